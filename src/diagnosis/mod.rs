pub mod advisory;
pub mod pipeline;
pub mod types;

pub use advisory::{advisory_for, NO_INFORMATION};
pub use pipeline::DiagnosisPipeline;
pub use types::{Diagnosis, Prediction, PredictionVector, ScoreEntry, CLASS_NAMES, NUM_CLASSES};
