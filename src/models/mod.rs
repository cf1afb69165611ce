pub mod classifier;
pub mod manager;

pub use classifier::{LeafModel, ModelStats, OnnxClassifier};
pub use manager::ModelManager;
pub use manager::health_check;
