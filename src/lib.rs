pub mod config;
pub mod diagnosis;
pub mod image;
pub mod models;
pub mod utils;
pub mod web;

// 重新导出主要类型
pub use config::Config;
pub use diagnosis::{Diagnosis, Prediction, PredictionVector, CLASS_NAMES};
pub use models::LeafModel;
pub use utils::error::DetectorError;

pub type Result<T> = std::result::Result<T, DetectorError>;
