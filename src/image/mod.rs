pub mod loader;
pub mod preprocessing;

pub use loader::{ImageKind, Upload, UploadedImage};
pub use preprocessing::{ImagePreprocessor, NormalizedTensor, INPUT_CHANNELS, INPUT_SIZE};
