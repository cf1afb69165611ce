use crate::diagnosis::PredictionVector;
use crate::image::{NormalizedTensor, INPUT_CHANNELS, INPUT_SIZE};
use crate::utils::error::DetectorError;
use crate::{Config, Result};
use ort::{
    inputs,
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use parking_lot::Mutex;
use serde::Serialize;
use std::path::PathBuf;

/// 叶片病害分类模型：输入归一化张量，输出各类别分数
pub trait LeafModel: Send + Sync {
    fn predict(&self, input: &NormalizedTensor) -> Result<PredictionVector>;

    fn stats(&self) -> ModelStats;
}

/// 模型统计信息
#[derive(Debug, Clone, Serialize)]
pub struct ModelStats {
    pub backend: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_path: Option<String>,
    pub input_name: String,
    pub output_name: String,
    pub input_shape: [usize; 4],
    pub intra_threads: usize,
    pub optimization_level: i32,
}

pub struct OnnxClassifier {
    session: Mutex<Session>,
    model_path: PathBuf,
    input_name: String,  // 动态发现的输入名称
    output_name: String, // 动态发现的输出名称
    intra_threads: usize,
    optimization_level: i32,
}

impl OnnxClassifier {
    pub fn new(config: &Config) -> Result<Self> {
        let model_path = config.model_path.clone();

        if !model_path.exists() {
            return Err(DetectorError::ModelLoad(format!(
                "Model not found: {}",
                model_path.display()
            )));
        }

        tracing::info!("Loading classification model from: {}", model_path.display());

        let session = Session::builder()?
            .with_optimization_level(optimization_level(config.onnx_config.optimization_level))?
            .with_intra_threads(config.onnx_config.intra_threads)?
            .commit_from_file(&model_path)
            .map_err(|e| {
                DetectorError::ModelLoad(format!(
                    "Failed to load model {}: {}",
                    model_path.display(),
                    e
                ))
            })?;

        let input_name = match session.inputs.first() {
            Some(input) => input.name.clone(),
            None => {
                return Err(DetectorError::ModelLoad(
                    "Classification model has no inputs".to_string(),
                ))
            }
        };

        let output_name = match session.outputs.first() {
            Some(output) => output.name.clone(),
            None => {
                return Err(DetectorError::ModelLoad(
                    "Classification model has no outputs".to_string(),
                ))
            }
        };

        tracing::info!(
            "Classification model I/O: input='{}', output='{}'",
            input_name,
            output_name
        );
        for (i, output) in session.outputs.iter().enumerate() {
            tracing::debug!("Classification output[{}]: '{}'", i, output.name);
        }

        Ok(Self {
            session: Mutex::new(session),
            model_path,
            input_name,
            output_name,
            intra_threads: config.onnx_config.intra_threads,
            optimization_level: config.onnx_config.optimization_level,
        })
    }
}

impl LeafModel for OnnxClassifier {
    fn predict(&self, input: &NormalizedTensor) -> Result<PredictionVector> {
        let input_tensor = Tensor::from_array(input.as_array().clone())?;

        let scores: Vec<f32> = {
            let mut session = self.session.lock();
            let outputs = session.run(inputs![self.input_name.as_str() => input_tensor])?;

            match outputs.get(&self.output_name) {
                Some(output) => output.try_extract_array::<f32>()?.iter().copied().collect(),
                None => {
                    let available: Vec<String> = outputs.keys().map(|s| s.to_string()).collect();
                    return Err(DetectorError::Inference(format!(
                        "Classification output '{}' not found. Available outputs: {:?}",
                        self.output_name, available
                    )));
                }
            }
        };

        PredictionVector::from_slice(&scores)
    }

    fn stats(&self) -> ModelStats {
        ModelStats {
            backend: "onnxruntime",
            model_path: Some(self.model_path.display().to_string()),
            input_name: self.input_name.clone(),
            output_name: self.output_name.clone(),
            input_shape: [1, INPUT_SIZE, INPUT_SIZE, INPUT_CHANNELS],
            intra_threads: self.intra_threads,
            optimization_level: self.optimization_level,
        }
    }
}

fn optimization_level(level: i32) -> GraphOptimizationLevel {
    match level {
        i32::MIN..=0 => GraphOptimizationLevel::Disable,
        1 => GraphOptimizationLevel::Level1,
        2 => GraphOptimizationLevel::Level2,
        _ => GraphOptimizationLevel::Level3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_model_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            model_path: dir.path().join("absent.onnx"),
            ..Config::default()
        };
        let err = OnnxClassifier::new(&config).err().unwrap();
        assert!(matches!(err, DetectorError::ModelLoad(_)));
        assert!(err.to_string().contains("absent.onnx"));
    }

    #[test]
    #[ignore = "requires the ONNX Runtime shared library"]
    fn corrupt_model_is_a_load_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"definitely not protobuf").unwrap();
        let config = Config {
            model_path: file.path().to_path_buf(),
            ..Config::default()
        };
        let err = OnnxClassifier::new(&config).err().unwrap();
        assert!(matches!(err, DetectorError::ModelLoad(_) | DetectorError::Ort(_)));
    }
}
