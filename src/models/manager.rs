use crate::image::NormalizedTensor;
use crate::models::{LeafModel, OnnxClassifier};
use crate::utils::error::DetectorError;
use crate::{Config, Result};
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// 全局模型管理器单例
pub struct ModelManager {
    model: Arc<dyn LeafModel>,
}

static MODEL_MANAGER: OnceCell<Arc<ModelManager>> = OnceCell::new();

impl ModelManager {
    /// 初始化全局模型管理器，从磁盘读取模型（进程内仅一次）
    pub fn init(config: Config) -> Result<Arc<ModelManager>> {
        if MODEL_MANAGER.get().is_some() {
            return Err(DetectorError::Internal(
                "Model manager already initialized".to_string(),
            ));
        }

        tracing::info!("Initializing model manager...");
        let model = Arc::new(OnnxClassifier::new(&config)?);

        Self::install(model)
    }

    /// 安装一个已加载的模型作为全局实例
    pub fn install(model: Arc<dyn LeafModel>) -> Result<Arc<ModelManager>> {
        let manager = Arc::new(ModelManager { model });

        MODEL_MANAGER
            .set(Arc::clone(&manager))
            .map_err(|_| DetectorError::Internal("Model manager already initialized".to_string()))?;

        tracing::info!("Model manager initialized successfully");
        Ok(manager)
    }

    /// 获取模型引用
    pub fn model(&self) -> Arc<dyn LeafModel> {
        Arc::clone(&self.model)
    }
}

/// 模型健康检查：对全黑输入做一次推理
pub fn health_check(model: &dyn LeafModel) -> Result<()> {
    tracing::debug!("Performing model health check...");

    model
        .predict(&NormalizedTensor::zeros())
        .map_err(|e| DetectorError::ModelUnavailable(format!("Health check failed: {}", e)))?;

    tracing::debug!("Model health check passed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnosis::PredictionVector;
    use crate::models::ModelStats;

    struct ConstantModel;

    impl LeafModel for ConstantModel {
        fn predict(&self, _input: &NormalizedTensor) -> Result<PredictionVector> {
            PredictionVector::new([0.1, 0.2, 0.3, 0.4])
        }

        fn stats(&self) -> ModelStats {
            ModelStats {
                backend: "constant",
                model_path: None,
                input_name: "input".into(),
                output_name: "output".into(),
                input_shape: [1, 128, 128, 3],
                intra_threads: 1,
                optimization_level: 0,
            }
        }
    }

    struct BrokenModel;

    impl LeafModel for BrokenModel {
        fn predict(&self, _input: &NormalizedTensor) -> Result<PredictionVector> {
            Err(DetectorError::Inference("session poisoned".into()))
        }

        fn stats(&self) -> ModelStats {
            ConstantModel.stats()
        }
    }

    // 全局单例只能设置一次，因此整个生命周期放在同一个测试里
    #[test]
    fn singleton_is_set_exactly_once() {
        let first = ModelManager::install(Arc::new(ConstantModel)).unwrap();
        assert_eq!(first.model().stats().backend, "constant");

        let second = ModelManager::install(Arc::new(ConstantModel));
        assert!(matches!(second, Err(DetectorError::Internal(_))));

        // 已初始化时不会再去读磁盘上的模型文件
        let reload = ModelManager::init(Config::default());
        assert!(matches!(reload, Err(DetectorError::Internal(_))));
    }

    #[test]
    fn health_check_reports_broken_model_as_unavailable() {
        assert!(health_check(&ConstantModel).is_ok());
        let err = health_check(&BrokenModel).unwrap_err();
        assert!(matches!(err, DetectorError::ModelUnavailable(_)));
    }
}
