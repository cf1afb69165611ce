use crate::{
    diagnosis::{advisory_for, Diagnosis, Prediction},
    image::{ImagePreprocessor, UploadedImage},
    models::LeafModel,
    utils::error::DetectorError,
    Result,
};
use std::sync::Arc;
use std::time::Instant;

/// 叶片图片 -> 预测结果 的处理流水线
pub struct DiagnosisPipeline;

impl DiagnosisPipeline {
    /// 同步执行：解码、预处理、推理、取最大值
    pub fn predict(model: &dyn LeafModel, upload: &UploadedImage) -> Result<Prediction> {
        let image = upload.decode()?;
        let tensor = ImagePreprocessor::to_tensor(&image)?;

        let scores = model.predict(&tensor)?;

        Ok(Prediction::from_scores(scores))
    }

    /// 在阻塞线程池中运行流水线并附加防治建议
    pub async fn diagnose(model: Arc<dyn LeafModel>, upload: UploadedImage) -> Result<Diagnosis> {
        let start_time = Instant::now();

        let prediction = tokio::task::spawn_blocking(move || Self::predict(model.as_ref(), &upload))
            .await
            .map_err(|e| DetectorError::Internal(format!("Inference task failed: {}", e)))??;

        let advisory = advisory_for(prediction.class_name);
        let processing_time = start_time.elapsed().as_secs_f32();

        tracing::debug!(
            "Scores: {:?} -> {} ({})",
            prediction.scores.scores(),
            prediction.class_name,
            prediction.confidence_label()
        );

        Ok(Diagnosis::new(prediction, advisory, processing_time))
    }
}
