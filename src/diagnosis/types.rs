use crate::utils::error::DetectorError;
use crate::Result;
use serde::Serialize;

/// 模型训练时的类别顺序，与输出向量按位置对齐
pub const CLASS_NAMES: [&str; NUM_CLASSES] =
    ["Early Blight", "Leaf Mold or Rust", "Late Blight", "Healthy"];

pub const NUM_CLASSES: usize = 4;

/// 模型输出的分数向量，长度恒等于类别数
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PredictionVector([f32; NUM_CLASSES]);

impl PredictionVector {
    pub fn new(scores: [f32; NUM_CLASSES]) -> Result<Self> {
        if let Some(bad) = scores.iter().find(|s| !s.is_finite()) {
            return Err(DetectorError::Inference(format!(
                "Model produced a non-finite score: {}",
                bad
            )));
        }
        Ok(Self(scores))
    }

    /// 从模型原始输出构造；长度必须与类别数一致
    pub fn from_slice(scores: &[f32]) -> Result<Self> {
        let scores: [f32; NUM_CLASSES] = scores.try_into().map_err(|_| {
            DetectorError::Inference(format!(
                "Expected {} class scores, model produced {}",
                NUM_CLASSES,
                scores.len()
            ))
        })?;
        Self::new(scores)
    }

    pub fn scores(&self) -> &[f32; NUM_CLASSES] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// 最大分数的位置；并列时取第一个
    pub fn argmax(&self) -> (usize, f32) {
        let mut best = (0, self.0[0]);
        for (i, &score) in self.0.iter().enumerate().skip(1) {
            if score > best.1 {
                best = (i, score);
            }
        }
        best
    }

    /// 按类别名标注的分数，用于图表
    pub fn labelled(&self) -> impl Iterator<Item = ScoreEntry> + '_ {
        CLASS_NAMES
            .iter()
            .zip(self.0.iter())
            .map(|(label, &score)| ScoreEntry { label, score })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreEntry {
    pub label: &'static str,
    pub score: f32,
}

/// 单张图片的预测结果
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub class_index: usize,
    pub class_name: &'static str,
    /// 百分比 [0, 100]
    pub confidence: f32,
    pub scores: PredictionVector,
}

impl Prediction {
    pub fn from_scores(scores: PredictionVector) -> Self {
        let (class_index, max_score) = scores.argmax();
        Self {
            class_index,
            class_name: CLASS_NAMES[class_index],
            confidence: max_score * 100.0,
            scores,
        }
    }

    /// 页面上显示的两位小数百分比
    pub fn confidence_label(&self) -> String {
        format!("{:.2}%", self.confidence)
    }
}

/// 返回给展示层的完整结果
#[derive(Debug, Clone, Serialize)]
pub struct Diagnosis {
    pub class_name: &'static str,
    pub confidence: f32,
    pub advisory: &'static str,
    pub scores: Vec<ScoreEntry>,
    /// 处理耗时（秒）
    pub processing_time: f32,
    #[serde(skip)]
    pub prediction: Prediction,
}

impl Diagnosis {
    pub fn new(prediction: Prediction, advisory: &'static str, processing_time: f32) -> Self {
        Self {
            class_name: prediction.class_name,
            confidence: prediction.confidence,
            advisory,
            scores: prediction.scores.labelled().collect(),
            processing_time,
            prediction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_length_matches_class_names() {
        let v = PredictionVector::new([0.1, 0.2, 0.3, 0.4]).unwrap();
        assert_eq!(v.len(), CLASS_NAMES.len());
        assert_eq!(v.labelled().count(), NUM_CLASSES);
    }

    #[test]
    fn wrong_output_length_is_an_inference_error() {
        for bad in [&[0.5f32][..], &[0.1, 0.2, 0.3][..], &[0.1, 0.2, 0.3, 0.2, 0.2][..]] {
            let err = PredictionVector::from_slice(bad).unwrap_err();
            assert!(matches!(err, DetectorError::Inference(_)));
        }
    }

    #[test]
    fn non_finite_scores_are_rejected() {
        assert!(PredictionVector::new([f32::NAN, 0.0, 0.0, 0.0]).is_err());
        assert!(PredictionVector::new([0.0, f32::INFINITY, 0.0, 0.0]).is_err());
    }

    #[test]
    fn prediction_uses_argmax_and_scales_confidence() {
        let v = PredictionVector::new([0.05, 0.10, 0.80, 0.05]).unwrap();
        let p = Prediction::from_scores(v);
        assert_eq!(p.class_index, 2);
        assert_eq!(p.class_name, "Late Blight");
        assert!((p.confidence - 80.0).abs() < 1e-4);
        assert_eq!(p.confidence_label(), "80.00%");
    }

    #[test]
    fn ties_resolve_to_first_maximum() {
        let v = PredictionVector::new([0.4, 0.4, 0.1, 0.1]).unwrap();
        assert_eq!(v.argmax().0, 0);
    }

    #[test]
    fn scores_need_not_sum_to_one() {
        let v = PredictionVector::new([0.6, 0.1, 0.0, 0.1]).unwrap();
        let p = Prediction::from_scores(v);
        assert_eq!(p.class_name, "Early Blight");
        assert!((p.confidence - 60.0).abs() < 1e-4);
    }

    #[test]
    fn diagnosis_serializes_labelled_scores() {
        let v = PredictionVector::new([0.1, 0.2, 0.3, 0.4]).unwrap();
        let d = Diagnosis::new(Prediction::from_scores(v), "advice", 0.5);
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["class_name"], "Healthy");
        assert_eq!(json["scores"].as_array().unwrap().len(), 4);
        assert_eq!(json["scores"][1]["label"], "Leaf Mold or Rust");
        assert!(json.get("prediction").is_none());
    }
}
