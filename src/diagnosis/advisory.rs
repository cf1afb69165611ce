/// 未收录类别时的通用提示
pub const NO_INFORMATION: &str = "No information available.";

const DISEASE_INFO: [(&str, &str); 4] = [
    (
        "Early Blight",
        "🦠 Caused by *Alternaria* fungus. Use fungicides and rotate crops.",
    ),
    (
        "Leaf Mold or Rust",
        "🍂 Caused by fungal infection. Improve ventilation and use organic sprays.",
    ),
    (
        "Late Blight",
        "💧 Caused by *Phytophthora infestans*. Avoid wet conditions and use resistant varieties.",
    ),
    (
        "Healthy",
        "🌱 The plant looks healthy! Maintain regular watering and soil nutrients.",
    ),
];

/// 查询类别对应的防治建议
pub fn advisory_for(class_name: &str) -> &'static str {
    DISEASE_INFO
        .iter()
        .find(|(name, _)| *name == class_name)
        .map(|(_, info)| *info)
        .unwrap_or(NO_INFORMATION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnosis::CLASS_NAMES;

    #[test]
    fn every_class_has_specific_advice() {
        for name in CLASS_NAMES {
            let info = advisory_for(name);
            assert!(!info.is_empty());
            assert_ne!(info, NO_INFORMATION, "missing advisory for {name}");
        }
    }

    #[test]
    fn unknown_class_falls_back() {
        assert_eq!(advisory_for("Powdery Mildew"), NO_INFORMATION);
        assert_eq!(advisory_for(""), NO_INFORMATION);
        assert_eq!(advisory_for("healthy"), NO_INFORMATION);
    }
}
