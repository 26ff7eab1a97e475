//! Seam for image-based ingredient detection.
//!
//! Detection itself happens outside this crate; whatever implements
//! [`IngredientDetector`] hands back labelled detections, which are turned into the
//! same ingredient list a user would type by hand.

use crate::error::DetectError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub name: String,
    pub confidence: f32,
}

pub trait IngredientDetector: Send + Sync {
    fn detect(&self, image: &[u8]) -> Result<Vec<Detection>, DetectError>;
}

pub fn filter_by_confidence(detections: &[Detection], threshold: f32) -> Vec<Detection> {
    detections.iter().filter(|d| d.confidence >= threshold).cloned().collect()
}

/// Distinct lower-cased ingredient names, most confident first.
pub fn ingredient_list(detections: &[Detection]) -> Vec<String> {
    let mut sorted: Vec<&Detection> = detections.iter().collect();
    sorted.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));

    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for d in sorted {
        let name = d.name.trim().to_lowercase();
        if name.is_empty() { continue; }
        if seen.insert(name.clone()) {
            names.push(name);
        }
    }
    names
}

/// Run `detector` on `image` and keep detections at or above `min_confidence`.
pub fn detect_ingredients(
    detector: &dyn IngredientDetector,
    image: &[u8],
    min_confidence: f32,
) -> Result<Vec<String>, DetectError> {
    let detections = detector.detect(image)?;
    let kept = filter_by_confidence(&detections, min_confidence);
    tracing::debug!(detected = detections.len(), kept = kept.len(), "filtered detections");
    Ok(ingredient_list(&kept))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(name: &str, confidence: f32) -> Detection {
        Detection { name: name.into(), confidence }
    }

    struct Fixed(Vec<Detection>);

    impl IngredientDetector for Fixed {
        fn detect(&self, image: &[u8]) -> Result<Vec<Detection>, DetectError> {
            if image.is_empty() {
                return Err(DetectError::UnsupportedImage("empty payload".into()));
            }
            Ok(self.0.clone())
        }
    }

    #[test]
    fn list_is_confidence_ordered_and_deduplicated() {
        let names = ingredient_list(&[det("Banana", 0.7), det("apple ", 0.9), det("banana", 0.95), det(" ", 0.99)]);
        assert_eq!(names, vec!["banana".to_string(), "apple".to_string()]);
    }

    #[test]
    fn low_confidence_detections_are_dropped() {
        let detector = Fixed(vec![det("carrot", 0.8), det("broccoli", 0.3)]);
        let names = detect_ingredients(&detector, b"jpeg", DEFAULT_MIN_CONFIDENCE).unwrap();
        assert_eq!(names, vec!["carrot".to_string()]);
        assert!(detect_ingredients(&detector, b"", DEFAULT_MIN_CONFIDENCE).is_err());
    }
}
