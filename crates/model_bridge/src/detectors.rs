use image::RgbImage;
use panel_mask::{BoxRegion, BoxSet, MaskError, PolygonRegion, PolygonSet, SoundSegmenter, TextDetector};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::{runner::ScriptRunner, Result};

#[derive(Deserialize)]
struct BoxesResponse {
    boxes: Vec<[f32; 4]>,
}

#[derive(Deserialize)]
struct PolygonsResponse {
    /// `null` when the model found no instances
    polygons: Option<Vec<Vec<[f32; 2]>>>,
}

/// `{"boxes": [[x1, y1, x2, y2], ...]}`
pub fn parse_boxes(response: &Value) -> Result<BoxSet> {
    let BoxesResponse { boxes } = BoxesResponse::deserialize(response)?;
    Ok(boxes
        .into_iter()
        .map(|[x1, y1, x2, y2]| BoxRegion::new(x1, y1, x2, y2))
        .collect())
}

/// `{"polygons": [[[x, y], ...], ...]}` or `{"polygons": null}`
pub fn parse_polygons(response: &Value) -> Result<PolygonSet> {
    let PolygonsResponse { polygons } = PolygonsResponse::deserialize(response)?;
    Ok(polygons
        .unwrap_or_default()
        .into_iter()
        .filter(|vertices| !vertices.is_empty())
        .map(PolygonRegion::new)
        .collect())
}

/// Text boxes from a YOLO detection model
#[derive(Debug, Clone)]
pub struct YoloTextDetector {
    runner: ScriptRunner,
    weights: String,
}

impl YoloTextDetector {
    pub const DEFAULT_WEIGHTS: &'static str = "best.pt";

    pub fn new(runner: ScriptRunner) -> Self {
        Self { runner, weights: Self::DEFAULT_WEIGHTS.to_string() }
    }

    pub fn with_weights(mut self, weights: impl Into<String>) -> Self {
        self.weights = weights.into();
        self
    }

    pub fn params(&self) -> Value {
        json!({ "task": "detect_boxes", "weights": self.weights })
    }

    pub fn detect(&self, image: &RgbImage) -> Result<BoxSet> {
        let boxes = parse_boxes(&self.runner.run_on_image(image, &self.params())?)?;
        debug!(count = boxes.len(), "text boxes detected");
        Ok(boxes)
    }
}

impl TextDetector for YoloTextDetector {
    fn detect_text(&self, image: &RgbImage) -> panel_mask::Result<BoxSet> {
        self.detect(image).map_err(|e| {
            warn!("text detection failed: {e}");
            MaskError::Detection(e.to_string())
        })
    }
}

/// Sound-effect polygons from a YOLO segmentation model
#[derive(Debug, Clone)]
pub struct YoloSoundSegmenter {
    runner: ScriptRunner,
    weights: String,
}

impl YoloSoundSegmenter {
    pub const DEFAULT_WEIGHTS: &'static str = "Sbest.pt";

    pub fn new(runner: ScriptRunner) -> Self {
        Self { runner, weights: Self::DEFAULT_WEIGHTS.to_string() }
    }

    pub fn with_weights(mut self, weights: impl Into<String>) -> Self {
        self.weights = weights.into();
        self
    }

    pub fn params(&self) -> Value {
        json!({ "task": "segment_polygons", "weights": self.weights })
    }

    pub fn segment(&self, image: &RgbImage) -> Result<PolygonSet> {
        let polygons = parse_polygons(&self.runner.run_on_image(image, &self.params())?)?;
        debug!(count = polygons.len(), "sound polygons segmented");
        Ok(polygons)
    }
}

impl SoundSegmenter for YoloSoundSegmenter {
    fn segment_sounds(&self, image: &RgbImage) -> panel_mask::Result<PolygonSet> {
        self.segment(image).map_err(|e| {
            warn!("sound segmentation failed: {e}");
            MaskError::Detection(e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BridgeError, ScriptConfig};

    #[test]
    fn test_parse_boxes_normalizes_corners() {
        let boxes = parse_boxes(&json!({"boxes": [[10, 12, 30, 40], [50.5, 60, 45, 55]]})).unwrap();
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes.boxes[0], BoxRegion::new(10.0, 12.0, 30.0, 40.0));
        assert_eq!(boxes.boxes[1], BoxRegion { x1: 45.0, y1: 55.0, x2: 50.5, y2: 60.0 });
    }

    #[test]
    fn test_parse_boxes_rejects_malformed() {
        assert!(matches!(parse_boxes(&json!({"boxes": [[1, 2, 3]]})), Err(BridgeError::InvalidResponse(_))));
        assert!(matches!(parse_boxes(&json!({})), Err(BridgeError::InvalidResponse(_))));
    }

    #[test]
    fn test_parse_polygons_null_means_none() {
        assert!(parse_polygons(&json!({"polygons": null})).unwrap().is_empty());
        let polygons = parse_polygons(&json!({"polygons": [[[0, 0], [10, 0], [5, 8]], []]})).unwrap();
        assert_eq!(polygons.len(), 1);
        assert_eq!(polygons.polygons[0].vertices, vec![[0.0, 0.0], [10.0, 0.0], [5.0, 8.0]]);
    }

    #[test]
    fn test_params_carry_task_and_weights() {
        let runner = ScriptRunner::new(ScriptConfig::new("yolo.py"));
        assert_eq!(
            YoloTextDetector::new(runner.clone()).params(),
            json!({"task": "detect_boxes", "weights": "best.pt"})
        );
        assert_eq!(
            YoloSoundSegmenter::new(runner).with_weights("custom.pt").params(),
            json!({"task": "segment_polygons", "weights": "custom.pt"})
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_detector_failure_maps_to_detection_error() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("broken.sh");
        std::fs::write(&script, "exit 1").unwrap();
        let runner = ScriptRunner::new(ScriptConfig { script, uv: None, python: "sh".to_string() });

        let image = RgbImage::new(4, 4);
        let err = YoloTextDetector::new(runner).detect_text(&image).unwrap_err();
        assert!(matches!(err, MaskError::Detection(_)));
    }
}
