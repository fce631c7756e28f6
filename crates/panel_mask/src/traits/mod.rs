use image::{GrayImage, RgbImage};
use crate::{
    error::Result,
    types::{BoxSet, Detections, PolygonSet},
};

/// Detector capability for machine-printed text
pub trait TextDetector: Send + Sync {
    /// Return zero or more text boxes in pixel coordinates
    fn detect_text(&self, image: &RgbImage) -> Result<BoxSet>;
}

/// Segmentation capability for sound and decorative lettering
pub trait SoundSegmenter: Send + Sync {
    /// Return zero or more polygons; no instances is a valid, empty result
    fn segment_sounds(&self, image: &RgbImage) -> Result<PolygonSet>;
}

/// Inpainting capability.
///
/// Implementations are expected to reproduce every pixel outside `mask`
/// unchanged and to return an image with the input's dimensions.
pub trait Inpainter: Send + Sync {
    fn inpaint(&self, image: &RgbImage, mask: &GrayImage) -> Result<RgbImage>;
}

/// Precomputed detections served as both detector capabilities
#[derive(Debug, Clone, Default)]
pub struct StaticDetections {
    detections: Detections,
}

impl StaticDetections {
    pub fn new(detections: Detections) -> Self {
        Self { detections }
    }

    pub fn detections(&self) -> &Detections {
        &self.detections
    }
}

impl TextDetector for StaticDetections {
    fn detect_text(&self, _image: &RgbImage) -> Result<BoxSet> {
        Ok(self.detections.text.clone())
    }
}

impl SoundSegmenter for StaticDetections {
    fn segment_sounds(&self, _image: &RgbImage) -> Result<PolygonSet> {
        Ok(self.detections.sound.clone())
    }
}
