pub mod builder;
pub mod remover;

use image::{Rgb, RgbImage};
use tracing::debug;

use crate::{
    algorithms::{composite, pad, rasterize, render_overlay_with, Composition},
    error::Result,
    mask::Mask,
    types::{Category, Detections, ImageDimensions, Padding, Selection},
};

pub use builder::PipelineBuilder;
pub use remover::RegionRemover;

/// Unpadded masks, one per category, at full image resolution
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryMasks {
    pub text: Mask,
    pub sound: Mask,
}

impl CategoryMasks {
    pub fn get(&self, category: Category) -> &Mask {
        match category {
            Category::Text => &self.text,
            Category::Sound => &self.sound,
        }
    }
}

/// Rasterize, pad, composite, preview and remove, with pluggable inpainting
#[derive(Debug)]
pub struct Pipeline {
    highlight: Rgb<u8>,
    remover: RegionRemover,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn new(highlight: Rgb<u8>, remover: RegionRemover) -> Self {
        Self { highlight, remover }
    }

    pub fn highlight(&self) -> Rgb<u8> {
        self.highlight
    }

    /// Rasterize each category's detections at image resolution
    pub fn build_masks(&self, dims: ImageDimensions, detections: &Detections) -> CategoryMasks {
        let ImageDimensions { width, height } = dims;
        let text = rasterize(&detections.for_category(Category::Text), width, height);
        let sound = rasterize(&detections.for_category(Category::Sound), width, height);
        debug!(
            text_regions = detections.text.len(),
            sound_regions = detections.sound.len(),
            text_pixels = text.active_count(),
            sound_pixels = sound.active_count(),
            "rasterized detections"
        );
        CategoryMasks { text, sound }
    }

    /// Pad each enabled category by its own radius and merge them
    pub fn compose(&self, masks: &CategoryMasks, selection: Selection, padding: Padding) -> Result<Composition> {
        let (width, height) = masks.text.dimensions();
        let padded = |category: Category| {
            if selection.contains(category) {
                pad(masks.get(category), padding.get(category))
            } else {
                Mask::empty(width, height)
            }
        };
        composite(selection, &padded(Category::Text), &padded(Category::Sound))
    }

    pub fn render(&self, image: &RgbImage, combined: &Mask) -> Result<RgbImage> {
        render_overlay_with(image, combined, self.highlight)
    }

    pub fn remove(&self, image: &RgbImage, combined: Option<&Mask>) -> Result<RgbImage> {
        self.remover.remove(image, combined)
    }

    /// Get information about the pipeline configuration
    pub fn info(&self) -> String {
        format!("Pipeline: highlight {:?}, {:?}", self.highlight.0, self.remover)
    }
}
