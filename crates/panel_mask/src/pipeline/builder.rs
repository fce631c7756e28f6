use image::Rgb;

use crate::{
    algorithms::{DiffusionInpainter, HIGHLIGHT},
    config::PipelineConfig,
    pipeline::{Pipeline, RegionRemover},
    traits::Inpainter,
};

/// Builder for creating processing pipelines with a fluent API
pub struct PipelineBuilder {
    highlight: Rgb<u8>,
    inpainter: Option<Box<dyn Inpainter>>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            highlight: HIGHLIGHT,
            inpainter: None,
        }
    }

    /// Start from the operator configuration
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new().with_highlight(config.highlight_color())
    }

    /// Set the inpainting backend (replaces any existing one)
    pub fn with_inpainter<I>(mut self, inpainter: I) -> Self
    where
        I: Inpainter + 'static,
    {
        self.inpainter = Some(Box::new(inpainter));
        self
    }

    pub fn with_boxed_inpainter(mut self, inpainter: Box<dyn Inpainter>) -> Self {
        self.inpainter = Some(inpainter);
        self
    }

    pub fn with_highlight(mut self, color: Rgb<u8>) -> Self {
        self.highlight = color;
        self
    }

    /// Build the pipeline, falling back to the built-in diffusion inpainter
    pub fn build(self) -> Pipeline {
        let inpainter = self
            .inpainter
            .unwrap_or_else(|| Box::new(DiffusionInpainter::default()));
        Pipeline::new(self.highlight, RegionRemover::new(inpainter))
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use image::{GrayImage, RgbImage};

    use super::*;
    use crate::{error::Result, mask::Mask};

    struct Blackout;

    impl Inpainter for Blackout {
        fn inpaint(&self, image: &RgbImage, mask: &GrayImage) -> Result<RgbImage> {
            let mut out = image.clone();
            for (x, y, pixel) in out.enumerate_pixels_mut() {
                if mask.get_pixel(x, y).0[0] > 0 {
                    *pixel = Rgb([0, 0, 0]);
                }
            }
            Ok(out)
        }
    }

    #[test]
    fn test_from_config_uses_highlight() {
        let config = PipelineConfig { highlight: [0, 0, 255], ..PipelineConfig::default() };
        let pipeline = PipelineBuilder::from_config(&config).build();
        assert_eq!(pipeline.highlight(), Rgb([0, 0, 255]));
    }

    #[test]
    fn test_custom_inpainter_is_used() {
        let pipeline = PipelineBuilder::new().with_inpainter(Blackout).build();
        let image = RgbImage::from_pixel(6, 6, Rgb([200, 200, 200]));
        let mask = Mask::from_fn(6, 6, |x, y| x == 2 && y == 2);
        let result = pipeline.remove(&image, Some(&mask)).unwrap();
        assert_eq!(*result.get_pixel(2, 2), Rgb([0, 0, 0]));
        assert_eq!(*result.get_pixel(0, 0), Rgb([200, 200, 200]));
    }
}
