use image::{GrayImage, RgbImage};
use panel_mask::{Inpainter, MaskError};
use serde_json::json;
use tracing::warn;

use crate::{
    runner::{path_str, png_temp_path, stage_mask, stage_png, ScriptRunner},
    Result,
};

/// LaMa inpainting through a script that writes its result to `output_path`
#[derive(Debug, Clone)]
pub struct LamaInpainter {
    runner: ScriptRunner,
}

impl LamaInpainter {
    pub fn new(runner: ScriptRunner) -> Self {
        Self { runner }
    }

    pub fn run(&self, image: &RgbImage, mask: &GrayImage) -> Result<RgbImage> {
        let image_path = stage_png(image)?;
        let mask_path = stage_mask(mask)?;
        let output_path = png_temp_path()?;

        let params = json!({
            "task": "inpaint",
            "mask_path": path_str(&mask_path),
            "output_path": path_str(&output_path),
        });
        self.runner.run(&json!({ "image_path": path_str(&image_path) }), &params)?;

        Ok(image::open(&output_path)?.to_rgb8())
    }
}

impl Inpainter for LamaInpainter {
    fn inpaint(&self, image: &RgbImage, mask: &GrayImage) -> panel_mask::Result<RgbImage> {
        self.run(image, mask).map_err(|e| {
            warn!("inpainting script failed: {e}");
            MaskError::InpaintingBackend(e.to_string())
        })
    }
}
