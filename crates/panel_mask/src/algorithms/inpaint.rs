use image::{GrayImage, Rgb, RgbImage};
use tracing::debug;

use crate::{
    error::{MaskError, Result},
    traits::Inpainter,
};

/// Model-free inpainter: fills the mask inward from its border, then
/// relaxes the filled region with a few averaging sweeps.
///
/// Pixels outside the mask are copied verbatim.
#[derive(Debug, Clone)]
pub struct DiffusionInpainter {
    pub smoothing_passes: usize,
}

impl Default for DiffusionInpainter {
    fn default() -> Self {
        Self { smoothing_passes: 16 }
    }
}

const NEIGHBOURS_8: [(i64, i64); 8] = [
    (-1, -1), (0, -1), (1, -1),
    (-1, 0), (1, 0),
    (-1, 1), (0, 1), (1, 1),
];

const NEIGHBOURS_4: [(i64, i64); 4] = [(0, -1), (-1, 0), (1, 0), (0, 1)];

impl Inpainter for DiffusionInpainter {
    fn inpaint(&self, image: &RgbImage, mask: &GrayImage) -> Result<RgbImage> {
        if image.dimensions() != mask.dimensions() {
            return Err(MaskError::DimensionMismatch {
                expected: image.dimensions(),
                actual: mask.dimensions(),
            });
        }

        let (width, height) = image.dimensions();
        let (w, h) = (width as i64, height as i64);
        let masked: Vec<bool> = mask.as_raw().iter().map(|&v| v > 0).collect();
        let hole_size = masked.iter().filter(|&&m| m).count();
        if hole_size == 0 {
            return Ok(image.clone());
        }
        if hole_size == masked.len() {
            return Err(MaskError::InpaintingBackend(
                "mask covers the whole image, nothing to sample from".to_string(),
            ));
        }

        let mut values: Vec<[f32; 3]> = image
            .pixels()
            .map(|p| [p.0[0] as f32, p.0[1] as f32, p.0[2] as f32])
            .collect();
        let mut known: Vec<bool> = masked.iter().map(|&m| !m).collect();
        let index = |x: i64, y: i64| (y * w + x) as usize;

        let mut layers = 0usize;
        loop {
            let mut layer: Vec<(usize, [f32; 3])> = Vec::new();
            for y in 0..h {
                for x in 0..w {
                    let i = index(x, y);
                    if known[i] {
                        continue;
                    }
                    let mut sum = [0f32; 3];
                    let mut count = 0f32;
                    for (dx, dy) in NEIGHBOURS_8 {
                        let (nx, ny) = (x + dx, y + dy);
                        if nx < 0 || ny < 0 || nx >= w || ny >= h {
                            continue;
                        }
                        let j = index(nx, ny);
                        if known[j] {
                            for c in 0..3 {
                                sum[c] += values[j][c];
                            }
                            count += 1.0;
                        }
                    }
                    if count > 0.0 {
                        layer.push((i, [sum[0] / count, sum[1] / count, sum[2] / count]));
                    }
                }
            }
            if layer.is_empty() {
                break;
            }
            for (i, value) in layer {
                values[i] = value;
                known[i] = true;
            }
            layers += 1;
        }

        for _ in 0..self.smoothing_passes {
            let snapshot = values.clone();
            for y in 0..h {
                for x in 0..w {
                    let i = index(x, y);
                    if !masked[i] {
                        continue;
                    }
                    let mut sum = [0f32; 3];
                    let mut count = 0f32;
                    for (dx, dy) in NEIGHBOURS_4 {
                        let (nx, ny) = (x + dx, y + dy);
                        if nx < 0 || ny < 0 || nx >= w || ny >= h {
                            continue;
                        }
                        let j = index(nx, ny);
                        for c in 0..3 {
                            sum[c] += snapshot[j][c];
                        }
                        count += 1.0;
                    }
                    values[i] = [sum[0] / count, sum[1] / count, sum[2] / count];
                }
            }
        }

        debug!(hole_size, layers, passes = self.smoothing_passes, "diffusion inpaint finished");

        let mut output = image.clone();
        for (i, pixel) in output.pixels_mut().enumerate() {
            if masked[i] {
                let [r, g, b] = values[i];
                *pixel = Rgb([to_channel(r), to_channel(g), to_channel(b)]);
            }
        }
        Ok(output)
    }
}

fn to_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
