use image::{Rgb, RgbImage};

use crate::{
    error::{MaskError, Result},
    mask::Mask,
};

/// Preview highlight for masked pixels
pub const HIGHLIGHT: Rgb<u8> = Rgb([255, 0, 0]);

/// Copy of `image` with every active mask pixel painted pure red
pub fn render_overlay(image: &RgbImage, mask: &Mask) -> Result<RgbImage> {
    render_overlay_with(image, mask, HIGHLIGHT)
}

pub fn render_overlay_with(image: &RgbImage, mask: &Mask, color: Rgb<u8>) -> Result<RgbImage> {
    ensure_matches(image, mask)?;
    let mut preview = image.clone();
    for (x, y, pixel) in preview.enumerate_pixels_mut() {
        if mask.is_active(x, y) {
            *pixel = color;
        }
    }
    Ok(preview)
}

/// Number of pixels outside `mask` where `result` differs from `original`.
///
/// Inpainters must keep this at zero; the remover does not check it.
pub fn changed_outside_mask(original: &RgbImage, result: &RgbImage, mask: &Mask) -> Result<u64> {
    ensure_matches(original, mask)?;
    if original.dimensions() != result.dimensions() {
        return Err(MaskError::DimensionMismatch {
            expected: original.dimensions(),
            actual: result.dimensions(),
        });
    }
    let changed = original
        .enumerate_pixels()
        .filter(|(x, y, pixel)| !mask.is_active(*x, *y) && result.get_pixel(*x, *y) != *pixel)
        .count();
    Ok(changed as u64)
}

pub(crate) fn ensure_matches(image: &RgbImage, mask: &Mask) -> Result<()> {
    if image.dimensions() != mask.dimensions() {
        return Err(MaskError::DimensionMismatch {
            expected: image.dimensions(),
            actual: mask.dimensions(),
        });
    }
    Ok(())
}
