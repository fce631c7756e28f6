use std::path::Path;

use image::{GrayImage, Luma};

use crate::error::{MaskError, Result};

/// Binary pixel mask backed by a grayscale buffer holding only 0 or 255.
///
/// Every operation returns a new mask; nothing mutates in place once a
/// mask has been handed out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    image: GrayImage,
}

impl Mask {
    pub const ACTIVE: u8 = 255;
    pub const INACTIVE: u8 = 0;

    /// All-inactive mask of the given size
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            image: GrayImage::new(width, height),
        }
    }

    /// Any non-zero value is treated as active
    pub fn from_gray(image: GrayImage) -> Self {
        let mut image = image;
        for pixel in image.pixels_mut() {
            pixel.0[0] = if pixel.0[0] > 0 { Self::ACTIVE } else { Self::INACTIVE };
        }
        Self { image }
    }

    pub fn from_fn<F>(width: u32, height: u32, mut active: F) -> Self
    where
        F: FnMut(u32, u32) -> bool,
    {
        let image = GrayImage::from_fn(width, height, |x, y| {
            Luma([if active(x, y) { Self::ACTIVE } else { Self::INACTIVE }])
        });
        Self { image }
    }

    pub(crate) fn from_bits(width: u32, height: u32, bits: &[bool]) -> Self {
        debug_assert_eq!(bits.len(), (width as usize) * (height as usize));
        let raw = bits
            .iter()
            .map(|&bit| if bit { Self::ACTIVE } else { Self::INACTIVE })
            .collect();
        let image = GrayImage::from_raw(width, height, raw)
            .unwrap_or_else(|| GrayImage::new(width, height));
        Self { image }
    }

    pub(crate) fn bits(&self) -> Vec<bool> {
        self.image.as_raw().iter().map(|&v| v > 0).collect()
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Out-of-range coordinates are inactive
    pub fn is_active(&self, x: u32, y: u32) -> bool {
        x < self.width() && y < self.height() && self.image.get_pixel(x, y).0[0] > 0
    }

    pub fn active_count(&self) -> u64 {
        self.image.as_raw().iter().filter(|&&v| v > 0).count() as u64
    }

    pub fn is_empty(&self) -> bool {
        !self.image.as_raw().iter().any(|&v| v > 0)
    }

    /// Every active pixel of `self` is active in `other`
    pub fn is_subset_of(&self, other: &Mask) -> bool {
        self.dimensions() == other.dimensions()
            && self
                .image
                .as_raw()
                .iter()
                .zip(other.image.as_raw())
                .all(|(&a, &b)| a == 0 || b > 0)
    }

    pub fn ensure_same_dimensions(&self, other: &Mask) -> Result<()> {
        if self.dimensions() != other.dimensions() {
            return Err(MaskError::DimensionMismatch {
                expected: self.dimensions(),
                actual: other.dimensions(),
            });
        }
        Ok(())
    }

    pub fn union(&self, other: &Mask) -> Result<Mask> {
        self.combine(other, |a, b| a || b)
    }

    pub fn intersection(&self, other: &Mask) -> Result<Mask> {
        self.combine(other, |a, b| a && b)
    }

    /// Pixels active in `self` but not in `other`
    pub fn difference(&self, other: &Mask) -> Result<Mask> {
        self.combine(other, |a, b| a && !b)
    }

    fn combine<F>(&self, other: &Mask, op: F) -> Result<Mask>
    where
        F: Fn(bool, bool) -> bool,
    {
        self.ensure_same_dimensions(other)?;
        let raw = self
            .image
            .as_raw()
            .iter()
            .zip(other.image.as_raw())
            .map(|(&a, &b)| if op(a > 0, b > 0) { Self::ACTIVE } else { Self::INACTIVE })
            .collect();
        let image = GrayImage::from_raw(self.width(), self.height(), raw)
            .ok_or_else(|| MaskError::GeometricComputation("mask buffer size mismatch".to_string()))?;
        Ok(Mask { image })
    }

    /// Inclusive `(min_x, min_y, max_x, max_y)` of the active pixels
    pub fn bounding_box(&self) -> Option<(u32, u32, u32, u32)> {
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for (x, y, pixel) in self.image.enumerate_pixels() {
            if pixel.0[0] == 0 {
                continue;
            }
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }
        bounds
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.image
    }

    pub fn into_gray(self) -> GrayImage {
        self.image
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.image.save(path).map_err(MaskError::ImageWrite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: u32, from: u32, to: u32) -> Mask {
        Mask::from_fn(size, size, |x, y| (from..to).contains(&x) && (from..to).contains(&y))
    }

    #[test]
    fn test_empty_mask_has_no_active_pixels() {
        let mask = Mask::empty(12, 7);
        assert_eq!(mask.dimensions(), (12, 7));
        assert!(mask.is_empty());
        assert_eq!(mask.bounding_box(), None);
    }

    #[test]
    fn test_from_gray_normalizes_values() {
        let mut gray = GrayImage::new(3, 1);
        gray.put_pixel(1, 0, Luma([7]));
        let mask = Mask::from_gray(gray);
        assert_eq!(mask.as_gray().get_pixel(1, 0).0[0], Mask::ACTIVE);
        assert_eq!(mask.active_count(), 1);
    }

    #[test]
    fn test_set_operations() {
        let a = square(10, 0, 5);
        let b = square(10, 3, 8);
        assert_eq!(a.union(&b).unwrap().active_count(), 25 + 25 - 4);
        assert_eq!(a.intersection(&b).unwrap().active_count(), 4);
        let diff = a.difference(&b).unwrap();
        assert!(!diff.is_active(3, 3));
        assert!(diff.is_active(0, 0));
        assert!(diff.is_subset_of(&a));
    }

    #[test]
    fn test_dimension_mismatch_is_rejected() {
        let err = Mask::empty(4, 4).union(&Mask::empty(5, 4)).unwrap_err();
        assert!(matches!(err, MaskError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_bounding_box() {
        assert_eq!(square(20, 4, 9).bounding_box(), Some((4, 4, 8, 8)));
    }
}
