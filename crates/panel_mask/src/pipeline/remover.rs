use image::RgbImage;
use tracing::{info, warn};

use crate::{
    algorithms::overlay::ensure_matches,
    error::{MaskError, Result},
    mask::Mask,
    traits::Inpainter,
};

/// Erases masked regions by delegating to a single inpainting backend
pub struct RegionRemover {
    inpainter: Box<dyn Inpainter>,
}

impl RegionRemover {
    pub fn new(inpainter: Box<dyn Inpainter>) -> Self {
        Self { inpainter }
    }

    /// Inpaint every active pixel of `mask`.
    ///
    /// The backend is called once; an absent or empty mask never reaches it.
    pub fn remove(&self, image: &RgbImage, mask: Option<&Mask>) -> Result<RgbImage> {
        let mask = match mask {
            Some(mask) if !mask.is_empty() => mask,
            _ => return Err(MaskError::NothingToRemove),
        };
        ensure_matches(image, mask)?;

        let active = mask.active_count();
        info!(active, width = image.width(), height = image.height(), "removing masked regions");

        let result = self.inpainter.inpaint(image, mask.as_gray()).map_err(|e| {
            warn!("inpainting failed: {e}");
            match e {
                MaskError::InpaintingBackend(_) => e,
                other => MaskError::InpaintingBackend(other.to_string()),
            }
        })?;

        if result.dimensions() != image.dimensions() {
            return Err(MaskError::InpaintingBackend(format!(
                "backend returned {:?}, expected {:?}",
                result.dimensions(),
                image.dimensions()
            )));
        }
        Ok(result)
    }
}

impl std::fmt::Debug for RegionRemover {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionRemover").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use image::{GrayImage, Rgb};

    use super::*;
    use crate::algorithms::{changed_outside_mask, DiffusionInpainter};

    struct Counting(Arc<AtomicUsize>);

    impl Inpainter for Counting {
        fn inpaint(&self, image: &RgbImage, _mask: &GrayImage) -> Result<RgbImage> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(image.clone())
        }
    }

    struct Failing;

    impl Inpainter for Failing {
        fn inpaint(&self, _image: &RgbImage, _mask: &GrayImage) -> Result<RgbImage> {
            Err(MaskError::Io(std::io::Error::other("model crashed")))
        }
    }

    struct Shrinking;

    impl Inpainter for Shrinking {
        fn inpaint(&self, _image: &RgbImage, _mask: &GrayImage) -> Result<RgbImage> {
            Ok(RgbImage::new(1, 1))
        }
    }

    fn image() -> RgbImage {
        RgbImage::from_fn(20, 20, |x, y| Rgb([(x * 10) as u8, (y * 10) as u8, 50]))
    }

    #[test]
    fn test_empty_or_missing_mask_skips_backend() {
        let calls = Arc::new(AtomicUsize::new(0));
        let remover = RegionRemover::new(Box::new(Counting(calls.clone())));

        assert!(matches!(remover.remove(&image(), None), Err(MaskError::NothingToRemove)));
        assert!(matches!(
            remover.remove(&image(), Some(&Mask::empty(20, 20))),
            Err(MaskError::NothingToRemove)
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let mask = Mask::from_fn(20, 20, |x, y| x == 3 && y == 3);
        remover.remove(&image(), Some(&mask)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backend_failures_are_reported_as_backend_errors() {
        let mask = Mask::from_fn(20, 20, |x, _| x < 4);
        let err = RegionRemover::new(Box::new(Failing)).remove(&image(), Some(&mask)).unwrap_err();
        assert!(matches!(err, MaskError::InpaintingBackend(ref msg) if msg.contains("model crashed")));

        let err = RegionRemover::new(Box::new(Shrinking)).remove(&image(), Some(&mask)).unwrap_err();
        assert!(matches!(err, MaskError::InpaintingBackend(_)));
    }

    #[test]
    fn test_builtin_backend_keeps_outside_pixels() {
        let source = image();
        let mask = Mask::from_fn(20, 20, |x, y| (5..9).contains(&x) && (5..9).contains(&y));
        let result = RegionRemover::new(Box::new(DiffusionInpainter::default()))
            .remove(&source, Some(&mask))
            .unwrap();
        assert_eq!(changed_outside_mask(&source, &result, &mask).unwrap(), 0);
    }
}
