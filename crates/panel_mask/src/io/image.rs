use std::path::Path;

use image::{ImageFormat, RgbImage};
use tracing::info;

use crate::error::{MaskError, Result};

/// Decode any supported raster file into 8-bit RGB
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<RgbImage> {
    let path = path.as_ref();
    let image = image::open(path)?.to_rgb8();
    info!(path = %path.display(), width = image.width(), height = image.height(), "loaded image");
    Ok(image)
}

/// Encoding chosen from the file extension; only PNG and JPEG are written
pub fn output_format(path: &Path) -> Result<ImageFormat> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => Ok(ImageFormat::Png),
        "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
        _ => Err(MaskError::UnsupportedFormat(extension)),
    }
}

pub fn save_image<P: AsRef<Path>>(image: &RgbImage, path: P) -> Result<()> {
    let path = path.as_ref();
    let format = output_format(path)?;
    image.save_with_format(path, format).map_err(MaskError::ImageWrite)?;
    info!(path = %path.display(), "saved image");
    Ok(())
}

#[cfg(test)]
mod tests {
    use image::Rgb;

    use super::*;

    #[test]
    fn test_save_and_reload_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("panel.png");
        let image = RgbImage::from_fn(5, 3, |x, y| Rgb([x as u8 * 40, y as u8 * 80, 7]));
        save_image(&image, &path).unwrap();
        assert_eq!(load_image(&path).unwrap(), image);
    }

    #[test]
    fn test_output_format_by_extension() {
        assert_eq!(output_format(Path::new("a.PNG")).unwrap(), ImageFormat::Png);
        assert_eq!(output_format(Path::new("a.jpeg")).unwrap(), ImageFormat::Jpeg);
        assert!(matches!(output_format(Path::new("a.bmp")), Err(MaskError::UnsupportedFormat(_))));
        assert!(matches!(output_format(Path::new("noext")), Err(MaskError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_corrupt_file_is_invalid_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not a png").unwrap();
        assert!(matches!(load_image(&path), Err(MaskError::InvalidImage(_))));
    }
}
