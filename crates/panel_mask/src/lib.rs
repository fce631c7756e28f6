//! # Panel Mask Library
//!
//! Builds removal masks for comic panels from detected text boxes and
//! sound-effect polygons, previews them, and erases the masked regions
//! with a pluggable inpainting backend.
//!
//! ## Core Features
//!
//! - **Rasterization**: boxes and polygons become full-resolution binary masks
//! - **Padding**: per-category dilation with a square all-ones kernel
//! - **Compositing**: sound regions take precedence over text where they overlap
//! - **Preview**: masked pixels painted red on a copy of the panel
//! - **Removal**: one call into an [`Inpainter`], built-in or model-backed
//! - **Session control**: stale background results are discarded by generation tokens
//! - **GeoJSON Support**: export/import detections to standard GeoJSON
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use panel_mask::{Pipeline, Detections, ImageDimensions, Padding, Selection};
//!
//! let pipeline = Pipeline::builder().build();
//! let image = image::open("panel.png")?.to_rgb8();
//! let detections = Detections::from_geojson_file("panel.geojson")?;
//!
//! let masks = pipeline.build_masks(ImageDimensions::of(&image), &detections);
//! let composition = pipeline.compose(&masks, Selection::all(), Padding::default())?;
//! let preview = pipeline.render(&image, &composition.combined)?;
//! let cleaned = pipeline.remove(&image, Some(&composition.combined))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Interactive Session
//!
//! ```rust,no_run
//! use panel_mask::{config::PipelineConfig, manager::SessionController, Category};
//!
//! # async fn run() -> panel_mask::Result<()> {
//! let controller = SessionController::from_config(&PipelineConfig::default());
//! controller.load_image("panel.png").await?;
//! controller.set_category_padding(Category::Sound, 14)?;
//! controller.remove().await?;
//! controller.save("cleaned.png")?;
//! # Ok(())
//! # }
//! ```

// Core modules
pub mod error;
pub mod types;
pub mod mask;
pub mod traits;
pub mod algorithms;
pub mod pipeline;
pub mod config;
pub mod io;
pub mod session;
pub mod manager;
pub mod mcp;
pub mod typed_geojson;

// Re-exports for convenience
pub use error::{MaskError, Result};
pub use types::*;
pub use mask::Mask;
pub use traits::*;
pub use algorithms::*;
pub use pipeline::{CategoryMasks, Pipeline, PipelineBuilder, RegionRemover};
pub use session::Session;
pub use manager::{SessionCommand, SessionController, SessionStatus, Ticket};

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn panel() -> RgbImage {
        RgbImage::from_fn(120, 90, |x, y| Rgb([(x * 2) as u8, (y * 2) as u8, 128]))
    }

    fn detections() -> Detections {
        Detections::new(
            BoxSet::new(vec![BoxRegion::new(8.0, 8.0, 40.0, 20.0)]),
            PolygonSet::new(vec![PolygonRegion::new(vec![
                [60.0, 30.0],
                [100.0, 35.0],
                [90.0, 70.0],
                [65.0, 60.0],
            ])]),
        )
    }

    #[test]
    fn test_pipeline_end_to_end() {
        let pipeline = Pipeline::builder().build();
        let image = panel();

        let masks = pipeline.build_masks(ImageDimensions::of(&image), &detections());
        let composition = pipeline.compose(&masks, Selection::all(), Padding::uniform(4)).unwrap();
        assert!(masks.text.is_subset_of(&composition.combined));
        assert!(masks.sound.is_subset_of(&composition.combined));

        let preview = pipeline.render(&image, &composition.combined).unwrap();
        assert_eq!(changed_outside_mask(&image, &preview, &composition.combined).unwrap(), 0);

        let cleaned = pipeline.remove(&image, Some(&composition.combined)).unwrap();
        assert_eq!(cleaned.dimensions(), image.dimensions());
        assert_eq!(changed_outside_mask(&image, &cleaned, &composition.combined).unwrap(), 0);
    }

    #[test]
    fn test_padding_is_monotonic_through_pipeline() {
        let pipeline = Pipeline::builder().build();
        let masks = pipeline.build_masks(ImageDimensions { width: 120, height: 90 }, &detections());

        let mut previous = pipeline.compose(&masks, Selection::all(), Padding::uniform(0)).unwrap();
        for radius in [1, 3, 6, 11] {
            let next = pipeline.compose(&masks, Selection::all(), Padding::uniform(radius)).unwrap();
            assert!(previous.combined.is_subset_of(&next.combined), "radius {radius}");
            previous = next;
        }
    }

    #[test]
    fn test_geojson_detections_drive_a_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("panel.geojson");
        detections().save_geojson(ImageDimensions { width: 120, height: 90 }, &path).unwrap();

        let config = config::PipelineConfig {
            artifacts: config::ArtifactConfig::in_dir(dir.path()),
            ..config::PipelineConfig::default()
        };
        let controller = SessionController::from_config(&config);
        let restored = Detections::from_geojson_file(&path).unwrap();
        let status = controller.load_with_detections(panel(), restored, None).unwrap();

        assert_eq!((status.text_regions, status.sound_regions), (1, 1));
        assert!(status.can_remove);
        let preview = io::load_image(dir.path().join("image_with_masks.png")).unwrap();
        assert_eq!(*preview.get_pixel(20, 14), HIGHLIGHT);
    }
}
