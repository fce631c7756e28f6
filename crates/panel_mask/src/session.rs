use std::sync::Arc;

use image::RgbImage;
use tracing::debug;

use crate::{
    algorithms::Composition,
    error::Result,
    mask::Mask,
    pipeline::{CategoryMasks, Pipeline},
    types::{Category, Detections, ImageDimensions, Padding, Selection},
};

/// Everything derived from one loaded image.
///
/// Detections are rasterized once; selection and padding changes only
/// redo the padding, compositing and preview steps.
#[derive(Debug, Clone)]
pub struct Session {
    pipeline: Arc<Pipeline>,
    source: RgbImage,
    detections: Detections,
    masks: CategoryMasks,
    selection: Selection,
    padding: Padding,
    composition: Composition,
    preview: RgbImage,
    result: Option<RgbImage>,
}

impl Session {
    pub fn new(
        pipeline: Arc<Pipeline>,
        source: RgbImage,
        detections: Detections,
        selection: Selection,
        padding: Padding,
    ) -> Result<Self> {
        let masks = pipeline.build_masks(ImageDimensions::of(&source), &detections);
        let composition = pipeline.compose(&masks, selection, padding)?;
        let preview = pipeline.render(&source, &composition.combined)?;
        Ok(Self {
            pipeline,
            source,
            detections,
            masks,
            selection,
            padding,
            composition,
            preview,
            result: None,
        })
    }

    /// Recompute composition and preview for new settings.
    ///
    /// The session is left untouched when recomputing fails.
    pub fn reconfigure(&mut self, selection: Selection, padding: Padding) -> Result<()> {
        let composition = self.pipeline.compose(&self.masks, selection, padding)?;
        let preview = self.pipeline.render(&self.source, &composition.combined)?;
        debug!(
            active = composition.combined.active_count(),
            ?selection,
            ?padding,
            "recomputed composition"
        );
        self.selection = selection;
        self.padding = padding;
        self.composition = composition;
        self.preview = preview;
        self.result = None;
        Ok(())
    }

    pub fn set_selection(&mut self, selection: Selection) -> Result<()> {
        self.reconfigure(selection, self.padding)
    }

    pub fn set_category(&mut self, category: Category, enabled: bool) -> Result<()> {
        self.set_selection(self.selection.with(category, enabled))
    }

    pub fn toggle(&mut self, category: Category) -> Result<()> {
        self.set_selection(self.selection.toggled(category))
    }

    pub fn set_padding(&mut self, padding: Padding) -> Result<()> {
        self.reconfigure(self.selection, padding)
    }

    pub fn set_category_padding(&mut self, category: Category, radius: u32) -> Result<()> {
        self.set_padding(self.padding.with(category, radius))
    }

    /// Store a successful removal; it becomes the displayed image
    pub fn apply_result(&mut self, result: RgbImage) {
        self.result = Some(result);
    }

    /// The inpainted result when one exists, otherwise the preview
    pub fn displayed(&self) -> &RgbImage {
        self.result.as_ref().unwrap_or(&self.preview)
    }

    pub fn can_remove(&self) -> bool {
        !self.composition.combined.is_empty()
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    pub fn source(&self) -> &RgbImage {
        &self.source
    }

    pub fn detections(&self) -> &Detections {
        &self.detections
    }

    pub fn masks(&self) -> &CategoryMasks {
        &self.masks
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn padding(&self) -> Padding {
        self.padding
    }

    pub fn composition(&self) -> &Composition {
        &self.composition
    }

    pub fn combined(&self) -> &Mask {
        &self.composition.combined
    }

    pub fn preview(&self) -> &RgbImage {
        &self.preview
    }

    pub fn result(&self) -> Option<&RgbImage> {
        self.result.as_ref()
    }

    pub fn dimensions(&self) -> ImageDimensions {
        ImageDimensions::of(&self.source)
    }
}
