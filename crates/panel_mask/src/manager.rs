use std::{
    path::{Path, PathBuf},
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use image::RgbImage;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr, VariantNames};
use tracing::{debug, info, warn};
use ts_rs::TS;

use crate::{
    config::{ArtifactConfig, PipelineConfig},
    error::{MaskError, Result},
    io::{geojson::load_detections_for, load_image, save_image},
    pipeline::{Pipeline, PipelineBuilder},
    session::Session,
    traits::{SoundSegmenter, StaticDetections, TextDetector},
    types::{Category, Detections, ImageDimensions, Padding, Selection},
};

#[derive(
    Debug, Clone,
    Serialize, Deserialize, JsonSchema,
    Display, VariantNames, IntoStaticStr,
    PartialEq
)]
#[serde(tag = "type", content = "params", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionCommand {
    /// Load a panel image and run both detectors on it
    LoadImage { path: String },

    /// Load a panel image together with precomputed GeoJSON detections
    LoadDetections { image: String, detections: String },

    /// Enable or disable one category
    SetCategory { category: Category, enabled: bool },

    /// Flip one category
    ToggleCategory { category: Category },

    /// Set the dilation radius of one category
    SetPadding {
        category: Category,
        #[schemars(range(max = 200))]
        radius: u32,
    },

    /// Inpaint the combined mask of the current session
    RemoveRegions,

    /// Write the displayed image to disk
    SaveImage { path: String },
}

impl SessionCommand {
    /// Get the JSON schema for all commands
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(SessionCommand)
    }

    /// Get a list of all available command names
    pub fn command_names() -> &'static [&'static str] {
        <Self as VariantNames>::VARIANTS
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::LoadImage { .. } => "Load a panel image and detect text boxes and sound effects",
            Self::LoadDetections { .. } => "Load a panel image with detections read from a GeoJSON file",
            Self::SetCategory { .. } => "Enable or disable text or sound regions in the mask",
            Self::ToggleCategory { .. } => "Flip whether a category contributes to the mask",
            Self::SetPadding { .. } => "Change how far a category's regions are grown before removal",
            Self::RemoveRegions => "Inpaint every pixel of the combined mask",
            Self::SaveImage { .. } => "Save the displayed image (inpainted result or preview)",
        }
    }

    /// Get parameter requirements for the command
    pub fn parameters_info(&self) -> Vec<(&'static str, &'static str, bool)> {
        match self {
            Self::LoadImage { .. } => vec![("path", "Path to the panel image", true)],
            Self::LoadDetections { .. } => vec![
                ("image", "Path to the panel image", true),
                ("detections", "Path to a GeoJSON detection file", true),
            ],
            Self::SetCategory { .. } => vec![
                ("category", "text or sound", true),
                ("enabled", "Whether the category is included", true),
            ],
            Self::ToggleCategory { .. } => vec![("category", "text or sound", true)],
            Self::SetPadding { .. } => vec![
                ("category", "text or sound", true),
                ("radius", "Square kernel size in pixels, 0 disables padding", true),
            ],
            Self::RemoveRegions => vec![],
            Self::SaveImage { .. } => vec![("path", "Output path ending in .png, .jpg or .jpeg", true)],
        }
    }

    /// One example of every command, in declaration order
    pub fn examples() -> Vec<Self> {
        vec![
            Self::LoadImage { path: "panel.png".to_string() },
            Self::LoadDetections {
                image: "panel.png".to_string(),
                detections: "panel.geojson".to_string(),
            },
            Self::SetCategory { category: Category::Text, enabled: true },
            Self::ToggleCategory { category: Category::Sound },
            Self::SetPadding { category: Category::Text, radius: Padding::DEFAULT_RADIUS },
            Self::RemoveRegions,
            Self::SaveImage { path: "cleaned.png".to_string() },
        ]
    }
}

/// Snapshot of the controller for display and tool responses
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema, TS)]
#[ts(export)]
pub struct SessionStatus {
    pub loaded: bool,
    pub source: Option<String>,
    pub dimensions: Option<ImageDimensions>,
    pub text_enabled: bool,
    pub sound_enabled: bool,
    pub text_padding: u32,
    pub sound_padding: u32,
    pub text_regions: usize,
    pub sound_regions: usize,
    #[ts(type = "number")]
    pub active_pixels: u64,
    pub can_remove: bool,
    pub has_result: bool,
    #[ts(type = "number")]
    pub epoch: u64,
    #[ts(type = "number")]
    pub revision: u64,
}

/// Generation counters captured when background work starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
pub struct Ticket {
    /// Bumped when an image load starts
    pub epoch: u64,
    /// Bumped on every mutation and removal start
    pub revision: u64,
}

#[derive(Debug)]
struct ControllerState {
    session: Option<Session>,
    source: Option<PathBuf>,
    selection: Selection,
    padding: Padding,
    epoch: u64,
    revision: u64,
}

impl ControllerState {
    fn ticket(&self) -> Ticket {
        Ticket { epoch: self.epoch, revision: self.revision }
    }

    fn status(&self) -> SessionStatus {
        let session = self.session.as_ref();
        SessionStatus {
            loaded: session.is_some(),
            source: self.source.as_ref().map(|path| path.display().to_string()),
            dimensions: session.map(Session::dimensions),
            text_enabled: self.selection.text,
            sound_enabled: self.selection.sound,
            text_padding: self.padding.text,
            sound_padding: self.padding.sound,
            text_regions: session.map_or(0, |s| s.detections().count(Category::Text)),
            sound_regions: session.map_or(0, |s| s.detections().count(Category::Sound)),
            active_pixels: session.map_or(0, |s| s.combined().active_count()),
            can_remove: session.is_some_and(Session::can_remove),
            has_result: session.is_some_and(|s| s.result().is_some()),
            epoch: self.epoch,
            revision: self.revision,
        }
    }
}

/// Owns the single session, the operator settings and the background work
/// that feeds it.
///
/// Loads and removals run on blocking workers. Their results are applied
/// only when no newer load (or, for removals, no newer mutation) started
/// in the meantime; otherwise they are dropped with
/// [`MaskError::StaleOperation`].
#[derive(Clone)]
pub struct SessionController {
    state: Arc<RwLock<ControllerState>>,
    pipeline: Arc<Pipeline>,
    text_detector: Arc<dyn TextDetector>,
    sound_segmenter: Arc<dyn SoundSegmenter>,
    artifacts: ArtifactConfig,
}

impl SessionController {
    /// Controller without detectors: images load with no regions until
    /// detectors are attached or detections are supplied directly
    pub fn new(pipeline: Pipeline, config: &PipelineConfig) -> Self {
        let empty = Arc::new(StaticDetections::default());
        Self {
            state: Arc::new(RwLock::new(ControllerState {
                session: None,
                source: None,
                selection: config.selection,
                padding: config.padding(),
                epoch: 0,
                revision: 0,
            })),
            pipeline: Arc::new(pipeline),
            text_detector: empty.clone(),
            sound_segmenter: empty,
            artifacts: config.artifacts.clone(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(PipelineBuilder::from_config(config).build(), config)
    }

    pub fn with_detectors<T, S>(self, text_detector: T, sound_segmenter: S) -> Self
    where
        T: TextDetector + 'static,
        S: SoundSegmenter + 'static,
    {
        self.with_shared_detectors(Arc::new(text_detector), Arc::new(sound_segmenter))
    }

    pub fn with_shared_detectors(
        mut self,
        text_detector: Arc<dyn TextDetector>,
        sound_segmenter: Arc<dyn SoundSegmenter>,
    ) -> Self {
        self.text_detector = text_detector;
        self.sound_segmenter = sound_segmenter;
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, ControllerState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ControllerState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    pub fn artifacts(&self) -> &ArtifactConfig {
        &self.artifacts
    }

    pub fn ticket(&self) -> Ticket {
        self.read().ticket()
    }

    pub fn status(&self) -> SessionStatus {
        self.read().status()
    }

    pub fn selection(&self) -> Selection {
        self.read().selection
    }

    pub fn padding(&self) -> Padding {
        self.read().padding
    }

    pub fn detections(&self) -> Option<(Detections, ImageDimensions)> {
        let state = self.read();
        let session = state.session.as_ref()?;
        Some((session.detections().clone(), session.dimensions()))
    }

    /// The inpainted result if one exists, otherwise the preview
    pub fn displayed_image(&self) -> Option<RgbImage> {
        self.read().session.as_ref().map(|s| s.displayed().clone())
    }

    /// Run `inspect` against the current session under the read lock
    pub fn with_session<T>(&self, inspect: impl FnOnce(&Session) -> T) -> Option<T> {
        self.read().session.as_ref().map(inspect)
    }

    /// Decode `path`, detect regions and make the result the current session.
    ///
    /// The load takes its place in line before decoding, so any load
    /// issued earlier is superseded even if its file decodes later. A
    /// decode failure leaves the session untouched. A load superseded by
    /// a newer one returns [`MaskError::StaleOperation`].
    pub async fn load_image<P: AsRef<Path>>(&self, path: P) -> Result<SessionStatus> {
        let path = path.as_ref().to_path_buf();
        let (ticket, selection, padding) = self.begin_load();
        let decode_path = path.clone();
        let image = run_blocking(move || load_image(&decode_path), MaskError::Detection).await?;
        self.ensure_current_load(ticket)?;

        let text_detector = self.text_detector.clone();
        let sound_segmenter = self.sound_segmenter.clone();
        let pipeline = self.pipeline.clone();
        info!(path = %path.display(), epoch = ticket.epoch, "detecting regions");

        let session = run_blocking(
            move || {
                let text = text_detector.detect_text(&image).map_err(as_detection_error)?;
                let sound = sound_segmenter.segment_sounds(&image).map_err(as_detection_error)?;
                Session::new(pipeline, image, Detections::new(text, sound), selection, padding)
            },
            MaskError::Detection,
        )
        .await?;

        self.commit_load(ticket, session, Some(path))
    }

    /// Install an image with detections computed elsewhere
    pub fn load_with_detections(
        &self,
        image: RgbImage,
        detections: Detections,
        source: Option<PathBuf>,
    ) -> Result<SessionStatus> {
        let (ticket, selection, padding) = self.begin_load();
        let session = Session::new(self.pipeline.clone(), image, detections, selection, padding)?;
        self.commit_load(ticket, session, source)
    }

    /// Decode an image and its GeoJSON detections, then install them
    pub async fn load_geojson<P, Q>(&self, image: P, detections: Q) -> Result<SessionStatus>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let image_path = image.as_ref().to_path_buf();
        let geojson_path = detections.as_ref().to_path_buf();
        let (ticket, selection, padding) = self.begin_load();

        let decode_path = image_path.clone();
        let pipeline = self.pipeline.clone();
        let session = run_blocking(
            move || {
                let image = load_image(&decode_path)?;
                let detections = load_detections_for(&geojson_path, ImageDimensions::of(&image))?;
                Session::new(pipeline, image, detections, selection, padding)
            },
            MaskError::Detection,
        )
        .await?;

        self.commit_load(ticket, session, Some(image_path))
    }

    fn ensure_current_load(&self, ticket: Ticket) -> Result<()> {
        let current = self.read().epoch;
        if current != ticket.epoch {
            debug!(issued = ticket.epoch, current, "discarding superseded load");
            return Err(MaskError::StaleOperation { issued: ticket.epoch, current });
        }
        Ok(())
    }

    fn begin_load(&self) -> (Ticket, Selection, Padding) {
        let mut state = self.write();
        state.epoch += 1;
        (state.ticket(), state.selection, state.padding)
    }

    fn commit_load(&self, ticket: Ticket, mut session: Session, source: Option<PathBuf>) -> Result<SessionStatus> {
        let (status, preview) = {
            let mut state = self.write();
            if state.epoch != ticket.epoch {
                debug!(issued = ticket.epoch, current = state.epoch, "discarding superseded load");
                return Err(MaskError::StaleOperation { issued: ticket.epoch, current: state.epoch });
            }
            // settings may have changed while detectors were running
            if session.selection() != state.selection || session.padding() != state.padding {
                session.reconfigure(state.selection, state.padding)?;
            }
            let preview = session.preview().clone();
            state.session = Some(session);
            state.source = source;
            state.revision += 1;
            (state.status(), preview)
        };

        info!(
            text_regions = status.text_regions,
            sound_regions = status.sound_regions,
            active_pixels = status.active_pixels,
            "session loaded"
        );
        self.write_artifact(self.artifacts.preview_path(), &preview);
        Ok(status)
    }

    fn update_settings(&self, selection: Selection, padding: Padding) -> Result<SessionStatus> {
        let (status, preview) = {
            let mut state = self.write();
            let preview = match state.session.as_mut() {
                Some(session) => {
                    session.reconfigure(selection, padding)?;
                    Some(session.preview().clone())
                }
                None => None,
            };
            state.selection = selection;
            state.padding = padding;
            state.revision += 1;
            (state.status(), preview)
        };

        if let Some(preview) = preview {
            self.write_artifact(self.artifacts.preview_path(), &preview);
        }
        Ok(status)
    }

    pub fn set_selection(&self, selection: Selection) -> Result<SessionStatus> {
        self.update_settings(selection, self.padding())
    }

    pub fn set_category(&self, category: Category, enabled: bool) -> Result<SessionStatus> {
        self.set_selection(self.selection().with(category, enabled))
    }

    pub fn toggle(&self, category: Category) -> Result<SessionStatus> {
        self.set_selection(self.selection().toggled(category))
    }

    pub fn set_padding(&self, padding: Padding) -> Result<SessionStatus> {
        self.update_settings(self.selection(), padding)
    }

    pub fn set_category_padding(&self, category: Category, radius: u32) -> Result<SessionStatus> {
        self.set_padding(self.padding().with(category, radius))
    }

    /// Inpaint the combined mask of the current session.
    ///
    /// On any error, including a stale result, the session is unchanged
    /// and no artifact is written.
    pub async fn remove(&self) -> Result<RgbImage> {
        let (ticket, source, combined) = {
            let mut state = self.write();
            let session = state.session.as_ref().ok_or(MaskError::NoImageLoaded)?;
            if !session.can_remove() {
                return Err(MaskError::NothingToRemove);
            }
            let source = session.source().clone();
            let combined = session.combined().clone();
            state.revision += 1;
            (state.ticket(), source, combined)
        };

        let pipeline = self.pipeline.clone();
        let result = run_blocking(
            move || pipeline.remove(&source, Some(&combined)),
            MaskError::InpaintingBackend,
        )
        .await?;

        {
            let mut state = self.write();
            let current = state.ticket();
            if current != ticket {
                let (issued, current) = if current.epoch != ticket.epoch {
                    (ticket.epoch, current.epoch)
                } else {
                    (ticket.revision, current.revision)
                };
                debug!(issued, current, "discarding superseded removal");
                return Err(MaskError::StaleOperation { issued, current });
            }
            if let Some(session) = state.session.as_mut() {
                session.apply_result(result.clone());
            }
            state.revision += 1;
        }

        info!("removal committed");
        self.write_artifact(self.artifacts.inpainted_path(), &result);
        Ok(result)
    }

    /// Write the displayed image; format follows the extension
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let displayed = self.displayed_image().ok_or(MaskError::NoImageLoaded)?;
        save_image(&displayed, path)
    }

    pub async fn execute(&self, command: SessionCommand) -> Result<SessionStatus> {
        debug!(command = %command, "executing");
        match command {
            SessionCommand::LoadImage { path } => self.load_image(path).await,
            SessionCommand::LoadDetections { image, detections } => self.load_geojson(image, detections).await,
            SessionCommand::SetCategory { category, enabled } => self.set_category(category, enabled),
            SessionCommand::ToggleCategory { category } => self.toggle(category),
            SessionCommand::SetPadding { category, radius } => self.set_category_padding(category, radius),
            SessionCommand::RemoveRegions => {
                self.remove().await?;
                Ok(self.status())
            }
            SessionCommand::SaveImage { path } => {
                self.save(path)?;
                Ok(self.status())
            }
        }
    }

    fn write_artifact(&self, path: Option<PathBuf>, image: &RgbImage) {
        let Some(path) = path else {
            return;
        };
        match save_image(image, &path) {
            Ok(()) => info!(path = %path.display(), "wrote artifact"),
            Err(e) => warn!(path = %path.display(), "failed to write artifact: {e}"),
        }
    }
}

fn as_detection_error(error: MaskError) -> MaskError {
    match error {
        MaskError::Detection(_) => error,
        other => MaskError::Detection(other.to_string()),
    }
}

/// Run `task` on the blocking pool; a panicked worker becomes `on_panic`
async fn run_blocking<T, F>(task: F, on_panic: fn(String) -> MaskError) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| on_panic(e.to_string()))?
}
