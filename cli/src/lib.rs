use std::fs;
use std::path::Path;

use model_bridge::{LamaInpainter, ScriptConfig, ScriptRunner, YoloSoundSegmenter, YoloTextDetector};
use panel_mask::{
    config::PipelineConfig, Category, DiffusionInpainter, Inpainter, MaskError, Pipeline, PipelineBuilder,
    SessionController,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    Mask(#[from] MaskError),
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

/// Where regions come from when an image is loaded without a detection file
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetectorBackend {
    /// No detector: only GeoJSON detections produce regions
    #[default]
    None,
    /// YOLO models behind a Python script
    Script {
        script: ScriptConfig,
        #[serde(default = "default_text_weights")]
        text_weights: String,
        #[serde(default = "default_sound_weights")]
        sound_weights: String,
    },
}

fn default_text_weights() -> String {
    YoloTextDetector::DEFAULT_WEIGHTS.to_string()
}

fn default_sound_weights() -> String {
    YoloSoundSegmenter::DEFAULT_WEIGHTS.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InpainterBackend {
    /// Built-in diffusion fill, no model required
    Builtin { smoothing_passes: usize },
    /// LaMa behind a Python script
    Script { script: ScriptConfig },
}

impl Default for InpainterBackend {
    fn default() -> Self {
        Self::Builtin {
            smoothing_passes: DiffusionInpainter::default().smoothing_passes,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    pub detector: DetectorBackend,
    pub inpainter: InpainterBackend,
}

/// Complete configuration file for the command line tool
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    pub backend: BackendConfig,
}

impl AppConfig {
    /// Load AppConfig from TOML string
    pub fn from_toml(content: &str) -> Result<Self, CliError> {
        Ok(toml::from_str(content)?)
    }

    /// Load AppConfig from JSON string
    pub fn from_json(content: &str) -> Result<Self, CliError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&fs::read_to_string(path_ref)?),
            Some("json") => Self::from_json(&fs::read_to_string(path_ref)?),
            _ => Err(CliError::UnsupportedFileFormat),
        }
    }

    /// Convert AppConfig to TOML string
    pub fn to_toml(&self) -> Result<String, CliError> {
        Ok(toml::to_string_pretty(&self)?)
    }

    /// Convert AppConfig to JSON string
    pub fn to_json(&self) -> Result<String, CliError> {
        Ok(serde_json::to_string_pretty(&self)?)
    }

    /// Save configuration, choosing the format from the extension
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), CliError> {
        let path_ref = path.as_ref();
        let content = match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => self.to_toml()?,
            Some("json") => self.to_json()?,
            _ => return Err(CliError::UnsupportedFileFormat),
        };
        fs::write(path_ref, content)?;
        Ok(())
    }

    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(AppConfig)
    }
}

/// Command line overrides applied on top of the loaded pipeline config
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub text_padding: Option<u32>,
    pub sound_padding: Option<u32>,
    pub no_text: bool,
    pub no_sound: bool,
}

impl Overrides {
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(radius) = self.text_padding {
            config.text_padding = radius;
        }
        if let Some(radius) = self.sound_padding {
            config.sound_padding = radius;
        }
        if self.no_text {
            config.selection = config.selection.with(Category::Text, false);
        }
        if self.no_sound {
            config.selection = config.selection.with(Category::Sound, false);
        }
    }
}

pub fn build_pipeline(config: &AppConfig) -> Pipeline {
    let inpainter: Box<dyn Inpainter> = match &config.backend.inpainter {
        InpainterBackend::Builtin { smoothing_passes } => {
            Box::new(DiffusionInpainter { smoothing_passes: *smoothing_passes })
        }
        InpainterBackend::Script { script } => Box::new(LamaInpainter::new(ScriptRunner::new(script.clone()))),
    };
    PipelineBuilder::from_config(&config.pipeline)
        .with_boxed_inpainter(inpainter)
        .build()
}

pub fn build_controller(config: &AppConfig) -> SessionController {
    let pipeline = build_pipeline(config);
    info!("{}", pipeline.info());
    let controller = SessionController::new(pipeline, &config.pipeline);
    match &config.backend.detector {
        DetectorBackend::None => controller,
        DetectorBackend::Script { script, text_weights, sound_weights } => {
            let runner = ScriptRunner::new(script.clone());
            controller.with_detectors(
                YoloTextDetector::new(runner.clone()).with_weights(text_weights.clone()),
                YoloSoundSegmenter::new(runner).with_weights(sound_weights.clone()),
            )
        }
    }
}
