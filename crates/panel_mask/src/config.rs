use std::{
    fs,
    path::{Path, PathBuf},
};

use image::Rgb;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    error::{MaskError, Result},
    types::{Padding, Selection},
};

/// Operator defaults and artifact locations for the mask pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PipelineConfig {
    /// Dilation radius for text boxes, in pixels
    pub text_padding: u32,
    /// Dilation radius for sound polygons, in pixels
    pub sound_padding: u32,
    /// Preview highlight color as RGB
    pub highlight: [u8; 3],
    /// Categories enabled when the first image is loaded
    pub selection: Selection,
    pub artifacts: ArtifactConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            text_padding: Padding::DEFAULT_RADIUS,
            sound_padding: Padding::DEFAULT_RADIUS,
            highlight: [255, 0, 0],
            selection: Selection::all(),
            artifacts: ArtifactConfig::default(),
        }
    }
}

/// Where the preview and inpainting result are written after each step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Nothing is written when false
    pub enabled: bool,
    pub dir: PathBuf,
    pub preview_file: String,
    pub inpainted_file: String,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from("."),
            preview_file: "image_with_masks.png".to_string(),
            inpainted_file: "inpainted.png".to_string(),
        }
    }
}

impl ArtifactConfig {
    /// Keep the well-known file names but never write them
    pub fn disabled() -> Self {
        Self { enabled: false, ..Self::default() }
    }

    pub fn in_dir<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into(), ..Self::default() }
    }

    pub fn preview_path(&self) -> Option<PathBuf> {
        self.enabled.then(|| self.dir.join(&self.preview_file))
    }

    pub fn inpainted_path(&self) -> Option<PathBuf> {
        self.enabled.then(|| self.dir.join(&self.inpainted_file))
    }
}

impl PipelineConfig {
    pub fn padding(&self) -> Padding {
        Padding {
            text: self.text_padding,
            sound: self.sound_padding,
        }
    }

    pub fn highlight_color(&self) -> Rgb<u8> {
        Rgb(self.highlight)
    }

    /// Load configuration from TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| MaskError::Config(e.to_string()))
    }

    /// Load configuration from JSON string
    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        match extension(path).as_deref() {
            Some("toml") => Self::from_toml_str(&content),
            Some("json") => Self::from_json_str(&content),
            other => Err(MaskError::UnsupportedFormat(other.unwrap_or_default().to_string())),
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| MaskError::Config(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Save configuration, choosing the format from the extension
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = match extension(path).as_deref() {
            Some("toml") => self.to_toml()?,
            Some("json") => self.to_json()?,
            other => return Err(MaskError::UnsupportedFormat(other.unwrap_or_default().to_string())),
        };
        fs::write(path, content)?;
        Ok(())
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.padding(), Padding::uniform(10));
        assert_eq!(config.selection, Selection::all());
        assert_eq!(config.highlight_color(), Rgb([255, 0, 0]));
        assert_eq!(
            config.artifacts.preview_path(),
            Some(PathBuf::from("./image_with_masks.png"))
        );
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
            text_padding = 4

            [selection]
            text = true
            sound = false
            "#,
        )
        .unwrap();
        assert_eq!(config.text_padding, 4);
        assert_eq!(config.sound_padding, 10);
        assert_eq!(config.selection, Selection { text: true, sound: false });
        assert_eq!(config.artifacts.inpainted_file, "inpainted.png");
    }

    #[test]
    fn test_json_and_toml_agree() {
        let config = PipelineConfig {
            sound_padding: 0,
            artifacts: ArtifactConfig::disabled(),
            ..PipelineConfig::default()
        };
        let from_toml = PipelineConfig::from_toml_str(&config.to_toml().unwrap()).unwrap();
        let from_json = PipelineConfig::from_json_str(&config.to_json().unwrap()).unwrap();
        assert_eq!(from_toml, config);
        assert_eq!(from_json, config);
    }

    #[test]
    fn test_file_roundtrip_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("panel.toml");
        let config = PipelineConfig { text_padding: 7, ..PipelineConfig::default() };
        config.save(&path).unwrap();
        assert_eq!(PipelineConfig::from_file(&path).unwrap(), config);

        let bad = dir.path().join("panel.yaml");
        std::fs::write(&bad, "text_padding: 1").unwrap();
        assert!(matches!(PipelineConfig::from_file(&bad), Err(MaskError::UnsupportedFormat(_))));
    }
}
