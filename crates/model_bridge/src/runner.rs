use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::Command,
};

use image::{GrayImage, RgbImage};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tempfile::{NamedTempFile, TempPath};
use tracing::debug;

use crate::{BridgeError, Result};

/// How to launch a model script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScriptConfig {
    /// Python script implementing the `--input/--params` protocol
    pub script: PathBuf,
    /// Run through `uv run python` with this `uv` binary
    #[serde(default)]
    pub uv: Option<PathBuf>,
    /// Interpreter used when `uv` is unset
    #[serde(default = "default_python")]
    pub python: String,
}

fn default_python() -> String {
    "python".to_string()
}

impl ScriptConfig {
    pub fn new<P: Into<PathBuf>>(script: P) -> Self {
        Self {
            script: script.into(),
            uv: None,
            python: default_python(),
        }
    }

    pub fn with_uv<P: Into<PathBuf>>(mut self, uv: P) -> Self {
        self.uv = Some(uv.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct ScriptRunner {
    config: ScriptConfig,
}

impl ScriptRunner {
    pub fn new(config: ScriptConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScriptConfig {
        &self.config
    }

    /// Program and leading arguments, before `--input`/`--params`
    pub fn invocation(&self) -> (OsString, Vec<OsString>) {
        let script = self.config.script.clone().into_os_string();
        match &self.config.uv {
            Some(uv) => (
                uv.clone().into_os_string(),
                vec!["run".into(), "python".into(), script],
            ),
            None => (self.config.python.clone().into(), vec![script]),
        }
    }

    /// Run the script once and parse its stdout as JSON
    pub fn run(&self, input: &Value, params: &Value) -> Result<Value> {
        let temp_input = NamedTempFile::new()?;
        let temp_params = NamedTempFile::new()?;
        serde_json::to_writer(&temp_input, input)?;
        serde_json::to_writer(&temp_params, params)?;

        let (program, args) = self.invocation();
        debug!(program = ?program, script = %self.config.script.display(), "running model script");

        let output = Command::new(&program)
            .args(&args)
            .arg("--input")
            .arg(temp_input.path())
            .arg("--params")
            .arg(temp_params.path())
            .output()
            .map_err(|source| BridgeError::Spawn {
                program: program.to_string_lossy().into_owned(),
                source,
            })?;

        if !output.status.success() {
            return Err(BridgeError::ScriptFailed {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }

    /// Run with `{"image_path": ...}` as input, the image staged as a PNG
    pub fn run_on_image(&self, image: &RgbImage, params: &Value) -> Result<Value> {
        let image_path = stage_png(image)?;
        self.run(&json!({ "image_path": path_str(&image_path) }), params)
    }
}

pub(crate) fn stage_png(image: &RgbImage) -> Result<TempPath> {
    let path = png_temp_path()?;
    image.save(&path)?;
    Ok(path)
}

pub(crate) fn stage_mask(mask: &GrayImage) -> Result<TempPath> {
    let path = png_temp_path()?;
    mask.save(&path)?;
    Ok(path)
}

pub(crate) fn png_temp_path() -> Result<TempPath> {
    Ok(tempfile::Builder::new().suffix(".png").tempfile()?.into_temp_path())
}

pub(crate) fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
