//! Bridges the panel pipeline's capability traits to external model
//! scripts (YOLO detectors, LaMa inpainting) run as subprocesses.
//!
//! Each call writes its input and parameters to temporary JSON files,
//! runs the script with `--input <file> --params <file>` and reads a JSON
//! document back from stdout.

mod detectors;
mod inpainter;
mod runner;

pub use detectors::{parse_boxes, parse_polygons, YoloSoundSegmenter, YoloTextDetector};
pub use inpainter::LamaInpainter;
pub use runner::{ScriptConfig, ScriptRunner};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Script exited with status {status:?}: {stderr}")]
    ScriptFailed { status: Option<i32>, stderr: String },

    #[error("Invalid script response: {0}")]
    InvalidResponse(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
