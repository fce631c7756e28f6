use thiserror::Error;

#[derive(Error, Debug)]
pub enum MaskError {
    #[error("Failed to load image: {0}")]
    InvalidImage(#[from] image::ImageError),

    #[error("Failed to write image: {0}")]
    ImageWrite(#[source] image::ImageError),

    #[error("No image loaded")]
    NoImageLoaded,

    #[error("Nothing to remove: the combined mask has no active pixels")]
    NothingToRemove,

    #[error("Inpainting backend failed: {0}")]
    InpaintingBackend(String),

    #[error("Region detection failed: {0}")]
    Detection(String),

    #[error("Discarded stale result (issued at {issued}, current is {current})")]
    StaleOperation { issued: u64, current: u64 },

    #[error("Mask dimensions {actual:?} do not match {expected:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Geometric computation error: {0}")]
    GeometricComputation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),
}

impl MaskError {
    /// Stale results are dropped silently by callers rather than surfaced
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::StaleOperation { .. })
    }
}

pub type Result<T> = std::result::Result<T, MaskError>;
