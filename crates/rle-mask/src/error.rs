use thiserror::Error;

#[derive(Debug, Error)]
pub enum RleMaskError {
    #[error("invalid image shape: {0}")]
    InvalidShape(String),

    #[error("malformed segment {index}: run lengths sum to {sum}, expected {expected}")]
    MalformedSegment { index: usize, sum: u64, expected: u64 },

    #[error("unknown image id {0}")]
    UnknownImage(u64),

    #[error("no height/width known for image {0}")]
    MissingShape(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl RleMaskError {
    /// Create an invalid shape error.
    pub fn invalid_shape(msg: impl Into<String>) -> Self {
        Self::InvalidShape(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, RleMaskError>;
