/// Core error types for the Lyrica engine.
use std::path::PathBuf;

/// A specialized Result type for Lyrica operations.
pub type LyricaResult<T> = Result<T, LyricaError>;

/// Top-level error type encompassing all Lyrica subsystems.
///
/// None of these are fatal to a host: layout errors degrade to heuristic
/// measurement, data errors skip the offending block, and surface errors
/// skip the frame.
#[derive(Debug, thiserror::Error)]
pub enum LyricaError {
    #[error("layout error: {0}")]
    Layout(String),

    #[error("data error in block {block}: {message}")]
    Data { block: usize, message: String },

    #[error("render surface error: {0}")]
    RenderSurface(String),

    #[error("config error: {message} ({path:?})")]
    Config { message: String, path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Other(String),
}

impl LyricaError {
    /// Create a data error for the content block at `block`.
    pub fn data(block: usize, message: impl Into<String>) -> Self {
        LyricaError::Data {
            block,
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        LyricaError::Config {
            message: message.into(),
            path: path.into(),
        }
    }

    /// Whether the error only degrades output rather than aborting it.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            LyricaError::Layout(_) | LyricaError::Data { .. } | LyricaError::RenderSurface(_)
        )
    }
}
