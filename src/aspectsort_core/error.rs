use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AspectSortError {
    // I/O errors
    #[error("Failed to create destination directory {path}: {source}")]
    CreateDestination {
        path: PathBuf,
        source: std::io::Error,
    },

    // Filesystem errors
    #[error("Directory walker error: {0}")]
    Walkdir(#[from] walkdir::Error),

    // Source validation
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Invalid output folder name: {0:?}")]
    InvalidOutputName(String),
}

impl AspectSortError {
    /// True for the errors that mean the source directory itself is unusable.
    pub fn is_invalid_source(&self) -> bool {
        matches!(
            self,
            AspectSortError::PathNotFound(_) | AspectSortError::NotADirectory(_)
        )
    }
}

/// Why a single file could not be probed.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("could not open {0}")]
    Open(#[source] std::io::Error),

    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),

    #[error("ffprobe could not be run: {0}")]
    FfprobeUnavailable(#[source] std::io::Error),

    #[error("ffprobe failed: {0}")]
    Ffprobe(String),

    #[error("unexpected ffprobe output: {0}")]
    FfprobeOutput(#[from] serde_json::Error),

    #[error("no decodable video frame")]
    NoFrame,

    #[error("invalid dimensions {width}x{height}")]
    ZeroDimensions { width: u32, height: u32 },
}

/// Result type for aspectsort operations.
pub type Result<T> = std::result::Result<T, AspectSortError>;
