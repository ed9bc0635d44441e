//! Error types for pcrender

use thiserror::Error;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The point data itself is unusable (empty cloud, missing colors)
    Input,
    /// A caller-supplied parameter is out of range or degenerate
    Parameter,
    /// Filesystem failure
    Io,
}

/// Main error type for scene preparation
#[derive(Error, Debug)]
pub enum Error {
    #[error("point cloud contains no points")]
    EmptyPointCloud,

    #[error("color policy 'original' requires stored colors, but the point cloud has none")]
    MissingColorData,

    #[error("point cloud has {points} points but {colors} colors")]
    ColorCountMismatch { points: usize, colors: usize },

    #[error("point radius must be positive, got {0}")]
    InvalidRadius(f64),

    #[error("field of view must lie in (0, 180) degrees, got {0}")]
    InvalidFieldOfView(f64),

    #[error("orbit radius must be positive, got {0}")]
    InvalidOrbitRadius(f64),

    #[error("degenerate camera: {0}")]
    DegenerateCamera(String),

    #[error("rotation axis has zero length")]
    DegenerateAxis,

    #[error("frame count must be at least 1, got {0}")]
    InvalidFrameCount(usize),

    #[error("invalid camera parameters: {0}")]
    CameraParse(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Which branch of the error taxonomy this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::EmptyPointCloud
            | Error::MissingColorData
            | Error::ColorCountMismatch { .. }
            | Error::InvalidData(_)
            | Error::UnsupportedFormat(_) => ErrorKind::Input,
            Error::InvalidRadius(_)
            | Error::InvalidFieldOfView(_)
            | Error::InvalidOrbitRadius(_)
            | Error::DegenerateCamera(_)
            | Error::DegenerateAxis
            | Error::InvalidFrameCount(_)
            | Error::CameraParse(_) => ErrorKind::Parameter,
            Error::Io(_) => ErrorKind::Io,
        }
    }
}

/// Result type alias for pcrender operations
pub type Result<T> = std::result::Result<T, Error>;
