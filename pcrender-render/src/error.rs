//! Error types for render orchestration

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Pipeline stage in which a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Mapping,
    Geometry,
    Camera,
    Compile,
    Render,
    Assembly,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Mapping => "mapping",
            Stage::Geometry => "geometry",
            Stage::Camera => "camera",
            Stage::Compile => "compile",
            Stage::Render => "render",
            Stage::Assembly => "assembly",
        };
        f.write_str(name)
    }
}

/// Errors raised while rendering stills and animations
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("{source}")]
    Scene {
        stage: Stage,
        #[source]
        source: pcrender_core::Error,
    },

    #[error("renderer executable not found (searched: {})", format_searched(.searched))]
    RendererNotFound { searched: Vec<PathBuf> },

    #[error("failed to start renderer: {source}")]
    Spawn {
        frame: Option<usize>,
        #[source]
        source: std::io::Error,
    },

    #[error("renderer exited with {}: {}", format_code(.code), .stderr.trim())]
    NonZeroExit {
        frame: Option<usize>,
        code: Option<i32>,
        stderr: String,
    },

    #[error("renderer reported success but wrote no image at {}", .path.display())]
    MissingOutput { frame: Option<usize>, path: PathBuf },

    #[error("renderer did not finish within {after:?}")]
    Timeout { frame: Option<usize>, after: Duration },

    #[error("render cancelled")]
    Cancelled { frame: Option<usize> },

    #[error("could not develop raw image: {message}")]
    Develop { frame: Option<usize>, message: String },

    #[error("expected {expected} frames, found {actual}")]
    FrameCountMismatch { expected: usize, actual: usize },

    #[error("frame is {}x{}, expected {}x{}", .actual.0, .actual.1, .expected.0, .expected.1)]
    FrameSizeMismatch {
        frame: usize,
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("could not encode animation: {0}")]
    Encode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {source}")]
    FrameIo {
        frame: usize,
        #[source]
        source: std::io::Error,
    },
}

fn format_searched(searched: &[PathBuf]) -> String {
    if searched.is_empty() {
        return "nothing".to_string();
    }
    searched
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

impl RenderError {
    /// Wrap a scene preparation error with the stage that raised it
    pub fn at(stage: Stage) -> impl FnOnce(pcrender_core::Error) -> Self {
        move |source| RenderError::Scene { stage, source }
    }

    /// The stage that failed
    pub fn stage(&self) -> Stage {
        match self {
            RenderError::Scene { stage, .. } => *stage,
            RenderError::FrameCountMismatch { .. }
            | RenderError::FrameSizeMismatch { .. }
            | RenderError::Encode(_) => Stage::Assembly,
            _ => Stage::Render,
        }
    }

    /// Index of the frame that failed, for per-frame failures
    pub fn frame(&self) -> Option<usize> {
        match self {
            RenderError::Spawn { frame, .. }
            | RenderError::NonZeroExit { frame, .. }
            | RenderError::MissingOutput { frame, .. }
            | RenderError::Timeout { frame, .. }
            | RenderError::Cancelled { frame }
            | RenderError::Develop { frame, .. } => *frame,
            RenderError::FrameSizeMismatch { frame, .. } | RenderError::FrameIo { frame, .. } => {
                Some(*frame)
            }
            _ => None,
        }
    }

    /// Whether this error only reports that work was abandoned
    pub fn is_cancellation(&self) -> bool {
        matches!(self, RenderError::Cancelled { .. })
    }

    /// Attach a frame index to a per-frame failure that has none yet.
    ///
    /// Plain I/O errors become [`RenderError::FrameIo`].
    pub fn with_frame(self, index: usize) -> Self {
        let mut err = match self {
            RenderError::Io(source) => return RenderError::FrameIo { frame: index, source },
            other => other,
        };
        match &mut err {
            RenderError::Spawn { frame, .. }
            | RenderError::NonZeroExit { frame, .. }
            | RenderError::MissingOutput { frame, .. }
            | RenderError::Timeout { frame, .. }
            | RenderError::Cancelled { frame }
            | RenderError::Develop { frame, .. } => {
                frame.get_or_insert(index);
            }
            _ => {}
        }
        err
    }
}

/// Result type alias for render operations
pub type Result<T> = std::result::Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Mapping.to_string(), "mapping");
        assert_eq!(Stage::Assembly.to_string(), "assembly");
    }

    #[test]
    fn test_scene_errors_keep_stage() {
        let err = RenderError::at(Stage::Camera)(pcrender_core::Error::DegenerateAxis);
        assert_eq!(err.stage(), Stage::Camera);
        assert_eq!(err.frame(), None);
        assert_eq!(err.to_string(), "rotation axis has zero length");
    }

    #[test]
    fn test_frame_index_preserved() {
        let err = RenderError::NonZeroExit {
            frame: Some(7),
            code: Some(2),
            stderr: "bad scene\n".to_string(),
        };
        assert_eq!(err.stage(), Stage::Render);
        assert_eq!(err.frame(), Some(7));
        assert_eq!(err.to_string(), "renderer exited with status 2: bad scene");
    }

    #[test]
    fn test_with_frame_does_not_overwrite() {
        let err = RenderError::Timeout { frame: None, after: Duration::from_secs(1) }.with_frame(3);
        assert_eq!(err.frame(), Some(3));
        let err = err.with_frame(9);
        assert_eq!(err.frame(), Some(3));
    }

    #[test]
    fn test_io_errors_take_a_frame() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err = RenderError::from(io).with_frame(5);
        assert!(matches!(err, RenderError::FrameIo { frame: 5, .. }));
        assert_eq!(err.frame(), Some(5));
        assert_eq!(err.stage(), Stage::Render);
        assert_eq!(err.to_string(), "I/O error: read-only");
        assert_eq!(err.with_frame(8).frame(), Some(5));
    }

    #[test]
    fn test_assembly_errors() {
        let err = RenderError::FrameCountMismatch { expected: 4, actual: 3 };
        assert_eq!(err.stage(), Stage::Assembly);
        let err = RenderError::FrameSizeMismatch { frame: 2, expected: (4, 4), actual: (8, 4) };
        assert_eq!(err.frame(), Some(2));
        assert_eq!(err.to_string(), "frame is 8x4, expected 4x4");
    }

    #[test]
    fn test_not_found_lists_candidates() {
        let err = RenderError::RendererNotFound {
            searched: vec![PathBuf::from("/a/mitsuba"), PathBuf::from("/b/mitsuba")],
        };
        assert_eq!(
            err.to_string(),
            "renderer executable not found (searched: /a/mitsuba, /b/mitsuba)"
        );
    }
}
