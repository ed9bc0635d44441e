//! Renderer orchestration for pcrender
//!
//! This crate runs compiled scenes through an external renderer:
//! - Renderer executable resolution
//! - Blocking renderer invocation with timeouts and cancellation
//! - Development of raw EXR output into PNG/JPEG
//! - Bounded parallel turntable rendering and GIF assembly
//! - Batch rendering of independent inputs

pub mod error;
pub mod locate;
pub mod invoke;
pub mod develop;
pub mod animation;
pub mod workspace;
pub mod config;
pub mod pipeline;

pub use error::{RenderError, Result, Stage};
pub use locate::{RendererExecutable, RendererLocator, SearchPathLocator, EXECUTABLE_ENV};
pub use invoke::{CancelToken, FrameJob, FrameRenderer, MitsubaRenderer, DEFAULT_VARIANT};
pub use develop::{develop, OutputFormat, JPEG_QUALITY};
pub use animation::{assemble_gif, FrameImage, DEFAULT_FRAME_DURATION};
pub use workspace::{ArtifactGuard, Workspace};
pub use config::{AnimationSettings, RenderSettings, SceneRecipe};
pub use pipeline::{BatchReport, RenderOrchestrator, ScenePlanner};
