//! Scene compilation and turntable camera animation for pcrender
//!
//! This crate turns colored points, a camera and lighting policy into
//! renderer scene descriptions:
//! - Palettes and per-point color policies
//! - Scene geometry with ground planes and lights
//! - Camera poses and their compact text form
//! - Turntable orbits around a pivot
//! - Mitsuba scene serialization, one frame at a time

pub mod palette;
pub mod color_mapper;
pub mod geometry;
pub mod camera;
pub mod turntable;
pub mod compiler;
pub mod frames;

pub use palette::*;
pub use color_mapper::{resolve, resolve_linear, ColorPolicy};
pub use geometry::*;
pub use camera::*;
pub use turntable::{Direction, OrbitAxis, OrbitSpec, TurntableAnimator};
pub use compiler::*;
pub use frames::*;
