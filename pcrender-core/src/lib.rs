//! Core data structures for pcrender
//!
//! This crate provides the immutable value types shared by every stage of the
//! rendering pipeline: points, colors, point clouds, preprocessing transforms
//! and the error taxonomy.

pub mod point;
pub mod point_cloud;
pub mod color;
pub mod traits;
pub mod transform;
pub mod error;

pub use point::*;
pub use point_cloud::*;
pub use color::*;
pub use traits::*;
pub use transform::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3, Unit, UnitQuaternion, Rotation3};
