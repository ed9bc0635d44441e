//! Core traits for pcrender

use crate::point::{Axis, Point3d, Vector3d};
use crate::point_cloud::PointCloud;
use serde::{Deserialize, Serialize};

/// Axis aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point3d,
    pub max: Point3d,
}

impl BoundingBox {
    pub fn center(&self) -> Point3d {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn extent(&self) -> Vector3d {
        self.max - self.min
    }

    /// Largest side length of the box
    pub fn max_extent(&self) -> f64 {
        self.extent().max()
    }

    /// `(min, max)` along one axis
    pub fn axis_range(&self, axis: Axis) -> (f64, f64) {
        (self.min[axis.index()], self.max[axis.index()])
    }
}

/// Trait for objects with a spatial extent
pub trait Bounded {
    /// Get the bounding box of the object, `None` when it holds no points
    fn bounding_box(&self) -> Option<BoundingBox>;

    /// Get the center point of the bounding box
    fn center(&self) -> Option<Point3d> {
        self.bounding_box().map(|bbox| bbox.center())
    }
}

impl Bounded for [Point3d] {
    fn bounding_box(&self) -> Option<BoundingBox> {
        let first = *self.first()?;
        let mut min = first;
        let mut max = first;

        for p in self {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);

            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }

        Some(BoundingBox { min, max })
    }
}

impl Bounded for PointCloud {
    fn bounding_box(&self) -> Option<BoundingBox> {
        self.points().bounding_box()
    }
}
