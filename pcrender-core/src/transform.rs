//! Point cloud preprocessing transforms

use crate::error::{Error, Result};
use crate::point::{ensure_finite, Point3d, Vector3d};
use crate::point_cloud::PointCloud;
use crate::traits::Bounded;
use serde::{Deserialize, Serialize};

/// Height added after the Y-up to Z-up remap so that a standardized cloud
/// does not intersect the standard ground plane.
pub const GROUND_CLEARANCE: f64 = 0.0125;

/// Extents below this are treated as a single point when standardizing
const MIN_EXTENT: f64 = 1e-9;

/// Map a Y-up viewer coordinate into the renderer's Z-up frame: `(x, y, z) -> (-z, x, y)`
pub fn y_up_to_z_up(v: &Vector3d) -> Vector3d {
    Vector3d::new(-v.z, v.x, v.y)
}

/// Same as [`y_up_to_z_up`] for points, followed by the ground clearance lift
pub fn y_up_point_to_z_up(p: &Point3d) -> Point3d {
    let mut out = Point3d::from(y_up_to_z_up(&p.coords));
    out.z += GROUND_CLEARANCE;
    out
}

/// Center the cloud's bounding box on the origin and scale its largest side to 1.
///
/// The result fits in `[-0.5, 0.5]^3`. A cloud whose extent is (nearly) zero is
/// only translated.
pub fn standardize(cloud: &PointCloud) -> Result<PointCloud> {
    let bbox = cloud.bounding_box().ok_or(Error::EmptyPointCloud)?;
    let center = bbox.center();
    let mut scale = bbox.max_extent();
    if scale < MIN_EXTENT {
        tracing::warn!(extent = scale, "point cloud has no extent, skipping scaling");
        scale = 1.0;
    }
    Ok(cloud.map_points(|p| Point3d::from((p - center) / scale)))
}

/// Preprocessing applied to a loaded cloud before any scene is built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocess {
    /// Down-sample to at most this many points
    pub max_points: Option<usize>,
    /// Seed of the down-sampling generator
    pub seed: u64,
    /// Center and scale into the unit cube
    pub standardize: bool,
    /// Input was captured in a Y-up frame
    pub y_up_to_z_up: bool,
}

impl Default for Preprocess {
    fn default() -> Self {
        Self {
            max_points: None,
            seed: 42,
            standardize: false,
            y_up_to_z_up: false,
        }
    }
}

impl Preprocess {
    pub fn with_max_points(mut self, max_points: usize) -> Self {
        self.max_points = Some(max_points);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_standardize(mut self, standardize: bool) -> Self {
        self.standardize = standardize;
        self
    }

    pub fn with_y_up_to_z_up(mut self, enabled: bool) -> Self {
        self.y_up_to_z_up = enabled;
        self
    }

    /// Down-sample, then standardize, then remap axes.
    ///
    /// Non-finite coordinates are rejected before anything else.
    pub fn apply(&self, cloud: &PointCloud) -> Result<PointCloud> {
        if cloud.is_empty() {
            return Err(Error::EmptyPointCloud);
        }
        ensure_finite(cloud.points())?;

        let mut out = match self.max_points {
            Some(max) => cloud.downsample(max, self.seed),
            None => cloud.clone(),
        };
        if self.standardize {
            out = standardize(&out)?;
        }
        if self.y_up_to_z_up {
            out = out.map_points(y_up_point_to_z_up);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_standardize_fits_unit_cube() {
        let cloud: PointCloud = vec![
            Point3d::new(10.0, 20.0, 30.0),
            Point3d::new(14.0, 21.0, 30.5),
            Point3d::new(12.0, 22.0, 31.0),
        ]
        .into();
        let std = standardize(&cloud).unwrap();
        let bbox = std.bounding_box().unwrap();

        assert_relative_eq!(bbox.min.x, -0.5, epsilon = 1e-12);
        assert_relative_eq!(bbox.max.x, 0.5, epsilon = 1e-12);
        assert_relative_eq!(bbox.center().y, 0.0, epsilon = 1e-12);
        assert!(bbox.max_extent() <= 1.0 + 1e-12);
    }

    #[test]
    fn test_standardize_single_point() {
        let cloud: PointCloud = vec![Point3d::new(3.0, 3.0, 3.0)].into();
        let std = standardize(&cloud).unwrap();
        assert_eq!(std[0], Point3d::origin());
        assert!(standardize(&PointCloud::new()).is_err());
    }

    #[test]
    fn test_y_up_remap() {
        let p = y_up_point_to_z_up(&Point3d::new(1.0, 2.0, 3.0));
        assert_relative_eq!(p.x, -3.0);
        assert_relative_eq!(p.y, 1.0);
        assert_relative_eq!(p.z, 2.0 + GROUND_CLEARANCE);
    }

    #[test]
    fn test_preprocess_pipeline() {
        let cloud: PointCloud = (0..100).map(|i| Point3d::new(0.0, i as f64, 0.0)).collect();
        let pre = Preprocess::default()
            .with_max_points(10)
            .with_standardize(true)
            .with_y_up_to_z_up(true);
        let out = pre.apply(&cloud).unwrap();

        assert_eq!(out.len(), 10);
        for p in out.iter() {
            assert!(p.z <= 0.5 + GROUND_CLEARANCE + 1e-12);
            assert_relative_eq!(p.x, 0.0, epsilon = 1e-12);
        }
        assert!(Preprocess::default().apply(&PointCloud::new()).is_err());
    }

    #[test]
    fn test_preprocess_rejects_non_finite_points() {
        let cloud: PointCloud = vec![Point3d::new(0.0, 0.0, 0.0), Point3d::new(f64::NAN, 1.0, 1.0)].into();
        let result = Preprocess::default().with_standardize(true).apply(&cloud);
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }
}
