//! Camera poses, their compact text form and their scene representation

use pcrender_core::{
    format_triple, parse_triple, y_up_to_z_up, Error, Point3d, Result, Vector3d, GROUND_CLEARANCE,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Field of view used when none is given, in degrees
pub const DEFAULT_FOV: f64 = 45.0;

/// Below this length a direction is treated as zero
const DIRECTION_EPSILON: f64 = 1e-12;

/// Sine of the smallest accepted angle between up and view direction
const PARALLEL_EPSILON: f64 = 1e-9;

/// Canonical world up of the renderer
pub fn world_up() -> Vector3d {
    Vector3d::z()
}

/// A validated camera pose.
///
/// `origin != target` and `0 < fov < 180` always hold, and `up` is never
/// parallel to the view direction. The up vector need not be unit length or
/// orthogonal to the view.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CameraPose {
    origin: Point3d,
    target: Point3d,
    up: Vector3d,
    fov: f64,
    #[serde(skip)]
    up_repaired: bool,
}

impl CameraPose {
    /// Validate and build a pose.
    ///
    /// Fails with [`Error::InvalidFieldOfView`] or [`Error::DegenerateCamera`].
    /// An `up` that is zero or parallel to the view direction is replaced by a
    /// stable fallback and a warning is logged.
    pub fn new(origin: Point3d, target: Point3d, up: Vector3d, fov: f64) -> Result<Self> {
        if !(fov > 0.0 && fov < 180.0) {
            return Err(Error::InvalidFieldOfView(fov));
        }
        let finite = origin.coords.iter().chain(target.coords.iter()).chain(up.iter()).all(|c| c.is_finite());
        if !finite {
            return Err(Error::DegenerateCamera("camera coordinates must be finite".to_string()));
        }

        let view = target - origin;
        let view_len = view.norm();
        if view_len < DIRECTION_EPSILON {
            return Err(Error::DegenerateCamera(format!(
                "origin and target coincide at ({})",
                format_triple(origin.x, origin.y, origin.z)
            )));
        }

        let dir = view / view_len;
        let up_len = up.norm();
        if up_len < DIRECTION_EPSILON || up.cross(&dir).norm() < PARALLEL_EPSILON * up_len {
            let fallback = fallback_up(&dir);
            tracing::warn!(
                up = %format_triple(up.x, up.y, up.z),
                fallback = %format_triple(fallback.x, fallback.y, fallback.z),
                "camera up vector is parallel to the view direction, using fallback"
            );
            return Ok(Self {
                origin,
                target,
                up: fallback,
                fov,
                up_repaired: true,
            });
        }

        Ok(Self {
            origin,
            target,
            up,
            fov,
            up_repaired: false,
        })
    }

    /// Parse `"ox,oy,oz[ tx,ty,tz[ ux,uy,uz]]"` with target defaulting to the
    /// coordinate origin and up to the world up axis.
    pub fn parse(text: &str) -> Result<Self> {
        Self::parse_with(text, Point3d::origin(), DEFAULT_FOV)
    }

    /// Parse the camera text form, defaulting a missing target to `pivot`.
    pub fn parse_with(text: &str, pivot: Point3d, fov: f64) -> Result<Self> {
        let triples: Vec<&str> = text.split_whitespace().collect();
        if triples.is_empty() || triples.len() > 3 {
            return Err(Error::CameraParse(format!(
                "expected 1 to 3 whitespace separated triples, found {}",
                triples.len()
            )));
        }

        let origin = Point3d::from(parse_triple(triples[0])?);
        let target = match triples.get(1) {
            Some(t) => Point3d::from(parse_triple(t)?),
            None => {
                tracing::debug!("camera target not given, aiming at the pivot");
                pivot
            }
        };
        let up = match triples.get(2) {
            Some(u) => Vector3d::from(parse_triple(u)?),
            None => {
                tracing::debug!("camera up not given, using world up");
                world_up()
            }
        };

        Self::new(origin, target, up, fov)
    }

    /// Convert camera parameters captured in a Y-up viewer frame into the
    /// renderer's Z-up frame, matching the remap applied to Y-up point clouds.
    pub fn from_y_up_viewer(origin: Point3d, target: Point3d, up: Vector3d, fov: f64) -> Result<Self> {
        let origin = Point3d::from(y_up_to_z_up(&origin.coords));
        let mut target = Point3d::from(y_up_to_z_up(&target.coords));
        target.z += GROUND_CLEARANCE;
        let up = y_up_to_z_up(&(-up));
        Self::new(origin, target, up, fov)
    }

    pub fn origin(&self) -> Point3d {
        self.origin
    }

    pub fn target(&self) -> Point3d {
        self.target
    }

    pub fn up(&self) -> Vector3d {
        self.up
    }

    pub fn fov(&self) -> f64 {
        self.fov
    }

    /// Whether the given up vector was replaced by a fallback
    pub fn up_was_repaired(&self) -> bool {
        self.up_repaired
    }

    /// Unit vector from origin towards target
    pub fn view_direction(&self) -> Vector3d {
        (self.target - self.origin).normalize()
    }

    /// Same pose with another field of view
    pub fn with_fov(self, fov: f64) -> Result<Self> {
        Self::new(self.origin, self.target, self.up, fov)
    }

    /// Scene graph node for this pose
    pub fn to_scene_fragment(&self) -> CameraFragment {
        CameraFragment {
            origin: self.origin,
            target: self.target,
            up: self.up,
            fov: self.fov,
        }
    }
}

impl PartialEq for CameraPose {
    fn eq(&self, other: &Self) -> bool {
        self.origin == other.origin
            && self.target == other.target
            && self.up == other.up
            && self.fov == other.fov
    }
}

impl Default for CameraPose {
    fn default() -> Self {
        Self {
            origin: Point3d::new(0.0, -4.0, 2.0),
            target: Point3d::origin(),
            up: world_up(),
            fov: DEFAULT_FOV,
            up_repaired: false,
        }
    }
}

/// Writes all three triples so the output parses back to the same pose.
impl fmt::Display for CameraPose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (o, t, u) = (self.origin, self.target, self.up);
        write!(
            f,
            "{} {} {}",
            format_triple(o.x, o.y, o.z),
            format_triple(t.x, t.y, t.z),
            format_triple(u.x, u.y, u.z)
        )
    }
}

impl FromStr for CameraPose {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// The camera part of a frame's scene graph
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraFragment {
    pub origin: Point3d,
    pub target: Point3d,
    pub up: Vector3d,
    pub fov: f64,
}

/// World axis least aligned with `dir`, made orthogonal to it.
///
/// Z is tried first so ties resolve to the renderer's up axis.
pub fn fallback_up(dir: &Vector3d) -> Vector3d {
    let candidates = [Vector3d::z(), Vector3d::y(), Vector3d::x()];
    let mut best = candidates[0];
    for axis in &candidates[1..] {
        if axis.dot(dir).abs() < best.dot(dir).abs() {
            best = *axis;
        }
    }
    (best - dir * best.dot(dir)).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_full() {
        let pose: CameraPose = "1,2,3 0,0,0.5 0,0,1".parse().unwrap();
        assert_eq!(pose.origin(), Point3d::new(1.0, 2.0, 3.0));
        assert_eq!(pose.target(), Point3d::new(0.0, 0.0, 0.5));
        assert_eq!(pose.up(), Vector3d::z());
        assert_eq!(pose.fov(), DEFAULT_FOV);
    }

    #[test]
    fn test_parse_defaults() {
        let pose = CameraPose::parse("3,0,1").unwrap();
        assert_eq!(pose.target(), Point3d::origin());
        assert_eq!(pose.up(), world_up());

        let pivot = Point3d::new(0.5, 0.5, 0.5);
        let pose = CameraPose::parse_with("3,0,1", pivot, 60.0).unwrap();
        assert_eq!(pose.target(), pivot);
        assert_eq!(pose.fov(), 60.0);
    }

    #[test]
    fn test_parse_errors() {
        assert!(CameraPose::parse("").is_err());
        assert!(CameraPose::parse("1,2").is_err());
        assert!(CameraPose::parse("1,2,3 4,5,6 0,0,1 9,9,9").is_err());
        assert!(matches!(
            CameraPose::parse("1,1,1 1,1,1"),
            Err(Error::DegenerateCamera(_))
        ));
    }

    #[test]
    fn test_text_round_trip() {
        let pose = CameraPose::new(
            Point3d::new(0.1, -1.0 / 3.0, 2.5),
            Point3d::new(1e-3, 0.0, -0.25),
            Vector3d::new(0.0, 0.2, 0.9),
            DEFAULT_FOV,
        )
        .unwrap();
        let reparsed: CameraPose = pose.to_string().parse().unwrap();
        assert_eq!(reparsed, pose);
    }

    #[test]
    fn test_fov_bounds() {
        let o = Point3d::new(1.0, 0.0, 0.0);
        let t = Point3d::origin();
        for fov in [0.0, -10.0, 180.0, 200.0, f64::NAN] {
            assert!(matches!(
                CameraPose::new(o, t, Vector3d::z(), fov),
                Err(Error::InvalidFieldOfView(_))
            ));
        }
        assert!(CameraPose::new(o, t, Vector3d::z(), 179.9).is_ok());
    }

    #[test]
    fn test_parallel_up_is_repaired() {
        let pose = CameraPose::parse("0,0,5 0,0,0 0,0,1").unwrap();
        assert!(pose.up_was_repaired());

        let dir = pose.view_direction();
        let up = pose.up();
        assert_relative_eq!(up.norm(), 1.0, epsilon = 1e-12);
        assert!(up.dot(&dir).abs() < 1e-12);
        assert!(up.cross(&dir).norm() > 0.5);

        let pose = CameraPose::parse("0,-4,2").unwrap();
        assert!(!pose.up_was_repaired());
    }

    #[test]
    fn test_zero_up_is_repaired() {
        let pose = CameraPose::parse("1,0,0 0,0,0 0,0,0").unwrap();
        assert!(pose.up_was_repaired());
        assert_relative_eq!(pose.up().z, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_y_up_viewer_remap() {
        let pose = CameraPose::from_y_up_viewer(
            Point3d::new(0.0, 0.0, 2.0),
            Point3d::origin(),
            Vector3d::new(0.0, -1.0, 0.0),
            DEFAULT_FOV,
        )
        .unwrap();
        assert_eq!(pose.origin(), Point3d::new(-2.0, 0.0, 0.0));
        assert_eq!(pose.target(), Point3d::new(0.0, 0.0, GROUND_CLEARANCE));
        assert_eq!(pose.up(), Vector3d::new(0.0, 0.0, 1.0));
    }
}
