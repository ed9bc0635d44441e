//! Turntable camera orbits.
//!
//! A turntable sweep rotates a base camera around an axis through a pivot.
//! Every frame is derived from the inputs alone, so any subset of frames can
//! be regenerated independently and in any order.

use crate::camera::{fallback_up, CameraPose};
use pcrender_core::{Axis, Error, Point3d, Result, Vector3d};
use nalgebra::{Rotation3, Unit};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const AXIS_EPSILON: f64 = 1e-12;

/// Which axis the camera orbits around
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrbitAxis {
    /// A canonical world axis
    World(Axis),
    /// The up vector of the base pose, keeping the object upright as first seen
    InitialUp,
}

impl Default for OrbitAxis {
    fn default() -> Self {
        OrbitAxis::World(Axis::Z)
    }
}

impl fmt::Display for OrbitAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrbitAxis::World(axis) => write!(f, "{}", axis),
            OrbitAxis::InitialUp => f.write_str("initial-up"),
        }
    }
}

impl FromStr for OrbitAxis {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "initial-up" | "initial_up" | "up" => Ok(OrbitAxis::InitialUp),
            other => other.parse().map(OrbitAxis::World),
        }
    }
}

/// Sense of rotation seen from the tip of the rotation axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    Clockwise,
    #[default]
    CounterClockwise,
}

impl Direction {
    pub fn sign(self) -> f64 {
        match self {
            Direction::Clockwise => -1.0,
            Direction::CounterClockwise => 1.0,
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            Direction::Clockwise => Direction::CounterClockwise,
            Direction::CounterClockwise => Direction::Clockwise,
        }
    }
}

/// Parameters of a turntable sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrbitSpec {
    /// Orbit center; defaults to the scene center, then the coordinate origin
    pub pivot: Option<Point3d>,
    pub axis: OrbitAxis,
    pub frame_count: usize,
    pub direction: Direction,
    /// Angle of frame 0 in degrees
    pub start_offset_deg: f64,
    /// Straight-line camera to pivot distance; derived from the base pose if unset
    pub distance: Option<f64>,
    /// Degrees above the orbit plane; derived from the base pose if unset
    pub elevation_deg: Option<f64>,
}

impl Default for OrbitSpec {
    fn default() -> Self {
        Self {
            pivot: None,
            axis: OrbitAxis::default(),
            frame_count: 36,
            direction: Direction::default(),
            start_offset_deg: 0.0,
            distance: None,
            elevation_deg: None,
        }
    }
}

impl OrbitSpec {
    pub fn with_pivot(mut self, pivot: Point3d) -> Self {
        self.pivot = Some(pivot);
        self
    }

    pub fn with_axis(mut self, axis: OrbitAxis) -> Self {
        self.axis = axis;
        self
    }

    pub fn with_frame_count(mut self, frame_count: usize) -> Self {
        self.frame_count = frame_count;
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_start_offset(mut self, degrees: f64) -> Self {
        self.start_offset_deg = degrees;
        self
    }

    pub fn with_distance(mut self, distance: f64) -> Self {
        self.distance = Some(distance);
        self
    }

    pub fn with_elevation(mut self, degrees: f64) -> Self {
        self.elevation_deg = Some(degrees);
        self
    }

    /// Rotation angle of each frame in degrees, frame 0 at the start offset
    pub fn angles(&self, frame_count: usize) -> Vec<f64> {
        let step = 360.0 / frame_count as f64;
        (0..frame_count)
            .map(|i| self.start_offset_deg + self.direction.sign() * i as f64 * step)
            .collect()
    }
}

/// Geometry shared by every frame of one sweep
#[derive(Debug, Clone, Copy)]
struct Orbit {
    pivot: Point3d,
    axis: Unit<Vector3d>,
    /// Camera origin at angle zero
    origin: Point3d,
    /// Camera up at angle zero, orthogonal to the view
    up: Vector3d,
    fov: f64,
}

impl Orbit {
    fn pose_at(&self, degrees: f64) -> Result<CameraPose> {
        let rotation = Rotation3::from_axis_angle(&self.axis, degrees.to_radians());
        let origin = self.pivot + rotation * (self.origin - self.pivot);
        CameraPose::new(origin, self.pivot, rotation * self.up, self.fov)
    }
}

/// Generates the camera poses of a turntable sweep
#[derive(Debug, Clone, Default)]
pub struct TurntableAnimator {
    spec: OrbitSpec,
    scene_center: Option<Point3d>,
}

impl TurntableAnimator {
    pub fn new(spec: OrbitSpec) -> Self {
        Self {
            spec,
            scene_center: None,
        }
    }

    /// Pivot used when the spec does not name one, usually the cloud centroid
    pub fn with_scene_center(mut self, center: Point3d) -> Self {
        self.scene_center = Some(center);
        self
    }

    pub fn spec(&self) -> &OrbitSpec {
        &self.spec
    }

    pub fn pivot(&self) -> Point3d {
        self.spec
            .pivot
            .or(self.scene_center)
            .unwrap_or_else(Point3d::origin)
    }

    /// Unit rotation axis for `base`.
    ///
    /// This is also the up direction of an attached ground plane, which keeps
    /// the plane fixed for the whole sweep. `InitialUp` fails with
    /// [`Error::DegenerateAxis`] when the base pose's up had to be replaced,
    /// since the given up was zero or along the view direction.
    pub fn rotation_axis(&self, base: &CameraPose) -> Result<Vector3d> {
        let axis = match self.spec.axis {
            OrbitAxis::World(axis) => axis.unit(),
            OrbitAxis::InitialUp if base.up_was_repaired() => return Err(Error::DegenerateAxis),
            OrbitAxis::InitialUp => base.up(),
        };
        let len = axis.norm();
        if len.is_nan() || len <= AXIS_EPSILON {
            return Err(Error::DegenerateAxis);
        }
        Ok(axis / len)
    }

    /// Poses for the spec's own frame count
    pub fn poses(&self, base: &CameraPose) -> Result<Vec<CameraPose>> {
        self.generate(base, self.spec.frame_count)
    }

    /// Exactly `frame_count` poses in angular order.
    #[tracing::instrument(skip_all, fields(frames = frame_count, axis = %self.spec.axis))]
    pub fn generate(&self, base: &CameraPose, frame_count: usize) -> Result<Vec<CameraPose>> {
        if frame_count == 0 {
            return Err(Error::InvalidFrameCount(frame_count));
        }

        let orbit = self.orbit(base)?;
        let poses = self
            .spec
            .angles(frame_count)
            .into_iter()
            .map(|angle| orbit.pose_at(angle))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            pivot = ?orbit.pivot,
            radius = (orbit.origin - orbit.pivot).norm(),
            "generated turntable poses"
        );
        Ok(poses)
    }

    fn orbit(&self, base: &CameraPose) -> Result<Orbit> {
        let axis = self.rotation_axis(base)?;
        let pivot = self.pivot();

        let rel = base.origin() - pivot;
        let height = rel.dot(&axis);
        let planar = rel - axis * height;
        let planar_len = planar.norm();

        let distance = self.spec.distance.unwrap_or_else(|| rel.norm());
        if !(distance.is_finite() && distance > 0.0) {
            return Err(Error::InvalidOrbitRadius(distance));
        }
        let elevation = match self.spec.elevation_deg {
            Some(deg) => deg.to_radians(),
            None => height.atan2(planar_len),
        };

        let radius = distance * elevation.cos();
        if radius.is_nan() || radius <= AXIS_EPSILON {
            return Err(Error::InvalidOrbitRadius(radius));
        }

        // Azimuth zero follows the base camera; a camera sitting on the axis
        // has no azimuth, so any direction in the orbit plane will do.
        let azimuth = if planar_len > AXIS_EPSILON {
            planar / planar_len
        } else {
            fallback_up(&axis)
        };
        let origin = pivot + azimuth * radius + axis * (distance * elevation.sin());

        let view = (pivot - origin).normalize();
        let up = orthogonal_to(&axis, &view)
            .or_else(|| orthogonal_to(&base.up(), &view))
            .unwrap_or_else(|| fallback_up(&view));

        Ok(Orbit {
            pivot,
            axis: Unit::new_unchecked(axis),
            origin,
            up,
            fov: base.fov(),
        })
    }
}

/// Component of `v` orthogonal to the unit vector `dir`, normalized
fn orthogonal_to(v: &Vector3d, dir: &Vector3d) -> Option<Vector3d> {
    let projected = v - dir * v.dot(dir);
    let len = projected.norm();
    (len > 1e-6 * v.norm().max(AXIS_EPSILON)).then(|| projected / len)
}

/// `frame_count` poses orbiting `base` as described by `spec`
pub fn generate(base: &CameraPose, spec: &OrbitSpec, frame_count: usize) -> Result<Vec<CameraPose>> {
    TurntableAnimator::new(spec.clone()).generate(base, frame_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn base() -> CameraPose {
        CameraPose::parse("2,0,1 0,0,0 0,0,1").unwrap()
    }

    fn azimuth_about_z(p: &Point3d) -> f64 {
        p.y.atan2(p.x).to_degrees()
    }

    fn wrap(deg: f64) -> f64 {
        deg.rem_euclid(360.0)
    }

    #[test]
    fn test_frame_count() {
        let spec = OrbitSpec::default();
        for n in [1, 2, 7, 36] {
            assert_eq!(generate(&base(), &spec, n).unwrap().len(), n);
        }
        assert!(matches!(
            generate(&base(), &spec, 0),
            Err(Error::InvalidFrameCount(0))
        ));
    }

    #[test]
    fn test_uniform_spacing_about_world_axis() {
        let spec = OrbitSpec::default().with_start_offset(10.0);
        let poses = generate(&base(), &spec, 12).unwrap();
        for (i, pose) in poses.iter().enumerate() {
            let expected = wrap(10.0 + 30.0 * i as f64);
            let actual = wrap(azimuth_about_z(&pose.origin()));
            let diff = (actual - expected + 180.0).rem_euclid(360.0) - 180.0;
            assert!(diff.abs() < 1e-9, "frame {}: {} vs {}", i, actual, expected);
        }
    }

    #[test]
    fn test_radius_and_elevation_are_preserved() {
        let poses = generate(&base(), &OrbitSpec::default(), 8).unwrap();
        for pose in &poses {
            let o = pose.origin();
            assert_relative_eq!((o.x * o.x + o.y * o.y).sqrt(), 2.0, epsilon = 1e-12);
            assert_relative_eq!(o.z, 1.0, epsilon = 1e-12);
            assert_eq!(pose.target(), Point3d::origin());
        }
    }

    #[test]
    fn test_single_frame_is_base_pose() {
        let poses = generate(&base(), &OrbitSpec::default(), 1).unwrap();
        assert_eq!(poses.len(), 1);
        let o = poses[0].origin();
        assert_relative_eq!(o.x, 2.0, epsilon = 1e-12);
        assert_relative_eq!(o.y, 0.0, epsilon = 1e-12);
        assert_relative_eq!(o.z, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_reversed_direction_mirrors_angles() {
        let ccw = OrbitSpec::default();
        let cw = ccw.clone().with_direction(Direction::Clockwise);
        let a = generate(&base(), &ccw, 5).unwrap();
        let b = generate(&base(), &cw, 5).unwrap();
        for (p, q) in a.iter().zip(&b) {
            let sum = wrap(azimuth_about_z(&p.origin()) + azimuth_about_z(&q.origin()));
            assert!(sum < 1e-9 || (360.0 - sum) < 1e-9);
        }
        assert_eq!(cw.angles(4), vec![0.0, -90.0, -180.0, -270.0]);
    }

    #[test]
    fn test_up_stays_orthogonal_and_continuous() {
        let n = 24;
        let poses = generate(&base(), &OrbitSpec::default(), n).unwrap();
        let step = (360.0 / n as f64).to_radians();
        for pair in poses.windows(2) {
            let up0 = pair[0].up();
            let up1 = pair[1].up();
            assert!(up0.dot(&pair[0].view_direction()).abs() < 1e-12);
            assert!(up0.angle(&up1) <= step + 1e-9);
            assert!(!pair[1].up_was_repaired());
        }
    }

    #[test]
    fn test_overrides() {
        let spec = OrbitSpec::default().with_distance(3.0).with_elevation(30.0);
        let poses = generate(&base(), &spec, 4).unwrap();
        for pose in &poses {
            let rel = pose.origin() - Point3d::origin();
            assert_relative_eq!(rel.norm(), 3.0, epsilon = 1e-12);
            assert_relative_eq!(rel.z, 1.5, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_pivot_resolution() {
        let center = Point3d::new(1.0, 1.0, 0.0);
        let animator = TurntableAnimator::new(OrbitSpec::default()).with_scene_center(center);
        assert_eq!(animator.pivot(), center);

        let explicit = Point3d::new(0.0, 0.0, 5.0);
        let animator = TurntableAnimator::new(OrbitSpec::default().with_pivot(explicit))
            .with_scene_center(center);
        assert_eq!(animator.pivot(), explicit);
        assert_eq!(TurntableAnimator::default().pivot(), Point3d::origin());
    }

    #[test]
    fn test_invalid_radius() {
        let spec = OrbitSpec::default().with_distance(0.0);
        assert!(matches!(
            generate(&base(), &spec, 3),
            Err(Error::InvalidOrbitRadius(_))
        ));
        let spec = OrbitSpec::default().with_distance(-1.0);
        assert!(generate(&base(), &spec, 3).is_err());
        let spec = OrbitSpec::default().with_elevation(90.0);
        assert!(matches!(
            generate(&base(), &spec, 3),
            Err(Error::InvalidOrbitRadius(_))
        ));
    }

    #[test]
    fn test_initial_up_axis() {
        let tilted = CameraPose::parse("0,-3,0 0,0,0 0,1,1").unwrap();
        let spec = OrbitSpec::default().with_axis(OrbitAxis::InitialUp);
        let animator = TurntableAnimator::new(spec);
        let axis = animator.rotation_axis(&tilted).unwrap();
        assert_relative_eq!(axis.norm(), 1.0, epsilon = 1e-12);

        let poses = animator.generate(&tilted, 6).unwrap();
        let h0 = (poses[0].origin() - Point3d::origin()).dot(&axis);
        for pose in &poses {
            let h = (pose.origin() - Point3d::origin()).dot(&axis);
            assert_relative_eq!(h, h0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_initial_up_rejects_degenerate_up() {
        let zero_up = CameraPose::new(Point3d::new(2.0, 0.0, 0.0), Point3d::origin(), Vector3d::zeros(), 45.0).unwrap();
        let along_view = CameraPose::parse("0,0,3 0,0,0 0,0,1").unwrap();
        let spec = OrbitSpec::default().with_axis(OrbitAxis::InitialUp);

        for pose in [zero_up, along_view] {
            assert!(pose.up_was_repaired());
            assert!(matches!(generate(&pose, &spec, 4), Err(Error::DegenerateAxis)));
        }

        // A world axis orbit does not depend on the given up
        let world = OrbitSpec::default().with_axis(OrbitAxis::World(Axis::Z));
        assert_eq!(generate(&zero_up, &world, 4).unwrap().len(), 4);
    }

    #[test]
    fn test_axis_parsing() {
        assert_eq!("y".parse::<OrbitAxis>().unwrap(), OrbitAxis::World(Axis::Y));
        assert_eq!("initial_up".parse::<OrbitAxis>().unwrap(), OrbitAxis::InitialUp);
        assert!("w".parse::<OrbitAxis>().is_err());
    }
}
