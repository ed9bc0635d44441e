//! Renderer-agnostic scene geometry: point primitives, ground and lights

use crate::camera::fallback_up;
use pcrender_core::{ensure_finite, Bounded, Color, Error, Point3d, PointCloud, Result, Vector3d};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Height of the standard ground plane
pub const STANDARD_GROUND_HEIGHT: f64 = -0.5;
/// Half side length of the standard ground plane
pub const STANDARD_GROUND_HALF_EXTENT: f64 = 10.0;

/// Point radius used when none is configured
pub const DEFAULT_POINT_RADIUS: f64 = 0.006;

/// Geometric primitive drawn for every point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PointShape {
    #[default]
    Sphere,
    /// A flat disc turned towards the camera of each frame
    Disc,
}

/// Ground plane policy. `Standard` and `Attached` are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum GroundSpec {
    None,
    /// Fixed horizontal plane below the unit cube
    #[default]
    Standard,
    /// Plane just below the cloud along the up axis
    Attached { offset: f64, size: f64 },
}

impl GroundSpec {
    pub const DEFAULT_ATTACHED_OFFSET: f64 = 0.1;
    pub const DEFAULT_ATTACHED_SIZE: f64 = 75.0;

    /// Attached ground with the default offset and size
    pub fn attached() -> Self {
        GroundSpec::Attached {
            offset: Self::DEFAULT_ATTACHED_OFFSET,
            size: Self::DEFAULT_ATTACHED_SIZE,
        }
    }
}

/// Area light above the scene. Its placement and size are fixed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaLight {
    pub intensity: f64,
}

impl AreaLight {
    pub const SIZE: f64 = 10.0;
    pub const HEIGHT: f64 = 20.0;

    pub fn origin() -> Point3d {
        Point3d::new(-4.0, 4.0, Self::HEIGHT)
    }

    pub fn target() -> Point3d {
        Point3d::origin()
    }
}

impl Default for AreaLight {
    fn default() -> Self {
        Self { intensity: 3.0 }
    }
}

/// Lighting policy of a scene
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightingSpec {
    /// Radiance of the environment, which is both the visible backdrop and
    /// the only ambient light
    pub background: Color,
    pub area_light: Option<AreaLight>,
    /// Accepted for compatibility and ignored. The scene holds a single
    /// environment emitter, so ambient level is controlled by `background`.
    pub ambient_fill_intensity: f64,
}

impl Default for LightingSpec {
    fn default() -> Self {
        Self {
            background: Color::WHITE,
            area_light: Some(AreaLight::default()),
            ambient_fill_intensity: 0.5,
        }
    }
}

impl LightingSpec {
    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    pub fn with_area_light(mut self, intensity: Option<f64>) -> Self {
        self.area_light = intensity.map(|intensity| AreaLight { intensity });
        self
    }

    pub fn with_ambient_fill_intensity(mut self, intensity: f64) -> Self {
        self.ambient_fill_intensity = intensity;
        self
    }
}

/// One point to draw
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointPrimitive {
    pub center: Point3d,
    pub color: Color,
}

/// Placed ground plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GroundPlane {
    /// Horizontal plane at `height` on the world Z axis
    Standard { height: f64, half_extent: f64 },
    /// Plane with normal `normal` whose offset along the normal is `height`
    Attached {
        center: Point3d,
        normal: Vector3d,
        /// In-plane direction used to orient the rectangle
        tangent: Vector3d,
        height: f64,
        half_extent: f64,
    },
}

impl GroundPlane {
    /// Signed offset of the plane along its normal
    pub fn height(&self) -> f64 {
        match *self {
            GroundPlane::Standard { height, .. } | GroundPlane::Attached { height, .. } => height,
        }
    }
}

/// Light source of the scene
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Emitter {
    Environment { radiance: Color },
    Area {
        intensity: f64,
        size: f64,
        origin: Point3d,
        target: Point3d,
        up: Vector3d,
    },
}

/// Static part of a scene, shared read-only by every frame.
///
/// Cloning is cheap; the point primitives are reference counted.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryFragment {
    points: Arc<[PointPrimitive]>,
    radius: f64,
    shape: PointShape,
    ground_spec: GroundSpec,
    ground: Option<GroundPlane>,
    emitters: Vec<Emitter>,
}

impl GeometryFragment {
    pub fn points(&self) -> &[PointPrimitive] {
        &self.points
    }

    pub fn point_radius(&self) -> f64 {
        self.radius
    }

    pub fn point_shape(&self) -> PointShape {
        self.shape
    }

    pub fn ground(&self) -> Option<&GroundPlane> {
        self.ground.as_ref()
    }

    pub fn emitters(&self) -> &[Emitter] {
        &self.emitters
    }

    /// The same geometry with an attached ground recomputed for another up
    /// direction. Other ground policies are returned unchanged.
    pub fn with_ground_up(&self, up: &Vector3d) -> Result<Self> {
        let ground = match self.ground_spec {
            GroundSpec::Attached { offset, size } => {
                let centers: Vec<Point3d> = self.points.iter().map(|p| p.center).collect();
                Some(attached_ground(&centers, up, offset, size)?)
            }
            _ => self.ground,
        };
        Ok(Self {
            ground,
            ..self.clone()
        })
    }
}

/// Builds the static scene geometry from resolved point colors
#[derive(Debug, Clone)]
pub struct SceneGeometryBuilder {
    ground: GroundSpec,
    lighting: LightingSpec,
    radius: f64,
    shape: PointShape,
    up: Vector3d,
}

impl Default for SceneGeometryBuilder {
    fn default() -> Self {
        Self {
            ground: GroundSpec::default(),
            lighting: LightingSpec::default(),
            radius: DEFAULT_POINT_RADIUS,
            shape: PointShape::default(),
            up: Vector3d::z(),
        }
    }
}

impl SceneGeometryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ground(mut self, ground: GroundSpec) -> Self {
        self.ground = ground;
        self
    }

    pub fn with_lighting(mut self, lighting: LightingSpec) -> Self {
        self.lighting = lighting;
        self
    }

    pub fn with_point_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_point_shape(mut self, shape: PointShape) -> Self {
        self.shape = shape;
        self
    }

    /// Up direction an attached ground is placed against
    pub fn with_up_axis(mut self, up: Vector3d) -> Self {
        self.up = up;
        self
    }

    /// Build the geometry for `points` colored by `colors`.
    ///
    /// Fails with [`Error::EmptyPointCloud`] for no points, with
    /// [`Error::InvalidData`] for a NaN or infinite coordinate and with
    /// [`Error::InvalidRadius`] for a non-positive radius.
    #[tracing::instrument(skip_all, fields(points = points.len()))]
    pub fn build(&self, points: &[Point3d], colors: &[Color]) -> Result<GeometryFragment> {
        if points.is_empty() {
            return Err(Error::EmptyPointCloud);
        }
        ensure_finite(points)?;
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(Error::InvalidRadius(self.radius));
        }
        if colors.len() != points.len() {
            return Err(Error::ColorCountMismatch {
                points: points.len(),
                colors: colors.len(),
            });
        }

        let ground = match self.ground {
            GroundSpec::None => None,
            GroundSpec::Standard => Some(GroundPlane::Standard {
                height: STANDARD_GROUND_HEIGHT,
                half_extent: STANDARD_GROUND_HALF_EXTENT,
            }),
            GroundSpec::Attached { offset, size } => {
                Some(attached_ground(points, &self.up, offset, size)?)
            }
        };

        if self.lighting.ambient_fill_intensity != 0.0 {
            tracing::debug!(
                intensity = self.lighting.ambient_fill_intensity,
                "ambient fill intensity has no effect, adjust the background color instead"
            );
        }

        let mut emitters = vec![Emitter::Environment {
            radiance: self.lighting.background,
        }];
        if let Some(light) = self.lighting.area_light {
            emitters.push(Emitter::Area {
                intensity: light.intensity,
                size: AreaLight::SIZE,
                origin: AreaLight::origin(),
                target: AreaLight::target(),
                up: Vector3d::z(),
            });
        }

        let primitives: Arc<[PointPrimitive]> = points
            .iter()
            .zip(colors)
            .map(|(&center, &color)| PointPrimitive { center, color })
            .collect();

        Ok(GeometryFragment {
            points: primitives,
            radius: self.radius,
            shape: self.shape,
            ground_spec: self.ground,
            ground,
            emitters,
        })
    }
}

/// Build sphere geometry for a cloud; the plain entry point used by tests and
/// simple callers.
pub fn build_geometry(
    cloud: &PointCloud,
    colors: &[Color],
    ground: &GroundSpec,
    lighting: &LightingSpec,
    point_radius: f64,
) -> Result<GeometryFragment> {
    SceneGeometryBuilder::new()
        .with_ground(*ground)
        .with_lighting(*lighting)
        .with_point_radius(point_radius)
        .build(cloud.points(), colors)
}

/// Plane under `points` along `up`, at the lowest projection minus `offset`
fn attached_ground(points: &[Point3d], up: &Vector3d, offset: f64, size: f64) -> Result<GroundPlane> {
    let len = up.norm();
    if len.is_nan() || len < 1e-12 {
        return Err(Error::DegenerateAxis);
    }
    let normal = up / len;

    let min_projection = points
        .iter()
        .map(|p| p.coords.dot(&normal))
        .fold(f64::INFINITY, f64::min);
    if !min_projection.is_finite() {
        return Err(Error::EmptyPointCloud);
    }
    let height = min_projection - offset;

    let bbox_center = points.bounding_box().ok_or(Error::EmptyPointCloud)?.center();
    let center = bbox_center + normal * (height - bbox_center.coords.dot(&normal));

    Ok(GroundPlane::Attached {
        center,
        normal,
        tangent: fallback_up(&normal),
        height,
        half_extent: size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cloud() -> Vec<Point3d> {
        vec![
            Point3d::new(0.0, 0.0, 0.25),
            Point3d::new(1.0, 0.0, -0.3),
            Point3d::new(0.0, 2.0, 0.7),
        ]
    }

    fn gray(n: usize) -> Vec<Color> {
        vec![Color::gray(0.5); n]
    }

    #[test]
    fn test_one_primitive_per_point() {
        let geometry = SceneGeometryBuilder::new().build(&cloud(), &gray(3)).unwrap();
        assert_eq!(geometry.points().len(), 3);
        assert_eq!(geometry.points()[1].center, Point3d::new(1.0, 0.0, -0.3));
        assert_eq!(geometry.point_radius(), DEFAULT_POINT_RADIUS);
    }

    #[test]
    fn test_empty_cloud() {
        let result = SceneGeometryBuilder::new().build(&[], &[]);
        assert!(matches!(result, Err(Error::EmptyPointCloud)));
    }

    #[test]
    fn test_non_finite_point_rejected() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let points = [Point3d::new(bad, 0.0, 0.0), Point3d::new(1.0, 1.0, 1.0)];
            let result = SceneGeometryBuilder::new().build(&points, &gray(2));
            assert!(matches!(result, Err(Error::InvalidData(_))));
        }
    }

    #[test]
    fn test_invalid_radius() {
        for radius in [0.0, -0.1, f64::NAN] {
            let result = SceneGeometryBuilder::new()
                .with_point_radius(radius)
                .build(&cloud(), &gray(3));
            assert!(matches!(result, Err(Error::InvalidRadius(_))));
        }
    }

    #[test]
    fn test_standard_ground_ignores_cloud() {
        let geometry = SceneGeometryBuilder::new().build(&cloud(), &gray(3)).unwrap();
        assert_eq!(
            geometry.ground(),
            Some(&GroundPlane::Standard {
                height: STANDARD_GROUND_HEIGHT,
                half_extent: STANDARD_GROUND_HALF_EXTENT,
            })
        );
    }

    #[test]
    fn test_attached_ground_height() {
        let geometry = SceneGeometryBuilder::new()
            .with_ground(GroundSpec::Attached { offset: 0.2, size: 5.0 })
            .build(&cloud(), &gray(3))
            .unwrap();
        let ground = geometry.ground().unwrap();
        assert_eq!(ground.height(), -0.3 - 0.2);
        if let GroundPlane::Attached { center, normal, tangent, .. } = ground {
            assert_relative_eq!(center.z, -0.5, epsilon = 1e-12);
            assert_relative_eq!(center.x, 0.5, epsilon = 1e-12);
            assert_eq!(*normal, Vector3d::z());
            assert!(tangent.dot(normal).abs() < 1e-12);
        } else {
            panic!("expected an attached ground");
        }
    }

    #[test]
    fn test_attached_ground_follows_up_axis() {
        let geometry = SceneGeometryBuilder::new()
            .with_ground(GroundSpec::attached())
            .build(&cloud(), &gray(3))
            .unwrap();
        let sideways = geometry.with_ground_up(&Vector3d::new(0.0, 2.0, 0.0)).unwrap();
        assert_relative_eq!(
            sideways.ground().unwrap().height(),
            0.0 - GroundSpec::DEFAULT_ATTACHED_OFFSET,
            epsilon = 1e-12
        );
        assert!(geometry.with_ground_up(&Vector3d::zeros()).is_err());
    }

    #[test]
    fn test_lighting() {
        let lighting = LightingSpec::default().with_background(Color::new(0.9, 0.9, 1.0));
        let geometry = SceneGeometryBuilder::new()
            .with_lighting(lighting)
            .build(&cloud(), &gray(3))
            .unwrap();
        let environments = geometry
            .emitters()
            .iter()
            .filter(|e| matches!(e, Emitter::Environment { .. }))
            .count();
        assert_eq!(environments, 1);
        assert_eq!(
            geometry.emitters()[0],
            Emitter::Environment { radiance: Color::new(0.9, 0.9, 1.0) }
        );
        assert_eq!(geometry.emitters().len(), 2);

        let no_area = SceneGeometryBuilder::new()
            .with_lighting(LightingSpec::default().with_area_light(None))
            .build(&cloud(), &gray(3))
            .unwrap();
        assert_eq!(no_area.emitters().len(), 1);
    }

    #[test]
    fn test_ambient_fill_is_a_no_op() {
        let quiet = LightingSpec::default().with_ambient_fill_intensity(0.0);
        let loud = LightingSpec::default().with_ambient_fill_intensity(5.0);
        let a = SceneGeometryBuilder::new().with_lighting(quiet).build(&cloud(), &gray(3)).unwrap();
        let b = SceneGeometryBuilder::new().with_lighting(loud).build(&cloud(), &gray(3)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_build_geometry_from_cloud() {
        let cloud = PointCloud::from_points(cloud());
        let geometry = build_geometry(
            &cloud,
            &gray(3),
            &GroundSpec::None,
            &LightingSpec::default(),
            0.01,
        )
        .unwrap();
        assert!(geometry.ground().is_none());
        assert!(build_geometry(&cloud, &gray(2), &GroundSpec::None, &LightingSpec::default(), 0.01).is_err());
    }
}
