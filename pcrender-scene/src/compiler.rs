//! Serialization of one frame into a Mitsuba 0.6 scene description.
//!
//! The output depends only on the inputs: compiling the same geometry and
//! camera twice yields byte-identical text.

use crate::camera::{fallback_up, CameraFragment};
use crate::geometry::{Emitter, GeometryFragment, GroundPlane, PointShape};
use pcrender_core::{format_triple, Color, Error, Point3d, Result, Vector3d};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};

/// Scene description format version
pub const SCENE_VERSION: &str = "0.6.0";

/// Light transport integrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Integrator {
    /// Unidirectional path tracer, unlimited depth when `max_depth` is `None`
    Path { max_depth: Option<u32> },
    Direct,
}

impl Default for Integrator {
    fn default() -> Self {
        Integrator::Path { max_depth: None }
    }
}

/// Renderer settings that do not depend on the frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSettings {
    pub integrator: Integrator,
    pub samples_per_pixel: u32,
    pub width: u32,
    pub height: u32,
    pub near_clip: f64,
    pub far_clip: f64,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            integrator: Integrator::default(),
            samples_per_pixel: 256,
            width: 3840,
            height: 2160,
            near_clip: 0.1,
            far_clip: 100.0,
        }
    }
}

impl SceneSettings {
    pub fn with_integrator(mut self, integrator: Integrator) -> Self {
        self.integrator = integrator;
        self
    }

    pub fn with_samples(mut self, samples_per_pixel: u32) -> Self {
        self.samples_per_pixel = samples_per_pixel;
        self
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_clip(mut self, near: f64, far: f64) -> Self {
        self.near_clip = near;
        self.far_clip = far;
        self
    }
}

/// A complete scene description for exactly one frame
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SceneFragment {
    xml: String,
}

impl SceneFragment {
    pub fn as_str(&self) -> &str {
        &self.xml
    }

    pub fn into_string(self) -> String {
        self.xml
    }

    pub fn len(&self) -> usize {
        self.xml.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xml.is_empty()
    }
}

impl fmt::Display for SceneFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.xml)
    }
}

/// Turns geometry and a camera into a renderer scene
#[derive(Debug, Clone, Default)]
pub struct SceneCompiler {
    settings: SceneSettings,
}

impl SceneCompiler {
    pub fn new(settings: SceneSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &SceneSettings {
        &self.settings
    }

    /// Compile one frame.
    ///
    /// Lighting reaches the scene through the emitters of `geometry`.
    pub fn compile(&self, geometry: &GeometryFragment, camera: &CameraFragment) -> Result<SceneFragment> {
        if self.settings.width == 0 || self.settings.height == 0 {
            return Err(Error::InvalidData(format!(
                "film resolution must be positive, got {}x{}",
                self.settings.width, self.settings.height
            )));
        }
        if self.settings.samples_per_pixel == 0 {
            return Err(Error::InvalidData("sample count must be positive".to_string()));
        }

        // 160 bytes per point covers the sphere node comfortably
        let mut xml = String::with_capacity(2048 + geometry.points().len() * 160);
        self.write_scene(&mut xml, geometry, camera)
            .map_err(|_| Error::InvalidData("failed to format scene description".to_string()))?;
        Ok(SceneFragment { xml })
    }

    fn write_scene(&self, out: &mut String, geometry: &GeometryFragment, camera: &CameraFragment) -> fmt::Result {
        writeln!(out, "<scene version=\"{}\">", SCENE_VERSION)?;
        self.write_integrator(out)?;

        // Environment first, then the sensor, matching what the renderer expects to see
        for emitter in geometry.emitters() {
            if let Emitter::Environment { radiance } = emitter {
                write_environment(out, radiance)?;
            }
        }
        self.write_sensor(out, camera)?;
        write_surface_material(out)?;

        let radius = geometry.point_radius();
        for point in geometry.points() {
            match geometry.point_shape() {
                PointShape::Sphere => write_sphere(out, &point.center, radius, &point.color)?,
                PointShape::Disc => write_disc(out, &point.center, radius, &point.color, &camera.origin)?,
            }
        }

        if let Some(ground) = geometry.ground() {
            write_ground(out, ground)?;
        }

        for emitter in geometry.emitters() {
            if let Emitter::Area { intensity, size, origin, target, up } = emitter {
                write_area_light(out, *intensity, *size, origin, target, up)?;
            }
        }

        writeln!(out, "</scene>")
    }

    fn write_integrator(&self, out: &mut String) -> fmt::Result {
        match self.settings.integrator {
            Integrator::Path { max_depth } => {
                writeln!(out, "    <integrator type=\"path\">")?;
                if let Some(depth) = max_depth.filter(|d| *d > 0) {
                    writeln!(out, "        <integer name=\"maxDepth\" value=\"{}\"/>", depth)?;
                }
                writeln!(out, "        <boolean name=\"hideEmitters\" value=\"false\"/>")?;
                writeln!(out, "    </integrator>")
            }
            Integrator::Direct => writeln!(out, "    <integrator type=\"direct\"/>"),
        }
    }

    fn write_sensor(&self, out: &mut String, camera: &CameraFragment) -> fmt::Result {
        let s = &self.settings;
        writeln!(out, "    <sensor type=\"perspective\">")?;
        writeln!(out, "        <float name=\"farClip\" value=\"{}\"/>", s.far_clip)?;
        writeln!(out, "        <float name=\"nearClip\" value=\"{}\"/>", s.near_clip)?;
        writeln!(out, "        <transform name=\"toWorld\">")?;
        writeln!(
            out,
            "            <lookat origin=\"{}\" target=\"{}\" up=\"{}\"/>",
            point(&camera.origin),
            point(&camera.target),
            vector(&camera.up)
        )?;
        writeln!(out, "        </transform>")?;
        writeln!(out, "        <float name=\"fov\" value=\"{}\"/>", camera.fov)?;
        writeln!(out, "        <sampler type=\"independent\">")?;
        writeln!(out, "            <integer name=\"sampleCount\" value=\"{}\"/>", s.samples_per_pixel)?;
        writeln!(out, "        </sampler>")?;
        writeln!(out, "        <film type=\"hdrfilm\">")?;
        writeln!(out, "            <integer name=\"width\" value=\"{}\"/>", s.width)?;
        writeln!(out, "            <integer name=\"height\" value=\"{}\"/>", s.height)?;
        writeln!(out, "            <rfilter type=\"gaussian\"/>")?;
        writeln!(out, "        </film>")?;
        writeln!(out, "    </sensor>")
    }
}

fn point(p: &Point3d) -> String {
    format_triple(p.x, p.y, p.z)
}

fn vector(v: &Vector3d) -> String {
    format_triple(v.x, v.y, v.z)
}

fn write_environment(out: &mut String, radiance: &Color) -> fmt::Result {
    writeln!(out, "    <emitter type=\"constant\">")?;
    writeln!(out, "        <rgb name=\"radiance\" value=\"{}\"/>", radiance)?;
    writeln!(out, "    </emitter>")
}

fn write_surface_material(out: &mut String) -> fmt::Result {
    writeln!(out, "    <bsdf type=\"roughplastic\" id=\"surfaceMaterial\">")?;
    writeln!(out, "        <string name=\"distribution\" value=\"ggx\"/>")?;
    writeln!(out, "        <float name=\"alpha\" value=\"0.05\"/>")?;
    writeln!(out, "        <float name=\"intIOR\" value=\"1.46\"/>")?;
    writeln!(out, "        <rgb name=\"diffuseReflectance\" value=\"1,1,1\"/>")?;
    writeln!(out, "    </bsdf>")
}

fn write_diffuse(out: &mut String, color: &Color) -> fmt::Result {
    writeln!(out, "        <bsdf type=\"diffuse\">")?;
    writeln!(out, "            <rgb name=\"reflectance\" value=\"{}\"/>", color)?;
    writeln!(out, "        </bsdf>")
}

fn write_sphere(out: &mut String, center: &Point3d, radius: f64, color: &Color) -> fmt::Result {
    writeln!(out, "    <shape type=\"sphere\">")?;
    writeln!(out, "        <float name=\"radius\" value=\"{}\"/>", radius)?;
    writeln!(out, "        <transform name=\"toWorld\">")?;
    writeln!(
        out,
        "            <translate x=\"{}\" y=\"{}\" z=\"{}\"/>",
        center.x, center.y, center.z
    )?;
    writeln!(out, "        </transform>")?;
    write_diffuse(out, color)?;
    writeln!(out, "    </shape>")
}

/// A unit disk faces +Z; `lookat` turns that normal towards the camera.
fn write_disc(out: &mut String, center: &Point3d, radius: f64, color: &Color, eye: &Point3d) -> fmt::Result {
    let to_eye = eye - center;
    let normal = if to_eye.norm() > 1e-12 { to_eye.normalize() } else { Vector3d::z() };
    let up = fallback_up(&normal);

    writeln!(out, "    <shape type=\"disk\">")?;
    writeln!(out, "        <transform name=\"toWorld\">")?;
    writeln!(out, "            <scale value=\"{}\"/>", radius)?;
    writeln!(
        out,
        "            <lookat origin=\"{}\" target=\"{}\" up=\"{}\"/>",
        point(center),
        point(&(center + normal)),
        vector(&up)
    )?;
    writeln!(out, "        </transform>")?;
    write_diffuse(out, color)?;
    writeln!(out, "    </shape>")
}

fn write_ground(out: &mut String, ground: &GroundPlane) -> fmt::Result {
    writeln!(out, "    <shape type=\"rectangle\">")?;
    match ground {
        GroundPlane::Standard { height, half_extent } => {
            writeln!(out, "        <ref name=\"bsdf\" id=\"surfaceMaterial\"/>")?;
            writeln!(out, "        <transform name=\"toWorld\">")?;
            writeln!(
                out,
                "            <scale x=\"{0}\" y=\"{0}\" z=\"1\"/>",
                half_extent
            )?;
            writeln!(out, "            <translate x=\"0\" y=\"0\" z=\"{}\"/>", height)?;
            writeln!(out, "        </transform>")?;
        }
        GroundPlane::Attached { center, normal, tangent, half_extent, .. } => {
            write_diffuse(out, &Color::WHITE)?;
            writeln!(out, "        <transform name=\"toWorld\">")?;
            writeln!(
                out,
                "            <scale x=\"{0}\" y=\"{0}\" z=\"1\"/>",
                half_extent
            )?;
            writeln!(
                out,
                "            <lookat origin=\"{}\" target=\"{}\" up=\"{}\"/>",
                point(center),
                point(&(center + normal)),
                vector(tangent)
            )?;
            writeln!(out, "        </transform>")?;
        }
    }
    writeln!(out, "    </shape>")
}

fn write_area_light(
    out: &mut String,
    intensity: f64,
    size: f64,
    origin: &Point3d,
    target: &Point3d,
    up: &Vector3d,
) -> fmt::Result {
    writeln!(out, "    <shape type=\"rectangle\">")?;
    writeln!(out, "        <transform name=\"toWorld\">")?;
    writeln!(out, "            <scale x=\"{0}\" y=\"{0}\" z=\"1\"/>", size)?;
    writeln!(
        out,
        "            <lookat origin=\"{}\" target=\"{}\" up=\"{}\"/>",
        point(origin),
        point(target),
        vector(up)
    )?;
    writeln!(out, "        </transform>")?;
    writeln!(out, "        <emitter type=\"area\">")?;
    writeln!(
        out,
        "            <rgb name=\"radiance\" value=\"{}\"/>",
        Color::gray(intensity)
    )?;
    writeln!(out, "        </emitter>")?;
    writeln!(out, "    </shape>")
}
