//! Command line arguments and their translation into library configuration

use clap::{Args, Parser, Subcommand, ValueEnum};
use pcrender_core::{Axis, Color, Point3d, Preprocess};
use pcrender_render::{OutputFormat, RenderSettings, SceneRecipe};
use pcrender_scene::{
    CameraPose, ColorPolicy, Direction, GroundSpec, Integrator, LightingSpec, OrbitAxis, OrbitSpec,
    Palette, PointShape, SceneSettings, DEFAULT_FOV, DEFAULT_POINT_RADIUS,
};
use std::path::PathBuf;
use std::time::Duration;

/// pcrender - photorealistic point cloud stills and turntables with Mitsuba
#[derive(Parser, Debug)]
#[command(name = "pcrender")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log filter used when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render still images of one or more point clouds
    Render(RenderCmd),
    /// Render a turntable animation into a looping GIF
    Turntable(TurntableCmd),
    /// Write Mitsuba scene files without rendering
    Scene(SceneCmd),
}

#[derive(Args, Debug)]
pub struct RenderCmd {
    /// Point cloud files or directories of them
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output image; only valid with a single input file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory for images when no --output is given
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Image format; defaults to the --output extension, then png
    #[arg(long)]
    pub format: Option<OutputFormat>,

    #[command(flatten)]
    pub camera: CameraArgs,

    #[command(flatten)]
    pub scene: SceneArgs,

    #[command(flatten)]
    pub renderer: RendererArgs,
}

#[derive(Args, Debug)]
pub struct TurntableCmd {
    /// Point cloud file
    pub input: PathBuf,

    /// Output GIF
    #[arg(short, long, default_value = "turntable.gif")]
    pub output: PathBuf,

    /// Display time of each frame in milliseconds
    #[arg(long, default_value_t = 100)]
    pub frame_duration_ms: u64,

    /// Keep the developed frames in this directory
    #[arg(long)]
    pub frames_dir: Option<PathBuf>,

    #[command(flatten)]
    pub camera: CameraArgs,

    #[command(flatten)]
    pub orbit: OrbitArgs,

    #[command(flatten)]
    pub scene: SceneArgs,

    #[command(flatten)]
    pub renderer: RendererArgs,
}

#[derive(Args, Debug)]
pub struct SceneCmd {
    /// Point cloud file
    pub input: PathBuf,

    /// Directory the scene files are written to
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Write one scene per turntable frame instead of a single still
    #[arg(long)]
    pub turntable: bool,

    #[command(flatten)]
    pub camera: CameraArgs,

    #[command(flatten)]
    pub orbit: OrbitArgs,

    #[command(flatten)]
    pub scene: SceneArgs,
}

#[derive(Args, Debug)]
pub struct CameraArgs {
    /// Camera as "ox,oy,oz[ tx,ty,tz[ ux,uy,uz]]"
    #[arg(long, allow_hyphen_values = true)]
    pub camera: Option<String>,

    /// Vertical field of view in degrees
    #[arg(long, default_value_t = DEFAULT_FOV)]
    pub fov: f64,

    /// Camera parameters were captured in a Y-up viewer
    #[arg(long)]
    pub camera_y_up: bool,
}

impl CameraArgs {
    pub fn pose(&self) -> pcrender_core::Result<CameraPose> {
        let Some(text) = self.camera.as_deref() else {
            return CameraPose::default().with_fov(self.fov);
        };
        let pose = CameraPose::parse_with(text, Point3d::origin(), self.fov)?;
        if self.camera_y_up {
            CameraPose::from_y_up_viewer(pose.origin(), pose.target(), pose.up(), self.fov)
        } else {
            Ok(pose)
        }
    }
}

#[derive(Args, Debug)]
pub struct OrbitArgs {
    /// Number of frames in a full turn
    #[arg(long, default_value_t = 36)]
    pub frames: usize,

    /// Rotation axis: x, y, z or initial-up
    #[arg(long, default_value = "z")]
    pub axis: OrbitAxis,

    /// Rotate clockwise seen from the tip of the axis
    #[arg(long)]
    pub clockwise: bool,

    /// Angle of the first frame in degrees
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub start_angle: f64,

    /// Camera distance from the pivot
    #[arg(long)]
    pub distance: Option<f64>,

    /// Camera elevation above the orbit plane in degrees
    #[arg(long, allow_hyphen_values = true)]
    pub elevation: Option<f64>,

    /// Orbit pivot as "x,y,z"; defaults to the cloud centroid
    #[arg(long, allow_hyphen_values = true)]
    pub pivot: Option<String>,
}

impl OrbitArgs {
    pub fn spec(&self) -> pcrender_core::Result<OrbitSpec> {
        let mut spec = OrbitSpec::default()
            .with_frame_count(self.frames)
            .with_axis(self.axis)
            .with_start_offset(self.start_angle)
            .with_direction(if self.clockwise {
                Direction::Clockwise
            } else {
                Direction::CounterClockwise
            });
        if let Some(distance) = self.distance {
            spec = spec.with_distance(distance);
        }
        if let Some(elevation) = self.elevation {
            spec = spec.with_elevation(elevation);
        }
        if let Some(pivot) = &self.pivot {
            spec = spec.with_pivot(Point3d::from(pcrender_core::parse_triple(pivot)?));
        }
        Ok(spec)
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    /// Colors stored in the file
    Original,
    /// Palette per coordinate axis
    Position,
    /// Palette along one axis
    Height,
    /// One color for every point
    Fixed,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroundMode {
    None,
    Standard,
    Attached,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeArg {
    Sphere,
    Disc,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegratorArg {
    Path,
    Direct,
}

#[derive(Args, Debug)]
pub struct SceneArgs {
    #[arg(long, value_enum, default_value_t = ColorMode::Original)]
    pub color_mode: ColorMode,

    /// Palette for position and height modes
    #[arg(long, default_value = "viridis")]
    pub palette: Palette,

    /// Axis for height mode
    #[arg(long, default_value = "z")]
    pub height_axis: Axis,

    /// Color for fixed mode as "r,g,b" in [0, 1]
    #[arg(long, default_value = "0.7,0.7,0.7")]
    pub fixed_color: Color,

    /// Radius of every point
    #[arg(long, default_value_t = DEFAULT_POINT_RADIUS)]
    pub radius: f64,

    #[arg(long, value_enum, default_value_t = ShapeArg::Sphere)]
    pub shape: ShapeArg,

    #[arg(long, value_enum, default_value_t = GroundMode::Standard)]
    pub ground: GroundMode,

    /// Gap between the lowest point and an attached ground
    #[arg(long, default_value_t = GroundSpec::DEFAULT_ATTACHED_OFFSET)]
    pub ground_offset: f64,

    /// Side length of an attached ground
    #[arg(long, default_value_t = GroundSpec::DEFAULT_ATTACHED_SIZE)]
    pub ground_size: f64,

    /// Environment color as "r,g,b"; also the ambient light
    #[arg(long, default_value = "1,1,1")]
    pub background: Color,

    /// Area light intensity
    #[arg(long, default_value_t = 3.0)]
    pub area_light: f64,

    /// Leave out the area light
    #[arg(long)]
    pub no_area_light: bool,

    /// Accepted for compatibility; has no effect, use --background instead
    #[arg(long, default_value_t = 0.5)]
    pub ambient_intensity: f64,

    /// Randomly keep at most this many points
    #[arg(long)]
    pub max_points: Option<usize>,

    /// Seed for --max-points
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Keep original coordinates instead of fitting the unit cube
    #[arg(long)]
    pub no_standardize: bool,

    /// Input points are Y-up
    #[arg(long)]
    pub y_up: bool,

    /// Samples per pixel
    #[arg(long, default_value_t = 256)]
    pub samples: u32,

    /// Film width in pixels
    #[arg(long, default_value_t = 3840)]
    pub width: u32,

    /// Film height in pixels
    #[arg(long, default_value_t = 2160)]
    pub height: u32,

    #[arg(long, value_enum, default_value_t = IntegratorArg::Path)]
    pub integrator: IntegratorArg,

    /// Maximum path depth for the path integrator
    #[arg(long)]
    pub max_depth: Option<u32>,
}

impl SceneArgs {
    pub fn color_policy(&self) -> ColorPolicy {
        match self.color_mode {
            ColorMode::Original => ColorPolicy::Original,
            ColorMode::Position => ColorPolicy::Position { palette: self.palette },
            ColorMode::Height => ColorPolicy::Height {
                axis: self.height_axis,
                palette: self.palette,
            },
            ColorMode::Fixed => ColorPolicy::Fixed { color: self.fixed_color },
        }
    }

    pub fn ground(&self) -> GroundSpec {
        match self.ground {
            GroundMode::None => GroundSpec::None,
            GroundMode::Standard => GroundSpec::Standard,
            GroundMode::Attached => GroundSpec::Attached {
                offset: self.ground_offset,
                size: self.ground_size,
            },
        }
    }

    pub fn lighting(&self) -> LightingSpec {
        LightingSpec::default()
            .with_background(self.background)
            .with_area_light((!self.no_area_light).then_some(self.area_light))
            .with_ambient_fill_intensity(self.ambient_intensity)
    }

    pub fn recipe(&self) -> SceneRecipe {
        let mut preprocess = Preprocess::default()
            .with_seed(self.seed)
            .with_standardize(!self.no_standardize)
            .with_y_up_to_z_up(self.y_up);
        if let Some(max_points) = self.max_points {
            preprocess = preprocess.with_max_points(max_points);
        }

        SceneRecipe::default()
            .with_preprocess(preprocess)
            .with_color(self.color_policy())
            .with_ground(self.ground())
            .with_lighting(self.lighting())
            .with_point_radius(self.radius)
            .with_point_shape(match self.shape {
                ShapeArg::Sphere => PointShape::Sphere,
                ShapeArg::Disc => PointShape::Disc,
            })
    }

    pub fn scene_settings(&self) -> SceneSettings {
        let integrator = match self.integrator {
            IntegratorArg::Path => Integrator::Path { max_depth: self.max_depth },
            IntegratorArg::Direct => Integrator::Direct,
        };
        SceneSettings::default()
            .with_integrator(integrator)
            .with_samples(self.samples)
            .with_resolution(self.width, self.height)
    }
}

#[derive(Args, Debug)]
pub struct RendererArgs {
    /// Mitsuba executable; otherwise MITSUBA_EXECUTABLE, conda, PATH and common locations are searched
    #[arg(long)]
    pub mitsuba: Option<PathBuf>,

    /// Mitsuba variant
    #[arg(long, default_value = "scalar_rgb")]
    pub variant: String,

    /// Do not mirror images left to right
    #[arg(long)]
    pub no_flip: bool,

    /// Renderer processes to run at once; defaults to the number of cores
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Give up on a frame after this many seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Keep scene files and raw EXR images
    #[arg(long)]
    pub keep_intermediates: bool,
}

impl RendererArgs {
    pub fn settings(&self, scene: SceneSettings, format: OutputFormat) -> RenderSettings {
        let mut settings = RenderSettings::default()
            .with_scene(scene)
            .with_variant(self.variant.clone())
            .with_format(format)
            .with_flip_horizontal(!self.no_flip)
            .with_timeout(self.timeout_secs.map(Duration::from_secs))
            .with_keep_intermediates(self.keep_intermediates);
        if let Some(jobs) = self.jobs {
            settings = settings.with_parallelism(jobs);
        }
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("pcrender").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_render_defaults() {
        let cli = parse(&["render", "cloud.ply"]);
        let Command::Render(cmd) = cli.command else {
            panic!("expected render");
        };
        assert_eq!(cmd.inputs, vec![PathBuf::from("cloud.ply")]);
        assert_eq!(cmd.scene.color_policy(), ColorPolicy::Original);
        assert_eq!(cmd.scene.ground(), GroundSpec::Standard);
        assert_eq!(cmd.scene.lighting(), LightingSpec::default());
        assert_eq!(cmd.camera.pose().unwrap(), CameraPose::default());
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_scene_options() {
        let cli = parse(&[
            "render",
            "cloud.xyz",
            "--color-mode",
            "height",
            "--palette",
            "turbo",
            "--height-axis",
            "y",
            "--ground",
            "attached",
            "--ground-offset",
            "0.25",
            "--no-area-light",
            "--background",
            "0,0,0",
        ]);
        let Command::Render(cmd) = cli.command else {
            panic!("expected render");
        };
        assert_eq!(
            cmd.scene.color_policy(),
            ColorPolicy::Height { axis: Axis::Y, palette: Palette::Turbo }
        );
        assert_eq!(cmd.scene.ground(), GroundSpec::Attached { offset: 0.25, size: 75.0 });
        let lighting = cmd.scene.lighting();
        assert_eq!(lighting.area_light, None);
        assert_eq!(lighting.background, Color::BLACK);
    }

    #[test]
    fn test_turntable_orbit() {
        let cli = parse(&[
            "turntable",
            "cloud.ply",
            "--frames",
            "12",
            "--axis",
            "initial-up",
            "--clockwise",
            "--start-angle",
            "-30",
            "--camera",
            "2,0,1 0,0,0",
        ]);
        let Command::Turntable(cmd) = cli.command else {
            panic!("expected turntable");
        };
        let spec = cmd.orbit.spec().unwrap();
        assert_eq!(spec.frame_count, 12);
        assert_eq!(spec.axis, OrbitAxis::InitialUp);
        assert_eq!(spec.direction, Direction::Clockwise);
        assert_eq!(spec.start_offset_deg, -30.0);
        assert_eq!(cmd.camera.pose().unwrap().origin(), Point3d::new(2.0, 0.0, 1.0));
    }

    #[test]
    fn test_bad_camera_rejected_before_rendering() {
        let cli = parse(&["scene", "cloud.ply", "--camera", "0,0,0 0,0,0"]);
        let Command::Scene(cmd) = cli.command else {
            panic!("expected scene");
        };
        assert!(matches!(
            cmd.camera.pose(),
            Err(pcrender_core::Error::DegenerateCamera(_))
        ));
    }

    #[test]
    fn test_unknown_palette() {
        let result = Cli::try_parse_from(["pcrender", "render", "a.ply", "--palette", "magma"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_out_of_range_color_rejected() {
        let result = Cli::try_parse_from(["pcrender", "render", "a.ply", "--background", "2,2,2"]);
        assert!(result.is_err());
        let result = Cli::try_parse_from(["pcrender", "scene", "a.ply", "--fixed-color", "0.5,1.5,0"]);
        assert!(result.is_err());
    }
}
