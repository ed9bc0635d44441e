//! Render orchestration: scene preparation, renderer invocation, development
//! and animation assembly.

use crate::animation::{assemble_gif, FrameImage};
use crate::config::{AnimationSettings, RenderSettings, SceneRecipe};
use crate::develop::{develop, OutputFormat};
use crate::error::{RenderError, Result, Stage};
use crate::invoke::{CancelToken, FrameJob, FrameRenderer, MitsubaRenderer};
use crate::locate::RendererLocator;
use crate::workspace::{ArtifactGuard, Workspace};
use pcrender_core::{Color, PointCloud, Vector3d};
use pcrender_scene::{
    compile_frames, resolve_linear, CameraPose, CompiledFrame, GeometryFragment, OrbitSpec,
    SceneCompiler, SceneFragment, SceneGeometryBuilder, SceneSettings, TurntableAnimator,
};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

/// Outcome of rendering several independent inputs
#[derive(Debug, Default)]
pub struct BatchReport {
    /// `(input, output image)` for every input that rendered
    pub succeeded: Vec<(PathBuf, PathBuf)>,
    /// `(input, error)` for every input that failed
    pub failed: Vec<(PathBuf, RenderError)>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Prepares points and compiles scene descriptions for a [`SceneRecipe`].
///
/// Needs no renderer; the orchestrator uses it for every job and it can write
/// scene files on its own.
#[derive(Debug, Clone)]
pub struct ScenePlanner {
    recipe: SceneRecipe,
    compiler: SceneCompiler,
}

impl ScenePlanner {
    pub fn new(recipe: SceneRecipe, settings: SceneSettings) -> Self {
        Self {
            recipe,
            compiler: SceneCompiler::new(settings),
        }
    }

    pub fn recipe(&self) -> &SceneRecipe {
        &self.recipe
    }

    fn prepare(&self, cloud: &PointCloud) -> Result<(PointCloud, Vec<Color>)> {
        let cloud = self
            .recipe
            .preprocess
            .apply(cloud)
            .map_err(RenderError::at(Stage::Geometry))?;
        let colors = resolve_linear(cloud.points(), cloud.colors(), &self.recipe.color)
            .map_err(RenderError::at(Stage::Mapping))?;
        Ok((cloud, colors))
    }

    fn geometry(&self, cloud: &PointCloud, colors: &[Color], up: Vector3d) -> Result<GeometryFragment> {
        SceneGeometryBuilder::new()
            .with_ground(self.recipe.ground)
            .with_lighting(self.recipe.lighting)
            .with_point_radius(self.recipe.point_radius)
            .with_point_shape(self.recipe.point_shape)
            .with_up_axis(up)
            .build(cloud.points(), colors)
            .map_err(RenderError::at(Stage::Geometry))
    }

    /// Scene description of a still image of `cloud`
    pub fn compile_still(&self, cloud: &PointCloud, camera: &CameraPose) -> Result<SceneFragment> {
        let (cloud, colors) = self.prepare(cloud)?;
        let geometry = self.geometry(&cloud, &colors, camera.up())?;
        self.compiler
            .compile(&geometry, &camera.to_scene_fragment())
            .map_err(RenderError::at(Stage::Compile))
    }

    /// Scene descriptions of every turntable frame, in frame order
    pub fn compile_turntable(
        &self,
        cloud: &PointCloud,
        base: &CameraPose,
        orbit: &OrbitSpec,
    ) -> Result<Vec<CompiledFrame>> {
        let (cloud, colors) = self.prepare(cloud)?;

        let mut animator = TurntableAnimator::new(orbit.clone());
        if let Some(center) = cloud.centroid() {
            animator = animator.with_scene_center(center);
        }
        let up = animator
            .rotation_axis(base)
            .map_err(RenderError::at(Stage::Camera))?;
        let poses = animator.poses(base).map_err(RenderError::at(Stage::Camera))?;

        let geometry = self.geometry(&cloud, &colors, up)?;
        compile_frames(&self.compiler, &geometry, &poses).map_err(RenderError::at(Stage::Compile))
    }

    /// Write scene files without rendering them.
    ///
    /// A still writes `<stem>.xml`; a turntable writes `<stem>_NNNN.xml` per frame.
    pub fn write_scenes(
        &self,
        cloud: &PointCloud,
        camera: &CameraPose,
        orbit: Option<&OrbitSpec>,
        out_dir: &Path,
        stem: &str,
    ) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(out_dir)?;
        let scenes = match orbit {
            None => vec![(out_dir.join(format!("{}.xml", stem)), self.compile_still(cloud, camera)?)],
            Some(orbit) => self
                .compile_turntable(cloud, camera, orbit)?
                .into_iter()
                .map(|frame| (out_dir.join(format!("{}_{:04}.xml", stem, frame.index)), frame.scene))
                .collect(),
        };

        let mut written = Vec::with_capacity(scenes.len());
        for (path, scene) in scenes {
            fs::write(&path, scene.as_str())?;
            written.push(path);
        }
        tracing::info!(files = written.len(), dir = %out_dir.display(), "wrote scene files");
        Ok(written)
    }
}

/// Drives a [`FrameRenderer`] over compiled scenes
pub struct RenderOrchestrator<R> {
    renderer: R,
    planner: ScenePlanner,
    settings: RenderSettings,
}

impl RenderOrchestrator<MitsubaRenderer> {
    /// Resolve the Mitsuba executable through `locator` and render with it
    pub fn with_mitsuba(
        locator: &dyn RendererLocator,
        recipe: SceneRecipe,
        settings: RenderSettings,
    ) -> Result<Self> {
        let executable = locator.locate()?;
        let renderer = MitsubaRenderer::new(executable).with_variant(settings.variant.clone());
        Ok(Self::new(renderer, recipe, settings))
    }
}

impl<R: FrameRenderer> RenderOrchestrator<R> {
    pub fn new(renderer: R, recipe: SceneRecipe, settings: RenderSettings) -> Self {
        Self {
            renderer,
            planner: ScenePlanner::new(recipe, settings.scene.clone()),
            settings,
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn planner(&self) -> &ScenePlanner {
        &self.planner
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Render one scene and develop it into `output`.
    ///
    /// Every failure of a turntable frame carries that frame's index.
    fn render_scene(
        &self,
        scene: &SceneFragment,
        frame: Option<usize>,
        workspace: &Workspace,
        stem: &str,
        output: &Path,
        format: OutputFormat,
        cancel: &CancelToken,
    ) -> Result<()> {
        let result = self.render_scene_files(scene, frame, workspace, stem, output, format, cancel);
        match frame {
            Some(index) => result.map_err(|e| e.with_frame(index)),
            None => result,
        }
    }

    fn render_scene_files(
        &self,
        scene: &SceneFragment,
        frame: Option<usize>,
        workspace: &Workspace,
        stem: &str,
        output: &Path,
        format: OutputFormat,
        cancel: &CancelToken,
    ) -> Result<()> {
        let mut artifacts = ArtifactGuard::new(self.settings.keep_intermediates);
        let scene_path = artifacts.track(workspace.join(format!("{}.xml", stem)));
        let raw_path = artifacts.track(workspace.join(format!("{}.exr", stem)));
        fs::write(&scene_path, scene.as_str())?;

        let job = FrameJob {
            frame,
            scene_path,
            output_path: raw_path.clone(),
            timeout: self.settings.timeout,
        };
        self.renderer.render(&job, cancel)?;

        develop(&raw_path, output, format, self.settings.flip_horizontal, frame)?;
        if raw_path == output {
            artifacts.release(&raw_path);
        }
        Ok(())
    }

    /// Render a still image of `cloud` seen from `camera`.
    ///
    /// The output extension is corrected to the configured format. Returns the
    /// path written.
    #[tracing::instrument(skip_all, fields(output = %output.display()))]
    pub fn render_still(&self, cloud: &PointCloud, camera: &CameraPose, output: &Path) -> Result<PathBuf> {
        let started = Instant::now();
        let scene = self.planner.compile_still(cloud, camera)?;

        let format = self.settings.format;
        let output = format.resolve_path(output);
        let workspace = if self.settings.keep_intermediates {
            let dir = output.parent().filter(|p| !p.as_os_str().is_empty());
            Workspace::kept(dir.unwrap_or_else(|| Path::new(".")))?
        } else {
            Workspace::temporary("pcrender-still")?
        };
        let stem = output
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "render".to_string());

        self.render_scene(&scene, None, &workspace, &stem, &output, format, &self.settings.cancel)?;
        tracing::info!(elapsed = ?started.elapsed(), "rendered still");
        Ok(output)
    }

    fn pool(&self) -> Result<ThreadPool> {
        ThreadPoolBuilder::new()
            .num_threads(self.settings.parallelism)
            .thread_name(|index| format!("pcrender-render-{}", index))
            .build()
            .map_err(|e| RenderError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())))
    }

    /// Render a turntable sweep and assemble it into a looping GIF.
    ///
    /// Frames render concurrently, up to the configured parallelism. The first
    /// failing frame cancels the rest and is returned; no animation is written
    /// from an incomplete frame set.
    ///
    /// Frames go to `animation.frames_dir` when set. Otherwise they live in a
    /// temporary directory, unless intermediates are kept, in which case they
    /// go to `<gif stem>_frames` next to the animation.
    #[tracing::instrument(skip_all, fields(output = %animation.output.display(), frames = orbit.frame_count))]
    pub fn render_turntable(
        &self,
        cloud: &PointCloud,
        base: &CameraPose,
        orbit: &OrbitSpec,
        animation: &AnimationSettings,
    ) -> Result<PathBuf> {
        let started = Instant::now();
        let frames = self.planner.compile_turntable(cloud, base, orbit)?;
        let expected = frames.len();

        let kept_dir = animation.frames_dir.clone().or_else(|| {
            self.settings
                .keep_intermediates
                .then(|| intermediates_dir(&animation.output))
        });
        let workspace = Workspace::new(kept_dir.as_deref(), "pcrender-frames")?;
        let cancel = self.settings.cancel.child();
        let first_failure: Mutex<Option<RenderError>> = Mutex::new(None);

        let rendered = self.pool()?.install(|| {
            frames
                .par_iter()
                .map(|frame| {
                    let stem = format!("frame_{:04}", frame.index);
                    let path = workspace.join(format!("{}.png", stem));
                    let result = self.render_scene(
                        &frame.scene,
                        Some(frame.index),
                        &workspace,
                        &stem,
                        &path,
                        OutputFormat::Png,
                        &cancel,
                    );
                    match result {
                        Ok(()) => Ok(FrameImage { index: frame.index, path }),
                        Err(e) => {
                            cancel.cancel();
                            if !e.is_cancellation() {
                                let mut slot = first_failure.lock().unwrap_or_else(|p| p.into_inner());
                                if slot.is_none() {
                                    tracing::warn!(frame = frame.index, error = %e, "frame failed, cancelling the rest");
                                    *slot = Some(e);
                                }
                            }
                            Err(())
                        }
                    }
                })
                .collect::<std::result::Result<Vec<_>, ()>>()
        });

        let images = match rendered {
            Ok(images) => images,
            Err(()) => {
                let failure = first_failure.into_inner().unwrap_or_else(|p| p.into_inner());
                return Err(failure.unwrap_or(RenderError::Cancelled { frame: None }));
            }
        };

        assemble_gif(images, expected, &animation.output, animation.frame_duration)?;
        let kept_in = (!workspace.is_temporary()).then(|| workspace.path().to_path_buf());
        tracing::info!(
            frames = expected,
            elapsed = ?started.elapsed(),
            frames_dir = ?kept_in,
            "rendered turntable"
        );
        Ok(animation.output.clone())
    }

    /// Render a still of every input into `out_dir`.
    ///
    /// Inputs are independent: one failing input does not stop the others.
    /// Outputs are named after the input stem; see [`output_names`] for how
    /// inputs sharing a stem are told apart.
    #[tracing::instrument(skip_all, fields(inputs = inputs.len()))]
    pub fn render_batch(&self, inputs: &[PathBuf], camera: &CameraPose, out_dir: &Path) -> Result<BatchReport> {
        fs::create_dir_all(out_dir)?;

        let names = output_names(inputs);
        let outcomes: Vec<(PathBuf, Result<PathBuf>)> = self.pool()?.install(|| {
            inputs
                .par_iter()
                .zip(names.par_iter())
                .map(|(input, name)| {
                    let output = out_dir.join(name);
                    let result = pcrender_io::read_point_cloud(input)
                        .map_err(RenderError::at(Stage::Geometry))
                        .and_then(|cloud| self.render_still(&cloud, camera, &output));
                    (input.clone(), result)
                })
                .collect()
        });

        let mut report = BatchReport::default();
        for (input, outcome) in outcomes {
            match outcome {
                Ok(output) => report.succeeded.push((input, output)),
                Err(e) => {
                    tracing::warn!(input = %input.display(), stage = %e.stage(), error = %e, "input failed");
                    report.failed.push((input, e));
                }
            }
        }
        tracing::info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "batch finished"
        );
        Ok(report)
    }
}

/// Where a turntable keeps its intermediates when no frames directory is given
fn intermediates_dir(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "turntable".to_string());
    let name = format!("{}_frames", stem);
    match output.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

/// Distinct output names (without extension) for batch inputs.
///
/// An input whose stem is unique keeps it. Inputs sharing a stem get their
/// extension appended (`scan.ply` becomes `scan_ply`), and any name still
/// taken gets a numeric suffix.
pub fn output_names(inputs: &[PathBuf]) -> Vec<String> {
    let stem_of = |input: &PathBuf| {
        input
            .file_stem()
            .unwrap_or(input.as_os_str())
            .to_string_lossy()
            .into_owned()
    };

    let mut stem_counts: HashMap<String, usize> = HashMap::new();
    for input in inputs {
        *stem_counts.entry(stem_of(input)).or_default() += 1;
    }

    let mut used = HashSet::new();
    inputs
        .iter()
        .map(|input| {
            let stem = stem_of(input);
            let base = match input.extension() {
                Some(ext) if stem_counts[&stem] > 1 => format!("{}_{}", stem, ext.to_string_lossy()),
                _ => stem,
            };
            let mut name = base.clone();
            let mut n = 2;
            while !used.insert(name.clone()) {
                name = format!("{}_{}", base, n);
                n += 1;
            }
            name
        })
        .collect()
}
