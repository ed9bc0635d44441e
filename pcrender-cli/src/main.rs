//! pcrender command line
//!
//! Renders point clouds through Mitsuba 0.6:
//! - `render`: still images of one file, several files or directories
//! - `turntable`: a looping GIF orbiting the cloud
//! - `scene`: scene files only, for inspection or rendering elsewhere

mod args;

use anyhow::{anyhow, bail, Context};
use args::{Cli, Command, RenderCmd, SceneCmd, TurntableCmd};
use clap::Parser;
use pcrender_core::PointCloud;
use pcrender_render::{
    AnimationSettings, OutputFormat, RenderError, RenderOrchestrator, ScenePlanner, SearchPathLocator,
    Stage,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .with_target(false)
        .init();

    let result = match &cli.command {
        Command::Render(cmd) => render(cmd),
        Command::Turntable(cmd) => turntable(cmd),
        Command::Scene(cmd) => scene(cmd),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Describe a failure as "<stage> failed for <input>[ frame N]"
fn failure(input: &Path, err: RenderError) -> anyhow::Error {
    let frame = err
        .frame()
        .map(|index| format!(" frame {}", index))
        .unwrap_or_default();
    let message = format!("{} failed for {}{}", err.stage(), input.display(), frame);
    anyhow::Error::new(err).context(message)
}

fn load(input: &Path) -> anyhow::Result<PointCloud> {
    pcrender_io::read_point_cloud(input)
        .map_err(RenderError::at(Stage::Geometry))
        .map_err(|e| failure(input, e))
}

fn locator(explicit: Option<&PathBuf>) -> SearchPathLocator {
    SearchPathLocator::from_env().with_explicit(explicit.cloned())
}

/// Expand directories into the point cloud files they contain
fn expand_inputs(inputs: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let found = pcrender_io::list_point_clouds(input)
                .with_context(|| format!("could not list {}", input.display()))?;
            if found.is_empty() {
                tracing::warn!(dir = %input.display(), "no point cloud files found");
            }
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }
    Ok(files)
}

fn render(cmd: &RenderCmd) -> anyhow::Result<()> {
    let camera = cmd
        .camera
        .pose()
        .map_err(|e| failure(Path::new("--camera"), RenderError::at(Stage::Camera)(e)))?;
    let inputs = expand_inputs(&cmd.inputs)?;
    if inputs.is_empty() {
        bail!("no point cloud files to render");
    }

    let format = cmd
        .format
        .or_else(|| cmd.output.as_deref().and_then(OutputFormat::from_path))
        .unwrap_or_default();
    let settings = cmd.renderer.settings(cmd.scene.scene_settings(), format);
    let orchestrator = RenderOrchestrator::with_mitsuba(
        &locator(cmd.renderer.mitsuba.as_ref()),
        cmd.scene.recipe(),
        settings,
    )
    .map_err(|e| anyhow::Error::new(e).context("render setup failed"))?;

    if let [input] = inputs.as_slice() {
        let output = match &cmd.output {
            Some(output) => output.clone(),
            None => cmd.out_dir.join(input.file_stem().unwrap_or(input.as_os_str())),
        };
        let cloud = load(input)?;
        let written = orchestrator
            .render_still(&cloud, &camera, &output)
            .map_err(|e| failure(input, e))?;
        println!("{}", written.display());
        return Ok(());
    }

    if cmd.output.is_some() {
        bail!("--output takes a single input; use --out-dir for several");
    }
    let report = orchestrator
        .render_batch(&inputs, &camera, &cmd.out_dir)
        .map_err(|e| anyhow::Error::new(e).context("batch setup failed"))?;
    for (_, output) in &report.succeeded {
        println!("{}", output.display());
    }
    let total = report.len();
    let failed = report.failed.len();
    for (input, err) in report.failed {
        eprintln!("error: {:#}", failure(&input, err));
    }
    if failed > 0 {
        return Err(anyhow!("{} of {} inputs failed", failed, total));
    }
    Ok(())
}

fn turntable(cmd: &TurntableCmd) -> anyhow::Result<()> {
    let camera = cmd
        .camera
        .pose()
        .map_err(|e| failure(&cmd.input, RenderError::at(Stage::Camera)(e)))?;
    let orbit = cmd
        .orbit
        .spec()
        .map_err(|e| failure(&cmd.input, RenderError::at(Stage::Camera)(e)))?;

    let settings = cmd
        .renderer
        .settings(cmd.scene.scene_settings(), OutputFormat::Png);
    let orchestrator = RenderOrchestrator::with_mitsuba(
        &locator(cmd.renderer.mitsuba.as_ref()),
        cmd.scene.recipe(),
        settings,
    )
    .map_err(|e| anyhow::Error::new(e).context("render setup failed"))?;

    let animation = AnimationSettings::new(&cmd.output)
        .with_frame_duration(Duration::from_millis(cmd.frame_duration_ms))
        .with_frames_dir(cmd.frames_dir.clone());

    let cloud = load(&cmd.input)?;
    let written = orchestrator
        .render_turntable(&cloud, &camera, &orbit, &animation)
        .map_err(|e| failure(&cmd.input, e))?;
    println!("{}", written.display());
    Ok(())
}

fn scene(cmd: &SceneCmd) -> anyhow::Result<()> {
    let camera = cmd
        .camera
        .pose()
        .map_err(|e| failure(&cmd.input, RenderError::at(Stage::Camera)(e)))?;
    let orbit = if cmd.turntable {
        let spec = cmd
            .orbit
            .spec()
            .map_err(|e| failure(&cmd.input, RenderError::at(Stage::Camera)(e)))?;
        Some(spec)
    } else {
        None
    };

    let planner = ScenePlanner::new(cmd.scene.recipe(), cmd.scene.scene_settings());

    let cloud = load(&cmd.input)?;
    let stem = cmd
        .input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "scene".to_string());
    let written = planner
        .write_scenes(&cloud, &camera, orbit.as_ref(), &cmd.out_dir, &stem)
        .map_err(|e| failure(&cmd.input, e))?;
    for path in written {
        println!("{}", path.display());
    }
    Ok(())
}
