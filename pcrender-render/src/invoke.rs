//! Blocking renderer invocation with timeout and cancellation

use crate::error::{RenderError, Result};
use crate::locate::RendererExecutable;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Default renderer variant
pub const DEFAULT_VARIANT: &str = "scalar_rgb";

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Shared flag that stops queued frames and kills running renderer processes.
///
/// A token made with [`CancelToken::child`] also observes its parent, so a
/// job can cancel its own frames without cancelling the caller's token.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    parent: Option<Arc<AtomicBool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
            || self
                .parent
                .as_ref()
                .map_or(false, |parent| parent.load(Ordering::SeqCst))
    }

    pub fn child(&self) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            parent: Some(self.flag.clone()),
        }
    }
}

/// One renderer invocation: a scene file in, a raw image out
#[derive(Debug, Clone, PartialEq)]
pub struct FrameJob {
    /// Frame index within an animation, `None` for stills
    pub frame: Option<usize>,
    pub scene_path: PathBuf,
    pub output_path: PathBuf,
    pub timeout: Option<Duration>,
}

/// Something that turns a scene file into a raw image file
pub trait FrameRenderer: Send + Sync {
    /// Render `job`, blocking until the image exists or rendering failed
    fn render(&self, job: &FrameJob, cancel: &CancelToken) -> Result<()>;
}

/// Runs the Mitsuba command line renderer
#[derive(Debug, Clone)]
pub struct MitsubaRenderer {
    executable: RendererExecutable,
    variant: String,
    show_progress: bool,
}

impl MitsubaRenderer {
    pub fn new(executable: RendererExecutable) -> Self {
        Self {
            executable,
            variant: DEFAULT_VARIANT.to_string(),
            show_progress: false,
        }
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = variant.into();
        self
    }

    /// Let the renderer write its progress bar to our stdout
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn executable(&self) -> &RendererExecutable {
        &self.executable
    }

    /// The command that renders `job`
    pub fn command(&self, job: &FrameJob) -> Command {
        let mut command = Command::new(self.executable.path());
        command
            .arg("-m")
            .arg(&self.variant)
            .arg(&job.scene_path)
            .arg("-o")
            .arg(&job.output_path);
        command
    }
}

impl FrameRenderer for MitsubaRenderer {
    fn render(&self, job: &FrameJob, cancel: &CancelToken) -> Result<()> {
        let mut command = self.command(job);
        if self.show_progress {
            command.stdout(Stdio::inherit());
        } else {
            command.stdout(Stdio::null());
        }

        tracing::debug!(frame = ?job.frame, scene = %job.scene_path.display(), "rendering");
        let started = Instant::now();
        run_process(command, job.frame, job.timeout, cancel)?;

        if !output_exists(&job.output_path) {
            return Err(RenderError::MissingOutput {
                frame: job.frame,
                path: job.output_path.clone(),
            });
        }
        tracing::debug!(frame = ?job.frame, elapsed = ?started.elapsed(), "rendered");
        Ok(())
    }
}

/// Run `command` to completion, capturing stderr.
///
/// The child is killed when `timeout` elapses or `cancel` trips. A non-zero
/// exit becomes [`RenderError::NonZeroExit`] carrying the captured stderr.
pub fn run_process(
    mut command: Command,
    frame: Option<usize>,
    timeout: Option<Duration>,
    cancel: &CancelToken,
) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(RenderError::Cancelled { frame });
    }

    let mut child = command
        .stdin(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| RenderError::Spawn { frame, source })?;

    let stderr_reader = child.stderr.take().map(|mut stderr| {
        thread::spawn(move || {
            let mut text = String::new();
            let _ = stderr.read_to_string(&mut text);
            text
        })
    });
    let collect_stderr = move || {
        stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default()
    };

    // A killed child's own children may hold stderr open, so the reader is
    // only joined after a normal exit.
    let status = wait(&mut child, frame, timeout, cancel)?;
    let stderr = collect_stderr();

    if status.success() {
        Ok(())
    } else {
        Err(RenderError::NonZeroExit {
            frame,
            code: status.code(),
            stderr,
        })
    }
}

fn wait(
    child: &mut Child,
    frame: Option<usize>,
    timeout: Option<Duration>,
    cancel: &CancelToken,
) -> Result<ExitStatus> {
    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if cancel.is_cancelled() {
            kill(child, frame);
            return Err(RenderError::Cancelled { frame });
        }
        if let Some(limit) = timeout {
            if started.elapsed() >= limit {
                tracing::warn!(frame = ?frame, ?limit, "renderer timed out, killing it");
                kill(child, frame);
                return Err(RenderError::Timeout { frame, after: limit });
            }
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn kill(child: &mut Child, frame: Option<usize>) {
    if let Err(e) = child.kill() {
        tracing::debug!(frame = ?frame, error = %e, "kill failed, process already gone");
    }
    let _ = child.wait();
}

/// Whether `path` looks like a usable raw image
fn output_exists(path: &Path) -> bool {
    path.metadata().map(|m| m.is_file() && m.len() > 0).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut command = Command::new("sh");
        command.arg("-c").arg(script);
        command
    }

    #[test]
    fn test_cancel_token_child() {
        let parent = CancelToken::new();
        let child = parent.child();
        assert!(!child.is_cancelled());

        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());

        let other = parent.child();
        parent.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn test_mitsuba_command_line() {
        let exe = RendererExecutable::new(std::env::current_exe().unwrap()).unwrap();
        let renderer = MitsubaRenderer::new(exe).with_variant("llvm_rgb");
        let job = FrameJob {
            frame: Some(2),
            scene_path: PathBuf::from("frame_0002.xml"),
            output_path: PathBuf::from("frame_0002.exr"),
            timeout: None,
        };
        let command = renderer.command(&job);
        let args: Vec<_> = command.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, vec!["-m", "llvm_rgb", "frame_0002.xml", "-o", "frame_0002.exr"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_success() {
        run_process(sh("exit 0"), None, None, &CancelToken::new()).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_captures_stderr() {
        let result = run_process(sh("echo broken scene >&2; exit 3"), Some(4), None, &CancelToken::new());
        match result {
            Err(RenderError::NonZeroExit { frame, code, stderr }) => {
                assert_eq!(frame, Some(4));
                assert_eq!(code, Some(3));
                assert_eq!(stderr.trim(), "broken scene");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_process() {
        let started = Instant::now();
        let result = run_process(
            sh("exec sleep 10"),
            Some(1),
            Some(Duration::from_millis(100)),
            &CancelToken::new(),
        );
        assert!(matches!(result, Err(RenderError::Timeout { frame: Some(1), .. })));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[test]
    fn test_cancel_kills_process() {
        let token = CancelToken::new();
        let trigger = token.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            trigger.cancel();
        });
        let result = run_process(sh("exec sleep 10"), Some(0), None, &token);
        canceller.join().unwrap();
        assert!(matches!(result, Err(RenderError::Cancelled { frame: Some(0) })));
    }

    #[test]
    fn test_cancelled_before_start() {
        let token = CancelToken::new();
        token.cancel();
        let result = run_process(sh("exit 0"), None, None, &token);
        assert!(matches!(result, Err(RenderError::Cancelled { frame: None })));
    }

    #[test]
    fn test_spawn_failure() {
        let command = Command::new("/definitely/not/a/renderer");
        let result = run_process(command, Some(5), None, &CancelToken::new());
        assert!(matches!(result, Err(RenderError::Spawn { frame: Some(5), .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_output_detected() {
        let dir = tempfile::tempdir().unwrap();
        let Ok(exe) = RendererExecutable::new("/bin/true").or_else(|_| RendererExecutable::new("/usr/bin/true")) else {
            return;
        };
        let job = FrameJob {
            frame: Some(0),
            scene_path: dir.path().join("scene.xml"),
            output_path: dir.path().join("out.exr"),
            timeout: None,
        };
        let result = MitsubaRenderer::new(exe).render(&job, &CancelToken::new());
        assert!(matches!(result, Err(RenderError::MissingOutput { frame: Some(0), .. })));
    }
}
