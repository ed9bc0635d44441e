//! Renderer executable resolution
//!
//! The search depends on the host environment, so it is captured once into a
//! [`SearchPathLocator`] and handed to the orchestrator as a
//! [`RendererLocator`].

use crate::error::{RenderError, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Environment variable naming the renderer executable directly
pub const EXECUTABLE_ENV: &str = "MITSUBA_EXECUTABLE";

#[cfg(windows)]
const EXECUTABLE_NAME: &str = "mitsuba.exe";
#[cfg(not(windows))]
const EXECUTABLE_NAME: &str = "mitsuba";

/// A renderer executable that existed when it was resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererExecutable {
    path: PathBuf,
}

impl RendererExecutable {
    /// Validate `path` as a runnable file
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if is_executable(&path) {
            Ok(Self { path })
        } else {
            Err(RenderError::RendererNotFound { searched: vec![path] })
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Resolves the renderer executable
pub trait RendererLocator: Send + Sync {
    fn locate(&self) -> Result<RendererExecutable>;
}

/// Searches, in order: an explicit path, `MITSUBA_EXECUTABLE`, the active
/// conda environment, `PATH`, then well-known install locations.
#[derive(Debug, Clone, Default)]
pub struct SearchPathLocator {
    explicit: Option<PathBuf>,
    env_override: Option<PathBuf>,
    conda_prefix: Option<PathBuf>,
    path_var: Option<OsString>,
    common_locations: Vec<PathBuf>,
}

impl SearchPathLocator {
    /// A locator that searches nothing until configured
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the current process environment
    pub fn from_env() -> Self {
        Self {
            explicit: None,
            env_override: std::env::var_os(EXECUTABLE_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            conda_prefix: std::env::var_os("CONDA_PREFIX")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            path_var: std::env::var_os("PATH"),
            common_locations: common_locations(),
        }
    }

    /// Use exactly this executable; nothing else is searched when set
    pub fn with_explicit(mut self, path: Option<PathBuf>) -> Self {
        self.explicit = path;
        self
    }

    pub fn with_env_override(mut self, path: Option<PathBuf>) -> Self {
        self.env_override = path;
        self
    }

    pub fn with_conda_prefix(mut self, prefix: Option<PathBuf>) -> Self {
        self.conda_prefix = prefix;
        self
    }

    pub fn with_path_var(mut self, path_var: Option<OsString>) -> Self {
        self.path_var = path_var;
        self
    }

    pub fn with_common_locations(mut self, locations: Vec<PathBuf>) -> Self {
        self.common_locations = locations;
        self
    }

    /// Every candidate path in search order
    pub fn candidates(&self) -> Vec<PathBuf> {
        if let Some(explicit) = &self.explicit {
            return vec![explicit.clone()];
        }

        let mut candidates = Vec::new();
        candidates.extend(self.env_override.clone());
        if let Some(prefix) = &self.conda_prefix {
            candidates.push(prefix.join("bin").join(EXECUTABLE_NAME));
            candidates.push(prefix.join("Scripts").join(EXECUTABLE_NAME));
            candidates.push(prefix.join(EXECUTABLE_NAME));
        }
        if let Some(path_var) = &self.path_var {
            candidates.extend(std::env::split_paths(path_var).map(|dir| dir.join(EXECUTABLE_NAME)));
        }
        candidates.extend(self.common_locations.iter().cloned());

        let mut seen = std::collections::HashSet::new();
        candidates.retain(|p| seen.insert(p.clone()));
        candidates
    }
}

impl RendererLocator for SearchPathLocator {
    fn locate(&self) -> Result<RendererExecutable> {
        let candidates = self.candidates();
        for candidate in &candidates {
            if is_executable(candidate) {
                tracing::info!(path = %candidate.display(), "using renderer");
                return Ok(RendererExecutable { path: candidate.clone() });
            }
            tracing::debug!(path = %candidate.display(), "renderer not found here");
        }
        Err(RenderError::RendererNotFound { searched: candidates })
    }
}

impl RendererLocator for RendererExecutable {
    fn locate(&self) -> Result<RendererExecutable> {
        Ok(self.clone())
    }
}

fn common_locations() -> Vec<PathBuf> {
    let mut locations = Vec::new();
    if cfg!(windows) {
        locations.push(PathBuf::from(r"C:\Program Files\Mitsuba\mitsuba.exe"));
        locations.push(PathBuf::from(r"C:\Program Files (x86)\Mitsuba\mitsuba.exe"));
    } else {
        locations.push(PathBuf::from("/usr/local/bin/mitsuba"));
        locations.push(PathBuf::from("/usr/bin/mitsuba"));
    }
    if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
        locations.push(PathBuf::from(home).join("mitsuba").join("dist").join(EXECUTABLE_NAME));
    }
    locations
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
