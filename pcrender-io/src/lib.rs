//! Point cloud readers for pcrender
//!
//! This crate loads point clouds from common file formats into the in-memory
//! [`PointCloud`] used by the rest of the pipeline. Formats are picked by file
//! extension:
//! - `.ply` (ASCII or binary, optional `red`/`green`/`blue` vertex colors)
//! - `.xyz`, `.txt`, `.pts` (whitespace or comma separated text, optional RGB)

pub mod ply;
pub mod xyz;

pub use ply::PlyReader;
pub use xyz::XyzReader;

use pcrender_core::{Error, PointCloud, Result};
use std::path::{Path, PathBuf};

/// Trait for reading point clouds from files
pub trait PointCloudReader: Send + Sync {
    /// Read a point cloud from the given path
    fn read_point_cloud(&self, path: &Path) -> Result<PointCloud>;

    /// Get the format name this reader handles
    fn format_name(&self) -> &'static str;

    /// Lower-case file extensions this reader handles, without the dot
    fn extensions(&self) -> &'static [&'static str];
}

static READERS: [&dyn PointCloudReader; 2] = [&PlyReader, &XyzReader];

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
}

/// The reader responsible for `path`, chosen by extension
pub fn reader_for(path: &Path) -> Option<&'static dyn PointCloudReader> {
    let ext = extension_of(path)?;
    READERS
        .iter()
        .copied()
        .find(|reader| reader.extensions().contains(&ext.as_str()))
}

/// Whether some reader handles `path`
pub fn is_supported(path: &Path) -> bool {
    reader_for(path).is_some()
}

/// Auto-detect format and read point cloud
pub fn read_point_cloud<P: AsRef<Path>>(path: P) -> Result<PointCloud> {
    let path = path.as_ref();
    let reader = reader_for(path).ok_or_else(|| {
        Error::UnsupportedFormat(format!(
            "Unsupported point cloud format: {:?} (expected .ply, .xyz, .txt or .pts)",
            path.extension().unwrap_or_default()
        ))
    })?;

    let cloud = reader.read_point_cloud(path)?;
    tracing::info!(
        path = %path.display(),
        format = reader.format_name(),
        points = cloud.len(),
        colors = cloud.has_colors(),
        "loaded point cloud"
    );
    Ok(cloud)
}

/// Supported point cloud files directly inside `dir`, sorted by path
pub fn list_point_clouds<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir.as_ref())? {
        let path = entry?.path();
        if path.is_file() && is_supported(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
