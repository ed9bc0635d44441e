//! Raw (linear HDR) image development into display images

use crate::error::{RenderError, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, ImageFormat, RgbImage};
use pcrender_core::linear_to_srgb;
use rayon::prelude::*;
use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// JPEG quality used for developed images
pub const JPEG_QUALITY: u8 = 95;

/// File format of a finished image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
    /// Keep the renderer's raw EXR
    Exr,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Exr => "exr",
        }
    }

    /// Format implied by the extension of `path`, if it names one
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()?.to_str()?.parse().ok()
    }

    /// `path` with a matching extension, appended when it has none of ours
    pub fn resolve_path(self, path: &Path) -> PathBuf {
        match Self::from_path(path) {
            Some(format) if format == self => path.to_path_buf(),
            _ => {
                let mut name = path.as_os_str().to_owned();
                name.push(".");
                name.push(self.extension());
                PathBuf::from(name)
            }
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpg" | "jpeg" => Ok(OutputFormat::Jpeg),
            "exr" => Ok(OutputFormat::Exr),
            other => Err(format!("unknown output format '{}' (expected png, jpg or exr)", other)),
        }
    }
}

fn encode_channel(value: f32) -> u8 {
    let value = if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.0 };
    (linear_to_srgb(value as f64) * 255.0).round() as u8
}

/// Decode a raw image and sRGB-encode it to 8 bits, optionally mirrored left to right
pub fn tonemap(raw: &Path, flip_horizontal: bool) -> std::result::Result<RgbImage, image::ImageError> {
    let hdr = image::io::Reader::open(raw)?
        .with_guessed_format()?
        .decode()?
        .into_rgb32f();
    let (width, height) = hdr.dimensions();
    let mut out = RgbImage::new(width, height);

    let row_len = width as usize * 3;
    if row_len > 0 {
        let src = hdr.as_raw();
        out.par_chunks_mut(row_len)
            .zip(src.par_chunks(row_len))
            .for_each(|(dst_row, src_row)| {
                for x in 0..width as usize {
                    let sx = if flip_horizontal { width as usize - 1 - x } else { x };
                    for c in 0..3 {
                        dst_row[x * 3 + c] = encode_channel(src_row[sx * 3 + c]);
                    }
                }
            });
    }
    Ok(out)
}

/// Turn the renderer's raw image into the requested output file
pub fn develop(
    raw: &Path,
    output: &Path,
    format: OutputFormat,
    flip_horizontal: bool,
    frame: Option<usize>,
) -> Result<()> {
    let fail = |message: String| RenderError::Develop { frame, message };

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    match format {
        OutputFormat::Exr => {
            if raw != output {
                std::fs::copy(raw, output)?;
            }
        }
        OutputFormat::Png => {
            let image = tonemap(raw, flip_horizontal).map_err(|e| fail(e.to_string()))?;
            image
                .save_with_format(output, ImageFormat::Png)
                .map_err(|e| fail(e.to_string()))?;
        }
        OutputFormat::Jpeg => {
            let image = tonemap(raw, flip_horizontal).map_err(|e| fail(e.to_string()))?;
            let writer = BufWriter::new(File::create(output)?);
            let mut encoder = JpegEncoder::new_with_quality(writer, JPEG_QUALITY);
            encoder
                .encode(image.as_raw(), image.width(), image.height(), ColorType::Rgb8)
                .map_err(|e| fail(e.to_string()))?;
        }
    }
    tracing::debug!(frame = ?frame, output = %output.display(), "developed image");
    Ok(())
}
