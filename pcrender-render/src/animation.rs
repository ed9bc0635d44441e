//! Looping GIF assembly from rendered frames

use crate::error::{RenderError, Result};
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default display time of one animation frame
pub const DEFAULT_FRAME_DURATION: Duration = Duration::from_millis(100);

/// A finished frame image and its position in the sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameImage {
    pub index: usize,
    pub path: PathBuf,
}

/// Sort `frames` by index and check that they form the full sequence `0..expected`
pub fn order_frames(mut frames: Vec<FrameImage>, expected: usize) -> Result<Vec<FrameImage>> {
    frames.sort_by_key(|f| f.index);
    frames.dedup_by_key(|f| f.index);
    let complete = frames.len() == expected && frames.iter().enumerate().all(|(i, f)| f.index == i);
    if !complete {
        return Err(RenderError::FrameCountMismatch {
            expected,
            actual: frames.len(),
        });
    }
    Ok(frames)
}

/// Encode `frames` into a looping GIF at `output`.
///
/// Frames are written in index order whatever order they arrive in. Every
/// frame must have the size of frame 0.
#[tracing::instrument(skip(frames), fields(frames = frames.len(), output = %output.display()))]
pub fn assemble_gif(
    frames: Vec<FrameImage>,
    expected: usize,
    output: &Path,
    frame_duration: Duration,
) -> Result<()> {
    if expected == 0 {
        return Err(RenderError::FrameCountMismatch { expected, actual: frames.len() });
    }
    let frames = order_frames(frames, expected)?;

    let millis = u32::try_from(frame_duration.as_millis()).unwrap_or(u32::MAX).max(1);
    let delay = Delay::from_numer_denom_ms(millis, 1);

    let mut size = None;
    let mut encoded = Vec::with_capacity(frames.len());
    for frame in &frames {
        let image = image::open(&frame.path)
            .map_err(|e| RenderError::Encode(format!("frame {}: {}", frame.index, e)))?
            .into_rgba8();
        let dimensions = image.dimensions();
        match size {
            None => size = Some(dimensions),
            Some(expected) if expected != dimensions => {
                return Err(RenderError::FrameSizeMismatch {
                    frame: frame.index,
                    expected,
                    actual: dimensions,
                })
            }
            Some(_) => {}
        }
        encoded.push(Frame::from_parts(image, 0, 0, delay));
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let writer = BufWriter::new(File::create(output)?);
    let mut encoder = GifEncoder::new(writer);
    encoder
        .set_repeat(Repeat::Infinite)
        .map_err(|e| RenderError::Encode(e.to_string()))?;
    encoder
        .encode_frames(encoded)
        .map_err(|e| RenderError::Encode(e.to_string()))?;

    tracing::info!(frames = frames.len(), "wrote animation");
    Ok(())
}
