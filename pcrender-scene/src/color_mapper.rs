//! Per-point color resolution

use crate::palette::Palette;
use pcrender_core::{Axis, Bounded, Color, Error, Point3d, Result};
use serde::{Deserialize, Serialize};

/// How each point gets its color
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum ColorPolicy {
    /// The colors stored with the cloud
    #[default]
    Original,
    /// Every coordinate normalized per axis and mapped through the palette
    Position { palette: Palette },
    /// One axis normalized and mapped through the palette
    Height { axis: Axis, palette: Palette },
    /// The same color for every point
    Fixed { color: Color },
}

impl ColorPolicy {
    /// Whether the resolved colors are sRGB encoded and need linearising
    /// before they reach the renderer. Palette output is passed through as is.
    pub fn is_srgb(&self) -> bool {
        matches!(self, ColorPolicy::Original | ColorPolicy::Fixed { .. })
    }
}

/// Maps a value in `[min, max]` to `[0, 1]`; a zero range maps to the middle.
#[derive(Debug, Clone, Copy)]
struct Normalizer {
    min: f64,
    range: f64,
}

impl Normalizer {
    fn new((min, max): (f64, f64)) -> Self {
        Self { min, range: max - min }
    }

    fn apply(&self, value: f64) -> f64 {
        if self.range > 0.0 {
            ((value - self.min) / self.range).clamp(0.0, 1.0)
        } else {
            0.5
        }
    }
}

/// Resolve one color per point.
///
/// Length preserving and pure. `Original` fails with [`Error::MissingColorData`]
/// when no colors are stored, and with [`Error::ColorCountMismatch`] when the
/// stored colors do not line up with the points.
pub fn resolve(
    points: &[Point3d],
    stored_colors: Option<&[Color]>,
    policy: &ColorPolicy,
) -> Result<Vec<Color>> {
    match policy {
        ColorPolicy::Original => {
            let colors = stored_colors.ok_or(Error::MissingColorData)?;
            if colors.len() != points.len() {
                return Err(Error::ColorCountMismatch {
                    points: points.len(),
                    colors: colors.len(),
                });
            }
            Ok(colors.to_vec())
        }
        ColorPolicy::Fixed { color } => Ok(vec![*color; points.len()]),
        ColorPolicy::Position { palette } => {
            let Some(bbox) = points.bounding_box() else {
                return Ok(Vec::new());
            };
            let norm = Axis::ALL.map(|axis| Normalizer::new(bbox.axis_range(axis)));
            Ok(points
                .iter()
                .map(|p| {
                    Color::new(
                        palette.sample(norm[0].apply(p.x)).r,
                        palette.sample(norm[1].apply(p.y)).g,
                        palette.sample(norm[2].apply(p.z)).b,
                    )
                })
                .collect())
        }
        ColorPolicy::Height { axis, palette } => {
            let Some(bbox) = points.bounding_box() else {
                return Ok(Vec::new());
            };
            let norm = Normalizer::new(bbox.axis_range(*axis));
            Ok(points
                .iter()
                .map(|p| palette.sample(norm.apply(p[axis.index()])))
                .collect())
        }
    }
}

/// Like [`resolve`], but converts sRGB encoded colors to linear space so the
/// result can go straight into a renderer scene.
pub fn resolve_linear(
    points: &[Point3d],
    stored_colors: Option<&[Color]>,
    policy: &ColorPolicy,
) -> Result<Vec<Color>> {
    let colors = resolve(points, stored_colors, policy)?;
    if policy.is_srgb() {
        Ok(colors.into_iter().map(Color::to_linear).collect())
    } else {
        Ok(colors)
    }
}
