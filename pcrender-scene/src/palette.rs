//! Named color ramps.
//!
//! Viridis and jet interpolate between key colors of the reference ramps,
//! turbo interpolates its full 256-entry table and rainbow is closed-form.
//! Every palette clamps its input to [0, 1].

mod turbo;

use pcrender_core::{Color, Error, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;
use turbo::TURBO_TABLE;

/// A deterministic mapping from a normalized scalar to a color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Palette {
    #[default]
    Viridis,
    Jet,
    Rainbow,
    Turbo,
}

// Viridis: dark purple -> blue -> teal -> green -> yellow
const VIRIDIS_KEYS: &[(f64, [f64; 3])] = &[
    (0.000, [0.267004, 0.004874, 0.329415]),
    (0.125, [0.282623, 0.140926, 0.457517]),
    (0.250, [0.229739, 0.322361, 0.545706]),
    (0.375, [0.172719, 0.448791, 0.557885]),
    (0.500, [0.127568, 0.566949, 0.550556]),
    (0.625, [0.134692, 0.658636, 0.517649]),
    (0.750, [0.369214, 0.788888, 0.382914]),
    (0.875, [0.678489, 0.863742, 0.189503]),
    (1.000, [0.993248, 0.906157, 0.143936]),
];

// Jet, one piecewise linear segment list per channel
const JET_RED: &[(f64, f64)] = &[(0.0, 0.0), (0.35, 0.0), (0.66, 1.0), (0.89, 1.0), (1.0, 0.5)];
const JET_GREEN: &[(f64, f64)] = &[
    (0.0, 0.0),
    (0.125, 0.0),
    (0.375, 1.0),
    (0.64, 1.0),
    (0.91, 0.0),
    (1.0, 0.0),
];
const JET_BLUE: &[(f64, f64)] = &[(0.0, 0.5), (0.11, 1.0), (0.34, 1.0), (0.65, 0.0), (1.0, 0.0)];

impl Palette {
    pub const ALL: [Palette; 4] = [Palette::Viridis, Palette::Jet, Palette::Rainbow, Palette::Turbo];

    pub fn name(self) -> &'static str {
        match self {
            Palette::Viridis => "viridis",
            Palette::Jet => "jet",
            Palette::Rainbow => "rainbow",
            Palette::Turbo => "turbo",
        }
    }

    /// Color at `t`, clamped into [0, 1]. NaN maps to the start of the ramp.
    pub fn sample(self, t: f64) -> Color {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let color = match self {
            Palette::Viridis => interpolate_keys(VIRIDIS_KEYS, t),
            Palette::Jet => Color::new(
                interpolate_segments(JET_RED, t),
                interpolate_segments(JET_GREEN, t),
                interpolate_segments(JET_BLUE, t),
            ),
            Palette::Rainbow => Color::new(
                (2.0 * t - 0.5).abs(),
                (PI * t).sin(),
                (PI * t / 2.0).cos(),
            ),
            Palette::Turbo => interpolate_table(&TURBO_TABLE, t),
        };
        color.clamped()
    }
}

impl fmt::Display for Palette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Palette {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Palette::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                Error::InvalidData(format!(
                    "unknown palette '{}', expected one of viridis, jet, rainbow, turbo",
                    s
                ))
            })
    }
}

/// Linear interpolation between RGB key colors
fn interpolate_keys(keys: &[(f64, [f64; 3])], t: f64) -> Color {
    let upper = keys.iter().position(|&(k, _)| k >= t).unwrap_or(keys.len() - 1);
    if upper == 0 {
        return Color::from_array(keys[0].1);
    }

    let (t0, c0) = keys[upper - 1];
    let (t1, c1) = keys[upper];
    let w = (t - t0) / (t1 - t0);
    Color::new(
        c0[0] + w * (c1[0] - c0[0]),
        c0[1] + w * (c1[1] - c0[1]),
        c0[2] + w * (c1[2] - c0[2]),
    )
}

/// Linear interpolation of a single channel through `(t, value)` anchors
fn interpolate_segments(segments: &[(f64, f64)], t: f64) -> f64 {
    let upper = segments.iter().position(|&(k, _)| k >= t).unwrap_or(segments.len() - 1);
    if upper == 0 {
        return segments[0].1;
    }

    let (t0, v0) = segments[upper - 1];
    let (t1, v1) = segments[upper];
    v0 + (t - t0) / (t1 - t0) * (v1 - v0)
}

/// Linear interpolation in an evenly spaced color table
fn interpolate_table(table: &[[f64; 3]], t: f64) -> Color {
    let last = table.len() - 1;
    let position = t * last as f64;
    let lower = (position.floor() as usize).min(last - 1);
    let w = position - lower as f64;
    let (c0, c1) = (table[lower], table[lower + 1]);
    Color::new(
        c0[0] + w * (c1[0] - c0[0]),
        c0[1] + w * (c1[1] - c0[1]),
        c0[2] + w * (c1[2] - c0[2]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_color(actual: Color, expected: [f64; 3]) {
        assert_relative_eq!(actual.r, expected[0], epsilon = 1e-3);
        assert_relative_eq!(actual.g, expected[1], epsilon = 1e-3);
        assert_relative_eq!(actual.b, expected[2], epsilon = 1e-3);
    }

    #[test]
    fn test_viridis_reference_values() {
        assert_color(Palette::Viridis.sample(0.0), [0.267004, 0.004874, 0.329415]);
        assert_color(Palette::Viridis.sample(0.25), [0.229739, 0.322361, 0.545706]);
        assert_color(Palette::Viridis.sample(0.5), [0.127568, 0.566949, 0.550556]);
        assert_color(Palette::Viridis.sample(0.75), [0.369214, 0.788888, 0.382914]);
        assert_color(Palette::Viridis.sample(1.0), [0.993248, 0.906157, 0.143936]);
    }

    #[test]
    fn test_jet_reference_values() {
        assert_color(Palette::Jet.sample(0.0), [0.0, 0.0, 0.5]);
        assert_color(Palette::Jet.sample(0.5), [0.4838710, 1.0, 0.4838710]);
        assert_color(Palette::Jet.sample(1.0), [0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_rainbow_reference_values() {
        assert_color(Palette::Rainbow.sample(0.0), [0.5, 0.0, 1.0]);
        assert_color(Palette::Rainbow.sample(0.5), [0.5, 1.0, 0.7071068]);
        assert_color(Palette::Rainbow.sample(1.0), [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_turbo_reference_values() {
        assert_color(Palette::Turbo.sample(0.0), [0.18995, 0.07176, 0.23217]);
        assert_color(Palette::Turbo.sample(0.25), [0.16015, 0.73318, 0.92519]);
        assert_color(Palette::Turbo.sample(0.5), [0.63843, 0.99097, 0.23647]);
        assert_color(Palette::Turbo.sample(0.75), [0.98533, 0.50182, 0.13238]);
        assert_color(Palette::Turbo.sample(1.0), [0.47960, 0.01583, 0.01055]);
    }

    #[test]
    fn test_turbo_hits_table_rows() {
        for (i, row) in TURBO_TABLE.iter().enumerate() {
            assert_color(Palette::Turbo.sample(i as f64 / 255.0), *row);
        }
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        for palette in Palette::ALL {
            assert_eq!(palette.sample(-3.0), palette.sample(0.0));
            assert_eq!(palette.sample(7.0), palette.sample(1.0));
            assert_eq!(palette.sample(f64::NAN), palette.sample(0.0));
            for i in 0..=100 {
                assert!(palette.sample(i as f64 / 100.0).is_normalized());
            }
        }
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("viridis".parse::<Palette>().unwrap(), Palette::Viridis);
        assert_eq!("TURBO".parse::<Palette>().unwrap(), Palette::Turbo);
        assert!("magma".parse::<Palette>().is_err());
    }
}
