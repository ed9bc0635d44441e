//! RGB colors and color space conversion

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::point::{format_triple, parse_triple};

/// An RGB color with float channels nominally in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0);

    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// A neutral gray with all three channels equal to `value`
    pub const fn gray(value: f64) -> Self {
        Self::new(value, value, value)
    }

    pub fn from_array(rgb: [f64; 3]) -> Self {
        Self::new(rgb[0], rgb[1], rgb[2])
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.r, self.g, self.b]
    }

    /// Clamp every channel into [0, 1]
    pub fn clamped(self) -> Self {
        Self::new(
            self.r.clamp(0.0, 1.0),
            self.g.clamp(0.0, 1.0),
            self.b.clamp(0.0, 1.0),
        )
    }

    pub fn is_normalized(&self) -> bool {
        self.to_array().iter().all(|c| (0.0..=1.0).contains(c))
    }

    /// Interpret this color as sRGB encoded and return its linear counterpart
    pub fn to_linear(self) -> Self {
        Self::new(srgb_to_linear(self.r), srgb_to_linear(self.g), srgb_to_linear(self.b))
    }

    /// Interpret this color as linear and return its sRGB encoding
    pub fn to_srgb(self) -> Self {
        Self::new(linear_to_srgb(self.r), linear_to_srgb(self.g), linear_to_srgb(self.b))
    }

    /// Build a color from 8-bit channels
    pub fn from_u8(rgb: [u8; 3]) -> Self {
        Self::new(
            rgb[0] as f64 / 255.0,
            rgb[1] as f64 / 255.0,
            rgb[2] as f64 / 255.0,
        )
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::gray(0.7)
    }
}

/// Formats as `r,g,b`, the renderer's rgb attribute syntax.
impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_triple(self.r, self.g, self.b))
    }
}

impl FromStr for Color {
    type Err = Error;

    /// Parse `r,g,b` with every channel in [0, 1]
    fn from_str(s: &str) -> Result<Self> {
        let color = parse_triple(s)
            .map(Color::from_array)
            .map_err(|_| Error::InvalidData(format!("'{}' is not an r,g,b color", s)))?;
        if !color.is_normalized() {
            return Err(Error::InvalidData(format!(
                "color '{}' has a channel outside [0, 1]",
                s
            )));
        }
        Ok(color)
    }
}

/// sRGB electro-optical transfer function
pub fn srgb_to_linear(value: f64) -> f64 {
    if value <= 0.04045 {
        value / 12.92
    } else {
        ((value + 0.055) / 1.055).powf(2.4)
    }
}

/// Inverse of [`srgb_to_linear`]
pub fn linear_to_srgb(value: f64) -> f64 {
    if value <= 0.0031308 {
        value * 12.92
    } else {
        1.055 * value.powf(1.0 / 2.4) - 0.055
    }
}
