//! Point types and related functionality

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A 3D point with double precision coordinates
pub type Point3d = Point3<f64>;

/// A 3D vector with double precision components
pub type Vector3d = Vector3<f64>;

/// One of the three canonical world axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Component index of this axis (0, 1 or 2)
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Unit vector pointing along the positive axis
    pub fn unit(self) -> Vector3d {
        match self {
            Axis::X => Vector3d::x(),
            Axis::Y => Vector3d::y(),
            Axis::Z => Vector3d::z(),
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        f.write_str(name)
    }
}

impl FromStr for Axis {
    type Err = Error;

    /// Accepts axis letters as well as the component indices `0`, `1`, `2`.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" | "0" => Ok(Axis::X),
            "y" | "1" => Ok(Axis::Y),
            "z" | "2" => Ok(Axis::Z),
            other => Err(Error::InvalidData(format!("unknown axis '{}'", other))),
        }
    }
}

/// Parse a `x,y,z` triple of comma separated floats.
pub fn parse_triple(text: &str) -> Result<[f64; 3]> {
    let parts: Vec<&str> = text.split(',').collect();
    if parts.len() != 3 {
        return Err(Error::CameraParse(format!(
            "expected 3 comma separated components in '{}', found {}",
            text,
            parts.len()
        )));
    }

    let mut values = [0.0; 3];
    for (slot, part) in values.iter_mut().zip(&parts) {
        *slot = part.trim().parse::<f64>().map_err(|e| {
            Error::CameraParse(format!("'{}' is not a number: {}", part.trim(), e))
        })?;
        if !slot.is_finite() {
            return Err(Error::CameraParse(format!("'{}' is not finite", part.trim())));
        }
    }
    Ok(values)
}

/// Format three components as `x,y,z` using the shortest round-trip representation.
pub fn format_triple(x: f64, y: f64, z: f64) -> String {
    format!("{},{},{}", x, y, z)
}

/// Fails with [`Error::InvalidData`] naming the first point with a NaN or
/// infinite coordinate.
pub fn ensure_finite(points: &[Point3d]) -> Result<()> {
    match points.iter().position(|p| !p.coords.iter().all(|c| c.is_finite())) {
        Some(index) => {
            let p = &points[index];
            Err(Error::InvalidData(format!(
                "point {} has a non-finite coordinate ({})",
                index,
                format_triple(p.x, p.y, p.z)
            )))
        }
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_parsing() {
        assert_eq!("x".parse::<Axis>().unwrap(), Axis::X);
        assert_eq!("Y".parse::<Axis>().unwrap(), Axis::Y);
        assert_eq!("2".parse::<Axis>().unwrap(), Axis::Z);
        assert!("w".parse::<Axis>().is_err());
    }

    #[test]
    fn test_axis_unit_vectors() {
        for axis in Axis::ALL {
            let unit = axis.unit();
            assert_eq!(unit.norm(), 1.0);
            assert_eq!(unit[axis.index()], 1.0);
        }
    }

    #[test]
    fn test_parse_triple() {
        assert_eq!(parse_triple("1,-2.5,3e-1").unwrap(), [1.0, -2.5, 0.3]);
        assert_eq!(parse_triple(" 0 , 1 , 2 ").unwrap(), [0.0, 1.0, 2.0]);
        assert!(parse_triple("1,2").is_err());
        assert!(parse_triple("1,2,3,4").is_err());
        assert!(parse_triple("a,b,c").is_err());
        assert!(parse_triple("1,inf,2").is_err());
    }

    #[test]
    fn test_ensure_finite() {
        let mut points = vec![Point3d::new(0.0, 1.0, 2.0), Point3d::new(-1.0, 0.5, 1e300)];
        assert!(ensure_finite(&points).is_ok());

        points.push(Point3d::new(0.0, f64::INFINITY, 0.0));
        points.push(Point3d::new(f64::NAN, 0.0, 0.0));
        match ensure_finite(&points) {
            Err(Error::InvalidData(message)) => assert!(message.starts_with("point 2 ")),
            other => panic!("expected InvalidData, got {:?}", other),
        }
    }

    #[test]
    fn test_format_triple_round_trips() {
        let values = [0.1, -1.0 / 3.0, 12345.678];
        let text = format_triple(values[0], values[1], values[2]);
        assert_eq!(parse_triple(&text).unwrap(), values);
    }
}
