//! PLY format support

use crate::PointCloudReader;
use pcrender_core::{ensure_finite, Color, Error, Point3d, PointCloud, Result};
use ply_rs::{
    parser::Parser,
    ply::{DefaultElement, Property},
};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub struct PlyReader;

impl PointCloudReader for PlyReader {
    fn read_point_cloud(&self, path: &Path) -> Result<PointCloud> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let parser = Parser::<DefaultElement>::new();
        let ply = parser.read_ply(&mut reader)?;

        let vertices = ply
            .payload
            .get("vertex")
            .ok_or_else(|| Error::InvalidData("PLY file has no vertex element".to_string()))?;

        let mut points = Vec::with_capacity(vertices.len());
        for vertex in vertices {
            let x = extract_property_value(vertex, "x")?;
            let y = extract_property_value(vertex, "y")?;
            let z = extract_property_value(vertex, "z")?;
            points.push(Point3d::new(x, y, z));
        }
        ensure_finite(&points)?;

        let has_colors = vertices
            .first()
            .map(|v| ["red", "green", "blue"].iter().all(|c| v.contains_key(*c)))
            .unwrap_or(false);
        if !has_colors {
            return Ok(PointCloud::from_points(points));
        }

        let colors = vertices
            .iter()
            .map(|v| {
                Ok(Color::new(
                    extract_color_channel(v, "red")?,
                    extract_color_channel(v, "green")?,
                    extract_color_channel(v, "blue")?,
                ))
            })
            .collect::<Result<Vec<_>>>()?;
        PointCloud::from_colored_points(points, colors)
    }

    fn format_name(&self) -> &'static str {
        "PLY"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["ply"]
    }
}

/// Extract a property value as f64 from a PLY element
fn extract_property_value(element: &DefaultElement, name: &str) -> Result<f64> {
    match element.get(name) {
        Some(Property::Float(val)) => Ok(*val as f64),
        Some(Property::Double(val)) => Ok(*val),
        Some(Property::Int(val)) => Ok(*val as f64),
        Some(Property::UInt(val)) => Ok(*val as f64),
        Some(Property::Short(val)) => Ok(*val as f64),
        Some(Property::UShort(val)) => Ok(*val as f64),
        _ => Err(Error::InvalidData(format!(
            "Property '{}' not found or invalid type",
            name
        ))),
    }
}

/// Integer channels are scaled from their full range, float channels are
/// taken as already normalized.
fn extract_color_channel(element: &DefaultElement, name: &str) -> Result<f64> {
    let value = match element.get(name) {
        Some(Property::UChar(val)) => *val as f64 / 255.0,
        Some(Property::UShort(val)) => *val as f64 / 65535.0,
        Some(Property::Float(val)) => *val as f64,
        Some(Property::Double(val)) => *val,
        _ => {
            return Err(Error::InvalidData(format!(
                "Color property '{}' not found or invalid type",
                name
            )))
        }
    };
    if value.is_nan() {
        return Err(Error::InvalidData(format!("Color property '{}' is NaN", name)));
    }
    Ok(value.clamp(0.0, 1.0))
}
