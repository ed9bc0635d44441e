//! Plain text point clouds (`x y z [r g b]` per line)

use crate::PointCloudReader;
use pcrender_core::{Color, Error, Point3d, PointCloud, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

pub struct XyzReader;

impl PointCloudReader for XyzReader {
    fn read_point_cloud(&self, path: &Path) -> Result<PointCloud> {
        let reader = BufReader::new(File::open(path)?);
        parse_rows(reader)
    }

    fn format_name(&self) -> &'static str {
        "XYZ"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["xyz", "txt", "pts"]
    }
}

fn split_fields(line: &str) -> impl Iterator<Item = &str> {
    line.split(|c: char| c.is_whitespace() || c == ',' || c == ';')
        .filter(|s| !s.is_empty())
}

/// Parse numeric rows. A single non-numeric first row is treated as a header.
/// Rows with six or more columns carry colors, which are rescaled from 0..255
/// when any channel exceeds 1.
pub fn parse_rows<R: BufRead>(reader: R) -> Result<PointCloud> {
    let mut rows: Vec<Vec<f64>> = Vec::new();
    let mut width = None;
    let mut seen_content = false;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("//") {
            continue;
        }

        let parsed: std::result::Result<Vec<f64>, _> =
            split_fields(trimmed).map(str::parse::<f64>).collect();
        let values = match parsed {
            Ok(values) => values,
            Err(_) if !seen_content => {
                tracing::debug!(line = line_no + 1, "skipping header row");
                seen_content = true;
                continue;
            }
            Err(e) => {
                return Err(Error::InvalidData(format!(
                    "line {}: {}",
                    line_no + 1,
                    e
                )))
            }
        };
        seen_content = true;

        if values.len() < 3 {
            return Err(Error::InvalidData(format!(
                "line {}: expected at least 3 columns, found {}",
                line_no + 1,
                values.len()
            )));
        }
        match width {
            None => width = Some(values.len()),
            Some(w) if w != values.len() => {
                return Err(Error::InvalidData(format!(
                    "line {}: expected {} columns, found {}",
                    line_no + 1,
                    w,
                    values.len()
                )))
            }
            Some(_) => {}
        }
        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(Error::InvalidData(format!(
                "line {}: non-finite value {}",
                line_no + 1,
                bad
            )));
        }
        rows.push(values);
    }

    let points: Vec<Point3d> = rows
        .iter()
        .map(|row| Point3d::new(row[0], row[1], row[2]))
        .collect();

    if width.unwrap_or(0) < 6 {
        return Ok(PointCloud::from_points(points));
    }

    let eight_bit = rows.iter().any(|row| row[3..6].iter().any(|&c| c > 1.0));
    let scale = if eight_bit { 1.0 / 255.0 } else { 1.0 };
    let colors = rows
        .iter()
        .map(|row| Color::new(row[3] * scale, row[4] * scale, row[5] * scale).clamped())
        .collect();
    PointCloud::from_colored_points(points, colors)
}
