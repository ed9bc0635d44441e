//! Point cloud data structures and functionality

use crate::color::Color;
use crate::error::{Error, Result};
use crate::point::Point3d;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::ops::Index;

/// An ordered set of points with an optional parallel set of colors.
///
/// When colors are present there is exactly one per point. The fields are
/// private so that invariant holds for every value of this type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointCloud {
    points: Vec<Point3d>,
    colors: Option<Vec<Color>>,
}

impl PointCloud {
    /// Create a new empty point cloud
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a point cloud without stored colors
    pub fn from_points(points: Vec<Point3d>) -> Self {
        Self { points, colors: None }
    }

    /// Create a point cloud with one stored color per point
    pub fn from_colored_points(points: Vec<Point3d>, colors: Vec<Color>) -> Result<Self> {
        Self::from_points(points).with_colors(colors)
    }

    /// Attach stored colors, replacing any existing ones
    pub fn with_colors(mut self, colors: Vec<Color>) -> Result<Self> {
        if colors.len() != self.points.len() {
            return Err(Error::ColorCountMismatch {
                points: self.points.len(),
                colors: colors.len(),
            });
        }
        self.colors = Some(colors);
        Ok(self)
    }

    /// Drop stored colors
    pub fn without_colors(mut self) -> Self {
        self.colors = None;
        self
    }

    /// Get the number of points in the cloud
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the point cloud is empty
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Point3d] {
        &self.points
    }

    pub fn colors(&self) -> Option<&[Color]> {
        self.colors.as_deref()
    }

    pub fn has_colors(&self) -> bool {
        self.colors.is_some()
    }

    /// Get an iterator over the points
    pub fn iter(&self) -> std::slice::Iter<'_, Point3d> {
        self.points.iter()
    }

    pub fn into_parts(self) -> (Vec<Point3d>, Option<Vec<Color>>) {
        (self.points, self.colors)
    }

    /// Arithmetic mean of all points, `None` for an empty cloud
    pub fn centroid(&self) -> Option<Point3d> {
        if self.points.is_empty() {
            return None;
        }
        let sum = self
            .points
            .iter()
            .fold(nalgebra::Vector3::zeros(), |acc, p| acc + p.coords);
        Some(Point3d::from(sum / self.points.len() as f64))
    }

    /// Apply `f` to every point, keeping stored colors untouched
    pub fn map_points<F>(&self, f: F) -> Self
    where
        F: Fn(&Point3d) -> Point3d,
    {
        Self {
            points: self.points.iter().map(f).collect(),
            colors: self.colors.clone(),
        }
    }

    /// Uniform random subset of at most `max_points` points, without replacement.
    ///
    /// The subset is a pure function of `(self, max_points, seed)` and keeps the
    /// original point order. Colors follow their points.
    pub fn downsample(&self, max_points: usize, seed: u64) -> Self {
        if self.points.len() <= max_points {
            return self.clone();
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut indices = rand::seq::index::sample(&mut rng, self.points.len(), max_points).into_vec();
        indices.sort_unstable();

        tracing::info!(
            from = self.points.len(),
            to = max_points,
            seed,
            "down-sampling point cloud"
        );

        Self {
            points: indices.iter().map(|&i| self.points[i]).collect(),
            colors: self
                .colors
                .as_ref()
                .map(|colors| indices.iter().map(|&i| colors[i]).collect()),
        }
    }
}

impl From<Vec<Point3d>> for PointCloud {
    fn from(points: Vec<Point3d>) -> Self {
        Self::from_points(points)
    }
}

impl FromIterator<Point3d> for PointCloud {
    fn from_iter<I: IntoIterator<Item = Point3d>>(iter: I) -> Self {
        Self::from_points(iter.into_iter().collect())
    }
}

impl Index<usize> for PointCloud {
    type Output = Point3d;

    fn index(&self, index: usize) -> &Self::Output {
        &self.points[index]
    }
}

impl<'a> IntoIterator for &'a PointCloud {
    type Item = &'a Point3d;
    type IntoIter = std::slice::Iter<'a, Point3d>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn line(n: usize) -> PointCloud {
        (0..n).map(|i| Point3d::new(i as f64, 0.0, 0.0)).collect()
    }

    #[test]
    fn test_color_count_must_match() {
        let points = vec![Point3d::origin(), Point3d::new(1.0, 1.0, 1.0)];
        let result = PointCloud::from_colored_points(points.clone(), vec![Color::WHITE]);
        assert!(matches!(
            result,
            Err(Error::ColorCountMismatch { points: 2, colors: 1 })
        ));

        let cloud = PointCloud::from_colored_points(points, vec![Color::WHITE, Color::BLACK]).unwrap();
        assert!(cloud.has_colors());
        assert_eq!(cloud.colors().unwrap().len(), 2);
    }

    #[test]
    fn test_centroid() {
        let cloud = line(5);
        let c = cloud.centroid().unwrap();
        assert_relative_eq!(c.x, 2.0, epsilon = 1e-12);
        assert!(PointCloud::new().centroid().is_none());
    }

    #[test]
    fn test_downsample_is_deterministic() {
        let cloud = line(1000);
        let a = cloud.downsample(100, 7);
        let b = cloud.downsample(100, 7);
        let c = cloud.downsample(100, 8);

        assert_eq!(a.len(), 100);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_downsample_without_replacement_keeps_colors_aligned() {
        let points: Vec<Point3d> = (0..200).map(|i| Point3d::new(i as f64, 0.0, 0.0)).collect();
        let colors: Vec<Color> = (0..200).map(|i| Color::gray(i as f64 / 200.0)).collect();
        let cloud = PointCloud::from_colored_points(points, colors).unwrap();

        let sampled = cloud.downsample(50, 42);
        let xs: Vec<f64> = sampled.iter().map(|p| p.x).collect();
        for pair in xs.windows(2) {
            assert!(pair[0] < pair[1], "indices must be unique and ordered");
        }
        for (p, c) in sampled.iter().zip(sampled.colors().unwrap()) {
            assert_relative_eq!(c.r, p.x / 200.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_downsample_noop_when_small() {
        let cloud = line(10);
        assert_eq!(cloud.downsample(50, 1), cloud);
    }
}
