//! Word geometry
//!
//! OCR providers describe each word with a polygon (usually a rotated quadrilateral).
//! Redaction only ever paints axis-aligned rectangles, so every polygon is collapsed
//! into the tightest axis-aligned [`BoundingBox`] that contains it.

use serde::Serialize;
use thiserror::Error;

/// Minimum number of (x, y) points a word polygon must carry.
pub const MIN_POLYGON_POINTS: usize = 4;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("polygon needs at least 4 points, got {0} coordinates")]
    TooFewPoints(usize),

    #[error("polygon coordinate {index} is not finite: {value}")]
    NonFinite { index: usize, value: f64 },
}

/// Axis-aligned box in image pixel coordinates.
///
/// There is no public field constructor: boxes are always derived from a polygon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl BoundingBox {
    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// Word outline as reported by OCR, stored as alternating x, y scalars.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    coords: Vec<f64>,
}

impl Polygon {
    /// Validate raw coordinates. A trailing unpaired scalar is dropped.
    pub fn from_coords(mut coords: Vec<f64>) -> Result<Self, GeometryError> {
        if coords.len() < MIN_POLYGON_POINTS * 2 {
            return Err(GeometryError::TooFewPoints(coords.len()));
        }
        if let Some((index, value)) = coords.iter().copied().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(GeometryError::NonFinite { index, value });
        }
        coords.truncate(coords.len() / 2 * 2);
        Ok(Self { coords })
    }

    /// Four corners of a rectangle, clockwise from the top-left.
    pub fn from_rect(left: f64, top: f64, width: f64, height: f64) -> Result<Self, GeometryError> {
        let right = left + width;
        let bottom = top + height;
        Self::from_coords(vec![left, top, right, top, right, bottom, left, bottom])
    }

    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.coords.chunks_exact(2).map(|p| (p[0], p[1]))
    }

    /// Tightest axis-aligned box containing every point.
    ///
    /// Rotated outlines are over-approximated.
    pub fn bounding_box(&self) -> BoundingBox {
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;

        for (x, y) in self.points() {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        BoundingBox {
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        }
    }
}

/// Collapse a flat `[x1, y1, x2, y2, ...]` polygon into its bounding box.
pub fn bounding_box_from_polygon(coords: &[f64]) -> Result<BoundingBox, GeometryError> {
    Polygon::from_coords(coords.to_vec()).map(|polygon| polygon.bounding_box())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_aligned_quad() {
        let bbox = bounding_box_from_polygon(&[10.0, 20.0, 100.0, 20.0, 100.0, 50.0, 10.0, 50.0]).unwrap();
        assert_eq!(bbox.x(), 10.0);
        assert_eq!(bbox.y(), 20.0);
        assert_eq!(bbox.width(), 90.0);
        assert_eq!(bbox.height(), 30.0);
        assert_eq!(bbox.right(), 100.0);
        assert_eq!(bbox.bottom(), 50.0);
    }

    #[test]
    fn test_rotated_quad_is_over_approximated() {
        // diamond: top (50,0), right (100,50), bottom (50,100), left (0,50)
        let bbox = bounding_box_from_polygon(&[50.0, 0.0, 100.0, 50.0, 50.0, 100.0, 0.0, 50.0]).unwrap();
        assert_eq!((bbox.x(), bbox.y()), (0.0, 0.0));
        assert_eq!((bbox.width(), bbox.height()), (100.0, 100.0));
    }

    #[test]
    fn test_corners_are_min_and_max_of_points() {
        let coords = [7.5, 3.0, 2.0, 9.0, 12.25, 4.0, 6.0, 1.5, 8.0, 11.0];
        let bbox = bounding_box_from_polygon(&coords).unwrap();
        assert_eq!(bbox.x(), 2.0);
        assert_eq!(bbox.y(), 1.5);
        assert_eq!(bbox.right(), 12.25);
        assert_eq!(bbox.bottom(), 11.0);
    }

    #[test]
    fn test_too_few_points() {
        let err = bounding_box_from_polygon(&[0.0, 0.0, 1.0, 0.0, 1.0, 1.0]).unwrap_err();
        assert_eq!(err, GeometryError::TooFewPoints(6));
        assert!(bounding_box_from_polygon(&[]).is_err());
    }

    #[test]
    fn test_non_finite_coordinate() {
        let err = bounding_box_from_polygon(&[0.0, 0.0, f64::NAN, 0.0, 1.0, 1.0, 0.0, 1.0]).unwrap_err();
        assert!(matches!(err, GeometryError::NonFinite { index: 2, .. }));
    }

    #[test]
    fn test_trailing_scalar_ignored() {
        let bbox = bounding_box_from_polygon(&[0.0, 0.0, 4.0, 0.0, 4.0, 2.0, 0.0, 2.0, 500.0]).unwrap();
        assert_eq!(bbox.width(), 4.0);
    }

    #[test]
    fn test_from_rect() {
        let bbox = Polygon::from_rect(100.0, 200.0, 50.0, 20.0).unwrap().bounding_box();
        assert_eq!((bbox.x(), bbox.y(), bbox.width(), bbox.height()), (100.0, 200.0, 50.0, 20.0));
    }
}
