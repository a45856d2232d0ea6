// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Normalized geometry — polygons and bounding boxes expressed as fractions of
// the page, plus the flip into PDF's bottom-left-origin coordinate space.

use serde::{Deserialize, Serialize};

use crate::error::{PagesmithError, Result};

/// A vertex in normalized page space: `(0, 0)` is top-left, `(1, 1)` is
/// bottom-right.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [f64; 2] {
    fn from(point: Point) -> Self {
        [point.x, point.y]
    }
}

/// A polygon produced by the detector, in normalized page space.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedPolygon {
    points: Vec<Point>,
}

impl NormalizedPolygon {
    pub fn new(points: impl Into<Vec<Point>>) -> Self {
        Self {
            points: points.into(),
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Axis-aligned bounding box of the polygon.
    ///
    /// Rejects polygons with fewer than three vertices and any coordinate
    /// outside `[0, 1]`. Use [`NormalizedPolygon::bounding_box_clamped`] to
    /// tolerate detector jitter instead.
    pub fn bounding_box(&self) -> Result<BoundingBox> {
        self.check_vertex_count()?;
        if let Some(point) = self
            .points
            .iter()
            .find(|p| !in_unit_range(p.x) || !in_unit_range(p.y))
        {
            return Err(PagesmithError::Geometry(format!(
                "vertex ({}, {}) lies outside [0, 1]",
                point.x, point.y
            )));
        }
        Ok(self.scan_extent())
    }

    /// Bounding box with every coordinate clamped into `[0, 1]` first.
    pub fn bounding_box_clamped(&self) -> Result<BoundingBox> {
        self.check_vertex_count()?;
        if self.points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(PagesmithError::Geometry("vertex is not finite".into()));
        }
        let bbox = self.scan_extent();
        Ok(BoundingBox {
            x_min: bbox.x_min.clamp(0.0, 1.0),
            x_max: bbox.x_max.clamp(0.0, 1.0),
            y_min: bbox.y_min.clamp(0.0, 1.0),
            y_max: bbox.y_max.clamp(0.0, 1.0),
        })
    }

    fn check_vertex_count(&self) -> Result<()> {
        if self.points.len() < 3 {
            return Err(PagesmithError::Geometry(format!(
                "polygon needs at least 3 vertices, got {}",
                self.points.len()
            )));
        }
        Ok(())
    }

    fn scan_extent(&self) -> BoundingBox {
        let mut bbox = BoundingBox {
            x_min: f64::INFINITY,
            x_max: f64::NEG_INFINITY,
            y_min: f64::INFINITY,
            y_max: f64::NEG_INFINITY,
        };
        for point in &self.points {
            bbox.x_min = bbox.x_min.min(point.x);
            bbox.x_max = bbox.x_max.max(point.x);
            bbox.y_min = bbox.y_min.min(point.y);
            bbox.y_max = bbox.y_max.max(point.y);
        }
        bbox
    }
}

/// Componentwise bounding box of a polygon. Free-function form of
/// [`NormalizedPolygon::bounding_box`].
pub fn bounding_box(polygon: &NormalizedPolygon) -> Result<BoundingBox> {
    polygon.bounding_box()
}

fn in_unit_range(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

/// Axis-aligned rectangle in normalized page space (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl BoundingBox {
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    /// The whole page.
    pub fn full_page() -> Self {
        Self::new(0.0, 1.0, 0.0, 1.0)
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Map the box onto a page of `width` x `height` units.
    ///
    /// The returned window is in the page's native bottom-left-origin space,
    /// so `top` is derived from `y_min` and `bottom` from `y_max`.
    pub fn crop_window(&self, width: f64, height: f64) -> Result<CropWindow> {
        if !(width > 0.0 && height > 0.0) {
            return Err(PagesmithError::Geometry(format!(
                "page has non-positive dimensions {width}x{height}"
            )));
        }
        if self.x_min >= 1.0 || self.y_min >= 1.0 || self.x_max <= 0.0 || self.y_max <= 0.0 {
            return Err(PagesmithError::Geometry(format!(
                "box {self:?} lies entirely outside the page"
            )));
        }

        let new_width = width * self.width();
        let new_height = height * self.height();
        if !(new_width > 0.0 && new_height > 0.0) {
            return Err(PagesmithError::Geometry(format!(
                "degenerate box {self:?} yields {new_width}x{new_height}"
            )));
        }

        Ok(CropWindow {
            left: self.x_min * width,
            right: self.x_max * width,
            top: height - self.y_min * height,
            bottom: height - self.y_max * height,
        })
    }
}

/// A crop rectangle in native page units with a bottom-left origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropWindow {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

impl CropWindow {
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    /// Top-left-origin pixel rectangle `(x, y, w, h)` on a raster of
    /// `pixel_height` rows. Rounds outwards to whole pixels.
    pub fn to_pixel_rect(&self, pixel_width: u32, pixel_height: u32) -> (u32, u32, u32, u32) {
        let max_x = f64::from(pixel_width);
        let max_y = f64::from(pixel_height);
        let x0 = self.left.floor().clamp(0.0, max_x);
        let x1 = self.right.ceil().clamp(0.0, max_x);
        let y0 = (max_y - self.top).floor().clamp(0.0, max_y);
        let y1 = (max_y - self.bottom).ceil().clamp(0.0, max_y);
        (
            x0 as u32,
            y0 as u32,
            ((x1 - x0) as u32).max(1),
            ((y1 - y0) as u32).max(1),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> NormalizedPolygon {
        NormalizedPolygon::new(vec![
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ])
    }

    #[test]
    fn bounding_box_scans_all_vertices() {
        let polygon = NormalizedPolygon::new(vec![
            Point::new(0.4, 0.2),
            Point::new(0.6, 0.5),
            Point::new(0.1, 0.7),
        ]);
        let bbox = bounding_box(&polygon).unwrap();
        assert_eq!(bbox, BoundingBox::new(0.1, 0.6, 0.2, 0.7));
    }

    #[test]
    fn bounding_box_rejects_two_vertices() {
        let polygon = NormalizedPolygon::new(vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)]);
        assert!(matches!(
            polygon.bounding_box(),
            Err(PagesmithError::Geometry(_))
        ));
    }

    #[test]
    fn bounding_box_rejects_out_of_range_vertex() {
        let polygon = square(0.1, 0.1, 1.2, 0.5);
        assert!(matches!(
            polygon.bounding_box(),
            Err(PagesmithError::Geometry(_))
        ));
    }

    #[test]
    fn clamped_bounding_box_tolerates_jitter() {
        let polygon = square(-0.01, 0.1, 1.02, 0.5);
        let bbox = polygon.bounding_box_clamped().unwrap();
        assert_eq!(bbox, BoundingBox::new(0.0, 1.0, 0.1, 0.5));
    }

    #[test]
    fn polygon_deserializes_from_nested_arrays() {
        let polygon: NormalizedPolygon =
            serde_json::from_str("[[0.1, 0.2], [0.6, 0.2], [0.6, 0.7]]").unwrap();
        assert_eq!(polygon.len(), 3);
        assert_eq!(polygon.points()[1], Point::new(0.6, 0.2));
    }

    #[test]
    fn crop_window_flips_vertical_axis() {
        let window = BoundingBox::new(0.1, 0.6, 0.2, 0.7)
            .crop_window(1000.0, 2000.0)
            .unwrap();
        assert_eq!(window.left, 100.0);
        assert_eq!(window.right, 600.0);
        assert_eq!(window.top, 1600.0);
        assert_eq!(window.bottom, 600.0);
        assert_eq!(window.width(), 500.0);
        assert_eq!(window.height(), 1000.0);
    }

    #[test]
    fn crop_window_touching_top_edge() {
        let window = BoundingBox::new(0.0, 0.5, 0.0, 0.25)
            .crop_window(100.0, 200.0)
            .unwrap();
        assert_eq!(window.top, 200.0);
        assert_eq!(window.bottom, 150.0);
        assert_eq!(window.left, 0.0);
    }

    #[test]
    fn crop_window_touching_bottom_edge() {
        let window = BoundingBox::new(0.5, 1.0, 0.75, 1.0)
            .crop_window(100.0, 200.0)
            .unwrap();
        assert_eq!(window.bottom, 0.0);
        assert_eq!(window.top, 50.0);
        assert_eq!(window.right, 100.0);
    }

    #[test]
    fn crop_window_full_page() {
        let window = BoundingBox::full_page().crop_window(612.0, 792.0).unwrap();
        assert_eq!(
            window,
            CropWindow {
                left: 0.0,
                bottom: 0.0,
                right: 612.0,
                top: 792.0
            }
        );
    }

    #[test]
    fn degenerate_box_is_rejected() {
        let zero_width = BoundingBox::new(0.3, 0.3, 0.1, 0.9);
        let zero_height = BoundingBox::new(0.1, 0.9, 0.4, 0.4);
        for bbox in [zero_width, zero_height] {
            let err = bbox.crop_window(100.0, 100.0).unwrap_err();
            assert!(matches!(err, PagesmithError::Geometry(_)), "{bbox:?}");
        }
    }

    #[test]
    fn box_outside_page_is_rejected() {
        let err = BoundingBox::new(1.0, 1.5, 0.1, 0.9)
            .crop_window(100.0, 100.0)
            .unwrap_err();
        assert!(matches!(err, PagesmithError::Geometry(_)));
    }

    #[test]
    fn pixel_rect_returns_top_left_origin() {
        let window = BoundingBox::new(0.1, 0.6, 0.2, 0.7)
            .crop_window(1000.0, 2000.0)
            .unwrap();
        assert_eq!(window.to_pixel_rect(1000, 2000), (100, 400, 500, 1000));
    }
}
