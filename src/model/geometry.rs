//! Page raster geometry shared by text zones and map-areas.

use serde::{Deserialize, Serialize};

/// An integer point in page raster coordinates.
pub type Point = (i64, i64);

/// An axis-aligned rectangle: origin plus width and height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
}

impl Rect {
    /// Create a rectangle from origin and size.
    pub fn new(x: i64, y: i64, w: i64, h: i64) -> Self {
        Self { x, y, w, h }
    }

    /// Create a rectangle from two opposite corners, as stored in zone records.
    pub fn from_corners(x0: i64, y0: i64, x1: i64, y1: i64) -> Self {
        Self {
            x: x0,
            y: y0,
            w: x1 - x0,
            h: y1 - y0,
        }
    }

    /// Right edge.
    pub fn x1(&self) -> i64 {
        self.x + self.w
    }

    /// Bottom edge (in raster coordinates y grows away from the origin).
    pub fn y1(&self) -> i64 {
        self.y + self.h
    }

    pub fn origin(&self) -> Point {
        (self.x, self.y)
    }

    /// Check whether the rectangle has a positive area.
    pub fn has_area(&self) -> bool {
        self.w > 0 && self.h > 0
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect::from_corners(
            self.x.min(other.x),
            self.y.min(other.y),
            self.x1().max(other.x1()),
            self.y1().max(other.y1()),
        )
    }

    /// Bounding box of a point set. Degenerate extents are widened to 1 so
    /// the result stays usable as a transform source.
    pub fn bounding(points: &[Point]) -> Rect {
        let mut x0 = i64::MAX;
        let mut y0 = i64::MAX;
        let mut x1 = i64::MIN;
        let mut y1 = i64::MIN;
        for &(x, y) in points {
            x0 = x0.min(x);
            y0 = y0.min(y);
            x1 = x1.max(x);
            y1 = y1.max(y);
        }
        if points.is_empty() {
            return Rect::new(0, 0, 1, 1);
        }
        Rect::new(x0, y0, (x1 - x0).max(1), (y1 - y0).max(1))
    }
}

/// Affine map taking one rectangle onto another.
#[derive(Debug, Clone, Copy)]
pub struct RectTransform {
    from: Rect,
    to: Rect,
}

impl RectTransform {
    pub fn new(from: Rect, to: Rect) -> Self {
        Self { from, to }
    }

    /// Map a point, rounding to the nearest raster position.
    pub fn apply(&self, (x, y): Point) -> Point {
        let scale = |v: i64, from0: i64, from_len: i64, to0: i64, to_len: i64| -> i64 {
            if from_len == 0 {
                return to0;
            }
            let offset = (v - from0) as f64 * to_len as f64 / from_len as f64;
            to0 + offset.round() as i64
        };
        (
            scale(x, self.from.x, self.from.w, self.to.x, self.to.w),
            scale(y, self.from.y, self.from.h, self.to.y, self.to.h),
        )
    }
}
