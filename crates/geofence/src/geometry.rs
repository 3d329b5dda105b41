//! Planar geometry primitives

use serde::{Deserialize, Serialize};

/// Tolerance for treating a point as lying on an edge (pixels)
const EDGE_EPSILON: f64 = 1e-6;

/// Point in image coordinates (x right, y down)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Both coordinates are finite
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    fn as_f64(self) -> (f64, f64) {
        (self.x as f64, self.y as f64)
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

/// Even-odd ray casting test.
///
/// Points on an edge or vertex are reported as inside. Polygons with fewer
/// than 3 vertices contain nothing.
pub fn contains(polygon: &[Point], point: Point) -> bool {
    let n = polygon.len();
    if n < 3 || !point.is_finite() {
        return false;
    }

    let p = point.as_f64();
    let mut inside = false;
    let mut j = n - 1;

    for i in 0..n {
        let a = polygon[j].as_f64();
        let b = polygon[i].as_f64();

        if on_segment(a, b, p) {
            return true;
        }

        // Half-open rule on y keeps shared vertices from counting twice
        if (b.1 > p.1) != (a.1 > p.1) {
            let x_cross = a.0 + (p.1 - a.1) * (b.0 - a.0) / (b.1 - a.1);
            if p.0 < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }

    inside
}

fn on_segment(a: (f64, f64), b: (f64, f64), p: (f64, f64)) -> bool {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let length = dx.hypot(dy);

    if length <= EDGE_EPSILON {
        return (p.0 - a.0).hypot(p.1 - a.1) <= EDGE_EPSILON;
    }

    let cross = dx * (p.1 - a.1) - dy * (p.0 - a.0);
    if cross.abs() / length > EDGE_EPSILON {
        return false;
    }

    p.0 >= a.0.min(b.0) - EDGE_EPSILON
        && p.0 <= a.0.max(b.0) + EDGE_EPSILON
        && p.1 >= a.1.min(b.1) - EDGE_EPSILON
        && p.1 <= a.1.max(b.1) + EDGE_EPSILON
}

/// Shoelace area; positive for counter-clockwise winding in a y-up frame
pub fn signed_area(polygon: &[Point]) -> f64 {
    let n = polygon.len();
    if n < 3 {
        return 0.0;
    }

    let mut twice_area = 0.0;
    for i in 0..n {
        let (x0, y0) = polygon[i].as_f64();
        let (x1, y1) = polygon[(i + 1) % n].as_f64();
        twice_area += x0 * y1 - x1 * y0;
    }
    twice_area / 2.0
}
