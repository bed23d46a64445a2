//! Planar helpers shared by the matcher, assembler and tracker.
//!
//! All coordinates are image pixels with the origin at the upper-left and the
//! y axis pointing down.

use nalgebra::{Point2, Vector2};

/// A point in frame (image) coordinates.
pub type Point = Point2<f64>;
/// A displacement in frame (image) coordinates.
pub type Vector = Vector2<f64>;

/// Turn `p` a quarter turn about `pivot`, counterclockwise as seen on screen.
///
/// With y pointing down this maps the offset `(x, y)` to `(y, -x)`, so a
/// vector pointing right ends up pointing up.
#[inline]
#[must_use]
pub fn quarter_turn_about(pivot: Point, p: Point) -> Point {
    let d = p - pivot;
    pivot + Vector::new(d.y, -d.x)
}

/// Unsigned angle between two vectors in `[0, π]`.
///
/// Degenerate (zero-length) inputs yield `0.0`.
#[inline]
#[must_use]
pub fn angle_between(u: &Vector, v: &Vector) -> f64 {
    u.angle(v)
}

/// Mean of a non-empty set of points. Returns the origin for an empty slice.
#[must_use]
pub fn centroid(points: &[Point]) -> Point {
    if points.is_empty() {
        return Point::origin();
    }
    let sum = points
        .iter()
        .fold(Vector::zeros(), |acc, p| acc + p.coords);
    Point::from(sum / points.len() as f64)
}

/// `true` when `x` and `y` differ by at most `margin` (inclusive).
#[inline]
#[must_use]
pub fn equal_with_margin(x: f64, y: f64, margin: f64) -> bool {
    !(x - margin > y || x + margin < y)
}

/// Axis-aligned rectangle, half-open on the max side.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    /// Minimum x coordinate (inclusive).
    pub min_x: f64,
    /// Minimum y coordinate (inclusive).
    pub min_y: f64,
    /// Maximum x coordinate (exclusive).
    pub max_x: f64,
    /// Maximum y coordinate (exclusive).
    pub max_y: f64,
}

impl Rect {
    /// Degenerate rectangle at a single point.
    #[must_use]
    pub fn at(p: Point) -> Self {
        Self {
            min_x: p.x,
            min_y: p.y,
            max_x: p.x,
            max_y: p.y,
        }
    }

    /// Smallest rectangle containing `self` and `p`.
    #[must_use]
    pub fn include(self, p: &Point) -> Self {
        Self {
            min_x: self.min_x.min(p.x),
            min_y: self.min_y.min(p.y),
            max_x: self.max_x.max(p.x),
            max_y: self.max_y.max(p.y),
        }
    }

    /// Smallest rectangle containing every point, or `None` for no points.
    #[must_use]
    pub fn bounding(points: &[Point]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        Some(rest.iter().fold(Self::at(*first), Self::include))
    }

    /// Half-open containment test.
    #[inline]
    #[must_use]
    pub fn contains(&self, p: &Point) -> bool {
        p.x >= self.min_x && p.x < self.max_x && p.y >= self.min_y && p.y < self.max_y
    }
}
