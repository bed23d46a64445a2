//! Synthetic fiducial generation for tests and benchmarks.
//!
//! Pages are rendered straight to circle candidates, the way the external
//! circle detector would report them, with colors taken from a [`Palette`].

use crate::bucket::Circle;
use crate::color::{DotColor, Palette, Rgb};
use crate::corner::{Corner, Dot};
use crate::geometry::{Point, Vector};
use crate::registry::PageRegistry;

pub mod scene;

pub use scene::{PagePlacement, SceneBuilder};

/// Arm spacing that keeps a corner inside one bucket at any rotation with the
/// default 130/65 grid.
pub const DEFAULT_SPACING: f64 = 22.0;

/// Two registrable example pages in `ulhc, urhc, lrhc, llhc` shorthand.
pub const EXAMPLE_PAGES: [[&str; 4]; 2] = [
    ["ygybr", "brgry", "gbgyg", "bgryy"],
    ["yggyg", "rgyrb", "bybbg", "brgrg"],
];

/// Registry holding [`EXAMPLE_PAGES`] with payloads `"page-1"` and `"page-2"`.
#[must_use]
pub fn example_registry() -> PageRegistry<&'static str> {
    let mut registry = PageRegistry::new();
    for (shorthand, payload) in EXAMPLE_PAGES.iter().zip(["page-1", "page-2"]) {
        let [ulhc, urhc, lrhc, llhc] = *shorthand;
        registry.register_shorthand(ulhc, urhc, lrhc, llhc, payload);
    }
    registry
}

/// Parse four shorthands, panicking on malformed input.
///
/// # Panics
/// Panics if any shorthand is malformed.
#[must_use]
#[allow(clippy::expect_used)]
pub fn corners_from_shorthand(shorthand: [&str; 4]) -> [Corner; 4] {
    shorthand.map(|s| Corner::from_shorthand(s).expect("valid shorthand"))
}

/// Color the palette reports for `color`, or the printed swatch.
#[must_use]
pub fn swatch(palette: &Palette, color: DotColor) -> Rgb {
    palette
        .reference(color)
        .unwrap_or(Palette::PRINTED[color as usize])
}

/// Circle candidates for the dots of a positioned corner, `ll` first.
#[must_use]
pub fn circles_for(corner: &Corner, radius: f64, palette: &Palette) -> Vec<Circle> {
    corner
        .dots()
        .iter()
        .map(|d| Circle {
            position: d.position,
            radius,
            color: swatch(palette, d.color),
        })
        .collect()
}

/// Corner with vertex `vertex`, left arm along `left` and `spacing` pixels
/// between neighboring dots. The right arm is the left arm turned a quarter.
#[must_use]
pub fn corner_at(corner: &Corner, vertex: Point, left: Vector, spacing: f64) -> Corner {
    let left = left.normalize() * spacing;
    let right = Vector::new(left.y, -left.x);
    let colors = corner.colors();
    Corner::from_dots([
        Dot::new(vertex + left * 2.0, colors[0]),
        Dot::new(vertex + left, colors[1]),
        Dot::new(vertex, colors[2]),
        Dot::new(vertex + right, colors[3]),
        Dot::new(vertex + right * 2.0, colors[4]),
    ])
}

/// Circle candidates for a corner placed by [`corner_at`], `ll` first.
#[must_use]
pub fn corner_circles(
    corner: &Corner,
    vertex: Point,
    left: Vector,
    spacing: f64,
    palette: &Palette,
) -> Vec<Circle> {
    circles_for(&corner_at(corner, vertex, left, spacing), spacing / 4.0, palette)
}

/// Positioned corners of a page whose vertices are `vertices`
/// (`ulhc, urhc, lrhc, llhc`, clockwise on screen).
///
/// Each corner's right arm points at the next vertex and its left arm at the
/// previous one.
#[must_use]
pub fn page_corners(corners: &[Corner; 4], vertices: &[Point; 4], spacing: f64) -> Vec<Corner> {
    (0..4)
        .map(|k| {
            let m = vertices[k];
            let right = (vertices[(k + 1) % 4] - m).normalize() * spacing;
            let left = (vertices[(k + 3) % 4] - m).normalize() * spacing;
            let colors = corners[k].colors();
            Corner::from_dots([
                Dot::new(m + left * 2.0, colors[0]),
                Dot::new(m + left, colors[1]),
                Dot::new(m, colors[2]),
                Dot::new(m + right, colors[3]),
                Dot::new(m + right * 2.0, colors[4]),
            ])
        })
        .collect()
}

/// Circle candidates for every dot of a page.
#[must_use]
pub fn page_circles(
    corners: &[Corner; 4],
    vertices: &[Point; 4],
    spacing: f64,
    palette: &Palette,
) -> Vec<Circle> {
    page_corners(corners, vertices, spacing)
        .iter()
        .flat_map(|c| circles_for(c, spacing / 4.0, palette))
        .collect()
}

/// Vertices of a `width` x `height` rectangle centered on `center`, turned
/// clockwise on screen by `rotation` radians, in `ulhc, urhc, lrhc, llhc` order.
#[must_use]
pub fn rectangle(center: Point, width: f64, height: f64, rotation: f64) -> [Point; 4] {
    let (s, c) = rotation.sin_cos();
    let (hw, hh) = (width / 2.0, height / 2.0);
    [(-hw, -hh), (hw, -hh), (hw, hh), (-hw, hh)]
        .map(|(x, y)| center + Vector::new(c * x - s * y, s * x + c * y))
}

/// Largest distance between matching vertices of two quads.
#[must_use]
pub fn max_vertex_error(detected: &[Point; 4], truth: &[Point; 4]) -> f64 {
    detected
        .iter()
        .zip(truth)
        .map(|(a, b)| (a - b).norm())
        .fold(0.0, f64::max)
}
