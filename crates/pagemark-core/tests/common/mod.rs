use pagemark_core::bucket::Circle;
use pagemark_core::color::{DotColor, Palette};
use pagemark_core::page::CornerSlot;
use pagemark_core::test_utils::swatch;

/// Index of a dot within the circles of one rendered page.
///
/// Scenes emit five circles per visible corner in slot order, `ll` first.
pub fn dot_index(slot: CornerSlot, dot: usize) -> usize {
    slot.index() * 5 + dot
}

/// Recolor one circle as if the camera had misread it.
pub fn misread(circles: &mut [Circle], index: usize, color: DotColor) {
    circles[index].color = swatch(&Palette::printed(), color);
}

/// Shift every circle by `(dx, dy)`.
pub fn shifted(circles: &[Circle], dx: f64, dy: f64) -> Vec<Circle> {
    circles
        .iter()
        .map(|c| Circle::new(c.position.x + dx, c.position.y + dy, c.radius, c.color))
        .collect()
}
