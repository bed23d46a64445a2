//! Resolved pages and their frame geometry.

use crate::corner::Corner;
use crate::geometry::{Point, Rect, Vector, angle_between, centroid};
use std::f64::consts::PI;

/// Position of a corner on a page, clockwise from the upper-left.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CornerSlot {
    /// Upper-left.
    Ulhc = 0,
    /// Upper-right.
    Urhc = 1,
    /// Lower-right.
    Lrhc = 2,
    /// Lower-left.
    Llhc = 3,
}

impl CornerSlot {
    /// All slots in clockwise order.
    pub const ALL: [CornerSlot; 4] = [
        CornerSlot::Ulhc,
        CornerSlot::Urhc,
        CornerSlot::Lrhc,
        CornerSlot::Llhc,
    ];

    /// Index in `0..4`.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Slot for `index`, wrapping modulo 4.
    #[must_use]
    pub const fn from_index(index: usize) -> Self {
        Self::ALL[index % 4]
    }

    /// Next slot clockwise.
    #[must_use]
    pub const fn next(self) -> Self {
        Self::from_index(self.index() + 1)
    }
}

/// Maps frame coordinates into another space (typically the projector's).
///
/// Produced by calibration. Closures `Fn(Point) -> Point` implement it.
pub trait CoordinateMapper {
    /// Map one point.
    fn map(&self, p: Point) -> Point;
}

/// Leaves coordinates unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityMapper;

impl CoordinateMapper for IdentityMapper {
    #[inline]
    fn map(&self, p: Point) -> Point {
        p
    }
}

impl<F> CoordinateMapper for F
where
    F: Fn(Point) -> Point,
{
    #[inline]
    fn map(&self, p: Point) -> Point {
        self(p)
    }
}

/// A page recognized in the current frame.
///
/// Corners carry detected positions and the registered dot colors.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Page<T> {
    /// 40-bit page identity.
    pub id: u64,
    /// Upper-left corner.
    pub ulhc: Corner,
    /// Upper-right corner.
    pub urhc: Corner,
    /// Lower-right corner.
    pub lrhc: Corner,
    /// Lower-left corner.
    pub llhc: Corner,
    /// Rotation in `[0, 2π)`, clockwise on screen.
    pub angle: f64,
    /// Payload registered with the page.
    pub payload: T,
    /// Corner whose position was inferred from the other three.
    pub synthesized: Option<CornerSlot>,
}

impl<T> Page<T> {
    /// Corners in `ulhc, urhc, lrhc, llhc` order.
    #[must_use]
    pub fn corners(&self) -> [Corner; 4] {
        [self.ulhc, self.urhc, self.lrhc, self.llhc]
    }

    /// Corner in `slot`.
    #[must_use]
    pub fn corner(&self, slot: CornerSlot) -> &Corner {
        match slot {
            CornerSlot::Ulhc => &self.ulhc,
            CornerSlot::Urhc => &self.urhc,
            CornerSlot::Lrhc => &self.lrhc,
            CornerSlot::Llhc => &self.llhc,
        }
    }

    /// Corner vertices in `ulhc, urhc, lrhc, llhc` order.
    #[must_use]
    pub fn vertices(&self) -> [Point; 4] {
        self.corners().map(|c| c.vertex())
    }

    /// Mean of the four vertices.
    #[must_use]
    pub fn center(&self) -> Point {
        centroid(&self.vertices())
    }

    /// Axis-aligned box around the four vertices.
    #[must_use]
    pub fn bounding_box(&self) -> Rect {
        let [first, rest @ ..] = self.vertices();
        rest.iter().fold(Rect::at(first), Rect::include)
    }

    /// Vertices mapped through `mapper`.
    #[must_use]
    pub fn map_vertices<M: CoordinateMapper + ?Sized>(&self, mapper: &M) -> [Point; 4] {
        self.vertices().map(|p| mapper.map(p))
    }

    /// `true` when all four corners were observed in this frame.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.synthesized.is_none()
    }
}

/// Page rotation derived from the upper-left corner's right arm.
///
/// Zero for an upright page, growing clockwise on screen.
#[must_use]
pub fn page_angle(ulhc: &Corner) -> f64 {
    let arm = ulhc.rr.position - ulhc.m.position;
    let angle = angle_between(&arm, &Vector::new(100.0, 0.0));
    if ulhc.rr.position.y < ulhc.m.position.y {
        2.0 * PI - angle
    } else {
        angle
    }
}
