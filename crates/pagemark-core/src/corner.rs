//! Corner fiducials and their 10-bit identity.
//!
//! A corner is five colored dots laid out as a right-angle arrow:
//!
//! ```text
//!   m -- r -- rr
//!   |
//!   l
//!   |
//!   ll
//! ```
//!
//! `m` is the vertex, `l`/`r` the arm midpoints and `ll`/`rr` the arm ends.
//! "Left" and "right" are defined under rotation: a quarter turn of the left
//! arm about `m`, counterclockwise on screen, closes it onto the right arm.
//!
//! # Bit layout
//!
//! Each dot contributes 2 bits; dots are packed `ll, l, m, r, rr` from the
//! high bits down, so `rr` occupies bits `1..0` and `ll` bits `9..8`.

use crate::color::DotColor;
use crate::geometry::Point;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of bits a single corner contributes to a page identity.
pub const CORNER_ID_BITS: u32 = 10;
/// Mask selecting one corner id.
pub const CORNER_ID_MASK: u16 = (1 << CORNER_ID_BITS) - 1;

/// A classified dot.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dot {
    /// Center of the dot in frame coordinates.
    pub position: Point,
    /// Classified color.
    pub color: DotColor,
}

impl Dot {
    /// Create a dot.
    #[must_use]
    pub const fn new(position: Point, color: DotColor) -> Self {
        Self { position, color }
    }
}

impl Default for Dot {
    fn default() -> Self {
        Self {
            position: Point::origin(),
            color: DotColor::Red,
        }
    }
}

/// Errors produced when parsing corner shorthand such as `"ygybr"`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShorthandError {
    /// Shorthand must name exactly five dots.
    #[error("corner shorthand must be 5 characters, got {0}")]
    WrongLength(usize),
    /// Only `r`, `g`, `b` and `y` are valid dot colors.
    #[error("invalid dot color {found:?} at position {index}")]
    InvalidColor {
        /// Offending character.
        found: char,
        /// Zero-based position in the shorthand.
        index: usize,
    },
}

/// A five-dot corner fiducial.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Corner {
    /// End of the left arm.
    pub ll: Dot,
    /// Middle of the left arm.
    pub l: Dot,
    /// Vertex.
    pub m: Dot,
    /// Middle of the right arm.
    pub r: Dot,
    /// End of the right arm.
    pub rr: Dot,
}

impl Corner {
    /// Build a corner from its dots in `ll, l, m, r, rr` order.
    #[must_use]
    pub const fn from_dots(dots: [Dot; 5]) -> Self {
        Self {
            ll: dots[0],
            l: dots[1],
            m: dots[2],
            r: dots[3],
            rr: dots[4],
        }
    }

    /// Corner with the given colors and every dot at the origin.
    #[must_use]
    pub fn from_colors(colors: [DotColor; 5]) -> Self {
        let origin = Point::origin();
        Self::from_dots(colors.map(|c| Dot::new(origin, c)))
    }

    /// Dots in `ll, l, m, r, rr` order.
    #[must_use]
    pub const fn dots(&self) -> [Dot; 5] {
        [self.ll, self.l, self.m, self.r, self.rr]
    }

    /// Dot colors in `ll, l, m, r, rr` order.
    #[must_use]
    pub fn colors(&self) -> [DotColor; 5] {
        self.dots().map(|d| d.color)
    }

    /// Dot positions in `ll, l, m, r, rr` order.
    #[must_use]
    pub fn positions(&self) -> [Point; 5] {
        self.dots().map(|d| d.position)
    }

    /// Vertex position.
    #[inline]
    #[must_use]
    pub fn vertex(&self) -> Point {
        self.m.position
    }

    /// 10-bit identity of the corner's colors.
    #[must_use]
    pub fn id(&self) -> u16 {
        self.dots()
            .iter()
            .fold(0u16, |acc, d| (acc << 2) | d.color.bits())
    }

    /// Decode a 10-bit identity back into colors (positions at the origin).
    #[must_use]
    pub fn from_id(id: u16) -> Self {
        let mut colors = [DotColor::Red; 5];
        for (i, c) in colors.iter_mut().enumerate() {
            let shift = 2 * (4 - i);
            *c = DotColor::from_bits(id >> shift);
        }
        Self::from_colors(colors)
    }

    /// Same positions, colors taken from `other`.
    #[must_use]
    pub fn with_colors_of(&self, other: &Corner) -> Self {
        let colors = other.colors();
        let mut dots = self.dots();
        for (dot, color) in dots.iter_mut().zip(colors) {
            dot.color = color;
        }
        Self::from_dots(dots)
    }

    /// Parse shorthand such as `"ygybr"`: one character per dot in
    /// `ll, l, m, r, rr` order.
    pub fn from_shorthand(s: &str) -> Result<Self, ShorthandError> {
        let count = s.chars().count();
        if count != 5 {
            return Err(ShorthandError::WrongLength(count));
        }
        let mut colors = [DotColor::Red; 5];
        for (index, (slot, found)) in colors.iter_mut().zip(s.chars()).enumerate() {
            *slot = DotColor::from_char(found)
                .ok_or(ShorthandError::InvalidColor { found, index })?;
        }
        Ok(Self::from_colors(colors))
    }
}

impl FromStr for Corner {
    type Err = ShorthandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_shorthand(s)
    }
}

impl fmt::Display for Corner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for dot in self.dots() {
            write!(f, "{}", dot.color.as_char())?;
        }
        Ok(())
    }
}
