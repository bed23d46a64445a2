//! Dot color classification.
//!
//! Sampled circle colors are mapped onto the four dot colors by nearest
//! reference swatch, with a raw-RGB heuristic that survives reference drift
//! under changing light.

use crate::config::HeuristicMode;

/// One of the four printable dot colors. Each carries 2 bits of identity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum DotColor {
    /// Red, bits `00`.
    #[default]
    Red = 0,
    /// Green, bits `01`.
    Green = 1,
    /// Blue, bits `10`.
    Blue = 2,
    /// Yellow, bits `11`.
    Yellow = 3,
}

impl DotColor {
    /// All colors in palette order.
    pub const ALL: [DotColor; 4] = [
        DotColor::Red,
        DotColor::Green,
        DotColor::Blue,
        DotColor::Yellow,
    ];

    /// The 2-bit code of this color.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u16 {
        self as u16
    }

    /// Color for the low 2 bits of `bits`.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u16) -> Self {
        match bits & 0b11 {
            0 => DotColor::Red,
            1 => DotColor::Green,
            2 => DotColor::Blue,
            _ => DotColor::Yellow,
        }
    }

    /// Shorthand character (`r`, `g`, `b` or `y`).
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            DotColor::Red => 'r',
            DotColor::Green => 'g',
            DotColor::Blue => 'b',
            DotColor::Yellow => 'y',
        }
    }

    /// Parse a shorthand character.
    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            'r' => Some(DotColor::Red),
            'g' => Some(DotColor::Green),
            'b' => Some(DotColor::Blue),
            'y' => Some(DotColor::Yellow),
            _ => None,
        }
    }
}

/// An 8-bit RGB sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// Create a sample from its channels.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Squared euclidean distance in RGB space.
    #[inline]
    #[must_use]
    pub fn distance_sq(&self, other: &Rgb) -> u32 {
        let dr = i32::from(self.r) - i32::from(other.r);
        let dg = i32::from(self.g) - i32::from(other.g);
        let db = i32::from(self.b) - i32::from(other.b);
        (dr * dr + dg * dg + db * db).unsigned_abs()
    }
}

/// Reference swatches of the printed dots as seen by the camera, indexed by
/// [`DotColor`] (red, green, blue, yellow).
///
/// Supplied by calibration; treated as read-only by the pipeline.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Palette {
    references: Vec<Rgb>,
}

impl Palette {
    /// Swatches picked from the printed reference material.
    pub const PRINTED: [Rgb; 4] = [
        Rgb::new(245, 34, 45),
        Rgb::new(56, 158, 13),
        Rgb::new(57, 16, 133),
        Rgb::new(250, 140, 22),
    ];

    /// Palette from the four references in `r, g, b, y` order.
    #[must_use]
    pub fn new(references: [Rgb; 4]) -> Self {
        Self {
            references: references.to_vec(),
        }
    }

    /// Palette without references; only the raw-RGB heuristic can classify.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            references: Vec::new(),
        }
    }

    /// The printed swatches, useful before calibration has run.
    #[must_use]
    pub fn printed() -> Self {
        Self::new(Self::PRINTED)
    }

    /// References in palette order.
    #[must_use]
    pub fn references(&self) -> &[Rgb] {
        &self.references
    }

    /// Reference swatch for `color`, if calibrated.
    #[must_use]
    pub fn reference(&self, color: DotColor) -> Option<Rgb> {
        self.references.get(color as usize).copied()
    }

    /// `true` when no references are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    /// Nearest reference and the distance margin to the runner-up.
    ///
    /// Ties resolve to the first entry in palette order. The margin is
    /// `u32::MAX` when there is a single reference.
    #[must_use]
    pub fn nearest(&self, sample: &Rgb) -> Option<(DotColor, u32)> {
        let mut best: Option<(usize, u32)> = None;
        let mut second = u32::MAX;
        for (i, reference) in self.references.iter().take(4).enumerate() {
            let d = sample.distance_sq(reference);
            match best {
                Some((_, b)) if d >= b => second = second.min(d),
                Some((_, b)) => {
                    second = b;
                    best = Some((i, d));
                }
                None => best = Some((i, d)),
            }
        }
        best.map(|(i, d)| {
            #[allow(clippy::cast_possible_truncation)]
            let color = DotColor::from_bits(i as u16);
            (color, second.saturating_sub(d))
        })
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::printed()
    }
}

/// Raw-RGB rules that hold for the printed dots across lighting conditions.
///
/// The first rule that fires wins; `None` if none applies.
#[must_use]
pub fn heuristic_color(sample: &Rgb) -> Option<DotColor> {
    let (r, g, b) = (u32::from(sample.r), u32::from(sample.g), u32::from(sample.b));
    if r < 80 && g < 80 && b < 80 {
        Some(DotColor::Blue)
    } else if g > r && g > b {
        Some(DotColor::Green)
    } else if r > 2 * g && g > b + 20 {
        Some(DotColor::Yellow)
    } else if r > 2 * g && r > 3 * b {
        Some(DotColor::Red)
    } else {
        None
    }
}

/// Maps sampled colors onto [`DotColor`]s.
#[derive(Clone, Copy, Debug)]
pub struct ColorClassifier<'a> {
    palette: &'a Palette,
    mode: HeuristicMode,
    ambiguity_margin: u32,
}

impl<'a> ColorClassifier<'a> {
    /// Classifier over `palette` with the given heuristic precedence.
    #[must_use]
    pub fn new(palette: &'a Palette, mode: HeuristicMode, ambiguity_margin: u32) -> Self {
        Self {
            palette,
            mode,
            ambiguity_margin,
        }
    }

    /// Classify one sample.
    ///
    /// Falls back to [`DotColor::Red`] when neither the palette nor the
    /// heuristic yields an answer.
    #[must_use]
    pub fn classify(&self, sample: &Rgb) -> DotColor {
        let nearest = self.palette.nearest(sample);
        match self.mode {
            HeuristicMode::Disabled => nearest.map(|(c, _)| c).unwrap_or_default(),
            HeuristicMode::Override => heuristic_color(sample)
                .or(nearest.map(|(c, _)| c))
                .unwrap_or_default(),
            HeuristicMode::Fallback => match nearest {
                Some((c, margin)) if margin > self.ambiguity_margin => c,
                Some((c, _)) => heuristic_color(sample).unwrap_or(c),
                None => heuristic_color(sample).unwrap_or_default(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_prefers_first_on_tie() {
        let grey = Rgb::new(100, 100, 100);
        let palette = Palette::new([grey, grey, Rgb::new(0, 0, 255), Rgb::new(255, 255, 0)]);
        let (color, margin) = palette.nearest(&grey).unwrap();
        assert_eq!(color, DotColor::Red);
        assert_eq!(margin, 0);
    }

    #[test]
    fn test_printed_swatches_classify_to_themselves() {
        let palette = Palette::printed();
        for mode in [
            HeuristicMode::Disabled,
            HeuristicMode::Fallback,
            HeuristicMode::Override,
        ] {
            let classifier = ColorClassifier::new(&palette, mode, 2_000);
            for color in DotColor::ALL {
                let sample = palette.reference(color).unwrap();
                assert_eq!(classifier.classify(&sample), color, "mode {mode:?}");
            }
        }
    }

    #[test]
    fn test_heuristic_rules() {
        assert_eq!(heuristic_color(&Rgb::new(20, 30, 70)), Some(DotColor::Blue));
        assert_eq!(heuristic_color(&Rgb::new(90, 180, 60)), Some(DotColor::Green));
        assert_eq!(heuristic_color(&Rgb::new(240, 110, 30)), Some(DotColor::Yellow));
        assert_eq!(heuristic_color(&Rgb::new(230, 60, 50)), Some(DotColor::Red));
        assert_eq!(heuristic_color(&Rgb::new(200, 200, 200)), None);
    }

    #[test]
    fn test_fallback_only_when_ambiguous() {
        // Reference for red has drifted towards orange; a true yellow sample
        // is equidistant between the drifted red and yellow swatches.
        let palette = Palette::new([
            Rgb::new(240, 100, 40),
            Rgb::new(56, 158, 13),
            Rgb::new(57, 16, 133),
            Rgb::new(240, 140, 20),
        ]);
        let sample = Rgb::new(240, 110, 30);
        let strict = ColorClassifier::new(&palette, HeuristicMode::Disabled, 0);
        assert_eq!(strict.classify(&sample), DotColor::Red);

        let fallback = ColorClassifier::new(&palette, HeuristicMode::Fallback, 2_000);
        assert_eq!(fallback.classify(&sample), DotColor::Yellow);

        // A clear red stays red in fallback mode even though it is far from
        // every reference.
        let clear = Rgb::new(250, 20, 30);
        assert_eq!(fallback.classify(&clear), DotColor::Red);
    }

    #[test]
    fn test_empty_palette_uses_heuristic() {
        let palette = Palette::empty();
        let classifier = ColorClassifier::new(&palette, HeuristicMode::Fallback, 0);
        assert_eq!(classifier.classify(&Rgb::new(90, 180, 60)), DotColor::Green);
        assert_eq!(classifier.classify(&Rgb::new(200, 200, 200)), DotColor::Red);
    }

    #[test]
    fn test_shorthand_chars() {
        for color in DotColor::ALL {
            assert_eq!(DotColor::from_char(color.as_char()), Some(color));
            assert_eq!(DotColor::from_bits(color.bits()), color);
        }
        assert_eq!(DotColor::from_char('x'), None);
    }
}
