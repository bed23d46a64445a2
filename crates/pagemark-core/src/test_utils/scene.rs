#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]

use super::{DEFAULT_SPACING, page_circles, rectangle, swatch};
use crate::bucket::Circle;
use crate::color::{DotColor, Palette};
use crate::corner::Corner;
use crate::geometry::Point;
use crate::page::CornerSlot;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

/// Gap between unrelated dots so no 130 px bucket can hold both.
const CLEARANCE: f64 = 190.0;

/// A page placed in a scene.
#[derive(Debug, Clone)]
pub struct PagePlacement {
    /// Registered corners in `ulhc, urhc, lrhc, llhc` order.
    pub corners: [Corner; 4],
    /// Center of the page.
    pub center: Point,
    /// Distance between the left-hand and right-hand vertices.
    pub width: f64,
    /// Distance between the upper and lower vertices.
    pub height: f64,
    /// Clockwise rotation on screen, in radians.
    pub rotation_rad: f64,
    /// Distance between neighboring dots of one corner.
    pub spacing: f64,
    /// Corners left out of the rendered circles.
    pub hidden: Vec<CornerSlot>,
}

impl PagePlacement {
    /// Upright page with the default dot spacing.
    pub fn new(corners: [Corner; 4], center: Point, width: f64, height: f64) -> Self {
        Self {
            corners,
            center,
            width,
            height,
            rotation_rad: 0.0,
            spacing: DEFAULT_SPACING,
            hidden: Vec::new(),
        }
    }

    /// Set the rotation.
    pub fn rotated(mut self, rotation_rad: f64) -> Self {
        self.rotation_rad = rotation_rad;
        self
    }

    /// Leave the corner in `slot` out of the scene.
    pub fn hiding(mut self, slot: CornerSlot) -> Self {
        self.hidden.push(slot);
        self
    }

    /// Ground-truth vertices in `ulhc, urhc, lrhc, llhc` order.
    pub fn vertices(&self) -> [Point; 4] {
        rectangle(self.center, self.width, self.height, self.rotation_rad)
    }

    /// Radius of a circle around the center that holds every dot.
    fn reach(&self) -> f64 {
        self.width.hypot(self.height) / 2.0 + 2.0 * self.spacing
    }
}

/// A builder for frames of circle candidates showing several pages.
pub struct SceneBuilder {
    width: u32,
    height: u32,
    pages: Vec<PagePlacement>,
    palette: Palette,
    jitter_sigma: f64,
    clutter: usize,
    seed: u64,
}

impl SceneBuilder {
    /// Create a new scene builder for a `width` x `height` frame.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pages: Vec::new(),
            palette: Palette::printed(),
            jitter_sigma: 0.0,
            clutter: 0,
            seed: 0,
        }
    }

    /// Colors used for the rendered circles.
    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    /// Standard deviation of the Gaussian noise added to circle positions.
    pub fn with_jitter(mut self, sigma: f64) -> Self {
        self.jitter_sigma = sigma;
        self
    }

    /// Number of stray circles scattered away from the pages.
    pub fn with_clutter(mut self, count: usize) -> Self {
        self.clutter = count;
        self
    }

    /// Seed for jitter and clutter.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Add a page if it stays inside the frame and clear of the other pages.
    pub fn add_page(&mut self, placement: PagePlacement) -> bool {
        let reach = placement.reach();
        let c = placement.center;
        if c.x - reach < 0.0
            || c.y - reach < 0.0
            || c.x + reach >= f64::from(self.width)
            || c.y + reach >= f64::from(self.height)
        {
            return false;
        }
        for existing in &self.pages {
            if (existing.center - c).norm() < existing.reach() + reach + CLEARANCE {
                return false;
            }
        }
        self.pages.push(placement);
        true
    }

    /// Add a page with random position, size and rotation.
    pub fn add_random_page<R: Rng>(
        &mut self,
        rng: &mut R,
        corners: [Corner; 4],
        size_range: (f64, f64),
    ) -> bool {
        for _ in 0..100 {
            let (min_s, max_s) = size_range;
            let width = rng.gen_range(min_s..max_s);
            let height = rng.gen_range(min_s..max_s);
            let half = width.hypot(height) / 2.0 + 2.0 * DEFAULT_SPACING;
            if f64::from(self.width) <= 2.0 * half || f64::from(self.height) <= 2.0 * half {
                continue;
            }
            let center = Point::new(
                rng.gen_range(half..f64::from(self.width) - half),
                rng.gen_range(half..f64::from(self.height) - half),
            );
            let rotation = rng.gen_range(0.0..2.0 * std::f64::consts::PI);
            let placement = PagePlacement::new(corners, center, width, height).rotated(rotation);
            if self.add_page(placement) {
                return true;
            }
        }
        false
    }

    /// Render the scene and return the circles and placements.
    pub fn build(self) -> (Vec<Circle>, Vec<PagePlacement>) {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut circles = Vec::new();

        for page in &self.pages {
            let rendered = page_circles(
                &page.corners,
                &page.vertices(),
                page.spacing,
                &self.palette,
            );
            // Five circles per corner, in slot order.
            for (slot, chunk) in CornerSlot::ALL.iter().zip(rendered.chunks(5)) {
                if !page.hidden.contains(slot) {
                    circles.extend_from_slice(chunk);
                }
            }
        }

        if let Ok(noise) = Normal::new(0.0, self.jitter_sigma) {
            for c in &mut circles {
                c.position.x += noise.sample(&mut rng);
                c.position.y += noise.sample(&mut rng);
            }
        }

        let mut placed = 0;
        let mut attempts = 0;
        while placed < self.clutter && attempts < self.clutter * 100 {
            attempts += 1;
            let p = Point::new(
                rng.gen_range(0.0..f64::from(self.width)),
                rng.gen_range(0.0..f64::from(self.height)),
            );
            if self
                .pages
                .iter()
                .any(|page| (page.center - p).norm() < page.reach() + CLEARANCE)
            {
                continue;
            }
            let color = DotColor::ALL[rng.gen_range(0..4)];
            circles.push(Circle {
                position: p,
                radius: rng.gen_range(3.0..8.0),
                color: swatch(&self.palette, color),
            });
            placed += 1;
        }

        (circles, self.pages)
    }
}
