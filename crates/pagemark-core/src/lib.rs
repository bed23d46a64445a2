//! Core recognition logic for the Pagemark library.
//!
//! Pagemark finds physical pages in a camera feed by the colored-dot fiducials
//! printed in their corners, identifies each page against a registry and keeps
//! the identification stable from frame to frame.
//!
//! # Architecture Overview
//!
//! The pipeline consumes circle candidates reported by an external circle
//! detector and runs once per frame:
//!
//! 1. **Bucketing**: circles are grouped into overlapping square windows so
//!    that each corner fiducial lands whole in at least one of them.
//! 2. **Corner matching**: every bucket is checked in parallel for the
//!    five-dot arrow shape; dots are classified against a reference palette
//!    and packed into a 10-bit corner id.
//! 3. **Smoothing**: corners close to ones remembered from recent frames take
//!    over the remembered colors.
//! 4. **Assembly**: corners are linked arm to vertex into cycles and resolved
//!    against the [`registry::PageRegistry`] by 30-bit partial ids. Any three
//!    corners of a page suffice; the fourth is synthesized.
//! 5. **Persistence**: corners of resolved pages are remembered for a bounded
//!    number of frames.
//!
//! # Example
//!
//! ```
//! use pagemark_core::PageDetector;
//! use pagemark_core::color::Palette;
//! use pagemark_core::registry::PageRegistry;
//! use pagemark_core::test_utils::{EXAMPLE_PAGES, PagePlacement, SceneBuilder, corners_from_shorthand};
//! use nalgebra::Point2;
//!
//! let mut registry = PageRegistry::new();
//! let [ulhc, urhc, lrhc, llhc] = EXAMPLE_PAGES[0];
//! assert!(registry.register_shorthand(ulhc, urhc, lrhc, llhc, "notes"));
//!
//! let mut scene = SceneBuilder::new(1280, 720);
//! let corners = corners_from_shorthand(EXAMPLE_PAGES[0]);
//! scene.add_page(PagePlacement::new(corners, Point2::new(640.0, 360.0), 320.0, 320.0));
//! let (circles, _) = scene.build();
//!
//! let mut detector = PageDetector::new();
//! let frame = detector.detect(&registry, &circles, &Palette::printed());
//! assert_eq!(frame.pages.len(), 1);
//! ```

/// Corner graph assembly into pages.
pub mod assembler;
/// Spatial bucketing of circle candidates.
pub mod bucket;
/// Dot colors and palette classification.
pub mod color;
/// Configuration types for the recognition pipeline.
pub mod config;
/// Corner fiducials and their identity.
pub mod corner;
/// Planar geometry helpers.
pub mod geometry;
/// Five-circle corner matching.
pub mod matcher;
/// Resolved pages and coordinate mapping.
pub mod page;
/// Page templates indexed by partial id.
pub mod registry;
/// Utilities for testing and synthetic data generation.
pub mod test_utils;
/// Frame-to-frame corner persistence.
pub mod tracker;

pub use crate::bucket::{BucketGrid, Circle};
pub use crate::color::{DotColor, Palette, Rgb};
pub use crate::config::DetectorConfig;
pub use crate::corner::Corner;
pub use crate::page::{CornerSlot, Page};
pub use crate::registry::{PageRegistry, PageTemplate};
use crate::assembler::CornerGraphAssembler;
use crate::matcher::CornerMatcher;
use crate::tracker::PageTracker;
use bumpalo::Bump;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::time::Instant;

/// Pipeline-wide statistics for a single frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct PipelineStats {
    /// Time taken for bucketing in milliseconds (zero for pre-bucketed input).
    pub bucket_ms: f64,
    /// Time taken for corner matching in milliseconds.
    pub matching_ms: f64,
    /// Time taken for color smoothing in milliseconds.
    pub smoothing_ms: f64,
    /// Time taken for page assembly in milliseconds.
    pub assembly_ms: f64,
    /// Time taken for persisting corners in milliseconds.
    pub persist_ms: f64,
    /// Total pipeline time in milliseconds.
    pub total_ms: f64,
    /// Number of buckets matched.
    pub num_buckets: usize,
    /// Number of corners matched, counting a corner once per bucket.
    pub num_corners: usize,
    /// Number of distinct corners after merging overlapping buckets.
    pub num_unique_corners: usize,
    /// Number of corners whose colors were replaced by persisted ones.
    pub num_smoothed: usize,
    /// Number of resolved pages.
    pub num_pages: usize,
    /// Number of pages resolved from three corners.
    pub num_synthesized: usize,
    /// Number of persisted corners dropped at the start of the frame.
    pub num_expired: usize,
    /// Number of persisted corners after the frame.
    pub num_persisted: usize,
}

/// Result of one frame.
#[derive(Clone, Debug)]
pub struct FrameResult<T> {
    /// Resolved pages keyed by page id.
    pub pages: BTreeMap<u64, Page<T>>,
    /// Distinct corners found in the frame, after smoothing.
    pub corners: Vec<Corner>,
    /// Pipeline statistics.
    pub stats: PipelineStats,
}

/// The main entry point for recognizing pages.
///
/// The detector holds per-frame scratch memory and the tracker state, and is
/// configured at construction time via [`DetectorConfig`].
pub struct PageDetector {
    arena: Bump,
    config: DetectorConfig,
    tracker: PageTracker,
}

impl PageDetector {
    /// Create a new detector instance with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DetectorConfig::default())
    }

    /// Create a detector with custom pipeline configuration.
    #[must_use]
    pub fn with_config(config: DetectorConfig) -> Self {
        Self {
            arena: Bump::new(),
            tracker: PageTracker::from_config(&config),
            config,
        }
    }

    /// Get the current detector configuration.
    #[must_use]
    pub fn config(&self) -> DetectorConfig {
        self.config
    }

    /// Corners remembered from previous frames.
    #[must_use]
    pub fn tracker(&self) -> &PageTracker {
        &self.tracker
    }

    /// Forget all tracking state.
    pub fn reset(&mut self) {
        self.tracker.clear();
        self.arena.reset();
    }

    /// Bucket grid laid over the configured frame size.
    #[must_use]
    pub fn grid(&self) -> BucketGrid {
        BucketGrid::for_frame(
            self.config.frame_width,
            self.config.frame_height,
            self.config.bucket_window,
            self.config.bucket_stride,
        )
    }

    /// Recognize pages among the raw circle candidates of one frame.
    pub fn detect<T: Clone>(
        &mut self,
        registry: &PageRegistry<T>,
        circles: &[Circle],
        palette: &Palette,
    ) -> FrameResult<T> {
        let start = Instant::now();
        let buckets = {
            let _span = tracing::info_span!("bucket", circles = circles.len()).entered();
            self.grid().bucket(circles)
        };
        let bucket_ms = start.elapsed().as_secs_f64() * 1000.0;

        let mut result = self.detect_buckets(registry, &buckets, palette);
        result.stats.bucket_ms = bucket_ms;
        result.stats.total_ms += bucket_ms;
        result
    }

    /// Recognize pages among circles already grouped into buckets.
    pub fn detect_buckets<T, B>(
        &mut self,
        registry: &PageRegistry<T>,
        buckets: &[B],
        palette: &Palette,
    ) -> FrameResult<T>
    where
        T: Clone,
        B: AsRef<[Circle]> + Sync,
    {
        let mut stats = PipelineStats::default();
        let start_total = Instant::now();
        self.arena.reset();
        stats.num_expired = self.tracker.begin_frame();
        stats.num_buckets = buckets.len();

        // 1. Corner matching
        let start_match = Instant::now();
        let matched: Vec<Corner> = {
            let _span = tracing::info_span!("corner_match", buckets = buckets.len()).entered();
            let matcher = CornerMatcher::new(&self.config, palette);
            buckets
                .par_iter()
                .filter_map(|b| matcher.match_corner(b.as_ref()))
                .collect()
        };
        stats.num_corners = matched.len();
        let mut corners = dedup_corners(matched, self.config.corner_dedup_distance);
        stats.num_unique_corners = corners.len();
        stats.matching_ms = start_match.elapsed().as_secs_f64() * 1000.0;

        // 2. Smoothing against persisted corners
        let start_smooth = Instant::now();
        {
            let _span = tracing::info_span!("smooth").entered();
            stats.num_smoothed = self.tracker.smooth(&mut corners);
        }
        stats.smoothing_ms = start_smooth.elapsed().as_secs_f64() * 1000.0;

        // 3. Assembly
        let start_assemble = Instant::now();
        let pages = {
            let _span = tracing::info_span!("assemble", corners = corners.len()).entered();
            CornerGraphAssembler::new(&self.config).assemble(&self.arena, &corners, registry)
        };
        stats.num_pages = pages.len();
        stats.num_synthesized = pages.values().filter(|p| p.synthesized.is_some()).count();
        stats.assembly_ms = start_assemble.elapsed().as_secs_f64() * 1000.0;

        // 4. Persistence
        let start_persist = Instant::now();
        {
            let _span = tracing::info_span!("persist").entered();
            self.tracker.persist(&pages);
        }
        stats.num_persisted = self.tracker.len();
        stats.persist_ms = start_persist.elapsed().as_secs_f64() * 1000.0;

        stats.total_ms = start_total.elapsed().as_secs_f64() * 1000.0;
        FrameResult {
            pages,
            corners,
            stats,
        }
    }
}

impl Default for PageDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Merge detections of the same corner from overlapping buckets, keeping the
/// first.
fn dedup_corners(matched: Vec<Corner>, distance: f64) -> Vec<Corner> {
    let mut unique: Vec<Corner> = Vec::with_capacity(matched.len());
    for corner in matched {
        let seen = unique
            .iter()
            .any(|u| (u.vertex() - corner.vertex()).norm() < distance);
        if !seen {
            unique.push(corner);
        }
    }
    unique
}
