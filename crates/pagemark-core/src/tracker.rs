//! Frame-to-frame persistence of recognized corners.
//!
//! Dot colors flicker between frames far more than dot positions do. Every
//! corner that belonged to a resolved page is remembered for a few frames, and
//! a corner detected close to a remembered one takes over its colors before
//! assembly. Positions always come from the current frame.

use crate::config::DetectorConfig;
use crate::corner::Corner;
use crate::geometry::Point;
use crate::page::Page;
use std::collections::BTreeMap;

/// Stable handle of a persisted corner.
pub type CornerKey = u64;

/// A corner remembered from a previous frame.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PersistEntry {
    /// Stable key, unique for the tracker's lifetime.
    pub key: CornerKey,
    /// Last resolved corner: position and registered colors.
    pub corner: Corner,
    /// Page the corner was resolved on.
    pub page_id: u64,
    /// Frames left before the entry is dropped.
    pub ttl: u32,
}

/// TTL-bounded store of corners seen on resolved pages.
#[derive(Clone, Debug)]
pub struct PageTracker {
    entries: Vec<PersistEntry>,
    next_key: CornerKey,
    distance: f64,
    max_ttl: u32,
}

impl Default for PageTracker {
    fn default() -> Self {
        Self::from_config(&DetectorConfig::default())
    }
}

impl PageTracker {
    /// Tracker matching corners within `distance` pixels, keeping them for
    /// `max_ttl` frames.
    #[must_use]
    pub fn new(distance: f64, max_ttl: u32) -> Self {
        Self {
            entries: Vec::new(),
            next_key: 0,
            distance,
            max_ttl,
        }
    }

    /// Tracker using `persist_distance` and `persist_ttl` from `config`.
    #[must_use]
    pub fn from_config(config: &DetectorConfig) -> Self {
        Self::new(config.persist_distance, config.persist_ttl)
    }

    /// Persisted corners.
    #[must_use]
    pub fn entries(&self) -> &[PersistEntry] {
        &self.entries
    }

    /// Number of persisted corners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when nothing is persisted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget every persisted corner.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drop entries that have run out and age the rest by one frame.
    ///
    /// An entry persisted with a TTL of `n` survives `n` frames without a
    /// match and is gone at the start of the one after. Returns the number of
    /// dropped entries.
    pub fn begin_frame(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain_mut(|e| {
            if e.ttl == 0 {
                return false;
            }
            e.ttl -= 1;
            true
        });
        let expired = before - self.entries.len();
        if expired > 0 {
            tracing::debug!(expired, remaining = self.entries.len(), "persisted corners expired");
        }
        expired
    }

    /// Index of the entry nearest to `p`, if closer than the match distance.
    fn nearest(&self, p: Point) -> Option<usize> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i, (e.corner.vertex() - p).norm()))
            .filter(|&(_, d)| d < self.distance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    /// Replace the colors of detected corners with those of nearby persisted
    /// corners. Positions are left untouched.
    ///
    /// Returns how many corners changed identity.
    pub fn smooth(&self, corners: &mut [Corner]) -> usize {
        let mut changed = 0;
        for corner in corners.iter_mut() {
            let Some(i) = self.nearest(corner.vertex()) else {
                continue;
            };
            let smoothed = corner.with_colors_of(&self.entries[i].corner);
            if smoothed.id() != corner.id() {
                tracing::trace!(
                    key = self.entries[i].key,
                    from = %corner,
                    to = %smoothed,
                    "corner colors smoothed"
                );
                changed += 1;
            }
            *corner = smoothed;
        }
        changed
    }

    /// Remember the corners of every resolved page, refreshing existing
    /// entries in place.
    pub fn persist<T>(&mut self, pages: &BTreeMap<u64, Page<T>>) {
        for page in pages.values() {
            for corner in page.corners() {
                let entry = PersistEntry {
                    key: 0,
                    corner,
                    page_id: page.id,
                    ttl: self.max_ttl,
                };
                match self.nearest(corner.vertex()) {
                    Some(i) => {
                        let key = self.entries[i].key;
                        self.entries[i] = PersistEntry { key, ..entry };
                    }
                    None => {
                        let key = self.next_key;
                        self.next_key += 1;
                        self.entries.push(PersistEntry { key, ..entry });
                    }
                }
            }
        }
    }
}
