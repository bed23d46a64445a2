//! Overlapping spatial buckets for circle candidates.
//!
//! The circle detector reports every dot in the frame. Matching corners over
//! the whole set would be quadratic in the number of dots and would mix dots
//! of neighboring fiducials, so circles are first grouped into square windows
//! laid out on a grid with half-window stride. A window larger than one
//! fiducial guarantees all five of its dots share at least one bucket.

use crate::color::Rgb;
use crate::geometry::{Point, Rect};

/// A circle candidate reported by the external detector.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Circle {
    /// Center in frame coordinates.
    pub position: Point,
    /// Radius in pixels.
    pub radius: f64,
    /// Color sampled at the center.
    pub color: Rgb,
}

impl Circle {
    /// Create a circle candidate.
    #[must_use]
    pub fn new(x: f64, y: f64, radius: f64, color: Rgb) -> Self {
        Self {
            position: Point::new(x, y),
            radius,
            color,
        }
    }
}

/// A grid of overlapping square windows covering a frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BucketGrid {
    /// Side length of one window.
    pub window: f64,
    /// Offset between neighboring windows.
    pub stride: f64,
    /// Number of window columns.
    pub columns: usize,
    /// Number of window rows.
    pub rows: usize,
}

impl BucketGrid {
    /// Grid whose windows cover a `width` x `height` frame.
    ///
    /// A 1280x720 frame with window 130 and stride 65 yields 20 x 12 windows.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn for_frame(width: u32, height: u32, window: f64, stride: f64) -> Self {
        let stride = if stride > 0.0 { stride } else { window.max(1.0) };
        let columns = (f64::from(width) / stride).ceil().max(1.0) as usize;
        let rows = (f64::from(height) / stride).ceil().max(1.0) as usize;
        Self {
            window,
            stride,
            columns,
            rows,
        }
    }

    /// Number of windows in the grid.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns * self.rows
    }

    /// `true` if the grid has no windows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Window at column `i`, row `j`.
    #[must_use]
    pub fn window_rect(&self, i: usize, j: usize) -> Rect {
        let min_x = i as f64 * self.stride;
        let min_y = j as f64 * self.stride;
        Rect {
            min_x,
            min_y,
            max_x: min_x + self.window,
            max_y: min_y + self.window,
        }
    }

    /// Inclusive range of window indices along one axis covering `v`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn axis_range(&self, v: f64, count: usize) -> Option<(usize, usize)> {
        if v < 0.0 || count == 0 {
            return None;
        }
        // Windows k with k*stride <= v < k*stride + window.
        let hi = (v / self.stride).floor();
        let lo = ((v - self.window) / self.stride).floor() + 1.0;
        let lo = lo.max(0.0) as usize;
        let hi = (hi as usize).min(count - 1);
        (lo <= hi).then_some((lo, hi))
    }

    /// Distribute circles over the windows containing them.
    ///
    /// Windows with fewer than `min_count` circles are dropped. The result
    /// holds circle indices into `circles`, in grid order.
    #[must_use]
    pub fn bucket_indices(&self, circles: &[Circle], min_count: usize) -> Vec<Vec<usize>> {
        let mut cells: Vec<Vec<usize>> = vec![Vec::new(); self.len()];
        for (idx, c) in circles.iter().enumerate() {
            let Some((x0, x1)) = self.axis_range(c.position.x, self.columns) else {
                continue;
            };
            let Some((y0, y1)) = self.axis_range(c.position.y, self.rows) else {
                continue;
            };
            for j in y0..=y1 {
                for i in x0..=x1 {
                    if self.window_rect(i, j).contains(&c.position) {
                        cells[j * self.columns + i].push(idx);
                    }
                }
            }
        }
        cells.retain(|cell| cell.len() >= min_count.max(1));
        cells
    }

    /// Distribute circles over the windows containing them, copying circles.
    ///
    /// Only windows holding at least five circles (one full corner) are kept.
    #[must_use]
    pub fn bucket(&self, circles: &[Circle]) -> Vec<Vec<Circle>> {
        self.bucket_indices(circles, 5)
            .into_iter()
            .map(|cell| cell.into_iter().map(|i| circles[i]).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f64, y: f64) -> Circle {
        Circle::new(x, y, 4.0, Rgb::default())
    }

    #[test]
    fn test_webcam_grid_dimensions() {
        let grid = BucketGrid::for_frame(1280, 720, 130.0, 65.0);
        assert_eq!(grid.columns, 20);
        assert_eq!(grid.rows, 12);
        let wide = BucketGrid::for_frame(2080, 1170, 130.0, 65.0);
        assert_eq!((wide.columns, wide.rows), (32, 18));
    }

    #[test]
    fn test_circle_lands_in_overlapping_windows() {
        let grid = BucketGrid::for_frame(260, 260, 130.0, 65.0);
        let circles = [at(100.0, 30.0)];
        let cells = grid.bucket_indices(&circles, 1);
        // x=100 is inside windows starting at 0 and 65; y=30 only in row 0.
        assert_eq!(cells.len(), 2);
    }

    #[test]
    fn test_window_is_half_open() {
        let grid = BucketGrid::for_frame(260, 260, 130.0, 65.0);
        let circles = [at(130.0, 10.0)];
        let cells = grid.bucket_indices(&circles, 1);
        // x=130 is excluded from [0,130) and included in [65,195) and [130,260).
        assert_eq!(cells.len(), 2);
    }

    #[test]
    fn test_cluster_shares_a_bucket() {
        let grid = BucketGrid::for_frame(640, 480, 130.0, 65.0);
        let circles: Vec<Circle> = [
            (300.0, 200.0),
            (300.0, 240.0),
            (300.0, 280.0),
            (340.0, 200.0),
            (380.0, 200.0),
        ]
        .iter()
        .map(|&(x, y)| at(x, y))
        .collect();
        let buckets = grid.bucket(&circles);
        assert!(buckets.iter().any(|b| b.len() == 5));
    }

    #[test]
    fn test_outside_frame_is_dropped() {
        let grid = BucketGrid::for_frame(100, 100, 130.0, 65.0);
        let circles = [at(-5.0, 10.0), at(10.0, -1.0)];
        assert!(grid.bucket_indices(&circles, 1).is_empty());
    }
}
