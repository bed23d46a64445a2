//! Geometric matching of five circles into one corner fiducial.
//!
//! The matcher works on the circles of a single bucket:
//!
//! 1. **Arms**: a circle is an arm midpoint when exactly two other circles sit
//!    at the same (binned) distance on opposite sides of it.
//! 2. **Vertex**: exactly two arms must exist, sharing one endpoint.
//! 3. **Radii**: around the centroid of the five dots, the vertex and both
//!    midpoints lie on a short radius and both ends on twice that radius.
//! 4. **Handedness**: a quarter turn of the left end about the vertex lands on
//!    the right end.
//! 5. **Colors**: each dot is classified against the reference palette.

use crate::bucket::Circle;
use crate::color::{ColorClassifier, Palette};
use crate::config::DetectorConfig;
use crate::corner::{Corner, Dot};
use crate::geometry::{Point, angle_between, centroid, equal_with_margin, quarter_turn_about};
use std::f64::consts::PI;

/// Three circle indices `(end, mid, end)` lying on a straight line.
type Arm = [usize; 3];

/// Matches bucket contents against the corner fiducial geometry.
#[derive(Clone, Copy, Debug)]
pub struct CornerMatcher<'a> {
    config: &'a DetectorConfig,
    classifier: ColorClassifier<'a>,
}

impl<'a> CornerMatcher<'a> {
    /// Create a matcher using the tolerances in `config`.
    #[must_use]
    pub fn new(config: &'a DetectorConfig, palette: &'a Palette) -> Self {
        Self {
            config,
            classifier: ColorClassifier::new(
                palette,
                config.heuristic_mode,
                config.ambiguity_margin,
            ),
        }
    }

    /// Try to read one corner out of a bucket of circles.
    ///
    /// Returns `None` unless exactly one corner-shaped arrangement is present.
    #[must_use]
    pub fn match_corner(&self, circles: &[Circle]) -> Option<Corner> {
        if circles.len() < 5 {
            return None;
        }

        let arms = self.find_arms(circles);
        if arms.len() != 2 {
            tracing::trace!(arms = arms.len(), "bucket rejected: expected two arms");
            return None;
        }

        let (top, end1, end2) = shared_vertex(&arms[0], &arms[1])?;
        let (mid1, mid2) = (arms[0][1], arms[1][1]);

        let mut seen = [top, end1, end2, mid1, mid2];
        seen.sort_unstable();
        if seen.windows(2).any(|w| w[0] == w[1]) {
            return None;
        }

        let pos = |i: usize| circles[i].position;
        if !self.radii_consistent(&[pos(end1), pos(mid1), pos(top), pos(mid2), pos(end2)]) {
            tracing::trace!("bucket rejected: radius check failed");
            return None;
        }

        let tol = self.config.orientation_tolerance;
        let (left, left_mid, right_mid, right) =
            if (quarter_turn_about(pos(top), pos(end1)) - pos(end2)).norm() < tol {
                (end1, mid1, mid2, end2)
            } else if (quarter_turn_about(pos(top), pos(end2)) - pos(end1)).norm() < tol {
                (end2, mid2, mid1, end1)
            } else {
                tracing::trace!("bucket rejected: arms are not a quarter turn apart");
                return None;
            };

        let dot = |i: usize| Dot::new(pos(i), self.classifier.classify(&circles[i].color));
        Some(Corner::from_dots([
            dot(left),
            dot(left_mid),
            dot(top),
            dot(right_mid),
            dot(right),
        ]))
    }

    /// Find every circle that sits midway on a straight line of three.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn find_arms(&self, circles: &[Circle]) -> Vec<Arm> {
        let width = self.config.distance_bucket_width.max(f64::EPSILON);
        let mut arms = Vec::new();
        let mut dists: Vec<(u64, f64, usize)> = Vec::with_capacity(circles.len());

        for (i, c) in circles.iter().enumerate() {
            dists.clear();
            dists.extend(circles.iter().enumerate().filter(|&(j, _)| j != i).map(
                |(j, o)| {
                    let d = (o.position - c.position).norm();
                    ((d / width).floor() as u64, d, j)
                },
            ));
            dists.sort_by(|a, b| a.1.total_cmp(&b.1));

            let mut start = 0;
            while start < dists.len() {
                let bin = dists[start].0;
                let end = dists[start..]
                    .iter()
                    .position(|e| e.0 != bin)
                    .map_or(dists.len(), |n| start + n);
                if end - start == 2 {
                    let (a, b) = (dists[start].2, dists[start + 1].2);
                    let u = circles[a].position - c.position;
                    let v = circles[b].position - c.position;
                    if (angle_between(&u, &v) - PI).abs() < self.config.line_angle_tolerance {
                        arms.push([a, i, b]);
                        break;
                    }
                }
                start = end;
            }
        }
        arms
    }

    /// Centroid-distance test on `[end1, mid1, top, mid2, end2]`.
    fn radii_consistent(&self, points: &[Point; 5]) -> bool {
        let mid = centroid(points);
        let mut d = points.map(|p| (p - mid).norm());
        d.sort_by(f64::total_cmp);

        let short = (d[0] + d[1] + d[2]) / 3.0;
        let long = (d[3] + d[4]) / 2.0;
        let cfg = self.config;
        equal_with_margin(short * 2.0, long, cfg.radius_ratio_margin)
            && equal_with_margin(d[0], d[1], cfg.short_radius_margin)
            && equal_with_margin(d[0], d[2], cfg.radius_margin)
            && equal_with_margin(d[1], d[2], cfg.radius_margin)
            && equal_with_margin(d[3], d[4], cfg.radius_margin)
    }
}

/// The endpoint shared by two arms, followed by the two unshared endpoints.
fn shared_vertex(a: &Arm, b: &Arm) -> Option<(usize, usize, usize)> {
    let [a0, _, a2] = *a;
    let [b0, _, b2] = *b;
    if a0 == b0 {
        Some((a0, a2, b2))
    } else if a2 == b2 {
        Some((a2, a0, b0))
    } else if a0 == b2 {
        Some((a0, a2, b0))
    } else if a2 == b0 {
        Some((a2, a0, b2))
    } else {
        None
    }
}

/// Convenience wrapper around [`CornerMatcher::match_corner`].
#[must_use]
pub fn match_corner(
    circles: &[Circle],
    palette: &Palette,
    config: &DetectorConfig,
) -> Option<Corner> {
    CornerMatcher::new(config, palette).match_corner(circles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::DotColor;
    use crate::geometry::Vector;
    use crate::test_utils::corner_circles;
    use proptest::prelude::*;

    fn ulhc_at(x: f64, y: f64, spacing: f64) -> Vec<Circle> {
        let corner = Corner::from_shorthand("ygybr").unwrap();
        corner_circles(
            &corner,
            Point::new(x, y),
            Vector::new(0.0, 1.0),
            spacing,
            &Palette::printed(),
        )
    }

    #[test]
    fn test_accepts_ideal_corner() {
        let circles = ulhc_at(200.0, 200.0, 40.0);
        let corner = match_corner(&circles, &Palette::printed(), &DetectorConfig::default())
            .expect("ideal corner should match");
        assert_eq!(corner.to_string(), "ygybr");
        assert_eq!(corner.vertex(), Point::new(200.0, 200.0));
        // Left arm points down, right arm points right.
        assert_eq!(corner.ll.position, Point::new(200.0, 280.0));
        assert_eq!(corner.rr.position, Point::new(280.0, 200.0));
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let mut circles = ulhc_at(200.0, 200.0, 40.0);
        circles.reverse();
        circles.swap(0, 3);
        let corner =
            match_corner(&circles, &Palette::printed(), &DetectorConfig::default()).unwrap();
        assert_eq!(corner.to_string(), "ygybr");
    }

    #[test]
    fn test_rejects_perturbed_end() {
        let mut circles = ulhc_at(200.0, 200.0, 40.0);
        // The right arm end is the last circle; push it 20px off its arm.
        circles[4].position.y += 20.0;
        assert!(match_corner(&circles, &Palette::printed(), &DetectorConfig::default()).is_none());
    }

    #[test]
    fn test_rejects_perturbed_vertex() {
        let mut circles = ulhc_at(200.0, 200.0, 40.0);
        circles[2].position.x -= 20.0;
        assert!(match_corner(&circles, &Palette::printed(), &DetectorConfig::default()).is_none());
    }

    #[test]
    fn test_mirrored_corner_reads_reversed() {
        let circles: Vec<Circle> = ulhc_at(200.0, 200.0, 40.0)
            .into_iter()
            .map(|mut c| {
                c.position.x = 400.0 - c.position.x;
                c
            })
            .collect();
        let corner = match_corner(&circles, &Palette::printed(), &DetectorConfig::default())
            .expect("mirrored arrangement is still a corner, read the other way");
        // The arms swap, so the shorthand reads reversed.
        assert_eq!(corner.to_string(), "rbygy");
    }

    #[test]
    fn test_rejects_too_few_and_straight_lines() {
        let circles = ulhc_at(200.0, 200.0, 40.0);
        let cfg = DetectorConfig::default();
        assert!(match_corner(&circles[..4], &Palette::printed(), &cfg).is_none());

        let line: Vec<Circle> = (0..5)
            .map(|i| Circle::new(100.0 + 35.0 * f64::from(i), 100.0, 5.0, circles[0].color))
            .collect();
        assert!(match_corner(&line, &Palette::printed(), &cfg).is_none());
    }

    #[test]
    fn test_too_wide_spacing_fails_radius_check() {
        // Beyond ~46px spacing the vertex and midpoints no longer sit within
        // the 6px radius margin of each other.
        let circles = ulhc_at(200.0, 200.0, 50.0);
        assert!(match_corner(&circles, &Palette::printed(), &DetectorConfig::default()).is_none());

        let relaxed = DetectorConfig::builder().radius_margin(8.0).build();
        assert!(match_corner(&circles, &Palette::printed(), &relaxed).is_some());
    }

    #[test]
    fn test_colors_follow_palette() {
        let palette = Palette::printed();
        let corner = Corner::from_shorthand("rgbyr").unwrap();
        let circles = corner_circles(
            &corner,
            Point::new(300.0, 300.0),
            Vector::new(0.0, 1.0),
            35.0,
            &palette,
        );
        let found = match_corner(&circles, &palette, &DetectorConfig::default()).unwrap();
        assert_eq!(
            found.colors(),
            [
                DotColor::Red,
                DotColor::Green,
                DotColor::Blue,
                DotColor::Yellow,
                DotColor::Red
            ]
        );
    }

    proptest! {
        #[test]
        fn prop_matches_any_orientation(
            angle in 0.0..(2.0 * PI),
            spacing in 26.0..44.0f64,
            x in 150.0..500.0f64,
            y in 150.0..500.0f64,
        ) {
            // Skip spacings where the arm distance straddles a bin edge.
            let frac = (spacing / 10.0).fract();
            prop_assume!(frac > 0.05 && frac < 0.95);
            let corner = Corner::from_shorthand("bgryy").unwrap();
            let left = Vector::new(angle.cos(), angle.sin());
            let circles = corner_circles(&corner, Point::new(x, y), left, spacing, &Palette::printed());
            let found = match_corner(&circles, &Palette::printed(), &DetectorConfig::default());
            prop_assert!(found.is_some());
            let found = found.unwrap();
            prop_assert_eq!(found.id(), corner.id());
            prop_assert!((found.vertex() - Point::new(x, y)).norm() < 1e-9);
        }
    }
}
