#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]
//! Partial occlusion and frame-to-frame tracking.

mod common;

use common::{dot_index, misread, shifted};
use nalgebra::Point2;
use pagemark_core::PageDetector;
use pagemark_core::bucket::Circle;
use pagemark_core::color::{DotColor, Palette};
use pagemark_core::config::DetectorConfig;
use pagemark_core::page::CornerSlot;
use pagemark_core::test_utils::{
    EXAMPLE_PAGES, PagePlacement, SceneBuilder, corners_from_shorthand, example_registry,
};

fn page_scene(rotation: f64, hidden: Option<CornerSlot>) -> (Vec<Circle>, PagePlacement) {
    let mut placement = PagePlacement::new(
        corners_from_shorthand(EXAMPLE_PAGES[0]),
        Point2::new(640.0, 360.0),
        320.0,
        300.0,
    )
    .rotated(rotation);
    if let Some(slot) = hidden {
        placement = placement.hiding(slot);
    }
    let mut scene = SceneBuilder::new(1280, 720);
    assert!(scene.add_page(placement));
    let (circles, mut placements) = scene.build();
    (circles, placements.remove(0))
}

#[test]
fn test_each_corner_can_be_occluded() {
    let registry = example_registry();
    for slot in CornerSlot::ALL {
        let (circles, placement) = page_scene(0.5, Some(slot));
        assert_eq!(circles.len(), 15);
        let frame = PageDetector::new().detect(&registry, &circles, &Palette::printed());
        assert_eq!(frame.pages.len(), 1, "hidden {slot:?}");
        let page = frame.pages.values().next().unwrap();
        assert_eq!(page.synthesized, Some(slot));
        assert_eq!(frame.stats.num_synthesized, 1);
        let truth = placement.vertices()[slot.index()];
        assert!((page.corner(slot).vertex() - truth).norm() < 1e-9);
        // The synthesized corner carries the registered colors.
        assert_eq!(
            page.corner(slot).to_string(),
            EXAMPLE_PAGES[0][slot.index()]
        );
    }
}

#[test]
fn test_two_hidden_corners_resolve_nothing() {
    let (mut remaining, _) = page_scene(0.0, Some(CornerSlot::Ulhc));
    // With the upper-left corner hidden, circles 5..10 belong to the
    // lower-right corner.
    remaining.drain(5..10);
    assert_eq!(remaining.len(), 10);
    let frame = PageDetector::new().detect(&example_registry(), &remaining, &Palette::printed());
    assert!(frame.pages.is_empty());
}

#[test]
fn test_smoothing_recovers_misread_corners() {
    let registry = example_registry();
    let (clean, _) = page_scene(0.0, None);

    // Misread the vertices of two neighboring corners; no three consecutive
    // corners keep their registered colors.
    let mut noisy = shifted(&clean, 2.0, -1.0);
    misread(&mut noisy, dot_index(CornerSlot::Ulhc, 2), DotColor::Red);
    misread(&mut noisy, dot_index(CornerSlot::Urhc, 2), DotColor::Blue);

    let cold = PageDetector::new().detect(&registry, &noisy, &Palette::printed());
    assert!(cold.pages.is_empty());

    let mut detector = PageDetector::new();
    let first = detector.detect(&registry, &clean, &Palette::printed());
    assert_eq!(first.pages.len(), 1);
    let second = detector.detect(&registry, &noisy, &Palette::printed());
    assert_eq!(second.pages.len(), 1);
    assert_eq!(second.stats.num_smoothed, 2);
    let page = second.pages.values().next().unwrap();
    // Colors come from memory, positions from the current frame.
    assert_eq!(page.ulhc.to_string(), EXAMPLE_PAGES[0][0]);
    assert_eq!(page.ulhc.vertex(), noisy[dot_index(CornerSlot::Ulhc, 2)].position);
}

#[test]
fn test_persisted_corners_expire() {
    let registry = example_registry();
    let (clean, _) = page_scene(0.0, None);
    let mut noisy = clean.clone();
    misread(&mut noisy, dot_index(CornerSlot::Ulhc, 2), DotColor::Red);
    misread(&mut noisy, dot_index(CornerSlot::Urhc, 2), DotColor::Blue);

    let config = DetectorConfig::builder().persist_ttl(10).build();

    // The tenth frame without a match still smooths.
    let mut detector = PageDetector::with_config(config);
    detector.detect(&registry, &clean, &Palette::printed());
    for _ in 0..9 {
        detector.detect(&registry, &[], &Palette::printed());
    }
    assert_eq!(detector.tracker().len(), 4);
    let frame = detector.detect(&registry, &noisy, &Palette::printed());
    assert_eq!(frame.pages.len(), 1);

    // The eleventh starts without the persisted corners.
    let mut detector = PageDetector::with_config(config);
    detector.detect(&registry, &clean, &Palette::printed());
    for _ in 0..10 {
        detector.detect(&registry, &[], &Palette::printed());
    }
    assert_eq!(detector.tracker().len(), 4);
    let frame = detector.detect(&registry, &noisy, &Palette::printed());
    assert!(frame.pages.is_empty());
    assert_eq!(frame.stats.num_expired, 4);
    assert!(detector.tracker().is_empty());
}

#[test]
fn test_large_motion_is_not_smoothed() {
    let registry = example_registry();
    let (clean, _) = page_scene(0.0, None);
    let mut moved = shifted(&clean, 30.0, 0.0);
    misread(&mut moved, dot_index(CornerSlot::Ulhc, 2), DotColor::Red);
    misread(&mut moved, dot_index(CornerSlot::Urhc, 2), DotColor::Blue);

    let mut detector = PageDetector::new();
    detector.detect(&registry, &clean, &Palette::printed());
    let frame = detector.detect(&registry, &moved, &Palette::printed());
    assert!(frame.pages.is_empty());
    assert_eq!(frame.stats.num_smoothed, 0);
}
