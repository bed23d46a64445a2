#![cfg(feature = "extended-tests")]
#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]
//! Randomized multi-page scenes with jitter and clutter.

use pagemark_core::PageDetector;
use pagemark_core::color::Palette;
use pagemark_core::config::DetectorConfig;
use pagemark_core::registry::{PageRegistry, PageTemplate};
use pagemark_core::test_utils::{SceneBuilder, max_vertex_error};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[test]
fn test_random_scenes() {
    let (width, height) = (2560, 1440);
    let config = DetectorConfig::builder().frame_size(width, height).build();
    let mut rng = ChaCha8Rng::seed_from_u64(7);

    let mut registry = PageRegistry::new();
    for n in 0..50u32 {
        let corners = registry.generate_unused(&mut rng, 1_000).unwrap();
        assert!(registry.register(PageTemplate::new(corners, n)));
    }
    let templates: Vec<_> = registry.iter().map(|t| t.corners).collect();

    for scene_idx in 0..50u64 {
        let mut scene = SceneBuilder::new(width, height)
            .with_jitter(0.3)
            .with_clutter(40)
            .with_seed(scene_idx);
        for k in 0..3 {
            let corners = templates[(scene_idx as usize * 3 + k) % templates.len()];
            scene.add_random_page(&mut rng, corners, (300.0, 360.0));
        }
        let (circles, placements) = scene.build();

        let mut detector = PageDetector::with_config(config);
        let frame = detector.detect(&registry, &circles, &Palette::printed());
        assert_eq!(frame.pages.len(), placements.len(), "scene {scene_idx}");

        for placement in &placements {
            let id = PageTemplate::new(placement.corners, ()).id;
            let page = frame.pages.get(&id).unwrap();
            let err = max_vertex_error(&page.vertices(), &placement.vertices());
            assert!(err < 3.0, "scene {scene_idx}: vertex error {err}");
        }
    }
}
