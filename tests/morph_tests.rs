//! End-to-end tests for the morphing engine.
//!
//! These drive the public API the way a host would: build a scene, toggle
//! states, change text and tick at a fixed timestep.

use arbor::glyph::{layout_glyph_points, GLYPH_WIDTH};
use arbor::prelude::*;
use arbor::sampling::{sample_cone_spiral, sample_uniform_in_sphere};
use glam::Vec2;
use rand::rngs::SmallRng;
use rand::SeedableRng;

const DT: f32 = 1.0 / 60.0;

fn radial(p: Vec3) -> f32 {
    Vec2::new(p.x, p.z).length()
}

fn tick_for(scene: &mut MorphScene, frames: usize) -> FrameStats {
    let mut stats = FrameStats::default();
    for _ in 0..frames {
        stats = scene.tick(DT);
    }
    stats
}

// ============================================================================
// Sampling
// ============================================================================

#[test]
fn test_spiral_scenario_four_particles() {
    let first = sample_cone_spiral(0, 4, 8.0, 2.0);
    assert!((first.y + 4.0).abs() < 1e-5);
    assert!((radial(first) - 2.0).abs() < 1e-5);

    let last = sample_cone_spiral(3, 4, 8.0, 2.0);
    assert!((last.y - 2.0).abs() < 1e-5);
    assert!((radial(last) - 0.5).abs() < 1e-5);
}

#[test]
fn test_spiral_heights_monotonic_and_apex_narrow() {
    let n = 1000;
    let points: Vec<Vec3> = (0..n).map(|i| sample_cone_spiral(i, n, 12.0, 4.5)).collect();
    for pair in points.windows(2) {
        assert!(pair[1].y >= pair[0].y);
    }
    assert!((radial(points[0]) - 4.5).abs() < 1e-4);
    assert!(radial(points[n as usize - 1]) <= 4.5 / n as f32 + 1e-4);
}

#[test]
fn test_uniform_sphere_is_volumetric() {
    let mut rng = SmallRng::seed_from_u64(2025);
    let radius = 3.0;
    let samples = 100_000;
    let mut sum = 0.0f64;
    for _ in 0..samples {
        let r = sample_uniform_in_sphere(&mut rng, radius).length();
        assert!(r <= radius + 1e-5);
        sum += r as f64;
    }
    let mean = sum / samples as f64;
    assert!((mean - 0.75 * radius as f64).abs() < 0.02);
}

// ============================================================================
// Targets
// ============================================================================

#[test]
fn test_target_arrays_index_aligned() {
    let scene = MorphScene::new(MorphConfig::default()).unwrap();
    for population in scene.populations() {
        assert_eq!(population.assembled_targets().len(), population.len());
        assert_eq!(population.dispersed_targets().len(), population.len());
        assert_eq!(population.colors().len(), population.len());
        assert_eq!(population.instances().len(), population.len());
    }
    assert_eq!(scene.particle_count(), 1950);
}

#[test]
fn test_unsupported_text_fills_whole_population() {
    let mut config = MorphConfig::greeting();
    config.populations[0].count = 2000;
    config.display_text = "0123 ?!".to_string();
    let scene = MorphScene::new(config.clone()).unwrap();
    let population = &scene.populations()[0];
    assert_eq!(population.dispersed_targets().len(), 2000);
    let half = config.text.fill_half_extents + Vec3::splat(1e-4);
    for t in population.dispersed_targets() {
        assert!(t.position.abs().cmple(half).all());
        assert!(t.is_finite());
    }
}

#[test]
fn test_hi_scenario() {
    let mut config = MorphConfig::greeting();
    config.populations[0].count = 500;
    config.display_text = "HI".to_string();
    config.text.slot_width = 5.0;
    config.text.scale = 1.0;
    config.text.centered = false;
    config.text.depth_jitter = 0.0;
    let scene = MorphScene::new(config.clone()).unwrap();
    let targets = scene.populations()[0].dispersed_targets();

    let stroke_points = layout_glyph_points("HI", &config.text, 500);
    assert_eq!(stroke_points.len(), 126);

    for (i, t) in targets.iter().take(63).enumerate() {
        assert!(t.position.x >= -1e-4 && t.position.x <= GLYPH_WIDTH + 1e-4, "H {i}");
    }
    for (i, t) in targets.iter().skip(63).take(63).enumerate() {
        assert!(
            t.position.x >= 5.0 - 1e-4 && t.position.x <= 5.0 + GLYPH_WIDTH + 1e-4,
            "I {i}"
        );
    }
    // the rest are fill
    let fill = &targets[126..];
    assert_eq!(fill.len(), 374);
    assert!(fill.iter().any(|t| t.position.x.abs() > 10.0));
}

// ============================================================================
// Morphing
// ============================================================================

#[test]
fn test_dispersed_to_assembled_within_sixty_frames() {
    let config = MorphConfig {
        initial_state: TargetState::Dispersed,
        motion: MotionConfig {
            easing: Easing::Exponential { speed: 60.0 },
            stagger: 0.0,
            ..MotionConfig::default()
        },
        ..MorphConfig::default()
    };
    let mut scene = MorphScene::new(config).unwrap();
    assert!(!scene.is_assembled());
    scene.set_target_state(TargetState::Assembled);

    tick_for(&mut scene, 60);
    for population in scene.populations() {
        for (live, target) in population.live().iter().zip(population.assembled_targets()) {
            assert!(live.position.distance(target.position) < 1e-4);
        }
    }
    assert!(scene.is_fully_assembled());
}

#[test]
fn test_double_toggle_converges_without_drift() {
    let mut scene = MorphScene::new(MorphConfig::default()).unwrap();
    scene.toggle();
    tick_for(&mut scene, 3);
    scene.toggle();
    let stats = tick_for(&mut scene, 1500);

    assert_eq!(stats.settled, scene.particle_count());
    for population in scene.populations() {
        assert_eq!(population.live(), population.assembled_targets());
    }
}

#[test]
fn test_idle_motion_is_bounded_and_not_accumulated() {
    let mut config = MorphConfig::default();
    config.initial_state = TargetState::Dispersed;
    config.motion.bob_amplitude = 0.25;
    let mut scene = MorphScene::new(config).unwrap();

    for _ in 0..20 {
        tick_for(&mut scene, 60);
        for population in scene.populations() {
            assert_eq!(population.live(), population.dispersed_targets());
            for (slot, target) in population
                .instances()
                .transforms()
                .iter()
                .zip(population.dispersed_targets())
            {
                assert!((slot.translation().y - target.position.y).abs() <= 0.25 + 1e-4);
            }
        }
    }
}

#[test]
fn test_greeting_tween_completes() {
    let mut config = MorphConfig::greeting();
    config.populations[0].count = 800;
    config.display_text = TextConfig::greeting("Ada");
    let mut scene = MorphScene::new(config).unwrap();
    scene.toggle();

    // 4 s tween + 0.8 s stagger
    tick_for(&mut scene, 60 * 4);
    assert!(!scene.populations()[0].is_settled());
    tick_for(&mut scene, 60);
    assert!(scene.populations()[0].is_settled());

    scene.set_display_text("MERRY CHRISTMAS").unwrap();
    assert!(!scene.populations()[0].is_settled());
    tick_for(&mut scene, 60 * 5);
    let population = &scene.populations()[0];
    assert_eq!(population.live(), population.dispersed_targets());
}

#[test]
fn test_upload_through_sink() {
    #[derive(Default)]
    struct Counter {
        instances: usize,
        colors: usize,
    }
    impl InstanceSink for Counter {
        fn upload_transforms(&mut self, transforms: &[InstanceTransform]) {
            self.instances += transforms.len();
        }
        fn upload_colors(&mut self, colors: &[InstanceColor]) {
            self.colors += colors.len();
        }
    }

    let mut scene = MorphScene::new(MorphConfig::default()).unwrap();
    scene.tick(DT);
    let mut sink = Counter::default();
    for population in scene.populations_mut() {
        population.upload(&mut sink);
    }
    assert_eq!(sink.instances, 1950);
    assert_eq!(sink.colors, 1950);
}

#[test]
fn test_config_file_roundtrip() {
    let path = std::env::temp_dir().join(format!("arbor-config-{}.json", std::process::id()));
    let config = MorphConfig::greeting();
    config.save(&path).unwrap();
    let loaded = MorphConfig::load(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(config, loaded);
}

#[test]
fn test_missing_config_file_is_io_error() {
    let err = MorphConfig::load("/nonexistent/arbor/config.json").unwrap_err();
    assert!(matches!(err, ArborError::Io(_)));
}
