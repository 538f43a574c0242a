use std::collections::HashSet;
use std::f32::consts::{PI, TAU};

use glam::Vec3;
use ring_core::damp::{Damped, DAMP_EPSILON};
use ring_core::interaction::snap_to_nearest_tile;
use ring_core::layout::{compute_layout, drag_ratio, tile_angle};
use ring_core::stencil::{StencilState, TileStencil};
use ring_core::{RingConfig, StencilId};

fn horizontal_radius(p: Vec3) -> f32 {
    Vec3::new(p.x, 0.0, p.z).length()
}

#[test]
fn tiles_sit_on_the_ring_within_jitter() {
    let cfg = RingConfig::default();
    let inc = TAU / cfg.num_tiles as f32;
    for p in compute_layout(&cfg).unwrap() {
        let expected = p.index as f32 * inc + 30f32.to_radians();
        assert!((p.angle - expected).abs() < 1e-5);
        assert!((tile_angle(&cfg, p.index) - expected).abs() < 1e-5);

        let r = horizontal_radius(p.shape_position);
        assert!(
            (r - cfg.radius).abs() <= cfg.radius_jitter + 1e-2,
            "tile {} at radius {r}",
            p.index
        );
        let dir = p.shape_position.normalize();
        assert!((dir.z.atan2(dir.x).rem_euclid(TAU) - expected.rem_euclid(TAU)).abs() < 1e-4);
    }
}

#[test]
fn drag_and_rest_positions_share_a_ray() {
    let cfg = RingConfig::default();
    let ratio = drag_ratio(&cfg);
    for p in compute_layout(&cfg).unwrap() {
        let rest = p.rest_position.normalize();
        let drag = p.drag_position.normalize();
        assert!(rest.cross(drag).length() < 1e-5);
        assert!(rest.dot(drag) > 0.0);
        assert!((p.drag_position.length() / p.rest_position.length() - ratio).abs() < 1e-5);
    }
}

#[test]
fn snap_picks_nearest_tile() {
    let inc = TAU / 9.0;
    let (index, yaw) = snap_to_nearest_tile(1.9 * inc, 9);
    assert_eq!(index, 2);
    assert!((yaw - 2.0 * inc).abs() < 1e-5);

    let (index, yaw) = snap_to_nearest_tile(-1.4 * inc, 9);
    assert_eq!(index, -1);
    assert!((yaw + inc).abs() < 1e-5);
}

#[test]
fn snap_takes_the_short_way_near_pi() {
    // With an even tile count a yaw just past pi rounds onto the tile at pi;
    // the result must never be more than half an increment away.
    for n in [4usize, 6, 9] {
        let inc = TAU / n as f32;
        for yaw in [PI - 0.01, PI + 0.01, -PI + 0.01, -PI - 0.01, 3.0 * PI - 0.2] {
            let (index, target) = snap_to_nearest_tile(yaw, n);
            assert!(
                (target - yaw).abs() <= inc / 2.0 + 1e-4,
                "n={n} yaw={yaw} -> {target}"
            );
            assert!((target - index as f32 * inc).abs() < 1e-4);
        }
    }
}

#[test]
fn damping_converges_without_overshoot() {
    for (start, target) in [(0.0f32, 1.0f32), (5.0, -3.0), (-0.5, 0.25)] {
        let mut d = Damped::new(start);
        let mut delta = 1.0 / 30.0;
        let mut elapsed = 0.0;
        while elapsed < 20.0 {
            d.damp(target, 0.22, delta);
            elapsed += delta;
            let past = if target > start {
                d.value > target
            } else {
                d.value < target
            };
            assert!(!past, "overshot {target} at {}", d.value);
            delta = (delta * 0.99).max(1e-3);
        }
        assert!((d.value - target).abs() <= DAMP_EPSILON);
    }
}

#[test]
fn stencil_ids_are_unique_and_nonzero() {
    let cfg = RingConfig::default();
    let mut seen = HashSet::new();
    for i in 0..cfg.num_tiles {
        let s = TileStencil::for_tile(i).unwrap();
        assert_ne!(s.id.get(), 0);
        assert!(seen.insert(s.id.get()));
        assert!(s.writer.is_writer());
        assert!(s.reader.is_reader());
    }
    assert!(StencilId::for_tile(255).is_err());
}

#[test]
fn stencil_reader_only_passes_own_id() {
    let a = TileStencil::for_tile(0).unwrap();
    let b = TileStencil::for_tile(1).unwrap();
    let stamped = a.writer.apply(0);
    assert!(a.reader.passes(stamped));
    assert!(!b.reader.passes(stamped));
    assert!(!a.reader.passes(0));
    assert!(StencilState::DISABLED.passes(stamped));
}

#[test]
fn hero_tile_is_on_axis() {
    let cfg = RingConfig {
        num_tiles: 9,
        radius: 1400.0,
        ..RingConfig::default()
    };
    let layout = compute_layout(&cfg).unwrap();
    let hero = &layout[6];
    assert!(hero.is_hero);
    assert_eq!(layout.iter().filter(|p| p.is_hero).count(), 1);
    assert_eq!(hero.shape_position.y, 0.0);
    assert_eq!(hero.rest_position.y, 0.0);
    assert!((hero.shape_position.length() - 1400.0).abs() < 1e-2);
}
