// Host-side tests for pointer gesture tracking and viewport mapping.
// The main crate is wasm-only, so we include the pure-Rust modules directly.

#![allow(dead_code)]
mod gesture {
    include!("../src/gesture.rs");
}

use gesture::*;
use glam::Vec2;

#[test]
fn press_starts_without_dragging() {
    let mut g = DragGesture::default();
    let input = g.press(1, Vec2::new(10.0, 20.0)).expect("press");
    assert_eq!(input.delta, Vec2::ZERO);
    assert!(!input.dragging);
    assert!(g.is_active());
    assert!(!g.has_moved());
}

#[test]
fn second_pointer_is_ignored_while_active() {
    let mut g = DragGesture::default();
    g.press(1, Vec2::ZERO);
    assert!(g.press(2, Vec2::ONE).is_none());
    assert!(g.motion(2, Vec2::new(5.0, 5.0)).is_none());
    assert!(g.release(2, Vec2::ONE).is_none());
    assert!(g.is_active());
}

#[test]
fn motion_reports_incremental_deltas() {
    let mut g = DragGesture::default();
    g.press(7, Vec2::new(100.0, 100.0));

    let a = g.motion(7, Vec2::new(110.0, 95.0)).expect("move");
    assert_eq!(a.delta, Vec2::new(10.0, -5.0));
    assert!(a.dragging);

    let b = g.motion(7, Vec2::new(112.0, 95.0)).expect("move");
    assert_eq!(b.delta, Vec2::new(2.0, 0.0));

    // Same position again carries nothing
    assert!(g.motion(7, Vec2::new(112.0, 95.0)).is_none());
    assert!(g.has_moved());
}

#[test]
fn release_ends_the_gesture_with_final_delta() {
    let mut g = DragGesture::default();
    g.press(3, Vec2::ZERO);
    g.motion(3, Vec2::new(4.0, 0.0));
    let end = g.release(3, Vec2::new(6.0, 1.0)).expect("release");
    assert_eq!(end.delta, Vec2::new(2.0, 1.0));
    assert!(!end.dragging);
    assert!(!g.is_active());

    // Motion without a press is not a drag
    assert!(g.motion(3, Vec2::new(9.0, 9.0)).is_none());
    assert!(g.press(4, Vec2::ZERO).is_some());
}

#[test]
fn ndc_maps_corners_with_y_up() {
    let vp = Vec2::new(800.0, 600.0);
    assert_eq!(client_to_ndc(Vec2::ZERO, vp), Vec2::new(-1.0, 1.0));
    assert_eq!(client_to_ndc(vp, vp), Vec2::new(1.0, -1.0));
    assert_eq!(client_to_ndc(vp * 0.5, vp), Vec2::ZERO);
    assert_eq!(client_to_ndc(Vec2::new(5.0, 5.0), Vec2::ZERO), Vec2::ZERO);
}

#[test]
fn uv_is_clamped_and_y_down() {
    let vp = Vec2::new(200.0, 100.0);
    assert_eq!(client_to_uv(Vec2::new(50.0, 25.0), vp), Vec2::new(0.25, 0.25));
    assert_eq!(client_to_uv(Vec2::new(-10.0, 300.0), vp), Vec2::new(0.0, 1.0));
    assert_eq!(client_to_uv(Vec2::ONE, Vec2::ZERO), Vec2::splat(0.5));
}
