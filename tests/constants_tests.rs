// Host-side tests for constants and their mathematical relationships.
// The main crate is wasm-only, so we include the pure-Rust modules directly.

#![allow(dead_code)]
mod constants {
    include!("../src/constants.rs");
}

use constants::*;

#[test]
#[allow(clippy::assertions_on_constants)]
fn constants_are_within_reasonable_bounds() {
    assert!(!CANVAS_ID.is_empty());
    assert!(ASSET_BASE_URL.ends_with('/'));

    // Backing store never goes below CSS resolution
    assert!(MAX_DEVICE_PIXEL_RATIO >= 1.0);

    // A clamped frame still advances the scene
    assert!(MAX_FRAME_DELTA_SEC > 0.0 && MAX_FRAME_DELTA_SEC <= 0.25);

    assert!(CLEAR_COLOR_HEX <= 0xff_ffff);
}

#[test]
#[allow(clippy::assertions_on_constants)]
fn trail_constants_are_consistent() {
    assert!(TRAIL_TEXTURE_SIZE.is_power_of_two());
    assert!(TRAIL_MAX_POINTS > 1);
    assert!(TRAIL_MAX_AGE_SEC > 0.0);

    // Splat radius is in uv units and must cover at least one texel
    assert!(TRAIL_RADIUS > 0.0 && TRAIL_RADIUS < 0.5);
    assert!(TRAIL_RADIUS * TRAIL_TEXTURE_SIZE as f32 >= 1.0);
    assert!(TRAIL_SPEED_SCALE > 0.0);
}

#[test]
#[allow(clippy::assertions_on_constants)]
fn model_uniform_stride_meets_offset_alignment() {
    // minUniformBufferOffsetAlignment is 256 on every WebGPU implementation
    assert_eq!(MODEL_UNIFORM_STRIDE % 256, 0);
    assert!(INITIAL_MODEL_SLOTS > 0);
}

#[test]
#[allow(clippy::assertions_on_constants)]
fn joint_palette_slots_fit_a_uniform_binding() {
    assert_eq!(JOINT_PALETTE_STRIDE % 256, 0);
    // maxUniformBufferBindingSize is at least 64 KiB
    assert!(JOINT_PALETTE_STRIDE <= 64 * 1024);
    assert!(INITIAL_JOINT_SLOTS >= 2);
}
