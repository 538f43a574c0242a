use glam::Vec3;

// Art-direction defaults for the ring and its content. Distances are in
// scene units (the loaded models are authored at roughly 1 unit = 1 mm).

// Ring layout
pub const NUM_TILES: usize = 9;
pub const RING_RADIUS: f32 = 1400.0;
pub const DRAG_RADIUS_OFFSET: f32 = 250.0; // inward pull of tile content while dragging
pub const CONTENT_RADIUS_OFFSET: f32 = 2000.0; // inner group sits this far past the cutout
pub const TILE_ANGLE_OFFSET_DEG: f32 = 30.0;
pub const HERO_TILE_INDEX: usize = 6;
pub const RADIUS_JITTER: f32 = 400.0; // +/- applied to non-hero tiles
pub const VERTICAL_JITTER: f32 = 0.2; // +/- fraction of the jittered radius
pub const LAYOUT_SEED: u64 = 42;

// Model paths, relative to the page
pub const SHAPE_MODEL_PATH: &str = "phone_screen.glb";
pub const FRAME_MODEL_PATH: &str = "phoneBody11.glb";
pub const CHARACTER_MODEL_PATH: &str = "Avatar_Animations_3.glb";
pub const LANDSCAPE_MODEL_PATH: &str = "tunnel.glb";
pub const CLIMBER_MODEL_PATH: &str = "Avatar_Animations_Climbing.glb";

// Tile design size (cutout fitted into this box)
pub const TILE_WIDTH: f32 = 750.0;
pub const TILE_HEIGHT: f32 = 1300.0;
pub const SHAPE_FIT_MARGIN: f32 = 0.97;

// Nested content scale relative to the fitted cutout
pub const CHARACTER_SCALE: f32 = 0.05;
pub const LANDSCAPE_SCALE: f32 = 0.015;
pub const LANDSCAPE_SCALE_BOOST: f32 = 4.0;
pub const CHARACTER_DROP_Y: f32 = 850.0;
pub const LANDSCAPE_DROP_Y: f32 = 900.0;
pub const CLIMBER_PULL_Z: f32 = 600.0;

// Ring vertical intro, follows scroll
pub const RING_START_Y: f32 = 4000.0;
pub const RING_Y_FOLLOW: f32 = 0.1; // per-frame fraction of the remaining distance

// Rotation
pub const MAX_PITCH_DEG: f32 = 15.0;
pub const DRAG_SENSITIVITY: f32 = 0.002; // radians per pixel
pub const ROTATION_SMOOTH_TIME: f32 = 0.22;
pub const POSITION_SMOOTH_TIME: f32 = 0.15;
pub const SNAP_SETTLE_EPSILON: f32 = 1e-3;

// Gestures
pub const CLICK_THRESHOLD_SEC: f32 = 0.95; // shorter press-release counts as a click

// Scroll
pub const SCROLL_LIMIT: f32 = 0.8;

// Hero cross-fade sequence
pub const CROSSFADE_DURATION_SEC: f32 = 0.5;
pub const SECOND_STAGE_AT_SEC: f32 = 2.0;
pub const REVEAL_AT_SEC: f32 = 3.5;

// Camera
pub const CAMERA_FOV_DEG: f32 = 50.0;
pub const CAMERA_NEAR: f32 = 0.1;
pub const CAMERA_FAR: f32 = 34000.0;
pub const CAMERA_POSITION: Vec3 = Vec3::new(1.0, -3000.0, 500.0);
pub const CAMERA_ZOOM_OFFSET: f32 = 600.0; // pushed back along +Z on tile click
pub const CAMERA_ZOOM_SMOOTH_TIME: f32 = 0.35;
pub const CAMERA_SWAY_MAX_PITCH: f32 = 0.02;
pub const CAMERA_SWAY_MAX_YAW: f32 = 0.07;
pub const CAMERA_SWAY_SMOOTH_TIME: f32 = 0.1;

// Lights
pub const AMBIENT_INTENSITY: f32 = 0.1;
pub const KEY_LIGHT_COLOR: u32 = 0xcab4b3;
pub const KEY_LIGHT_INTENSITY: f32 = 65940.0;
pub const KEY_LIGHT_DISTANCE: f32 = 2781.0;
pub const KEY_LIGHT_DECAY: f32 = 1.04;
pub const KEY_LIGHT_POSITION: Vec3 = Vec3::new(-197.0, 70.0, -1761.0);
pub const KEY_LIGHT_DISTANCE_MIN: f32 = 3443.0; // distance once past the scroll limit
pub const KEY_LIGHT_DISTANCE_MAX: f32 = 25000.0;
pub const FILL_LIGHT_INTENSITY: f32 = 22000.0;
pub const FILL_LIGHT_DISTANCE: f32 = 2119.0;
pub const FILL_LIGHT_DECAY: f32 = 1.24;
pub const FILL_LIGHT_POSITION: Vec3 = Vec3::new(40.0, -1600.0, -500.0);
pub const WARNING_COLOR: u32 = 0xcd7878;
pub const BLINK_DURATION_SEC: f32 = 3.0;
pub const BLINK_INTERVAL_SEC: f32 = 0.4;

// Post-processing
pub const DISTORTION_MAX_AMPLITUDE: f32 = 0.2;
pub const DISTORTION_BLEND: f32 = 0.02;
pub const BLOOM_INTENSITY: f32 = 3.2;
pub const BLOOM_RADIUS: f32 = 0.5;
pub const BLOOM_LUMINANCE_THRESHOLD: f32 = 0.4;
pub const BLOOM_LEVELS: u32 = 4;

// Materials
pub const SHAPE_COLOR: u32 = 0x000000;
pub const CHARACTER_COLOR: u32 = 0x999999;
pub const CLIMBER_COLOR: u32 = 0xc7c7c7;
pub const LANDSCAPE_COLOR: u32 = 0xadd8e6;
pub const FRAME_COLOR: u32 = 0x202020;

/// Clip names baked into the tile character asset, cycled by tile index.
pub const TILE_ANIMATION_NAMES: [&str; 6] = [
    "Armature.002|mixamo.com|Layer0.001 Retarget",
    "Armature.002|mixamo.com|Layer0 Retarget",
    "Armature.003|mixamo.com|Layer0 Retarget",
    "Armature.004|mixamo.com|Layer0 Retarget",
    "Armature.001|mixamo.com|Layer0.001 Retarget",
    "Armature.001|mixamo.com|Layer0 Retarget",
];

pub const CLIMBER_PRIMARY_CLIP: &str = "Armature.003|mixamo.com|Layer0.001 Retarget";
pub const CLIMBER_SECONDARY_CLIP: &str = "Armature.002|mixamo.com|Layer0.002 Retarget";
pub const CLIMBER_TERTIARY_CLIP: &str = "Armature.002|mixamo.com|Layer0.003 Retarget";

/// Convert a packed `0xRRGGBB` colour into linear-ish `[0, 1]` components.
#[inline]
pub fn rgb_hex(hex: u32) -> Vec3 {
    Vec3::new(
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    )
}
