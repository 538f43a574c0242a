/// Browser-side constants: DOM hooks, asset location, surface sizing and the
/// distortion trail. Art-direction values for the ring itself live in
/// `ring_core::constants`.
// Canvas element the renderer attaches to
pub const CANVAS_ID: &str = "canvas_main";

// Models are fetched relative to the page
pub const ASSET_BASE_URL: &str = "models/";

// Scene background (sRGB hex)
pub const CLEAR_COLOR_HEX: u32 = 0x040d11;

// Backing-store resolution cap
pub const MAX_DEVICE_PIXEL_RATIO: f64 = 1.3;

// Frame clock clamp so a backgrounded tab does not fast-forward the scene
pub const MAX_FRAME_DELTA_SEC: f32 = 0.1;

// Distortion trail texture
pub const TRAIL_TEXTURE_SIZE: u32 = 64; // square, texels
pub const TRAIL_MAX_POINTS: usize = 48;
pub const TRAIL_MAX_AGE_SEC: f32 = 0.9;
pub const TRAIL_RADIUS: f32 = 0.08; // uv units
pub const TRAIL_SPEED_SCALE: f32 = 40.0; // uv distance per sample -> strength

// Per-draw model uniforms share one buffer at this stride (WebGPU's
// minUniformBufferOffsetAlignment)
pub const MODEL_UNIFORM_STRIDE: u64 = 256;
pub const INITIAL_MODEL_SLOTS: usize = 64;

// One joint palette slot: MAX_SKIN_JOINTS column-major mat4s. Also a
// multiple of the dynamic offset alignment above.
pub const JOINT_PALETTE_STRIDE: u64 = ring_core::MAX_SKIN_JOINTS as u64 * 64;
pub const INITIAL_JOINT_SLOTS: usize = 4;
