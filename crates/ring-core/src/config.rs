//! Runtime configuration for the ring and the compositor.
//!
//! Every field defaults to the art-direction constant of the same purpose in
//! [`crate::constants`]. The front-end never exposes these as user options;
//! they exist so tests and alternative hosts can build smaller or larger
//! rings without touching the constants.

use glam::Vec3;

use crate::constants::*;
use crate::error::{Result, RingError};

/// Stencil buffers are 8 bits wide and id 0 is the cleared background.
pub const MAX_STENCIL_TILES: usize = 255;

#[derive(Clone, Debug)]
pub struct RingConfig {
    pub num_tiles: usize,
    pub radius: f32,
    pub drag_offset: f32,
    pub content_offset: f32,
    pub angle_offset: f32,
    pub hero_index: usize,
    pub radius_jitter: f32,
    pub vertical_jitter: f32,
    pub seed: u64,

    pub tile_width: f32,
    pub tile_height: f32,

    pub start_y: f32,
    pub max_pitch: f32,
    pub drag_sensitivity: f32,
    pub rotation_smooth_time: f32,
    pub position_smooth_time: f32,

    pub click_threshold_sec: f32,
    pub scroll_limit: f32,

    pub animation_names: Vec<String>,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            num_tiles: NUM_TILES,
            radius: RING_RADIUS,
            drag_offset: DRAG_RADIUS_OFFSET,
            content_offset: CONTENT_RADIUS_OFFSET,
            angle_offset: TILE_ANGLE_OFFSET_DEG.to_radians(),
            hero_index: HERO_TILE_INDEX,
            radius_jitter: RADIUS_JITTER,
            vertical_jitter: VERTICAL_JITTER,
            seed: LAYOUT_SEED,
            tile_width: TILE_WIDTH,
            tile_height: TILE_HEIGHT,
            start_y: RING_START_Y,
            max_pitch: MAX_PITCH_DEG.to_radians(),
            drag_sensitivity: DRAG_SENSITIVITY,
            rotation_smooth_time: ROTATION_SMOOTH_TIME,
            position_smooth_time: POSITION_SMOOTH_TIME,
            click_threshold_sec: CLICK_THRESHOLD_SEC,
            scroll_limit: SCROLL_LIMIT,
            animation_names: TILE_ANIMATION_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl RingConfig {
    /// Angle between neighbouring tiles.
    #[inline]
    pub fn angle_increment(&self) -> f32 {
        std::f32::consts::TAU / self.num_tiles as f32
    }

    /// Clip name for the character inside tile `index`.
    pub fn animation_name(&self, index: usize) -> Option<&str> {
        if self.animation_names.is_empty() {
            return None;
        }
        Some(self.animation_names[index % self.animation_names.len()].as_str())
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_tiles == 0 || self.num_tiles > MAX_STENCIL_TILES {
            return Err(RingError::InvalidConfig(format!(
                "num_tiles must be in 1..={MAX_STENCIL_TILES}, got {}",
                self.num_tiles
            )));
        }
        if self.hero_index >= self.num_tiles {
            return Err(RingError::InvalidConfig(format!(
                "hero_index {} outside ring of {} tiles",
                self.hero_index, self.num_tiles
            )));
        }
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(RingError::InvalidConfig(format!(
                "radius must be positive, got {}",
                self.radius
            )));
        }
        if !(0.0..self.radius).contains(&self.drag_offset) {
            return Err(RingError::InvalidConfig(format!(
                "drag_offset {} must be in [0, radius)",
                self.drag_offset
            )));
        }
        if self.radius_jitter < 0.0 || self.radius_jitter >= self.radius {
            return Err(RingError::InvalidConfig(format!(
                "radius_jitter {} must be in [0, radius)",
                self.radius_jitter
            )));
        }
        if self.rotation_smooth_time <= 0.0 || self.position_smooth_time <= 0.0 {
            return Err(RingError::InvalidConfig(
                "smoothing times must be positive".to_string(),
            ));
        }
        if !(self.scroll_limit > 0.0 && self.scroll_limit < 1.0) {
            return Err(RingError::InvalidConfig(format!(
                "scroll_limit must be in (0, 1), got {}",
                self.scroll_limit
            )));
        }
        if self.tile_width <= 0.0 || self.tile_height <= 0.0 {
            return Err(RingError::InvalidConfig(
                "tile design size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BloomSettings {
    pub intensity: f32,
    pub radius: f32,
    pub luminance_threshold: f32,
    pub levels: u32,
    pub mipmap_blur: bool,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            intensity: BLOOM_INTENSITY,
            radius: BLOOM_RADIUS,
            luminance_threshold: BLOOM_LUMINANCE_THRESHOLD,
            levels: BLOOM_LEVELS,
            mipmap_blur: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DistortionSettings {
    pub max_amplitude: f32,
    pub blend: f32,
}

impl Default for DistortionSettings {
    fn default() -> Self {
        Self {
            max_amplitude: DISTORTION_MAX_AMPLITUDE,
            blend: DISTORTION_BLEND,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CameraSettings {
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub zoom_offset: f32,
    pub zoom_smooth_time: f32,
    pub sway_max_pitch: f32,
    pub sway_max_yaw: f32,
    pub sway_smooth_time: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov_y: CAMERA_FOV_DEG.to_radians(),
            near: CAMERA_NEAR,
            far: CAMERA_FAR,
            position: CAMERA_POSITION,
            zoom_offset: CAMERA_ZOOM_OFFSET,
            zoom_smooth_time: CAMERA_ZOOM_SMOOTH_TIME,
            sway_max_pitch: CAMERA_SWAY_MAX_PITCH,
            sway_max_yaw: CAMERA_SWAY_MAX_YAW,
            sway_smooth_time: CAMERA_SWAY_SMOOTH_TIME,
        }
    }
}
