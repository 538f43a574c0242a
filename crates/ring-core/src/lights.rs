use glam::Vec3;

use crate::constants::*;
use crate::damp::lerp;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointLight {
    pub color: Vec3,
    pub intensity: f32,
    /// Range after which the light contributes nothing; 0 means unlimited.
    pub distance: f32,
    pub decay: f32,
    pub position: Vec3,
}

/// Key light flashing between its colour and a warning colour.
#[derive(Clone, Copy, Debug)]
pub struct LightBlink {
    pub elapsed: f32,
    pub duration: f32,
    pub interval: f32,
    pub color: Vec3,
}

impl LightBlink {
    pub fn new(duration: f32, interval: f32, color: Vec3) -> Self {
        Self {
            elapsed: 0.0,
            duration,
            interval,
            color,
        }
    }

    pub fn finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// The warning colour shows on every other interval tick.
    pub fn showing_warning(&self) -> bool {
        if self.finished() || self.interval <= 0.0 {
            return false;
        }
        ((self.elapsed / self.interval).floor() as u32) % 2 == 1
    }
}

#[derive(Clone, Debug)]
pub struct SceneLights {
    pub ambient_color: Vec3,
    pub ambient_intensity: f32,
    pub key: PointLight,
    pub fill: PointLight,
    key_base_color: Vec3,
    blink: Option<LightBlink>,
}

impl Default for SceneLights {
    fn default() -> Self {
        let key_color = rgb_hex(KEY_LIGHT_COLOR);
        Self {
            ambient_color: Vec3::ONE,
            ambient_intensity: AMBIENT_INTENSITY,
            key: PointLight {
                color: key_color,
                intensity: KEY_LIGHT_INTENSITY,
                distance: KEY_LIGHT_DISTANCE,
                decay: KEY_LIGHT_DECAY,
                position: KEY_LIGHT_POSITION,
            },
            fill: PointLight {
                color: key_color,
                intensity: FILL_LIGHT_INTENSITY,
                distance: FILL_LIGHT_DISTANCE,
                decay: FILL_LIGHT_DECAY,
                position: FILL_LIGHT_POSITION,
            },
            key_base_color: key_color,
            blink: None,
        }
    }
}

impl SceneLights {
    /// Start (or restart) the warning blink on the key light.
    pub fn start_blink(&mut self) {
        self.blink = Some(LightBlink::new(
            BLINK_DURATION_SEC,
            BLINK_INTERVAL_SEC,
            rgb_hex(WARNING_COLOR),
        ));
    }

    pub fn is_blinking(&self) -> bool {
        self.blink.is_some()
    }

    /// Past the scroll limit the key light reaches further as the page
    /// approaches its end.
    pub fn apply_scroll(&mut self, fraction: f32, limit: f32) {
        if fraction < limit || limit >= 1.0 {
            return;
        }
        let t = ((fraction - limit) / (1.0 - limit)).clamp(0.0, 1.0);
        self.key.distance = lerp(KEY_LIGHT_DISTANCE_MIN, KEY_LIGHT_DISTANCE_MAX, t);
    }

    pub fn update(&mut self, delta: f32) {
        let Some(blink) = self.blink.as_mut() else {
            return;
        };
        blink.elapsed += delta.max(0.0);
        if blink.finished() {
            self.blink = None;
            self.key.color = self.key_base_color;
            return;
        }
        self.key.color = if blink.showing_warning() {
            blink.color
        } else {
            self.key_base_color
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blink_alternates_then_restores() {
        let mut lights = SceneLights::default();
        let base = lights.key.color;
        lights.start_blink();
        lights.update(0.1);
        assert_eq!(lights.key.color, base);
        lights.update(0.4);
        assert_eq!(lights.key.color, rgb_hex(WARNING_COLOR));
        lights.update(3.0);
        assert_eq!(lights.key.color, base);
        assert!(!lights.is_blinking());
    }

    #[test]
    fn scroll_past_limit_extends_key_light() {
        let mut lights = SceneLights::default();
        lights.apply_scroll(0.5, 0.8);
        assert_eq!(lights.key.distance, KEY_LIGHT_DISTANCE);
        lights.apply_scroll(1.0, 0.8);
        assert!((lights.key.distance - KEY_LIGHT_DISTANCE_MAX).abs() < 1e-2);
    }
}
