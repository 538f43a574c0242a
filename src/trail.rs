use std::collections::VecDeque;

use glam::{Vec2, Vec3};

/// Tuning for the pointer trail that feeds the distortion pass.
#[derive(Clone, Copy, Debug)]
pub struct TrailSettings {
    /// Texture edge length in texels.
    pub size: u32,
    pub max_points: usize,
    pub max_age: f32,
    /// Splat radius in uv units.
    pub radius: f32,
    /// Converts uv distance moved between samples into splat strength.
    pub speed_scale: f32,
}

#[derive(Clone, Copy, Debug)]
struct TrailPoint {
    pos: Vec2,
    dir: Vec2,
    strength: f32,
    age: f32,
}

/// Fading pointer trail rasterized into an RGBA8 image.
///
/// Each texel stores the push direction in `r`/`g` (remapped so that a
/// value of 128 means no offset) and the strength in `b`. The direction is
/// stored negated, matching the distortion shader's decode.
pub struct Trail {
    settings: TrailSettings,
    points: VecDeque<TrailPoint>,
    last: Option<Vec2>,
    accum: Vec<Vec3>,
    pixels: Vec<u8>,
    dirty: bool,
}

impl Trail {
    pub fn new(settings: TrailSettings) -> Self {
        let texels = (settings.size * settings.size) as usize;
        let mut trail = Self {
            settings,
            points: VecDeque::with_capacity(settings.max_points),
            last: None,
            accum: vec![Vec3::ZERO; texels],
            pixels: vec![0; texels * 4],
            dirty: true,
        };
        trail.rasterize();
        trail
    }

    #[inline]
    pub fn size(&self) -> u32 {
        self.settings.size
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Record a pointer position in `[0, 1]` uv. Stationary samples only
    /// move the anchor.
    pub fn add_point(&mut self, uv: Vec2) {
        let Some(last) = self.last.replace(uv) else {
            return;
        };
        let step = uv - last;
        let dist = step.length();
        if dist <= f32::EPSILON {
            return;
        }
        if self.points.len() == self.settings.max_points {
            self.points.pop_front();
        }
        self.points.push_back(TrailPoint {
            pos: uv,
            dir: step / dist,
            strength: (dist * self.settings.speed_scale).min(1.0),
            age: 0.0,
        });
    }

    /// Age every point, drop expired ones and re-rasterize. Returns whether
    /// the image changed and needs uploading.
    pub fn update(&mut self, delta: f32) -> bool {
        let max_age = self.settings.max_age;
        for p in self.points.iter_mut() {
            p.age += delta.max(0.0);
        }
        self.points.retain(|p| p.age < max_age);
        if self.points.is_empty() && !self.dirty {
            return false;
        }
        self.rasterize();
        // An empty trail needs one more upload to clear the texture.
        self.dirty = !self.points.is_empty();
        true
    }

    fn rasterize(&mut self) {
        let size = self.settings.size as i32;
        let radius = self.settings.radius.max(1e-4);
        let max_age = self.settings.max_age.max(1e-4);
        self.accum.fill(Vec3::ZERO);

        for p in &self.points {
            let life = (1.0 - p.age / max_age).max(0.0);
            let weight = p.strength * life;
            if weight <= 0.0 {
                continue;
            }
            let x0 = (((p.pos.x - radius) * size as f32).floor() as i32).max(0);
            let x1 = (((p.pos.x + radius) * size as f32).ceil() as i32).min(size - 1);
            let y0 = (((p.pos.y - radius) * size as f32).floor() as i32).max(0);
            let y1 = (((p.pos.y + radius) * size as f32).ceil() as i32).min(size - 1);
            for y in y0..=y1 {
                for x in x0..=x1 {
                    let texel = Vec2::new(
                        (x as f32 + 0.5) / size as f32,
                        (y as f32 + 0.5) / size as f32,
                    );
                    let d = texel.distance(p.pos) / radius;
                    if d >= 1.0 {
                        continue;
                    }
                    let falloff = (1.0 - d) * (1.0 - d) * weight;
                    let a = &mut self.accum[(y * size + x) as usize];
                    *a += Vec3::new(p.dir.x * falloff, p.dir.y * falloff, falloff);
                }
            }
        }

        for (texel, a) in self.pixels.chunks_exact_mut(4).zip(self.accum.iter()) {
            let intensity = a.z.min(1.0);
            let dir = Vec2::new(a.x, a.y).normalize_or_zero();
            texel[0] = encode_unit(-dir.x);
            texel[1] = encode_unit(-dir.y);
            texel[2] = (intensity * 255.0).round() as u8;
            texel[3] = 255;
        }
    }
}

/// `[-1, 1]` to a byte, 0 landing on 128.
#[inline]
fn encode_unit(v: f32) -> u8 {
    ((v.clamp(-1.0, 1.0) * 0.5 + 0.5) * 255.0).round() as u8
}
