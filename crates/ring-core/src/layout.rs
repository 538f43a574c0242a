//! Static placement of tiles around the ring.
//!
//! Tiles sit on a circle around the vertical axis. Each one gets a cutout
//! position on the ring itself and an inner content anchor further out along
//! the same ray. While the user drags, the content anchor is pulled inward to
//! `drag_position`; otherwise it rests at `rest_position`. Both are computed
//! once here and treated as read-only targets afterwards.

use glam::{Mat3, Quat, Vec3};
use rand::prelude::*;

use crate::config::RingConfig;
use crate::error::Result;

#[derive(Clone, Debug, PartialEq)]
pub struct TilePlacement {
    pub index: usize,
    pub angle: f32,
    pub is_hero: bool,
    /// Where the stencil cutout and its frame sit.
    pub shape_position: Vec3,
    /// Inner content anchor when idle.
    pub rest_position: Vec3,
    /// Inner content anchor while dragging; same ray as `rest_position`.
    pub drag_position: Vec3,
    /// Rotation turning the tile's +Z toward the ring axis.
    pub orientation: Quat,
}

#[inline]
fn jitter(rng: &mut StdRng, amount: f32) -> f32 {
    if amount > 0.0 {
        rng.gen_range(-amount..amount)
    } else {
        0.0
    }
}

/// Orientation whose +Z axis points along `forward`, keeping +Y as close to
/// world up as possible.
pub fn look_rotation(forward: Vec3) -> Quat {
    let z = forward.normalize_or_zero();
    if z == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    let mut x = Vec3::Y.cross(z);
    if x.length_squared() < 1e-8 {
        x = Vec3::X;
    }
    let x = x.normalize();
    let y = z.cross(x);
    Quat::from_mat3(&Mat3::from_cols(x, y, z))
}

/// Angle of tile `index` around the ring.
#[inline]
pub fn tile_angle(config: &RingConfig, index: usize) -> f32 {
    index as f32 * config.angle_increment() + config.angle_offset
}

/// Scale applied to a rest position to get its drag position.
#[inline]
pub fn drag_ratio(config: &RingConfig) -> f32 {
    (config.radius - config.drag_offset) / config.radius
}

/// Place every tile. Jitter comes from a RNG seeded with `config.seed`, so a
/// given configuration always produces the same ring.
pub fn compute_layout(config: &RingConfig) -> Result<Vec<TilePlacement>> {
    config.validate()?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let ratio = drag_ratio(config);

    let placements = (0..config.num_tiles)
        .map(|index| {
            let is_hero = index == config.hero_index;
            let angle = tile_angle(config, index);
            let (sin, cos) = angle.sin_cos();

            // Draw both samples for every tile so the hero does not shift
            // the sequence seen by the tiles after it.
            let vertical = jitter(&mut rng, config.vertical_jitter);
            let radial = jitter(&mut rng, config.radius_jitter);
            let (vertical, radial) = if is_hero { (0.0, 0.0) } else { (vertical, radial) };

            let ray = Vec3::new(cos, vertical, sin);
            let shape_position = ray * (config.radius + radial);
            let rest_position = ray * (config.radius + config.content_offset + radial);
            let drag_position = rest_position * ratio;
            let orientation = look_rotation(-shape_position);

            TilePlacement {
                index,
                angle,
                is_hero,
                shape_position,
                rest_position,
                drag_position,
                orientation,
            }
        })
        .collect();
    Ok(placements)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn look_rotation_maps_z_onto_forward() {
        let fwd = Vec3::new(-1.0, 0.0, 0.0);
        let q = look_rotation(fwd);
        assert!((q * Vec3::Z - fwd).length() < 1e-5);
        assert!((q * Vec3::Y - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn same_seed_same_ring() {
        let cfg = RingConfig::default();
        assert_eq!(compute_layout(&cfg).unwrap(), compute_layout(&cfg).unwrap());
    }
}
