//! Critically damped smoothing.
//!
//! A spring-damper approximation (the "smooth damp" formulation): each value
//! carries its own velocity and decelerates into the target without
//! oscillating. The result is clamped so it never passes the target.

use glam::Vec3;

/// Values closer than this snap onto the target and stop moving.
pub const DAMP_EPSILON: f32 = 0.001;

#[inline]
fn ease_exp(x: f32) -> f32 {
    1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x)
}

/// A scalar moved toward a target with critically damped smoothing.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Damped {
    pub value: f32,
    velocity: f32,
}

impl Damped {
    pub const fn new(value: f32) -> Self {
        Self {
            value,
            velocity: 0.0,
        }
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    /// Advance toward `target` over `delta` seconds. Returns `false` once the
    /// value has settled on the target.
    pub fn damp(&mut self, target: f32, smooth_time: f32, delta: f32) -> bool {
        if (self.value - target).abs() <= DAMP_EPSILON {
            self.value = target;
            self.velocity = 0.0;
            return false;
        }
        if delta <= 0.0 {
            return true;
        }
        let smooth_time = smooth_time.max(0.0001);
        let omega = 2.0 / smooth_time;
        let t = ease_exp(omega * delta);
        let change = self.value - target;
        let temp = (self.velocity + omega * change) * delta;
        self.velocity = (self.velocity - omega * temp) * t;
        let mut output = target + (change + temp) * t;

        // Never step past the target.
        if (target - self.value > 0.0) == (output > target) {
            output = target;
            self.velocity = 0.0;
        }
        self.value = output;
        true
    }

    /// Jump to `value` and drop any accumulated velocity.
    pub fn reset(&mut self, value: f32) {
        self.value = value;
        self.velocity = 0.0;
    }
}

/// Per-axis damping for positions.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DampedVec3 {
    x: Damped,
    y: Damped,
    z: Damped,
}

impl DampedVec3 {
    pub const fn new(v: Vec3) -> Self {
        Self {
            x: Damped::new(v.x),
            y: Damped::new(v.y),
            z: Damped::new(v.z),
        }
    }

    #[inline]
    pub fn value(&self) -> Vec3 {
        Vec3::new(self.x.value, self.y.value, self.z.value)
    }

    pub fn damp(&mut self, target: Vec3, smooth_time: f32, delta: f32) -> bool {
        let mx = self.x.damp(target.x, smooth_time, delta);
        let my = self.y.damp(target.y, smooth_time, delta);
        let mz = self.z.damp(target.z, smooth_time, delta);
        mx || my || mz
    }

    pub fn reset(&mut self, v: Vec3) {
        self.x.reset(v.x);
        self.y.reset(v.y);
        self.z.reset(v.z);
    }
}

/// Exponential follow used for the ring's vertical offset. Frame-rate
/// dependent: each call closes `factor` of the remaining gap.
#[inline]
pub fn follow(current: f32, target: f32, factor: f32) -> f32 {
    current + (target - current) * factor
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settles_within_epsilon_and_snaps() {
        let mut d = Damped::new(0.0);
        for _ in 0..600 {
            d.damp(1.0, 0.22, 1.0 / 60.0);
        }
        assert_eq!(d.value, 1.0);
        assert!(!d.damp(1.0, 0.22, 1.0 / 60.0));
    }

    #[test]
    fn zero_delta_does_not_move() {
        let mut d = Damped::new(3.0);
        d.damp(10.0, 0.15, 0.0);
        assert_eq!(d.value, 3.0);
    }

    #[test]
    fn follow_closes_fraction_of_gap() {
        assert!((follow(0.0, 100.0, 0.1) - 10.0).abs() < 1e-6);
        assert!((follow(100.0, 100.0, 0.1) - 100.0).abs() < 1e-6);
    }
}
