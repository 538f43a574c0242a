//! Joint hierarchies, keyframed joint tracks, and sampling them into
//! skinning matrices.
//!
//! A [`Skeleton`] holds each joint's rest pose and inverse bind matrix.
//! Clips carry one [`JointTrack`] per animated joint. Blending several
//! weighted clips gives a local pose, and [`Skeleton::skin_matrices`] turns
//! that pose into the palette a skinned mesh is drawn with.

use glam::{Mat4, Quat, Vec3, Vec4};

use crate::error::{Result, RingError};
use crate::scene::Transform;

/// Joints a single palette upload can address.
pub const MAX_SKIN_JOINTS: usize = 128;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interpolation {
    Linear,
    Step,
}

pub trait Interpolate: Copy {
    fn interpolate(a: Self, b: Self, t: f32) -> Self;
}

impl Interpolate for Vec3 {
    #[inline]
    fn interpolate(a: Self, b: Self, t: f32) -> Self {
        a.lerp(b, t)
    }
}

impl Interpolate for Quat {
    #[inline]
    fn interpolate(a: Self, b: Self, t: f32) -> Self {
        a.slerp(b, t)
    }
}

/// Non-empty keyframe list with ascending times.
#[derive(Clone, Debug, PartialEq)]
pub struct Keyframes<T> {
    times: Vec<f32>,
    values: Vec<T>,
    interpolation: Interpolation,
}

impl<T: Interpolate> Keyframes<T> {
    /// `None` when there are no keys or times and values disagree in length.
    pub fn new(times: Vec<f32>, values: Vec<T>, interpolation: Interpolation) -> Option<Self> {
        if times.is_empty() || times.len() != values.len() {
            return None;
        }
        Some(Self {
            times,
            values,
            interpolation,
        })
    }

    pub fn last_time(&self) -> f32 {
        self.times[self.times.len() - 1]
    }

    /// Value at `time`, holding the first and last keys outside the range.
    pub fn sample(&self, time: f32) -> T {
        let last = self.times.len() - 1;
        if time <= self.times[0] {
            return self.values[0];
        }
        if time >= self.times[last] {
            return self.values[last];
        }
        let next = self.times.partition_point(|t| *t <= time).clamp(1, last);
        let prev = next - 1;
        match self.interpolation {
            Interpolation::Step => self.values[prev],
            Interpolation::Linear => {
                let span = self.times[next] - self.times[prev];
                let f = if span > 0.0 {
                    (time - self.times[prev]) / span
                } else {
                    0.0
                };
                T::interpolate(self.values[prev], self.values[next], f)
            }
        }
    }
}

/// Animated channels of one joint within a clip.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct JointTrack {
    pub joint: usize,
    pub translation: Option<Keyframes<Vec3>>,
    pub rotation: Option<Keyframes<Quat>>,
    pub scale: Option<Keyframes<Vec3>>,
}

impl JointTrack {
    pub fn new(joint: usize) -> Self {
        Self {
            joint,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.translation.is_none() && self.rotation.is_none() && self.scale.is_none()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Joint {
    pub name: String,
    pub parent: Option<usize>,
    pub rest: Transform,
    pub inverse_bind: Mat4,
}

/// One clip's contribution to a blended pose.
#[derive(Clone, Copy, Debug)]
pub struct PoseLayer<'a> {
    pub tracks: &'a [JointTrack],
    pub time: f32,
    pub weight: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Skeleton {
    joints: Vec<Joint>,
    /// Transform of the non-joint ancestors above the root joints.
    root: Mat4,
    /// Joint indices with every parent ahead of its children.
    order: Vec<usize>,
}

impl Skeleton {
    pub fn new(joints: Vec<Joint>, root: Mat4) -> Result<Self> {
        if joints.is_empty() {
            return Err(RingError::InvalidSkeleton("no joints".into()));
        }
        for (i, joint) in joints.iter().enumerate() {
            if joint.parent.is_some_and(|p| p >= joints.len() || p == i) {
                return Err(RingError::InvalidSkeleton(format!(
                    "joint `{}` has a bad parent",
                    joint.name
                )));
            }
        }

        let mut order = Vec::with_capacity(joints.len());
        let mut placed = vec![false; joints.len()];
        while order.len() < joints.len() {
            let before = order.len();
            for (i, joint) in joints.iter().enumerate() {
                if placed[i] {
                    continue;
                }
                if joint.parent.map_or(true, |p| placed[p]) {
                    placed[i] = true;
                    order.push(i);
                }
            }
            if order.len() == before {
                return Err(RingError::InvalidSkeleton("joint parents form a cycle".into()));
            }
        }
        Ok(Self {
            joints,
            root,
            order,
        })
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    pub fn rest_pose(&self) -> Vec<Transform> {
        self.joints.iter().map(|j| j.rest).collect()
    }

    /// Blend weighted layers into local joint transforms. Channels the
    /// layers leave short of full weight are topped up from the rest pose.
    pub fn sample_pose<'a>(&self, layers: impl IntoIterator<Item = PoseLayer<'a>>) -> Vec<Transform> {
        let n = self.joints.len();
        let mut translations = vec![(Vec3::ZERO, 0.0_f32); n];
        let mut rotations = vec![(Vec4::ZERO, 0.0_f32); n];
        let mut scales = vec![(Vec3::ZERO, 0.0_f32); n];

        for layer in layers {
            if layer.weight <= 0.0 {
                continue;
            }
            let w = layer.weight;
            for track in layer.tracks {
                let Some(joint) = self.joints.get(track.joint) else {
                    continue;
                };
                if let Some(keys) = &track.translation {
                    let acc = &mut translations[track.joint];
                    acc.0 += keys.sample(layer.time) * w;
                    acc.1 += w;
                }
                if let Some(keys) = &track.rotation {
                    let mut q = Vec4::from(keys.sample(layer.time));
                    // Same hemisphere as the rest rotation so the sum doesn't cancel.
                    if q.dot(Vec4::from(joint.rest.rotation)) < 0.0 {
                        q = -q;
                    }
                    let acc = &mut rotations[track.joint];
                    acc.0 += q * w;
                    acc.1 += w;
                }
                if let Some(keys) = &track.scale {
                    let acc = &mut scales[track.joint];
                    acc.0 += keys.sample(layer.time) * w;
                    acc.1 += w;
                }
            }
        }

        self.joints
            .iter()
            .enumerate()
            .map(|(i, joint)| Transform {
                translation: blend_vec3(joint.rest.translation, translations[i]),
                rotation: blend_quat(joint.rest.rotation, rotations[i]),
                scale: blend_vec3(joint.rest.scale, scales[i]),
            })
            .collect()
    }

    /// Skinning palette for a local pose: each joint's model-space matrix
    /// times its inverse bind matrix. Joints missing from `locals` use their
    /// rest transform.
    pub fn skin_matrices(&self, locals: &[Transform]) -> Vec<Mat4> {
        let mut world = vec![Mat4::IDENTITY; self.joints.len()];
        for &i in &self.order {
            let joint = &self.joints[i];
            let local = locals.get(i).unwrap_or(&joint.rest).matrix();
            world[i] = match joint.parent {
                Some(p) => world[p] * local,
                None => self.root * local,
            };
        }
        world
            .iter()
            .zip(&self.joints)
            .map(|(w, j)| *w * j.inverse_bind)
            .collect()
    }

    pub fn rest_matrices(&self) -> Vec<Mat4> {
        self.skin_matrices(&[])
    }
}

fn blend_vec3(rest: Vec3, (sum, weight): (Vec3, f32)) -> Vec3 {
    if weight >= 1.0 {
        sum / weight
    } else {
        sum + rest * (1.0 - weight)
    }
}

fn blend_quat(rest: Quat, (sum, weight): (Vec4, f32)) -> Quat {
    let q = if weight >= 1.0 {
        sum
    } else {
        sum + Vec4::from(rest) * (1.0 - weight)
    };
    let len = q.length();
    if len < 1e-6 {
        rest
    } else {
        Quat::from_vec4(q / len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn arm() -> Skeleton {
        let joints = vec![
            Joint {
                name: "shoulder".into(),
                parent: None,
                rest: Transform::IDENTITY,
                inverse_bind: Mat4::IDENTITY,
            },
            Joint {
                name: "hand".into(),
                parent: Some(0),
                rest: Transform::from_translation(Vec3::X),
                inverse_bind: Mat4::from_translation(-Vec3::X),
            },
        ];
        Skeleton::new(joints, Mat4::IDENTITY).unwrap()
    }

    fn swing() -> JointTrack {
        JointTrack {
            rotation: Keyframes::new(
                vec![0.0, 1.0],
                vec![Quat::IDENTITY, Quat::from_rotation_z(FRAC_PI_2)],
                Interpolation::Linear,
            ),
            ..JointTrack::new(0)
        }
    }

    #[test]
    fn rest_pose_skins_to_identity() {
        for m in arm().rest_matrices() {
            assert!(m.abs_diff_eq(Mat4::IDENTITY, 1e-6));
        }
    }

    #[test]
    fn child_follows_parent_rotation() {
        let skel = arm();
        let tracks = [swing()];
        let pose = skel.sample_pose([PoseLayer {
            tracks: &tracks,
            time: 1.0,
            weight: 1.0,
        }]);
        let palette = skel.skin_matrices(&pose);
        // The hand's bind position (1,0,0) swings up to (0,1,0).
        let p = palette[1].transform_point3(Vec3::X);
        assert!((p - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn half_weight_blends_toward_rest() {
        let skel = arm();
        let tracks = [swing()];
        let pose = skel.sample_pose([PoseLayer {
            tracks: &tracks,
            time: 1.0,
            weight: 0.5,
        }]);
        let angle = pose[0].rotation.angle_between(Quat::IDENTITY);
        assert!((angle - FRAC_PI_2 * 0.5).abs() < 1e-4);
    }

    #[test]
    fn step_keys_hold_until_the_next_key() {
        let keys = Keyframes::new(vec![0.0, 1.0, 2.0], vec![Vec3::ZERO, Vec3::X, Vec3::Y], Interpolation::Step)
            .unwrap();
        assert_eq!(keys.sample(0.99), Vec3::ZERO);
        assert_eq!(keys.sample(1.5), Vec3::X);
        assert_eq!(keys.sample(9.0), Vec3::Y);
        assert_eq!(keys.last_time(), 2.0);
    }

    #[test]
    fn parent_cycles_are_rejected() {
        let joint = |parent| Joint {
            name: "j".into(),
            parent: Some(parent),
            rest: Transform::IDENTITY,
            inverse_bind: Mat4::IDENTITY,
        };
        assert!(matches!(
            Skeleton::new(vec![joint(1), joint(0)], Mat4::IDENTITY),
            Err(RingError::InvalidSkeleton(_))
        ));
    }
}
