//! Clip playback bookkeeping.
//!
//! A mixer tracks, per clip action, the playback time, whether it runs, and
//! its blend weight including in-flight fades. [`AnimationMixer::skin_matrices`]
//! samples every running action at its weight into a skinning palette.

use std::sync::Arc;

use glam::Mat4;
use smallvec::SmallVec;

use crate::error::{Result, RingError};
use crate::skeleton::{JointTrack, PoseLayer, Skeleton};

#[derive(Clone, Debug, PartialEq)]
pub struct ClipInfo {
    pub name: String,
    pub duration: f32,
    /// Joint channels; empty for clips that only move non-joint nodes.
    pub tracks: Arc<[JointTrack]>,
}

impl ClipInfo {
    pub fn new(name: impl Into<String>, duration: f32) -> Self {
        Self {
            name: name.into(),
            duration,
            tracks: Arc::from(Vec::new()),
        }
    }

    pub fn with_tracks(mut self, tracks: Vec<JointTrack>) -> Self {
        self.tracks = Arc::from(tracks);
        self
    }
}

/// Look up a clip by exact name.
pub fn find_clip<'a>(clips: &'a [ClipInfo], name: &str) -> Result<&'a ClipInfo> {
    clips
        .iter()
        .find(|c| c.name == name)
        .ok_or_else(|| RingError::ClipNotFound(name.to_string()))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActionId(usize);

#[derive(Clone, Copy, Debug, PartialEq)]
struct Fade {
    from: f32,
    to: f32,
    duration: f32,
    elapsed: f32,
}

impl Fade {
    fn weight(&self) -> f32 {
        if self.duration <= 0.0 {
            return self.to;
        }
        let t = (self.elapsed / self.duration).clamp(0.0, 1.0);
        self.from + (self.to - self.from) * t
    }

    fn finished(&self) -> bool {
        self.elapsed >= self.duration
    }
}

#[derive(Clone, Debug)]
pub struct AnimationAction {
    clip: ClipInfo,
    pub time: f32,
    pub paused: bool,
    running: bool,
    weight: f32,
    fade: Option<Fade>,
}

impl AnimationAction {
    fn new(clip: ClipInfo) -> Self {
        Self {
            clip,
            time: 0.0,
            paused: false,
            running: false,
            weight: 1.0,
            fade: None,
        }
    }

    pub fn clip(&self) -> &ClipInfo {
        &self.clip
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Weight including any fade in progress; zero while stopped.
    pub fn effective_weight(&self) -> f32 {
        if !self.running {
            return 0.0;
        }
        self.fade.map(|f| f.weight()).unwrap_or(self.weight)
    }

    fn advance(&mut self, delta: f32) {
        if !self.running {
            return;
        }
        if let Some(mut fade) = self.fade {
            fade.elapsed += delta;
            if fade.finished() {
                self.weight = fade.to;
                self.fade = None;
                if self.weight <= 0.0 {
                    self.running = false;
                }
            } else {
                self.fade = Some(fade);
            }
        }
        if self.paused || delta == 0.0 {
            return;
        }
        let duration = self.clip.duration;
        self.time += delta;
        if duration > 0.0 {
            self.time = self.time.rem_euclid(duration);
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct AnimationMixer {
    actions: SmallVec<[AnimationAction; 3]>,
}

impl AnimationMixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Action for `clip`, created on first request.
    pub fn clip_action(&mut self, clip: &ClipInfo) -> ActionId {
        if let Some(i) = self.actions.iter().position(|a| a.clip.name == clip.name) {
            return ActionId(i);
        }
        self.actions.push(AnimationAction::new(clip.clone()));
        ActionId(self.actions.len() - 1)
    }

    pub fn action(&self, id: ActionId) -> Option<&AnimationAction> {
        self.actions.get(id.0)
    }

    pub fn action_mut(&mut self, id: ActionId) -> Option<&mut AnimationAction> {
        self.actions.get_mut(id.0)
    }

    pub fn actions(&self) -> impl Iterator<Item = &AnimationAction> {
        self.actions.iter()
    }

    pub fn play(&mut self, id: ActionId) {
        if let Some(a) = self.actions.get_mut(id.0) {
            if !a.running {
                a.running = true;
                a.weight = 1.0;
                a.fade = None;
            }
        }
    }

    pub fn stop(&mut self, id: ActionId) {
        if let Some(a) = self.actions.get_mut(id.0) {
            a.running = false;
            a.time = 0.0;
            a.fade = None;
            a.weight = 1.0;
        }
    }

    pub fn set_paused(&mut self, id: ActionId, paused: bool) {
        if let Some(a) = self.actions.get_mut(id.0) {
            a.paused = paused;
        }
    }

    /// Place the action at `time`, clamped to the clip.
    pub fn set_time(&mut self, id: ActionId, time: f32) {
        if let Some(a) = self.actions.get_mut(id.0) {
            a.time = time.clamp(0.0, a.clip.duration.max(0.0));
        }
    }

    pub fn effective_weight(&self, id: ActionId) -> f32 {
        self.action(id).map(|a| a.effective_weight()).unwrap_or(0.0)
    }

    /// Fade `from` out and `to` in over `duration` seconds. `to` starts
    /// running unpaused.
    pub fn cross_fade(&mut self, from: ActionId, to: ActionId, duration: f32) {
        if from == to {
            return;
        }
        if let Some(a) = self.actions.get_mut(from.0) {
            if a.running {
                a.fade = Some(Fade {
                    from: a.effective_weight(),
                    to: 0.0,
                    duration,
                    elapsed: 0.0,
                });
            }
        }
        if let Some(b) = self.actions.get_mut(to.0) {
            b.running = true;
            b.paused = false;
            b.fade = Some(Fade {
                from: 0.0,
                to: 1.0,
                duration,
                elapsed: 0.0,
            });
        }
    }

    /// Running actions with a non-zero weight, as pose layers.
    pub fn pose_layers(&self) -> impl Iterator<Item = PoseLayer<'_>> {
        self.actions.iter().filter_map(|a| {
            let weight = a.effective_weight();
            (weight > 0.0).then_some(PoseLayer {
                tracks: &a.clip.tracks,
                time: a.time,
                weight,
            })
        })
    }

    /// Blend the running actions at their current times and weights into
    /// a palette for `skeleton`.
    pub fn skin_matrices(&self, skeleton: &Skeleton) -> Vec<Mat4> {
        skeleton.skin_matrices(&skeleton.sample_pose(self.pose_layers()))
    }

    /// Advance all running actions. A zero delta re-evaluates weights without
    /// moving playback time.
    pub fn update(&mut self, delta: f32) {
        for a in self.actions.iter_mut() {
            a.advance(delta.max(0.0));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_action_loops() {
        let mut m = AnimationMixer::new();
        let a = m.clip_action(&ClipInfo::new("walk", 1.0));
        m.play(a);
        m.update(1.25);
        assert!((m.action(a).unwrap().time - 0.25).abs() < 1e-5);
    }

    #[test]
    fn paused_action_holds_time() {
        let mut m = AnimationMixer::new();
        let a = m.clip_action(&ClipInfo::new("walk", 2.0));
        m.play(a);
        m.set_paused(a, true);
        m.set_time(a, 0.5);
        m.update(0.3);
        assert!((m.action(a).unwrap().time - 0.5).abs() < 1e-6);
    }

    #[test]
    fn cross_fade_hands_weight_over_and_stops_source() {
        let mut m = AnimationMixer::new();
        let a = m.clip_action(&ClipInfo::new("a", 1.0));
        let b = m.clip_action(&ClipInfo::new("b", 1.0));
        m.play(a);
        m.cross_fade(a, b, 0.5);
        m.update(0.25);
        assert!((m.effective_weight(a) - 0.5).abs() < 1e-5);
        assert!((m.effective_weight(b) - 0.5).abs() < 1e-5);
        m.update(0.5);
        assert_eq!(m.effective_weight(a), 0.0);
        assert!(!m.action(a).unwrap().is_running());
        assert_eq!(m.effective_weight(b), 1.0);
    }

    #[test]
    fn palette_follows_action_time_and_weight() {
        use crate::scene::Transform;
        use crate::skeleton::{Interpolation, Joint, Keyframes};
        use glam::Vec3;

        let skeleton = Skeleton::new(
            vec![Joint {
                name: "root".into(),
                parent: None,
                rest: Transform::IDENTITY,
                inverse_bind: Mat4::IDENTITY,
            }],
            Mat4::IDENTITY,
        )
        .unwrap();
        let lift = ClipInfo::new("lift", 1.0).with_tracks(vec![JointTrack {
            translation: Keyframes::new(vec![0.0, 1.0], vec![Vec3::ZERO, Vec3::Y], Interpolation::Linear),
            ..JointTrack::new(0)
        }]);
        let mut m = AnimationMixer::new();
        let a = m.clip_action(&lift);
        // Not running: rest pose.
        assert_eq!(m.skin_matrices(&skeleton), vec![Mat4::IDENTITY]);

        m.play(a);
        m.set_paused(a, true);
        m.set_time(a, 0.5);
        let p = m.skin_matrices(&skeleton)[0].transform_point3(Vec3::ZERO);
        assert!((p - Vec3::new(0.0, 0.5, 0.0)).length() < 1e-5);
    }

    #[test]
    fn missing_clip_is_reported() {
        let clips = vec![ClipInfo::new("idle", 1.0)];
        assert!(find_clip(&clips, "idle").is_ok());
        assert!(matches!(
            find_clip(&clips, "run"),
            Err(RingError::ClipNotFound(_))
        ));
    }
}
