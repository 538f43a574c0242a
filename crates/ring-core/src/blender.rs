//! Per-frame animation driving for tile characters and the hero avatar.

use smallvec::SmallVec;

use crate::animation::{ActionId, AnimationMixer};
use crate::constants::CROSSFADE_DURATION_SEC;
use crate::error::Result;
use crate::scene::{NodeId, Scene};
use crate::sequence::{CrossFadeSequence, SequenceEvent, SequenceState};

/// The scroll-scrubbed climber and its three clips.
#[derive(Clone, Debug)]
pub struct HeroAvatar {
    pub node: NodeId,
    pub mixer: AnimationMixer,
    pub primary: Option<ActionId>,
    pub secondary: Option<ActionId>,
    pub tertiary: Option<ActionId>,
}

impl HeroAvatar {
    /// Prime the primary clip for scrubbing: running but paused.
    pub fn new(
        node: NodeId,
        mut mixer: AnimationMixer,
        primary: Option<ActionId>,
        secondary: Option<ActionId>,
        tertiary: Option<ActionId>,
    ) -> Self {
        if let Some(p) = primary {
            mixer.play(p);
            mixer.set_paused(p, true);
        }
        for id in [secondary, tertiary].into_iter().flatten() {
            mixer.set_paused(id, true);
        }
        Self {
            node,
            mixer,
            primary,
            secondary,
            tertiary,
        }
    }

    /// Put the pose back on the primary clip, everything else stopped.
    fn restore_primary(&mut self) {
        for id in [self.secondary, self.tertiary].into_iter().flatten() {
            self.mixer.stop(id);
        }
        if let Some(p) = self.primary {
            self.mixer.stop(p);
            self.mixer.play(p);
            self.mixer.set_paused(p, true);
        }
    }

    fn scrub(&mut self, fraction: f32) {
        if let Some(p) = self.primary {
            let duration = self
                .mixer
                .action(p)
                .map(|a| a.clip().duration)
                .unwrap_or(0.0);
            self.mixer.set_time(p, duration * fraction.clamp(0.0, 1.0));
            self.mixer.update(0.0);
        }
    }
}

pub struct TileMixer {
    pub tile: usize,
    /// The character node this mixer poses.
    pub node: Option<NodeId>,
    pub mixer: AnimationMixer,
}

pub struct AnimationBlender {
    tile_mixers: Vec<TileMixer>,
    hero: Option<HeroAvatar>,
    sequence: CrossFadeSequence,
    fade_duration: f32,
}

impl Default for AnimationBlender {
    fn default() -> Self {
        Self::new(CrossFadeSequence::default(), CROSSFADE_DURATION_SEC)
    }
}

impl AnimationBlender {
    pub fn new(sequence: CrossFadeSequence, fade_duration: f32) -> Self {
        Self {
            tile_mixers: Vec::new(),
            hero: None,
            sequence,
            fade_duration,
        }
    }

    pub fn push_tile_mixer(&mut self, tile: usize, node: Option<NodeId>, mixer: AnimationMixer) {
        self.tile_mixers.push(TileMixer { tile, node, mixer });
    }

    pub fn tile_mixers(&self) -> &[TileMixer] {
        &self.tile_mixers
    }

    pub fn set_hero(&mut self, hero: HeroAvatar) {
        self.hero = Some(hero);
    }

    pub fn hero(&self) -> Option<&HeroAvatar> {
        self.hero.as_ref()
    }

    pub fn sequence(&self) -> &CrossFadeSequence {
        &self.sequence
    }

    pub fn crossfade_triggered(&self) -> bool {
        self.sequence.is_triggered()
    }

    /// Start the hero cross-fade. Needs a loaded hero; returns `true` only on
    /// the call that actually starts the sequence.
    pub fn trigger_crossfade(&mut self) -> bool {
        let Some(hero) = self.hero.as_mut() else {
            return false;
        };
        if !self.sequence.trigger() {
            return false;
        }
        if let (Some(p), Some(s)) = (hero.primary, hero.secondary) {
            hero.mixer.cross_fade(p, s, self.fade_duration);
        }
        log::info!("[anim] hero cross-fade started");
        true
    }

    /// Abort a running cross-fade and return the hero to scrubbing.
    pub fn cancel_crossfade(&mut self) -> bool {
        if !self.sequence.cancel() {
            return false;
        }
        if let Some(hero) = self.hero.as_mut() {
            hero.restore_primary();
        }
        log::info!("[anim] hero cross-fade cancelled");
        true
    }

    /// Advance tile mixers by `delta`; drive the hero either by scroll
    /// position or, once the cross-fade is triggered, by real time.
    pub fn advance(&mut self, delta: f32, scroll_fraction: f32) -> SmallVec<[SequenceEvent; 2]> {
        for tm in self.tile_mixers.iter_mut() {
            tm.mixer.update(delta);
        }
        let Some(hero) = self.hero.as_mut() else {
            return SmallVec::new();
        };
        if self.sequence.state() == SequenceState::Pending {
            hero.scrub(scroll_fraction);
            return SmallVec::new();
        }
        hero.mixer.update(delta);
        let events = self.sequence.advance(delta);
        for ev in &events {
            if let (SequenceEvent::StartSecondFade, Some(s), Some(t)) =
                (*ev, hero.secondary, hero.tertiary)
            {
                hero.mixer.cross_fade(s, t, self.fade_duration);
            }
        }
        events
    }

    /// Write the current pose of every visible animated character into its
    /// node's joint palette.
    pub fn apply_poses(&self, scene: &mut Scene) -> Result<()> {
        let tiles = self
            .tile_mixers
            .iter()
            .filter_map(|tm| tm.node.map(|n| (n, &tm.mixer)));
        let hero = self.hero.as_ref().map(|h| (h.node, &h.mixer));
        for (node, mixer) in tiles.chain(hero) {
            if scene.is_visible(node) {
                scene.pose(node, mixer)?;
            }
        }
        Ok(())
    }
}
