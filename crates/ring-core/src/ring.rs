//! The tile ring: owns the tiles, turns input into targets and, once per
//! frame, damps everything toward those targets.

use glam::{EulerRot, Quat, Vec3};
use smallvec::SmallVec;

use crate::assets::ModelAsset;
use crate::blender::AnimationBlender;
use crate::config::RingConfig;
use crate::constants::{RING_Y_FOLLOW, SNAP_SETTLE_EPSILON};
use crate::content::{assemble_climber, assemble_tile, HeroAnchor, TileAssets, TileContent};
use crate::damp::{follow, Damped, DampedVec3};
use crate::error::{Result, RingError};
use crate::interaction::{DragEnd, DragInput, GesturePhase, InteractionController, RotationTarget};
use crate::layout::{compute_layout, TilePlacement};
use crate::registry::{NodeTag, SceneRegistry};
use crate::scene::{NodeId, Ray, Scene};
use crate::sequence::SequenceEvent;
use crate::stencil::TileStencil;

pub struct Tile {
    pub placement: TilePlacement,
    pub stencil: TileStencil,
    pub content_group: NodeId,
    position: DampedVec3,
    pub content: Option<TileContent>,
}

impl Tile {
    #[inline]
    pub fn index(&self) -> usize {
        self.placement.index
    }

    #[inline]
    pub fn is_hero(&self) -> bool {
        self.placement.is_hero
    }

    /// Current (damped) position of the content group.
    pub fn position(&self) -> Vec3 {
        self.position.value()
    }
}

/// Snapshot of the ring's motion state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RingState {
    pub current_rotation: RotationTarget,
    pub target_rotation: RotationTarget,
    pub is_dragging: bool,
    pub vertical_offset: f32,
    pub target_vertical_offset: f32,
    pub scroll_fraction: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrollUpdate {
    pub fraction: f32,
    pub crossfade_started: bool,
    pub crossfade_cancelled: bool,
}

pub struct TileRing {
    config: RingConfig,
    node: NodeId,
    tiles: Vec<Tile>,
    interaction: InteractionController,
    pitch: Damped,
    yaw: Damped,
    vertical: f32,
    target_vertical: f32,
    scroll_fraction: f32,
    blender: AnimationBlender,
    hero_anchor: Option<HeroAnchor>,
    pending_climber: Option<ModelAsset>,
    climber: Option<NodeId>,
}

impl TileRing {
    /// Lay out the ring and create one empty content group per tile.
    pub fn new(config: RingConfig, scene: &mut Scene, registry: &mut SceneRegistry) -> Result<Self> {
        let placements = compute_layout(&config)?;
        let node = scene.add_node("ring", None);
        scene.set_translation(node, Vec3::new(0.0, config.start_y, 0.0))?;

        let mut tiles = Vec::with_capacity(placements.len());
        for placement in placements {
            let index = placement.index;
            let content_group = scene.add_node(format!("tile_{index}"), Some(node));
            scene.set_translation(content_group, placement.rest_position)?;
            registry.insert(content_group, NodeTag::ContentGroup { tile: index });
            tiles.push(Tile {
                stencil: TileStencil::for_tile(index)?,
                position: DampedVec3::new(placement.rest_position),
                placement,
                content_group,
                content: None,
            });
        }
        log::info!(
            "[ring] {} tiles, radius {}, hero tile {}",
            tiles.len(),
            config.radius,
            config.hero_index
        );

        Ok(Self {
            interaction: InteractionController::new(&config),
            vertical: config.start_y,
            target_vertical: config.start_y,
            config,
            node,
            tiles,
            pitch: Damped::new(0.0),
            yaw: Damped::new(0.0),
            scroll_fraction: 0.0,
            blender: AnimationBlender::default(),
            hero_anchor: None,
            pending_climber: None,
            climber: None,
        })
    }

    pub fn config(&self) -> &RingConfig {
        &self.config
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn tile(&self, index: usize) -> Result<&Tile> {
        self.tiles.get(index).ok_or(RingError::TileOutOfRange {
            index,
            count: self.tiles.len(),
        })
    }

    pub fn hero_tile(&self) -> Option<&Tile> {
        self.tiles.iter().find(|t| t.is_hero())
    }

    pub fn blender(&self) -> &AnimationBlender {
        &self.blender
    }

    pub fn phase(&self) -> GesturePhase {
        self.interaction.phase()
    }

    pub fn climber(&self) -> Option<NodeId> {
        self.climber
    }

    pub fn is_climber_visible(&self, scene: &Scene) -> bool {
        self.climber.is_some_and(|c| scene.is_visible(c))
    }

    pub fn state(&self) -> RingState {
        RingState {
            current_rotation: RotationTarget {
                pitch: self.pitch.value,
                yaw: self.yaw.value,
            },
            target_rotation: self.interaction.target(),
            is_dragging: self.interaction.is_dragging(),
            vertical_offset: self.vertical,
            target_vertical_offset: self.target_vertical,
            scroll_fraction: self.scroll_fraction,
        }
    }

    /// Pointer input. Rotation is locked while the climber is on screen,
    /// but presses are still tracked so a short one remains a click.
    pub fn on_drag(&mut self, scene: &Scene, input: DragInput) {
        if self.is_climber_visible(scene) {
            self.interaction.on_press(input);
        } else {
            self.interaction.on_drag(input);
        }
    }

    pub fn on_drag_end(&mut self) -> DragEnd {
        let end = self.interaction.on_drag_end();
        if let DragEnd::Snap { tile_index, .. } = end {
            log::debug!("[ring] snapping to tile {}", tile_index.rem_euclid(self.tiles.len() as i32));
        }
        end
    }

    /// Feed the page scroll fraction. Crossing the limit upward starts the
    /// hero cross-fade once; dropping back below it before the sequence has
    /// finished cancels and re-arms it.
    pub fn on_scroll(&mut self, fraction: f32) -> ScrollUpdate {
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.scroll_fraction = fraction;
        self.target_vertical = self.config.start_y * (1.0 - fraction);

        let mut update = ScrollUpdate {
            fraction,
            ..ScrollUpdate::default()
        };
        if fraction >= self.config.scroll_limit {
            update.crossfade_started = self.blender.trigger_crossfade();
        } else {
            update.crossfade_cancelled = self.blender.cancel_crossfade();
        }
        update
    }

    /// Attach a finished tile load. Returns the hero anchor when this was
    /// the hero tile, after placing any climber that was waiting for it.
    pub fn attach_tile(
        &mut self,
        scene: &mut Scene,
        registry: &mut SceneRegistry,
        index: usize,
        assets: &TileAssets,
    ) -> Result<Option<HeroAnchor>> {
        let count = self.tiles.len();
        let tile = self
            .tiles
            .get_mut(index)
            .ok_or(RingError::TileOutOfRange { index, count })?;
        if tile.content.is_some() {
            log::warn!("[ring] tile {index} already assembled, ignoring duplicate load");
            return Ok(None);
        }
        let assembled = assemble_tile(
            scene,
            registry,
            &self.config,
            &tile.placement,
            &tile.stencil,
            self.node,
            tile.content_group,
            assets,
        )?;
        self.blender
            .push_tile_mixer(index, assembled.content.character, assembled.mixer);
        tile.content = Some(assembled.content);

        if let Some(anchor) = assembled.hero_anchor {
            self.hero_anchor = Some(anchor);
            if let Some(asset) = self.pending_climber.take() {
                self.place_climber(scene, registry, &anchor, &asset)?;
            }
        }
        Ok(assembled.hero_anchor)
    }

    /// Attach the climber model. If the hero tile is not in place yet the
    /// model is held until it is.
    pub fn attach_climber(
        &mut self,
        scene: &mut Scene,
        registry: &mut SceneRegistry,
        asset: ModelAsset,
    ) -> Result<()> {
        if self.climber.is_some() {
            log::warn!("[ring] climber already placed");
            return Ok(());
        }
        match self.hero_anchor {
            Some(anchor) => self.place_climber(scene, registry, &anchor, &asset),
            None => {
                log::debug!("[ring] climber waiting for hero tile");
                self.pending_climber = Some(asset);
                Ok(())
            }
        }
    }

    fn place_climber(
        &mut self,
        scene: &mut Scene,
        registry: &mut SceneRegistry,
        anchor: &HeroAnchor,
        asset: &ModelAsset,
    ) -> Result<()> {
        let hero = assemble_climber(scene, registry, anchor, asset)?;
        self.climber = Some(hero.node);
        self.blender.set_hero(hero);
        Ok(())
    }

    /// Catch up on a trigger that happened before the climber existed.
    pub fn sync_crossfade(&mut self) -> bool {
        self.scroll_fraction >= self.config.scroll_limit && self.blender.trigger_crossfade()
    }

    /// Per-frame step. Returns the sequence events that fired this frame.
    pub fn update(&mut self, scene: &mut Scene, delta: f32) -> Result<SmallVec<[SequenceEvent; 2]>> {
        let delta = delta.max(0.0);
        self.interaction.tick(delta);

        let target = self.interaction.target();
        let smooth = self.config.rotation_smooth_time;
        self.pitch.damp(target.pitch, smooth, delta);
        self.yaw.damp(target.yaw, smooth, delta);
        self.interaction.settle(self.yaw.value, SNAP_SETTLE_EPSILON);

        let dragging = self.interaction.is_dragging();
        for tile in self.tiles.iter_mut() {
            let goal = if dragging {
                tile.placement.drag_position
            } else {
                tile.placement.rest_position
            };
            tile.position
                .damp(goal, self.config.position_smooth_time, delta);
            scene.set_translation(tile.content_group, tile.position.value())?;
        }

        self.vertical = follow(self.vertical, self.target_vertical, RING_Y_FOLLOW);
        scene.set_translation(self.node, Vec3::new(0.0, self.vertical, 0.0))?;
        scene.set_rotation(
            self.node,
            Quat::from_euler(EulerRot::XYZ, self.pitch.value, self.yaw.value, 0.0),
        )?;

        let events = self.blender.advance(delta, self.scroll_fraction);
        for event in &events {
            if *event == SequenceEvent::RevealTileCharacter {
                self.reveal_hero_character(scene)?;
            }
        }
        self.blender.apply_poses(scene)?;
        Ok(events)
    }

    fn reveal_hero_character(&mut self, scene: &mut Scene) -> Result<()> {
        if let Some(climber) = self.climber {
            scene.set_visible(climber, false)?;
        }
        let character = self
            .hero_tile()
            .and_then(|t| t.content.as_ref())
            .and_then(|c| c.character);
        if let Some(character) = character {
            scene.set_visible(character, true)?;
        }
        log::info!("[ring] climber handed over to hero tile");
        Ok(())
    }

    /// Nearest visible interactive content hit by `ray`, as (tile, distance).
    pub fn hit_test(&self, scene: &Scene, registry: &SceneRegistry, ray: &Ray) -> Option<(usize, f32)> {
        registry
            .interactive()
            .into_iter()
            .filter(|id| scene.is_visible(*id))
            .filter_map(|id| {
                let tile = registry.tag(id)?.tile()?;
                let t = scene.world_bounds(id).ok()?.intersect_ray(ray)?;
                Some((tile, t))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}
