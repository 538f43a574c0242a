//! Everything the host drives: the scene, the ring inside it, camera,
//! lights and the compositor's view of the scene.
//!
//! The host feeds input events and finished loads in, calls [`Experience::update`]
//! once per frame, then draws [`Experience::draw_items`].

use glam::Vec2;
use smallvec::SmallVec;

use crate::assets::ModelAsset;
use crate::camera::CameraRig;
use crate::compositor::{order_draws, BloomSelection, CompositorSettings};
use crate::config::{CameraSettings, RingConfig};
use crate::content::LoadedTile;
use crate::error::Result;
use crate::interaction::{DragEnd, DragInput};
use crate::lights::SceneLights;
use crate::registry::SceneRegistry;
use crate::ring::{ScrollUpdate, TileRing};
use crate::scene::{DrawItem, Scene};
use crate::sequence::SequenceEvent;

/// What a pointer release turned out to be.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Release {
    Ignored,
    /// Short press; `tile` is the content under the pointer, if any.
    Click { tile: Option<usize> },
    Snap { tile_index: i32 },
}

#[derive(Clone, Debug, Default)]
pub struct FrameReport {
    pub events: SmallVec<[SequenceEvent; 2]>,
    /// The cross-fade started this frame rather than from a scroll event,
    /// because the climber arrived after the page was already past the limit.
    pub crossfade_started: bool,
}

pub struct Experience {
    scene: Scene,
    registry: SceneRegistry,
    ring: TileRing,
    camera: CameraRig,
    lights: SceneLights,
    compositor: CompositorSettings,
    bloom: BloomSelection,
    pointer: Vec2,
}

impl Experience {
    pub fn new(
        config: RingConfig,
        camera: CameraSettings,
        compositor: CompositorSettings,
        aspect: f32,
    ) -> Result<Self> {
        let mut scene = Scene::new();
        let mut registry = SceneRegistry::new();
        let ring = TileRing::new(config, &mut scene, &mut registry)?;
        Ok(Self {
            scene,
            registry,
            ring,
            camera: CameraRig::new(camera, aspect),
            lights: SceneLights::default(),
            compositor,
            bloom: BloomSelection::default(),
            pointer: Vec2::ZERO,
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn registry(&self) -> &SceneRegistry {
        &self.registry
    }

    pub fn ring(&self) -> &TileRing {
        &self.ring
    }

    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }

    pub fn lights(&self) -> &SceneLights {
        &self.lights
    }

    pub fn compositor(&self) -> &CompositorSettings {
        &self.compositor
    }

    pub fn bloom_selection(&self) -> &BloomSelection {
        &self.bloom
    }

    pub fn resize(&mut self, aspect: f32) {
        self.camera.set_aspect(aspect);
    }

    /// Pointer position in NDC. Used for camera sway and click picking.
    pub fn on_pointer_move(&mut self, ndc: Vec2) {
        self.pointer = ndc;
        self.camera.on_pointer_move(ndc);
    }

    pub fn on_drag(&mut self, input: DragInput) {
        self.ring.on_drag(&self.scene, input);
    }

    pub fn on_drag_end(&mut self) -> Release {
        match self.ring.on_drag_end() {
            DragEnd::Ignored => Release::Ignored,
            DragEnd::Snap { tile_index, .. } => Release::Snap { tile_index },
            DragEnd::Click => {
                let ray = self.camera.camera().ray_from_ndc(self.pointer);
                let tile = self
                    .ring
                    .hit_test(&self.scene, &self.registry, &ray)
                    .map(|(tile, _)| tile);
                if let Some(tile) = tile {
                    let zoomed = self.camera.toggle_zoom();
                    self.lights.start_blink();
                    log::info!("[input] clicked tile {tile}, zoomed: {zoomed}");
                }
                Release::Click { tile }
            }
        }
    }

    pub fn on_scroll(&mut self, fraction: f32) -> ScrollUpdate {
        let update = self.ring.on_scroll(fraction);
        self.lights
            .apply_scroll(update.fraction, self.ring.config().scroll_limit);
        if update.crossfade_started {
            self.lights.start_blink();
        }
        update
    }

    /// Attach a finished tile load. A failed load is logged and the tile
    /// stays empty.
    pub fn attach_tile(&mut self, loaded: LoadedTile) -> Result<()> {
        match loaded.assets {
            Ok(assets) => {
                self.ring
                    .attach_tile(&mut self.scene, &mut self.registry, loaded.index, &assets)?;
                self.bloom.refresh(&self.registry);
            }
            Err(e) => log::error!("[ring] tile {} left empty: {e}", loaded.index),
        }
        Ok(())
    }

    pub fn attach_climber(&mut self, asset: Result<ModelAsset>) -> Result<()> {
        match asset {
            Ok(asset) => {
                self.ring
                    .attach_climber(&mut self.scene, &mut self.registry, asset)?;
                self.bloom.refresh(&self.registry);
                Ok(())
            }
            Err(e) => {
                log::error!("[ring] no climber: {e}");
                Ok(())
            }
        }
    }

    pub fn update(&mut self, delta: f32) -> Result<FrameReport> {
        let crossfade_started = self.ring.sync_crossfade();
        if crossfade_started {
            self.lights.start_blink();
        }
        let events = self.ring.update(&mut self.scene, delta)?;
        self.camera.update(delta);
        self.lights.update(delta);
        Ok(FrameReport {
            events,
            crossfade_started,
        })
    }

    /// Visible meshes in stencil-safe draw order.
    pub fn draw_items(&self) -> Vec<DrawItem> {
        let mut items = self.scene.draw_items();
        order_draws(&mut items);
        items
    }
}
