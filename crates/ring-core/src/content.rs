//! Loading and assembling what sits in and behind each tile.
//!
//! Loading and scene mutation are split: [`load_tile_assets`] only awaits the
//! models, and [`assemble_tile`] is the single step that turns a finished
//! load into nodes, materials, registry tags and a mixer. Loads for
//! different tiles complete in any order.

use std::f32::consts::PI;

use glam::{Quat, Vec3};

use crate::animation::AnimationMixer;
use crate::assets::{AssetContext, ModelAsset};
use crate::blender::HeroAvatar;
use crate::config::RingConfig;
use crate::constants::*;
use crate::error::Result;
use crate::layout::TilePlacement;
use crate::registry::{NodeTag, SceneRegistry};
use crate::scene::{Material, NodeId, Scene, Transform};
use crate::stencil::{StencilState, TileStencil};

#[derive(Clone, Debug)]
pub struct AssetPaths {
    pub shape: String,
    pub character: String,
    pub landscape: String,
    pub frame: String,
    pub climber: String,
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self {
            shape: SHAPE_MODEL_PATH.to_string(),
            character: CHARACTER_MODEL_PATH.to_string(),
            landscape: LANDSCAPE_MODEL_PATH.to_string(),
            frame: FRAME_MODEL_PATH.to_string(),
            climber: CLIMBER_MODEL_PATH.to_string(),
        }
    }
}

/// Models for one tile. Only the cutout is mandatory.
#[derive(Clone, Debug)]
pub struct TileAssets {
    pub shape: ModelAsset,
    pub character: Option<ModelAsset>,
    pub landscape: Option<ModelAsset>,
    pub frame: Option<ModelAsset>,
}

/// Outcome of one tile's load, ready to be assembled on the frame thread.
#[derive(Debug)]
pub struct LoadedTile {
    pub index: usize,
    pub assets: Result<TileAssets>,
}

/// Load everything tile `index` needs. The cutout is loaded first since
/// the rest is sized from it; a failed optional model only drops that piece.
pub async fn load_tile_assets(ctx: &AssetContext, paths: &AssetPaths, index: usize) -> LoadedTile {
    let shape = match ctx.load(&paths.shape).await {
        Ok(shape) => shape,
        Err(e) => {
            return LoadedTile {
                index,
                assets: Err(e),
            }
        }
    };
    let character = ctx.load(&paths.character).await.ok();
    let landscape = ctx.load(&paths.landscape).await.ok();
    let frame = ctx.load(&paths.frame).await.ok();
    LoadedTile {
        index,
        assets: Ok(TileAssets {
            shape,
            character,
            landscape,
            frame,
        }),
    }
}

pub async fn load_climber(ctx: &AssetContext, paths: &AssetPaths) -> Result<ModelAsset> {
    ctx.load(&paths.climber).await
}

/// Uniform scale fitting a box of `size` into the tile design box. Degenerate
/// axes are ignored; a fully degenerate box keeps unit scale.
pub fn fit_scale(size: Vec3, width: f32, height: f32) -> f32 {
    [(width, size.x), (height, size.y), (width, size.z)]
        .into_iter()
        .filter(|(_, s)| *s > f32::EPSILON)
        .map(|(limit, s)| limit / s)
        .reduce(f32::min)
        .unwrap_or(1.0)
}

#[derive(Clone, Debug)]
pub struct TileContent {
    pub index: usize,
    pub shape: NodeId,
    pub frame: Option<NodeId>,
    pub character: Option<NodeId>,
    pub landscape: Option<NodeId>,
    pub shape_scale: f32,
}

/// Where the climber is placed: the hero tile's content anchor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeroAnchor {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: f32,
}

pub struct AssembledTile {
    pub content: TileContent,
    pub mixer: AnimationMixer,
    pub hero_anchor: Option<HeroAnchor>,
}

fn character_material(stencil: StencilState) -> Material {
    Material {
        color: rgb_hex(CHARACTER_COLOR),
        metalness: 0.1,
        roughness: 0.8,
        stencil,
        ..Material::default()
    }
}

/// Turn a finished tile load into scene nodes.
///
/// The cutout and frame hang off `ring` at the placement's shape position;
/// character and landscape hang off `content_group` and test against the
/// tile's stencil id.
#[allow(clippy::too_many_arguments)]
pub fn assemble_tile(
    scene: &mut Scene,
    registry: &mut SceneRegistry,
    config: &RingConfig,
    placement: &TilePlacement,
    stencil: &TileStencil,
    ring: NodeId,
    content_group: NodeId,
    assets: &TileAssets,
) -> Result<AssembledTile> {
    let index = placement.index;
    let shape_scale = fit_scale(assets.shape.bounds.size(), config.tile_width, config.tile_height)
        * SHAPE_FIT_MARGIN;

    let shape = scene.add_node(format!("stencil_{index}"), Some(ring));
    {
        let meshes = scene.model_meshes(&assets.shape.path, &assets.shape.meshes);
        let node = scene.node_mut(shape)?;
        node.transform = Transform {
            translation: placement.shape_position,
            rotation: placement.orientation,
            scale: Vec3::splat(shape_scale),
        };
        node.meshes = meshes;
        node.material = Material {
            color: rgb_hex(SHAPE_COLOR),
            stencil: stencil.writer,
            ..Material::default()
        };
    }
    registry.insert(shape, NodeTag::StencilShape { tile: index });

    let frame = match &assets.frame {
        Some(model) => {
            let scale = fit_scale(model.bounds.size(), config.tile_width, config.tile_height);
            let id = scene.add_node(format!("frame_{index}"), Some(ring));
            let meshes = scene.model_meshes(&model.path, &model.meshes);
            let node = scene.node_mut(id)?;
            node.transform = Transform {
                translation: placement.shape_position,
                rotation: placement.orientation,
                scale: Vec3::splat(scale),
            };
            node.meshes = meshes;
            node.material = Material {
                color: rgb_hex(FRAME_COLOR),
                metalness: 0.6,
                roughness: 0.4,
                ..Material::default()
            };
            registry.insert(id, NodeTag::Frame { tile: index });
            Some(id)
        }
        None => None,
    };

    let mut mixer = AnimationMixer::new();
    let character = match &assets.character {
        Some(model) => {
            let id = scene.add_node(format!("character_{index}"), Some(content_group));
            let meshes = scene.model_meshes(&model.path, &model.meshes);
            let node = scene.node_mut(id)?;
            node.transform = Transform {
                translation: Vec3::new(0.0, -CHARACTER_DROP_Y, 0.0),
                rotation: placement.orientation,
                scale: Vec3::splat(shape_scale * CHARACTER_SCALE),
            };
            node.meshes = meshes;
            node.material = character_material(stencil.reader);
            // The hero tile's own character stays hidden until the climber
            // hands over to it.
            node.visible = !placement.is_hero;
            scene.set_skeleton(id, model.skeleton.clone())?;
            registry.insert(id, NodeTag::Character { tile: index });

            match config.animation_name(index).map(|name| model.find_clip(name)) {
                Some(Ok(clip)) => {
                    let action = mixer.clip_action(clip);
                    mixer.play(action);
                }
                Some(Err(e)) => log::warn!("[ring] tile {index}: {e}, keeping static pose"),
                None => {}
            }
            Some(id)
        }
        None => None,
    };

    let landscape = match &assets.landscape {
        Some(model) => {
            let id = scene.add_node(format!("landscape_{index}"), Some(content_group));
            let meshes = scene.model_meshes(&model.path, &model.meshes);
            let node = scene.node_mut(id)?;
            node.transform = Transform {
                translation: Vec3::new(0.0, -LANDSCAPE_DROP_Y, 0.0),
                rotation: placement.orientation,
                scale: Vec3::splat(shape_scale * LANDSCAPE_SCALE * LANDSCAPE_SCALE_BOOST),
            };
            node.meshes = meshes;
            node.material = Material {
                color: rgb_hex(LANDSCAPE_COLOR),
                stencil: stencil.reader,
                ..Material::default()
            };
            registry.insert(id, NodeTag::Landscape { tile: index });
            Some(id)
        }
        None => None,
    };

    let hero_anchor = placement.is_hero.then(|| HeroAnchor {
        position: placement.rest_position,
        rotation: Quat::IDENTITY,
        scale: shape_scale * CHARACTER_SCALE,
    });

    log::info!("[ring] tile {index} assembled (scale {shape_scale:.3})");
    Ok(AssembledTile {
        content: TileContent {
            index,
            shape,
            frame,
            character,
            landscape,
            shape_scale,
        },
        mixer,
        hero_anchor,
    })
}

/// Place the climber in front of the hero tile's content anchor and prime
/// its clips. Missing clips are logged and left out.
pub fn assemble_climber(
    scene: &mut Scene,
    registry: &mut SceneRegistry,
    anchor: &HeroAnchor,
    asset: &ModelAsset,
) -> Result<HeroAvatar> {
    let id = scene.add_node("climber", None);
    let meshes = scene.model_meshes(&asset.path, &asset.meshes);
    let node = scene.node_mut(id)?;
    node.transform = Transform {
        translation: anchor.position + Vec3::new(0.0, -CHARACTER_DROP_Y, -CLIMBER_PULL_Z),
        rotation: anchor.rotation * Quat::from_rotation_y(PI),
        scale: Vec3::splat(anchor.scale),
    };
    node.meshes = meshes;
    node.material = Material {
        color: rgb_hex(CLIMBER_COLOR),
        metalness: 0.1,
        roughness: 0.9,
        ..Material::default()
    };
    node.visible = true;
    scene.set_skeleton(id, asset.skeleton.clone())?;
    registry.insert(id, NodeTag::Climber);

    let mut mixer = AnimationMixer::new();
    let mut action = |name: &str| match asset.find_clip(name) {
        Ok(clip) => Some(mixer.clip_action(clip)),
        Err(e) => {
            log::warn!("[ring] climber: {e}");
            None
        }
    };
    let primary = action(CLIMBER_PRIMARY_CLIP);
    let secondary = action(CLIMBER_SECONDARY_CLIP);
    let tertiary = action(CLIMBER_TERTIARY_CLIP);

    log::info!("[ring] climber placed at {:?}", anchor.position);
    Ok(HeroAvatar::new(id, mixer, primary, secondary, tertiary))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_scale_takes_tightest_axis() {
        let s = fit_scale(Vec3::new(75.0, 65.0, 10.0), 750.0, 1300.0);
        assert!((s - 10.0).abs() < 1e-5);
    }

    #[test]
    fn flat_model_ignores_zero_depth() {
        let s = fit_scale(Vec3::new(10.0, 10.0, 0.0), 750.0, 1300.0);
        assert!((s - 75.0).abs() < 1e-5);
        assert_eq!(fit_scale(Vec3::ZERO, 750.0, 1300.0), 1.0);
    }
}
