use std::cell::RefCell;
use std::rc::Rc;

use glam::{Mat4, Quat, Vec2, Vec3};
use ring_core::animation::ClipInfo;
use ring_core::assets::{AssetContext, AssetLoader, LoadFuture, ModelAsset};
use ring_core::constants::*;
use ring_core::content::{load_climber, load_tile_assets, AssetPaths};
use ring_core::scene::Transform;
use ring_core::skeleton::{Interpolation, Joint, JointTrack, Keyframes, Skeleton};
use ring_core::{
    CameraSettings, CompositorSettings, DragInput, Experience, MeshData, NodeTag, Release,
    RingConfig, RingError, SequenceEvent, SequenceState,
};

/// Serves a unit box for every path and records what was requested.
struct BoxLoader {
    requests: RefCell<Vec<String>>,
    clips: Vec<ClipInfo>,
    missing: Option<String>,
}

impl BoxLoader {
    fn new() -> Self {
        let clips = TILE_ANIMATION_NAMES
            .iter()
            .chain([CLIMBER_PRIMARY_CLIP, CLIMBER_SECONDARY_CLIP, CLIMBER_TERTIARY_CLIP].iter())
            .map(|name| {
                let clip = ClipInfo::new(*name, 2.0);
                if *name == CLIMBER_PRIMARY_CLIP {
                    clip.with_tracks(vec![climb_track()])
                } else {
                    clip
                }
            })
            .collect();
        Self {
            requests: RefCell::new(Vec::new()),
            clips,
            missing: None,
        }
    }
}

fn unit_box() -> MeshData {
    let positions = vec![
        [-0.5, -0.5, -0.5],
        [0.5, -0.5, -0.5],
        [0.5, 0.5, -0.5],
        [-0.5, 0.5, -0.5],
        [-0.5, -0.5, 0.5],
        [0.5, -0.5, 0.5],
        [0.5, 0.5, 0.5],
        [-0.5, 0.5, 0.5],
    ];
    let indices = vec![
        0, 2, 1, 0, 3, 2, 4, 5, 6, 4, 6, 7, 0, 1, 5, 0, 5, 4, 3, 6, 2, 3, 7, 6, 1, 2, 6, 1, 6,
        5, 0, 4, 7, 0, 7, 3,
    ];
    MeshData::new(positions, Vec::new(), indices)
}

/// Single-joint rig: the climber box is bound to one root joint.
fn climber_skeleton() -> Skeleton {
    let root = Joint {
        name: "hips".into(),
        parent: None,
        rest: Transform::IDENTITY,
        inverse_bind: Mat4::IDENTITY,
    };
    Skeleton::new(vec![root], Mat4::IDENTITY).unwrap()
}

/// The climb clip lifts and turns the root joint over its two seconds.
fn climb_track() -> JointTrack {
    JointTrack {
        translation: Keyframes::new(
            vec![0.0, 2.0],
            vec![Vec3::ZERO, Vec3::new(0.0, 1.0, 0.0)],
            Interpolation::Linear,
        ),
        rotation: Keyframes::new(
            vec![0.0, 2.0],
            vec![Quat::IDENTITY, Quat::from_rotation_y(1.0)],
            Interpolation::Linear,
        ),
        ..JointTrack::new(0)
    }
}

impl AssetLoader for BoxLoader {
    fn load(&self, path: &str) -> LoadFuture {
        self.requests.borrow_mut().push(path.to_string());
        let path = path.to_string();
        let clips = self.clips.clone();
        let missing = self.missing.clone();
        Box::pin(async move {
            if missing.as_deref() == Some(path.as_str()) {
                return Err(RingError::AssetLoad {
                    path,
                    reason: "not found".into(),
                });
            }
            if path == CLIMBER_MODEL_PATH {
                let mesh = unit_box();
                let n = mesh.positions.len();
                let mesh = mesh.with_skin(vec![[0; 4]; n], vec![[1.0, 0.0, 0.0, 0.0]; n]);
                return Ok(ModelAsset::new(path, vec![mesh], clips)?.with_skeleton(climber_skeleton()));
            }
            ModelAsset::new(path, vec![unit_box()], clips)
        })
    }
}

fn experience() -> Experience {
    Experience::new(
        RingConfig::default(),
        CameraSettings::default(),
        CompositorSettings::default(),
        16.0 / 9.0,
    )
    .unwrap()
}

fn load_everything(exp: &mut Experience, loader: Rc<BoxLoader>, climber_first: bool) {
    let ctx = AssetContext::new(loader);
    let paths = AssetPaths::default();
    if climber_first {
        let climber = pollster::block_on(load_climber(&ctx, &paths));
        exp.attach_climber(climber).unwrap();
    }
    // Reverse order: completion order must not matter.
    for index in (0..NUM_TILES).rev() {
        let loaded = pollster::block_on(load_tile_assets(&ctx, &paths, index));
        exp.attach_tile(loaded).unwrap();
    }
    if !climber_first {
        let climber = pollster::block_on(load_climber(&ctx, &paths));
        exp.attach_climber(climber).unwrap();
    }
    assert!(ctx.all_settled());
}

/// Tiles only, no climber, so nothing locks rotation.
fn load_tiles(exp: &mut Experience, loader: Rc<BoxLoader>) {
    let ctx = AssetContext::new(loader);
    let paths = AssetPaths::default();
    for index in 0..NUM_TILES {
        let loaded = pollster::block_on(load_tile_assets(&ctx, &paths, index));
        exp.attach_tile(loaded).unwrap();
    }
}

/// NDC of the visible interactive content whose bounds centre projects
/// closest to the middle of the screen.
fn aim_at_nearest_content(exp: &Experience) -> Vec2 {
    let view_proj = exp.camera().camera().view_proj();
    exp.registry()
        .interactive()
        .into_iter()
        .filter(|id| exp.scene().is_visible(*id))
        .filter_map(|id| {
            let centre = exp.scene().world_bounds(id).ok()?.center();
            let clip = view_proj * centre.extend(1.0);
            (clip.w > 0.0).then(|| Vec2::new(clip.x, clip.y) / clip.w)
        })
        .min_by(|a, b| a.length().total_cmp(&b.length()))
        .expect("some content in front of the camera")
}

fn short_press(exp: &mut Experience) -> Release {
    exp.on_drag(DragInput {
        delta: Vec2::new(1.0, 0.0),
        dragging: true,
    });
    exp.on_drag_end()
}

fn run(exp: &mut Experience, seconds: f32) -> Vec<SequenceEvent> {
    let dt = 1.0 / 60.0;
    let mut events = Vec::new();
    let mut t = 0.0;
    while t < seconds {
        events.extend(exp.update(dt).unwrap().events);
        t += dt;
    }
    events
}

#[test]
fn every_tile_is_assembled_with_its_stencil() {
    let mut exp = experience();
    let loader = Rc::new(BoxLoader::new());
    load_everything(&mut exp, loader.clone(), false);

    let ring = exp.ring();
    for tile in ring.tiles() {
        let content = tile.content.as_ref().expect("tile content");
        let shape = exp.scene().node(content.shape).unwrap();
        assert_eq!(shape.material.stencil, tile.stencil.writer);
        let landscape = exp.scene().node(content.landscape.unwrap()).unwrap();
        assert_eq!(landscape.material.stencil, tile.stencil.reader);
        let character = content.character.unwrap();
        assert_eq!(
            exp.scene().node(character).unwrap().material.stencil,
            tile.stencil.reader
        );
        // Hero tile's own character waits for the climber hand-over.
        assert_eq!(exp.scene().is_visible(character), !tile.is_hero());
        // Unit box fitted to 750 wide, with margin.
        assert!((content.shape_scale - 750.0 * SHAPE_FIT_MARGIN).abs() < 1e-2);
    }

    assert_eq!(exp.bloom_selection().len(), NUM_TILES);
    assert_eq!(exp.ring().blender().tile_mixers().len(), NUM_TILES);
    // Each distinct model is fetched once however many tiles use it.
    assert_eq!(loader.requests.borrow().len(), 5);
    // Shared models are uploaded once.
    assert_eq!(exp.scene().mesh_count(), 5);

    let climber = exp.ring().climber().unwrap();
    assert_eq!(exp.registry().tag(climber), Some(NodeTag::Climber));
    assert!(exp.scene().is_visible(climber));
}

#[test]
fn draws_stamp_stencil_before_testing_it() {
    let mut exp = experience();
    load_everything(&mut exp, Rc::new(BoxLoader::new()), false);
    let items = exp.draw_items();
    let first_reader = items
        .iter()
        .position(|d| d.material.stencil.is_reader())
        .unwrap();
    let last_writer = items
        .iter()
        .rposition(|d| d.material.stencil.is_writer())
        .unwrap();
    assert!(last_writer < first_reader);
}

#[test]
fn climber_loaded_before_hero_tile_waits_for_it() {
    let mut exp = experience();
    load_everything(&mut exp, Rc::new(BoxLoader::new()), true);
    let climber = exp.ring().climber().expect("climber placed once hero arrived");
    let hero = exp.ring().hero_tile().unwrap();
    let node = exp.scene().node(climber).unwrap();
    let expected = hero.placement.rest_position
        + Vec3::new(0.0, -CHARACTER_DROP_Y, -CLIMBER_PULL_Z);
    assert!((node.transform.translation - expected).length() < 1e-3);
}

#[test]
fn scroll_past_limit_runs_the_handover_once() {
    let mut exp = experience();
    load_everything(&mut exp, Rc::new(BoxLoader::new()), false);

    let first = exp.on_scroll(0.85);
    assert!(first.crossfade_started);
    assert!(exp.lights().is_blinking());
    for s in [0.9, 0.95, 1.0] {
        assert!(!exp.on_scroll(s).crossfade_started);
    }

    let events = run(&mut exp, 4.0);
    assert_eq!(
        events,
        vec![
            SequenceEvent::StartSecondFade,
            SequenceEvent::RevealTileCharacter
        ]
    );
    let climber = exp.ring().climber().unwrap();
    assert!(!exp.scene().is_visible(climber));
    let hero_character = exp
        .ring()
        .hero_tile()
        .and_then(|t| t.content.as_ref())
        .and_then(|c| c.character)
        .unwrap();
    assert!(exp.scene().is_visible(hero_character));

    // Finished sequences stay finished.
    exp.on_scroll(0.2);
    assert!(!exp.on_scroll(0.9).crossfade_started);
    assert_eq!(
        exp.ring().blender().sequence().state(),
        SequenceState::Done
    );
}

#[test]
fn scrolling_back_early_rearms_the_trigger() {
    let mut exp = experience();
    load_everything(&mut exp, Rc::new(BoxLoader::new()), false);
    assert!(exp.on_scroll(0.85).crossfade_started);
    run(&mut exp, 1.0);
    let back = exp.on_scroll(0.5);
    assert!(back.crossfade_cancelled);
    assert_eq!(
        exp.ring().blender().sequence().state(),
        SequenceState::Pending
    );
    assert!(exp.on_scroll(0.85).crossfade_started);
}

#[test]
fn late_climber_still_triggers_when_already_scrolled() {
    let mut exp = experience();
    exp.on_scroll(0.9);
    load_everything(&mut exp, Rc::new(BoxLoader::new()), false);
    let report = exp.update(1.0 / 60.0).unwrap();
    assert!(report.crossfade_started);
}

#[test]
fn drag_is_locked_while_climber_is_visible() {
    let mut exp = experience();
    load_everything(&mut exp, Rc::new(BoxLoader::new()), false);
    exp.on_drag(DragInput {
        delta: Vec2::new(200.0, 0.0),
        dragging: true,
    });
    assert_eq!(exp.ring().state().target_rotation.yaw, 0.0);
    // The press itself still counts: a quick release is a click.
    let release = exp.on_drag_end();
    assert!(matches!(release, Release::Click { .. }), "got {release:?}");
    assert_eq!(exp.ring().state().target_rotation.yaw, 0.0);
}

#[test]
fn clicking_content_zooms_and_blinks_then_zooms_back() {
    let mut exp = experience();
    load_tiles(&mut exp, Rc::new(BoxLoader::new()));
    exp.update(1.0 / 60.0).unwrap();

    exp.on_pointer_move(aim_at_nearest_content(&exp));
    let first = short_press(&mut exp);
    assert!(matches!(first, Release::Click { tile: Some(_) }), "got {first:?}");
    assert!(exp.camera().is_zoomed());
    assert!(exp.lights().is_blinking());

    run(&mut exp, 0.5);
    exp.on_pointer_move(aim_at_nearest_content(&exp));
    let second = short_press(&mut exp);
    assert!(matches!(second, Release::Click { tile: Some(_) }), "got {second:?}");
    assert!(!exp.camera().is_zoomed());
}

#[test]
fn climber_pose_follows_scroll() {
    let mut exp = experience();
    load_everything(&mut exp, Rc::new(BoxLoader::new()), false);
    let climber = exp.ring().climber().unwrap();

    let mut palette_at = |fraction: f32| {
        exp.on_scroll(fraction);
        exp.update(1.0 / 60.0).unwrap();
        exp.scene().joint_palette(climber).unwrap().to_vec()
    };
    let low = palette_at(0.1);
    let high = palette_at(0.6);
    assert_eq!(low.len(), 1);
    assert!(!low[0].abs_diff_eq(high[0], 1e-3));
    // 60% of the way through the clip: 0.6 up on the joint.
    let lifted = high[0].transform_point3(Vec3::ZERO);
    assert!((lifted.y - 0.6).abs() < 1e-4);

    let draws = exp.draw_items();
    assert!(draws.iter().any(|d| d.node == climber && d.skinned));
    // Tile characters have no rig.
    assert!(draws.iter().all(|d| d.node == climber || !d.skinned));
}

#[test]
fn long_drag_snaps_and_settles() {
    let mut exp = experience();
    exp.on_drag(DragInput {
        delta: Vec2::new(-400.0, 0.0),
        dragging: true,
    });
    run(&mut exp, 1.0);
    let release = exp.on_drag_end();
    let Release::Snap { tile_index } = release else {
        panic!("expected snap, got {release:?}");
    };
    run(&mut exp, 5.0);
    let state = exp.ring().state();
    let inc = std::f32::consts::TAU / NUM_TILES as f32;
    assert!((state.current_rotation.yaw - tile_index as f32 * inc).abs() <= 1e-3);
    assert!(!state.is_dragging);
}

#[test]
fn click_on_nothing_does_not_zoom() {
    let mut exp = experience();
    exp.on_pointer_move(Vec2::new(0.9, 0.9));
    exp.on_drag(DragInput {
        delta: Vec2::new(1.0, 0.0),
        dragging: true,
    });
    assert_eq!(exp.on_drag_end(), Release::Click { tile: None });
    assert!(!exp.camera().is_zoomed());
}

#[test]
fn failed_cutout_leaves_tile_empty() {
    let mut exp = experience();
    let mut loader = BoxLoader::new();
    loader.missing = Some(SHAPE_MODEL_PATH.to_string());
    let ctx = AssetContext::new(Rc::new(loader));
    let loaded = pollster::block_on(load_tile_assets(&ctx, &AssetPaths::default(), 0));
    assert!(loaded.assets.is_err());
    exp.attach_tile(loaded).unwrap();
    assert!(exp.ring().tile(0).unwrap().content.is_none());
    assert_eq!(ctx.stats().failed, 1);
}
