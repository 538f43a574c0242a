use fnv::FnvHashMap;
use glam::{Mat3, Mat4, Quat, Vec3};
use gltf::animation::util::ReadOutputs;
use gltf::mesh::Mode;
use ring_core::animation::ClipInfo;
use ring_core::scene::Transform;
use ring_core::skeleton::{Interpolation, Joint, JointTrack, Keyframes, Skeleton};
use ring_core::{MeshData, ModelAsset, RingError};

/// Decode a binary or embedded glTF into a model asset.
///
/// Every triangle primitive reachable from the default scene becomes one
/// mesh. Static meshes are baked into model space with their node
/// transforms; meshes bound to the model's first skin stay in bind space
/// with their joint influences, and the skin becomes the asset's skeleton.
/// Clip durations are the last keyframe time across all of a clip's
/// channels; channels that target joints become the clip's tracks.
pub fn decode_model(path: &str, bytes: &[u8]) -> ring_core::Result<ModelAsset> {
    let (document, buffers, _) = gltf::import_slice(bytes).map_err(|e| RingError::AssetLoad {
        path: path.to_string(),
        reason: e.to_string(),
    })?;

    let mut skins = document.skins();
    let rig = skins
        .next()
        .and_then(|skin| import_skin(path, &document, &skin, &buffers));
    if skins.next().is_some() {
        log::warn!("[assets] {path} has several skins; only the first is used");
    }
    let skin_index = rig.as_ref().map(|r| r.skin);

    let mut meshes = Vec::new();
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next());
    match scene {
        Some(scene) => {
            for node in scene.nodes() {
                collect_node(&node, Mat4::IDENTITY, &buffers, skin_index, &mut meshes);
            }
        }
        None => {
            for mesh in document.meshes() {
                collect_mesh(&mesh, Mat4::IDENTITY, &buffers, false, &mut meshes);
            }
        }
    }

    let clips = document
        .animations()
        .enumerate()
        .map(|(index, animation)| {
            let name = animation
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("animation_{index}"));
            let duration = animation
                .channels()
                .filter_map(|channel| {
                    let reader = channel.reader(|buffer| buffers.get(buffer.index()).map(|b| &b[..]));
                    reader.read_inputs().and_then(|times| times.reduce(f32::max))
                })
                .fold(0.0_f32, f32::max);
            let clip = ClipInfo::new(name, duration);
            match &rig {
                Some(rig) => clip.with_tracks(joint_tracks(&animation, &rig.node_to_joint, &buffers)),
                None => clip,
            }
        })
        .collect();

    log::debug!(
        "[assets] decoded {path}: {} meshes, {} joints",
        meshes.len(),
        rig.as_ref().map_or(0, |r| r.skeleton.len())
    );
    let asset = ModelAsset::new(path, meshes, clips)?;
    Ok(match rig {
        Some(rig) => asset.with_skeleton(rig.skeleton),
        None => asset,
    })
}

struct SkinRig {
    skin: usize,
    skeleton: Skeleton,
    node_to_joint: FnvHashMap<usize, usize>,
}

/// Build a skeleton from `skin`. A skin that can't be used is logged and
/// its meshes fall back to static bind pose.
fn import_skin(
    path: &str,
    document: &gltf::Document,
    skin: &gltf::Skin<'_>,
    buffers: &[gltf::buffer::Data],
) -> Option<SkinRig> {
    let joint_nodes: Vec<_> = skin.joints().collect();
    if joint_nodes.is_empty() {
        log::warn!("[assets] {path}: skin without joints, drawing bind pose");
        return None;
    }
    let node_to_joint: FnvHashMap<usize, usize> = joint_nodes
        .iter()
        .enumerate()
        .map(|(joint, node)| (node.index(), joint))
        .collect();

    let mut parent_of_node: FnvHashMap<usize, usize> = FnvHashMap::default();
    let mut node_local = Vec::new();
    for node in document.nodes() {
        node_local.push(Mat4::from_cols_array_2d(&node.transform().matrix()));
        for child in node.children() {
            parent_of_node.insert(child.index(), node.index());
        }
    }

    let reader = skin.reader(|buffer| buffers.get(buffer.index()).map(|b| &b[..]));
    let mut inverse_bind = vec![Mat4::IDENTITY; joint_nodes.len()];
    if let Some(matrices) = reader.read_inverse_bind_matrices() {
        for (slot, m) in inverse_bind.iter_mut().zip(matrices) {
            *slot = Mat4::from_cols_array_2d(&m);
        }
    }

    let joints: Vec<Joint> = joint_nodes
        .iter()
        .zip(inverse_bind)
        .enumerate()
        .map(|(index, (node, inverse_bind))| {
            let (t, r, s) = node.transform().decomposed();
            Joint {
                name: node
                    .name()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("joint_{index}")),
                parent: parent_of_node
                    .get(&node.index())
                    .and_then(|p| node_to_joint.get(p))
                    .copied(),
                rest: Transform {
                    translation: Vec3::from_array(t),
                    rotation: Quat::from_array(r).normalize(),
                    scale: Vec3::from_array(s),
                },
                inverse_bind,
            }
        })
        .collect();

    // Non-joint ancestors (an armature node, usually) sit above the root joints.
    let root = joints
        .iter()
        .zip(&joint_nodes)
        .find(|(joint, _)| joint.parent.is_none())
        .and_then(|(_, node)| parent_of_node.get(&node.index()))
        .map(|&parent| node_world(parent, &node_local, &parent_of_node))
        .unwrap_or(Mat4::IDENTITY);

    match Skeleton::new(joints, root) {
        Ok(skeleton) => Some(SkinRig {
            skin: skin.index(),
            skeleton,
            node_to_joint,
        }),
        Err(e) => {
            log::warn!("[assets] {path}: {e}, drawing bind pose");
            None
        }
    }
}

fn node_world(node: usize, local: &[Mat4], parents: &FnvHashMap<usize, usize>) -> Mat4 {
    let mut world = local.get(node).copied().unwrap_or(Mat4::IDENTITY);
    let mut current = node;
    // Bounded walk; a malformed file could loop.
    for _ in 0..local.len() {
        let Some(&parent) = parents.get(&current) else {
            break;
        };
        world = local.get(parent).copied().unwrap_or(Mat4::IDENTITY) * world;
        current = parent;
    }
    world
}

fn joint_tracks(
    animation: &gltf::Animation<'_>,
    node_to_joint: &FnvHashMap<usize, usize>,
    buffers: &[gltf::buffer::Data],
) -> Vec<JointTrack> {
    let mut tracks: FnvHashMap<usize, JointTrack> = FnvHashMap::default();
    for channel in animation.channels() {
        let target = channel.target().node();
        let Some(&joint) = node_to_joint.get(&target.index()) else {
            continue;
        };
        let interpolation = match channel.sampler().interpolation() {
            gltf::animation::Interpolation::Linear => Interpolation::Linear,
            gltf::animation::Interpolation::Step => Interpolation::Step,
            gltf::animation::Interpolation::CubicSpline => {
                log::warn!(
                    "[assets] clip {:?}: cubic spline channel on node {} skipped",
                    animation.name(),
                    target.index()
                );
                continue;
            }
        };
        let reader = channel.reader(|buffer| buffers.get(buffer.index()).map(|b| &b[..]));
        let Some(times) = reader.read_inputs() else {
            continue;
        };
        let times: Vec<f32> = times.collect();
        let track = tracks.entry(joint).or_insert_with(|| JointTrack::new(joint));
        match reader.read_outputs() {
            Some(ReadOutputs::Translations(values)) => {
                track.translation =
                    Keyframes::new(times, values.map(Vec3::from_array).collect(), interpolation);
            }
            Some(ReadOutputs::Rotations(values)) => {
                let values = values
                    .into_f32()
                    .map(|q| Quat::from_array(q).normalize())
                    .collect();
                track.rotation = Keyframes::new(times, values, interpolation);
            }
            Some(ReadOutputs::Scales(values)) => {
                track.scale = Keyframes::new(times, values.map(Vec3::from_array).collect(), interpolation);
            }
            _ => {}
        }
    }
    let mut tracks: Vec<JointTrack> = tracks.into_values().filter(|t| !t.is_empty()).collect();
    tracks.sort_by_key(|t| t.joint);
    tracks
}

fn collect_node(
    node: &gltf::Node<'_>,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    skin: Option<usize>,
    out: &mut Vec<MeshData>,
) {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
    if let Some(mesh) = node.mesh() {
        let skinned = skin.is_some() && node.skin().map(|s| s.index()) == skin;
        // Skinned vertices are placed by their joints, not by the node.
        let placement = if skinned { Mat4::IDENTITY } else { world };
        collect_mesh(&mesh, placement, buffers, skinned, out);
    }
    for child in node.children() {
        collect_node(&child, world, buffers, skin, out);
    }
}

fn collect_mesh(
    mesh: &gltf::Mesh<'_>,
    world: Mat4,
    buffers: &[gltf::buffer::Data],
    skinned: bool,
    out: &mut Vec<MeshData>,
) {
    let normal_matrix = Mat3::from_mat4(world).inverse().transpose();
    for primitive in mesh.primitives() {
        if primitive.mode() != Mode::Triangles {
            continue;
        }
        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|b| &b[..]));
        let Some(positions) = reader.read_positions() else {
            continue;
        };
        let positions: Vec<[f32; 3]> = positions
            .map(|p| world.transform_point3(Vec3::from_array(p)).to_array())
            .collect();
        if positions.is_empty() {
            continue;
        }
        let normals: Vec<[f32; 3]> = reader
            .read_normals()
            .map(|it| {
                it.map(|n| {
                    (normal_matrix * Vec3::from_array(n))
                        .normalize_or_zero()
                        .to_array()
                })
                .collect()
            })
            .unwrap_or_default();
        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };
        let mesh = MeshData::new(positions, normals, indices);
        if skinned {
            let joints: Vec<[u16; 4]> = reader
                .read_joints(0)
                .map(|it| it.into_u16().collect())
                .unwrap_or_default();
            let weights: Vec<[f32; 4]> = reader
                .read_weights(0)
                .map(|it| it.into_f32().collect())
                .unwrap_or_default();
            out.push(mesh.with_skin(joints, weights));
        } else {
            out.push(mesh);
        }
    }
}
