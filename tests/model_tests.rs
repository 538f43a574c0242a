// Host-side tests for glTF decoding.
// The main crate is wasm-only, so we include the pure-Rust modules directly.

#![allow(dead_code)]
mod model {
    include!("../src/model.rs");
}

use glam::{Mat4, Vec3};
use model::decode_model;
use ring_core::RingError;

// One triangle under a node translated by +2 on y, with a 1.5 s clip
const TRIANGLE_GLTF: &str = r#"{"asset":{"version":"2.0"},"scene":0,"scenes":[{"nodes":[0]}],"nodes":[{"mesh":0,"translation":[0,2,0]}],"meshes":[{"primitives":[{"attributes":{"POSITION":0},"indices":1}]}],"buffers":[{"byteLength":76,"uri":"data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAAAAABAAIAAAAAAAAAAADAPwAAAAAAAABAAAAAAAAAAAAAAEBAAAAAAA=="}],"bufferViews":[{"buffer":0,"byteOffset":0,"byteLength":36},{"buffer":0,"byteOffset":36,"byteLength":6},{"buffer":0,"byteOffset":44,"byteLength":8},{"buffer":0,"byteOffset":52,"byteLength":24}],"accessors":[{"bufferView":0,"componentType":5126,"count":3,"type":"VEC3","min":[0,0,0],"max":[1,1,0]},{"bufferView":1,"componentType":5123,"count":3,"type":"SCALAR"},{"bufferView":2,"componentType":5126,"count":2,"type":"SCALAR","min":[0],"max":[1.5]},{"bufferView":3,"componentType":5126,"count":2,"type":"VEC3"}],"animations":[{"name":"Climb","channels":[{"sampler":0,"target":{"node":0,"path":"translation"}}],"samplers":[{"input":2,"output":3}]}]}"#;

// The same triangle bound to one joint "root"; "Wave" turns the joint 90
// degrees about z over 1 s. The mesh node's own translation must be ignored.
const SKINNED_GLTF: &str = r#"{"asset":{"version":"2.0"},"scene":0,"scenes":[{"nodes":[0,1]}],"nodes":[{"mesh":0,"skin":0,"translation":[5,0,0]},{"name":"root","translation":[0,0,0]}],"skins":[{"joints":[1],"inverseBindMatrices":4}],"meshes":[{"primitives":[{"attributes":{"POSITION":0,"JOINTS_0":2,"WEIGHTS_0":3},"indices":1}]}],"buffers":[{"byteLength":220,"uri":"data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAAAAABAAIAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAIA/AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAAAAAAAAAAAAAAAIA/AAAAAAAAAAAAAAAAAAAAAAAAgD8AAAAAAAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAAAAAAIA/AAAAAAAAgD8AAAAAAAAAAAAAAAAAAIA/AAAAAAAAAADzBDU/8wQ1Pw=="}],"bufferViews":[{"buffer":0,"byteOffset":0,"byteLength":36},{"buffer":0,"byteOffset":36,"byteLength":6},{"buffer":0,"byteOffset":44,"byteLength":24},{"buffer":0,"byteOffset":68,"byteLength":48},{"buffer":0,"byteOffset":116,"byteLength":64},{"buffer":0,"byteOffset":180,"byteLength":8},{"buffer":0,"byteOffset":188,"byteLength":32}],"accessors":[{"bufferView":0,"componentType":5126,"count":3,"type":"VEC3","min":[0,0,0],"max":[1,1,0]},{"bufferView":1,"componentType":5123,"count":3,"type":"SCALAR"},{"bufferView":2,"componentType":5123,"count":3,"type":"VEC4"},{"bufferView":3,"componentType":5126,"count":3,"type":"VEC4"},{"bufferView":4,"componentType":5126,"count":1,"type":"MAT4"},{"bufferView":5,"componentType":5126,"count":2,"type":"SCALAR","min":[0],"max":[1]},{"bufferView":6,"componentType":5126,"count":2,"type":"VEC4"}],"animations":[{"name":"Wave","channels":[{"sampler":0,"target":{"node":1,"path":"rotation"}}],"samplers":[{"input":5,"output":6}]}]}"#;

#[test]
fn decodes_triangle_with_node_transform_baked_in() {
    let asset = decode_model("tri.gltf", TRIANGLE_GLTF.as_bytes()).expect("decode");
    assert_eq!(asset.path, "tri.gltf");
    assert_eq!(asset.meshes.len(), 1);

    let mesh = &asset.meshes[0];
    assert_eq!(mesh.indices, vec![0, 1, 2]);
    assert_eq!(mesh.positions[0], [0.0, 2.0, 0.0]);
    assert_eq!(mesh.positions[1], [1.0, 2.0, 0.0]);
    assert_eq!(mesh.positions[2], [0.0, 3.0, 0.0]);

    assert!((asset.bounds.min - Vec3::new(0.0, 2.0, 0.0)).length() < 1e-6);
    assert!((asset.bounds.max - Vec3::new(1.0, 3.0, 0.0)).length() < 1e-6);
}

#[test]
fn missing_normals_are_generated() {
    let asset = decode_model("tri.gltf", TRIANGLE_GLTF.as_bytes()).expect("decode");
    let mesh = &asset.meshes[0];
    assert_eq!(mesh.normals.len(), mesh.positions.len());
    for n in &mesh.normals {
        assert!((Vec3::from_array(*n) - Vec3::Z).length() < 1e-5);
    }
}

#[test]
fn clip_duration_is_last_keyframe() {
    let asset = decode_model("tri.gltf", TRIANGLE_GLTF.as_bytes()).expect("decode");
    let clip = asset.find_clip("Climb").expect("clip");
    assert!((clip.duration - 1.5).abs() < 1e-6);
    assert!(asset.find_clip("Idle").is_err());
}

#[test]
fn garbage_bytes_are_an_asset_error() {
    match decode_model("broken.glb", b"not a model") {
        Err(RingError::AssetLoad { path, .. }) => assert_eq!(path, "broken.glb"),
        other => panic!("expected AssetLoad, got {other:?}"),
    }
}

#[test]
fn model_without_meshes_is_rejected() {
    let json = r#"{"asset":{"version":"2.0"},"scenes":[{"nodes":[]}]}"#;
    assert!(matches!(
        decode_model("empty.gltf", json.as_bytes()),
        Err(RingError::EmptyModel(_))
    ));
}

#[test]
fn skinned_mesh_keeps_bind_space_and_joint_influences() {
    let asset = decode_model("arm.gltf", SKINNED_GLTF.as_bytes()).expect("decode");
    let skeleton = asset.skeleton.as_ref().expect("skeleton");
    assert_eq!(skeleton.len(), 1);
    assert_eq!(skeleton.joints()[0].name, "root");
    assert_eq!(skeleton.joints()[0].parent, None);

    let mesh = &asset.meshes[0];
    assert_eq!(mesh.positions[1], [1.0, 0.0, 0.0]);
    let skin = mesh.skin.as_ref().expect("joint influences");
    assert_eq!(skin.joints, vec![[0; 4]; 3]);
    assert_eq!(skin.weights, vec![[1.0, 0.0, 0.0, 0.0]; 3]);

    for m in skeleton.rest_matrices() {
        assert!(m.abs_diff_eq(Mat4::IDENTITY, 1e-6));
    }
}

#[test]
fn joint_channels_become_clip_tracks() {
    let asset = decode_model("arm.gltf", SKINNED_GLTF.as_bytes()).expect("decode");
    let clip = asset.find_clip("Wave").expect("clip");
    assert!((clip.duration - 1.0).abs() < 1e-6);
    assert_eq!(clip.tracks.len(), 1);
    let track = &clip.tracks[0];
    assert_eq!(track.joint, 0);
    assert!(track.translation.is_none());

    let rotation = track.rotation.as_ref().expect("rotation keys");
    let end = rotation.sample(1.0);
    let p = end * Vec3::X;
    assert!((p - Vec3::Y).length() < 1e-5);

    // Static models carry no tracks.
    let tri = decode_model("tri.gltf", TRIANGLE_GLTF.as_bytes()).expect("decode");
    assert!(tri.skeleton.is_none());
    assert!(tri.find_clip("Climb").unwrap().tracks.is_empty());
}
