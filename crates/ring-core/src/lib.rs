pub mod animation;
pub mod assets;
pub mod blender;
pub mod camera;
pub mod compositor;
pub mod config;
pub mod constants;
pub mod content;
pub mod damp;
pub mod error;
pub mod experience;
pub mod interaction;
pub mod layout;
pub mod lights;
pub mod registry;
pub mod ring;
pub mod scene;
pub mod sequence;
pub mod skeleton;
pub mod stencil;

pub use animation::{ActionId, AnimationMixer, ClipInfo};
pub use assets::{AssetContext, AssetLoader, LoadFuture, ModelAsset};
pub use blender::{AnimationBlender, HeroAvatar};
pub use camera::{Camera, CameraRig};
pub use compositor::{BloomSelection, CompositorSettings, PassKind};
pub use config::{BloomSettings, CameraSettings, DistortionSettings, RingConfig};
pub use content::{AssetPaths, LoadedTile, TileAssets};
pub use error::{Result, RingError};
pub use experience::{Experience, FrameReport, Release};
pub use interaction::{DragEnd, DragInput, GesturePhase};
pub use layout::{compute_layout, TilePlacement};
pub use lights::SceneLights;
pub use registry::{NodeTag, SceneRegistry};
pub use ring::{RingState, ScrollUpdate, TileRing};
pub use scene::{Aabb, DrawItem, Material, MeshData, MeshId, NodeId, Ray, Scene, SkinWeights};
pub use sequence::{CrossFadeSequence, SequenceEvent, SequenceState};
pub use skeleton::{Joint, JointTrack, Keyframes, Skeleton, MAX_SKIN_JOINTS};
pub use stencil::{StencilId, StencilState, TileStencil};
