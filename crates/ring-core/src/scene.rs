//! Minimal retained scene graph: an arena of nodes with parent links,
//! shared mesh storage and per-node materials.

use std::sync::Arc;

use fnv::FnvHashMap;
use glam::{Mat4, Quat, Vec3};
use smallvec::SmallVec;

use crate::animation::AnimationMixer;
use crate::error::{Result, RingError};
use crate::skeleton::Skeleton;
use crate::stencil::StencilState;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(u32);

impl MeshId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Axis-aligned bounding box. An empty box has `min > max`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Aabb {
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a [f32; 3]>) -> Self {
        let mut b = Self::EMPTY;
        for p in points {
            b.extend(Vec3::from(*p));
        }
        b
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn extend(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Bounds of this box after transforming its eight corners.
    pub fn transformed(&self, m: &Mat4) -> Aabb {
        if self.is_empty() {
            return *self;
        }
        let mut out = Aabb::EMPTY;
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            out.extend(m.transform_point3(corner));
        }
        out
    }

    /// Slab test. Returns the entry distance along the ray, or 0 when the
    /// origin is inside the box.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        if self.is_empty() {
            return None;
        }
        let mut t_min = 0.0_f32;
        let mut t_max = f32::INFINITY;
        for axis in 0..3 {
            let o = ray.origin[axis];
            let d = ray.direction[axis];
            if d.abs() < 1e-12 {
                if o < self.min[axis] || o > self.max[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let mut t0 = (self.min[axis] - o) * inv;
            let mut t1 = (self.max[axis] - o) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }
        Some(t_min)
    }
}

/// Per-vertex joint influences, indexing into the owning model's skeleton.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SkinWeights {
    pub joints: Vec<[u16; 4]>,
    pub weights: Vec<[f32; 4]>,
}

/// Triangle mesh in model space. Skinned meshes stay in bind space and
/// carry their joint influences.
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    pub bounds: Aabb,
    pub skin: Option<SkinWeights>,
}

impl MeshData {
    /// Build a mesh; missing normals are filled with area-weighted vertex
    /// normals.
    pub fn new(positions: Vec<[f32; 3]>, normals: Vec<[f32; 3]>, indices: Vec<u32>) -> Self {
        let bounds = Aabb::from_points(positions.iter());
        let normals = if normals.len() == positions.len() {
            normals
        } else {
            vertex_normals(&positions, &indices)
        };
        Self {
            positions,
            normals,
            indices,
            bounds,
            skin: None,
        }
    }

    /// Attach joint influences. Both lists are padded or cut to the vertex
    /// count and each vertex's weights are normalised to sum to one.
    pub fn with_skin(mut self, mut joints: Vec<[u16; 4]>, mut weights: Vec<[f32; 4]>) -> Self {
        joints.resize(self.positions.len(), [0; 4]);
        weights.resize(self.positions.len(), [0.0; 4]);
        for w in weights.iter_mut() {
            let sum: f32 = w.iter().sum();
            if sum > f32::EPSILON {
                w.iter_mut().for_each(|x| *x /= sum);
            }
        }
        self.skin = Some(SkinWeights { joints, weights });
        self
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

fn vertex_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut acc = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if a >= positions.len() || b >= positions.len() || c >= positions.len() {
            continue;
        }
        let pa = Vec3::from(positions[a]);
        let n = (Vec3::from(positions[b]) - pa).cross(Vec3::from(positions[c]) - pa);
        acc[a] += n;
        acc[b] += n;
        acc[c] += n;
    }
    acc.into_iter()
        .map(|n| n.try_normalize().unwrap_or(Vec3::Y).to_array())
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    #[inline]
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub color: Vec3,
    pub metalness: f32,
    pub roughness: f32,
    pub emissive: f32,
    pub stencil: StencilState,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            metalness: 0.0,
            roughness: 1.0,
            emissive: 0.0,
            stencil: StencilState::DISABLED,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    pub name: String,
    pub transform: Transform,
    pub parent: Option<NodeId>,
    pub visible: bool,
    pub meshes: SmallVec<[MeshId; 4]>,
    pub material: Material,
    pub skeleton: Option<Arc<Skeleton>>,
    /// Current skinning matrices; empty without a skeleton.
    pub joint_palette: Vec<Mat4>,
}

/// One mesh to draw with its resolved world matrix.
#[derive(Clone, Copy, Debug)]
pub struct DrawItem {
    pub node: NodeId,
    pub mesh: MeshId,
    pub world: Mat4,
    pub material: Material,
    /// The node has a joint palette, see [`Scene::joint_palette`].
    pub skinned: bool,
}

#[derive(Default)]
pub struct Scene {
    nodes: Vec<Node>,
    meshes: Vec<MeshData>,
    model_meshes: FnvHashMap<String, SmallVec<[MeshId; 4]>>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn add_node(&mut self, name: impl Into<String>, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            name: name.into(),
            transform: Transform::IDENTITY,
            parent,
            visible: true,
            meshes: SmallVec::new(),
            material: Material::default(),
            skeleton: None,
            joint_palette: Vec::new(),
        });
        id
    }

    pub fn add_mesh(&mut self, mesh: MeshData) -> MeshId {
        let id = MeshId(self.meshes.len() as u32);
        self.meshes.push(mesh);
        id
    }

    /// Mesh ids for a model keyed by its path, uploading the meshes the first
    /// time the model is seen so repeated instances share storage.
    pub fn model_meshes(&mut self, key: &str, meshes: &[MeshData]) -> SmallVec<[MeshId; 4]> {
        if let Some(ids) = self.model_meshes.get(key) {
            return ids.clone();
        }
        let ids: SmallVec<[MeshId; 4]> = meshes.iter().map(|m| self.add_mesh(m.clone())).collect();
        self.model_meshes.insert(key.to_string(), ids.clone());
        ids
    }

    pub fn mesh(&self, id: MeshId) -> Option<&MeshData> {
        self.meshes.get(id.index())
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id.index()).ok_or(RingError::UnknownNode(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(id.index()).ok_or(RingError::UnknownNode(id))
    }

    pub fn set_translation(&mut self, id: NodeId, translation: Vec3) -> Result<()> {
        self.node_mut(id)?.transform.translation = translation;
        Ok(())
    }

    pub fn set_rotation(&mut self, id: NodeId, rotation: Quat) -> Result<()> {
        self.node_mut(id)?.transform.rotation = rotation;
        Ok(())
    }

    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> Result<()> {
        self.node_mut(id)?.visible = visible;
        Ok(())
    }

    /// Give the node a skeleton, starting from its rest palette.
    pub fn set_skeleton(&mut self, id: NodeId, skeleton: Option<Arc<Skeleton>>) -> Result<()> {
        let node = self.node_mut(id)?;
        node.joint_palette = skeleton
            .as_deref()
            .map(Skeleton::rest_matrices)
            .unwrap_or_default();
        node.skeleton = skeleton;
        Ok(())
    }

    /// Re-sample the node's palette from `mixer`. No-op without a skeleton.
    pub fn pose(&mut self, id: NodeId, mixer: &AnimationMixer) -> Result<()> {
        let node = self.node_mut(id)?;
        if let Some(skeleton) = &node.skeleton {
            node.joint_palette = mixer.skin_matrices(skeleton);
        }
        Ok(())
    }

    pub fn joint_palette(&self, id: NodeId) -> Option<&[Mat4]> {
        self.nodes
            .get(id.index())
            .filter(|n| n.skeleton.is_some())
            .map(|n| n.joint_palette.as_slice())
    }

    pub fn world_matrix(&self, id: NodeId) -> Result<Mat4> {
        let node = self.node(id)?;
        let local = node.transform.matrix();
        match node.parent {
            Some(p) => Ok(self.world_matrix(p)? * local),
            None => Ok(local),
        }
    }

    /// Visible only when the node and all of its ancestors are.
    pub fn is_visible(&self, id: NodeId) -> bool {
        let mut cur = Some(id);
        while let Some(c) = cur {
            match self.nodes.get(c.index()) {
                Some(n) if n.visible => cur = n.parent,
                _ => return false,
            }
        }
        true
    }

    /// Union of the node's mesh bounds in its own space.
    pub fn local_bounds(&self, id: NodeId) -> Result<Aabb> {
        let node = self.node(id)?;
        Ok(node
            .meshes
            .iter()
            .filter_map(|m| self.mesh(*m))
            .fold(Aabb::EMPTY, |acc, m| acc.union(&m.bounds)))
    }

    pub fn world_bounds(&self, id: NodeId) -> Result<Aabb> {
        let local = self.local_bounds(id)?;
        Ok(local.transformed(&self.world_matrix(id)?))
    }

    /// Every mesh on a visible node, with resolved world matrices.
    pub fn draw_items(&self) -> Vec<DrawItem> {
        let mut world_cache: Vec<Option<Mat4>> = vec![None; self.nodes.len()];
        let mut items = Vec::new();
        for (i, node) in self.nodes.iter().enumerate() {
            if node.meshes.is_empty() {
                continue;
            }
            let id = NodeId(i as u32);
            if !self.is_visible(id) {
                continue;
            }
            let world = self.cached_world(id, &mut world_cache);
            for mesh in &node.meshes {
                items.push(DrawItem {
                    node: id,
                    mesh: *mesh,
                    world,
                    material: node.material,
                    skinned: node.skeleton.is_some(),
                });
            }
        }
        items
    }

    fn cached_world(&self, id: NodeId, cache: &mut [Option<Mat4>]) -> Mat4 {
        if let Some(m) = cache[id.index()] {
            return m;
        }
        let node = &self.nodes[id.index()];
        let local = node.transform.matrix();
        let world = match node.parent {
            Some(p) => self.cached_world(p, cache) * local,
            None => local,
        };
        cache[id.index()] = Some(world);
        world
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ray_hits_box_in_front_and_misses_behind() {
        let b = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let hit = b.intersect_ray(&Ray::new(Vec3::new(0.0, 0.0, 5.0), -Vec3::Z));
        assert!((hit.unwrap() - 4.0).abs() < 1e-5);
        assert!(b
            .intersect_ray(&Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::Z))
            .is_none());
    }

    #[test]
    fn hidden_parent_hides_children() {
        let mut s = Scene::new();
        let root = s.add_node("root", None);
        let child = s.add_node("child", Some(root));
        assert!(s.is_visible(child));
        s.set_visible(root, false).unwrap();
        assert!(!s.is_visible(child));
    }

    #[test]
    fn skin_weights_are_padded_and_normalised() {
        let mesh = MeshData::new(
            vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            Vec::new(),
            vec![0, 1, 2],
        )
        .with_skin(vec![[0, 1, 0, 0]], vec![[2.0, 2.0, 0.0, 0.0]]);
        let skin = mesh.skin.unwrap();
        assert_eq!(skin.joints.len(), 3);
        assert_eq!(skin.weights[0], [0.5, 0.5, 0.0, 0.0]);
        assert_eq!(skin.weights[2], [0.0; 4]);
    }

    #[test]
    fn world_matrix_composes_parents() {
        let mut s = Scene::new();
        let root = s.add_node("root", None);
        let child = s.add_node("child", Some(root));
        s.set_translation(root, Vec3::new(0.0, 10.0, 0.0)).unwrap();
        s.set_translation(child, Vec3::new(1.0, 0.0, 0.0)).unwrap();
        let p = s.world_matrix(child).unwrap().transform_point3(Vec3::ZERO);
        assert!((p - Vec3::new(1.0, 10.0, 0.0)).length() < 1e-5);
    }
}
