//! Post-processing pass chain and the GPU-independent parts of it: which
//! passes run, which meshes bloom, the order draws must be issued in for
//! the stencil cutouts to work, and the bloom mip chain sizes.

use fnv::FnvHashSet;
use smallvec::SmallVec;

use crate::config::{BloomSettings, DistortionSettings};
use crate::registry::SceneRegistry;
use crate::scene::{DrawItem, NodeId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassKind {
    /// Scene render with depth and stencil.
    Render,
    /// Trail-driven UV warp.
    Distortion,
    /// Bloom of the selected meshes, added over the frame.
    SelectiveBloom,
}

#[derive(Clone, Debug, Default)]
pub struct CompositorSettings {
    pub distortion: Option<DistortionSettings>,
    pub bloom: BloomSettings,
}

impl CompositorSettings {
    pub fn with_distortion(bloom: BloomSettings, distortion: DistortionSettings) -> Self {
        Self {
            distortion: Some(distortion),
            bloom,
        }
    }

    /// Passes in execution order. Each reads the previous one's output and
    /// the last one writes to the surface.
    pub fn passes(&self) -> SmallVec<[PassKind; 3]> {
        let mut passes = SmallVec::new();
        passes.push(PassKind::Render);
        if self.distortion.is_some() {
            passes.push(PassKind::Distortion);
        }
        if self.bloom.levels > 0 && self.bloom.intensity > 0.0 {
            passes.push(PassKind::SelectiveBloom);
        }
        passes
    }
}

/// Allow-list of nodes whose meshes contribute to bloom.
#[derive(Clone, Debug, Default)]
pub struct BloomSelection {
    nodes: FnvHashSet<NodeId>,
}

impl BloomSelection {
    pub fn from_registry(registry: &SceneRegistry) -> Self {
        Self {
            nodes: registry.bloom_selection().into_iter().collect(),
        }
    }

    /// Rebuild after new content was registered.
    pub fn refresh(&mut self, registry: &SceneRegistry) {
        let before = self.nodes.len();
        *self = Self::from_registry(registry);
        if self.nodes.len() != before {
            log::info!("[bloom] selection now {} meshes", self.nodes.len());
        }
    }

    #[inline]
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum DrawPhase {
    StencilWrite,
    StencilTest,
    Plain,
}

impl DrawPhase {
    /// Every phase shades; a cutout paints its own (black) material where
    /// it stamps the stencil.
    pub fn writes_color(self) -> bool {
        true
    }

    /// Cutouts leave depth alone so content behind the window still passes.
    pub fn writes_depth(self) -> bool {
        self != DrawPhase::StencilWrite
    }
}

pub fn draw_phase(item: &DrawItem) -> DrawPhase {
    let s = item.material.stencil;
    if s.is_writer() {
        DrawPhase::StencilWrite
    } else if s.is_reader() {
        DrawPhase::StencilTest
    } else {
        DrawPhase::Plain
    }
}

/// Cutouts have to stamp the stencil buffer before anything tests against
/// it. The sort is stable so scene order is kept within a phase.
pub fn order_draws(items: &mut [DrawItem]) {
    items.sort_by_key(draw_phase);
}

/// Sizes of the bloom mip chain, halving from the full frame size.
pub fn bloom_mip_sizes(width: u32, height: u32, levels: u32) -> SmallVec<[(u32, u32); 8]> {
    let mut sizes = SmallVec::new();
    let (mut w, mut h) = (width.max(1), height.max(1));
    for _ in 0..levels {
        w = (w / 2).max(1);
        h = (h / 2).max(1);
        sizes.push((w, h));
    }
    sizes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Material, MeshData, Scene};
    use crate::stencil::TileStencil;
    use glam::Mat4;

    #[test]
    fn pass_order() {
        let s = CompositorSettings::with_distortion(
            BloomSettings::default(),
            DistortionSettings::default(),
        );
        assert_eq!(
            s.passes().as_slice(),
            &[PassKind::Render, PassKind::Distortion, PassKind::SelectiveBloom]
        );
        let plain = CompositorSettings::default();
        assert_eq!(
            plain.passes().as_slice(),
            &[PassKind::Render, PassKind::SelectiveBloom]
        );
    }

    #[test]
    fn writers_draw_before_readers() {
        let mut scene = Scene::new();
        let a = scene.add_node("a", None);
        let mesh = scene.add_mesh(MeshData::default());
        let stencil = TileStencil::for_tile(0).unwrap();
        let item = |stencil| DrawItem {
            node: a,
            mesh,
            world: Mat4::IDENTITY,
            material: Material {
                stencil,
                ..Material::default()
            },
            skinned: false,
        };
        let mut items = vec![
            item(stencil.reader),
            item(Material::default().stencil),
            item(stencil.writer),
        ];
        order_draws(&mut items);
        let phases: Vec<_> = items.iter().map(draw_phase).collect();
        assert_eq!(
            phases,
            vec![DrawPhase::StencilWrite, DrawPhase::StencilTest, DrawPhase::Plain]
        );
    }

    #[test]
    fn cutouts_paint_colour_but_not_depth() {
        assert!(DrawPhase::StencilWrite.writes_color());
        assert!(!DrawPhase::StencilWrite.writes_depth());
        for phase in [DrawPhase::StencilTest, DrawPhase::Plain] {
            assert!(phase.writes_color());
            assert!(phase.writes_depth());
        }
    }

    #[test]
    fn mip_chain_halves() {
        assert_eq!(
            bloom_mip_sizes(800, 600, 4).as_slice(),
            &[(400, 300), (200, 150), (100, 75), (50, 37)]
        );
        assert_eq!(bloom_mip_sizes(3, 1, 3).as_slice(), &[(1, 1), (1, 1), (1, 1)]);
    }
}
