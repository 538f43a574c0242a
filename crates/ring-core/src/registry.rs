//! Explicit registry of what each interesting scene node is.
//!
//! Nodes are tagged when they are created, so queries such as "which meshes
//! bloom" or "what can be clicked" walk the registry rather than the whole
//! scene graph.

use fnv::FnvHashMap;
use smallvec::SmallVec;

use crate::scene::NodeId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeTag {
    /// Stencil-writing cutout of a tile.
    StencilShape { tile: usize },
    /// Decorative frame drawn around a cutout.
    Frame { tile: usize },
    /// Per-tile group that holds the inner content.
    ContentGroup { tile: usize },
    /// Landscape behind a cutout. Selected for bloom.
    Landscape { tile: usize },
    /// Animated character behind a cutout.
    Character { tile: usize },
    /// Scroll-scrubbed hero avatar anchored to the hero tile.
    Climber,
}

impl NodeTag {
    pub fn tile(&self) -> Option<usize> {
        match *self {
            NodeTag::StencilShape { tile }
            | NodeTag::Frame { tile }
            | NodeTag::ContentGroup { tile }
            | NodeTag::Landscape { tile }
            | NodeTag::Character { tile } => Some(tile),
            NodeTag::Climber => None,
        }
    }

    #[inline]
    pub fn selected_for_bloom(&self) -> bool {
        matches!(self, NodeTag::Landscape { .. })
    }

    /// Content a click ray is tested against.
    #[inline]
    pub fn interactive(&self) -> bool {
        matches!(self, NodeTag::Landscape { .. } | NodeTag::Character { .. })
    }
}

#[derive(Default, Debug)]
pub struct SceneRegistry {
    tags: FnvHashMap<NodeId, NodeTag>,
    // Registration order, so queries are stable.
    order: Vec<NodeId>,
}

impl SceneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: NodeId, tag: NodeTag) {
        if self.tags.insert(node, tag).is_none() {
            self.order.push(node);
        }
    }

    pub fn tag(&self, node: NodeId) -> Option<NodeTag> {
        self.tags.get(&node).copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, NodeTag)> + '_ {
        self.order.iter().map(move |id| (*id, self.tags[id]))
    }

    pub fn bloom_selection(&self) -> Vec<NodeId> {
        self.iter()
            .filter(|(_, t)| t.selected_for_bloom())
            .map(|(id, _)| id)
            .collect()
    }

    pub fn interactive(&self) -> Vec<NodeId> {
        self.iter()
            .filter(|(_, t)| t.interactive())
            .map(|(id, _)| id)
            .collect()
    }

    pub fn tile_nodes(&self, tile: usize) -> SmallVec<[(NodeId, NodeTag); 4]> {
        self.iter().filter(|(_, t)| t.tile() == Some(tile)).collect()
    }

    pub fn find(&self, tag: NodeTag) -> Option<NodeId> {
        self.iter().find(|(_, t)| *t == tag).map(|(id, _)| id)
    }
}
