//! BSP node storage: one tagged node type sharing a common header.

use std::ops::Range;

use crate::plane::{BoundingBox, BspPlane};

/// Index of a node in a [`Level`](super::Level)'s node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Index of a leaf in leaf order. Leaf 0 is the outside-the-level sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LeafIndex(pub usize);

impl LeafIndex {
    pub const SENTINEL: LeafIndex = LeafIndex(0);

    #[inline]
    pub fn is_sentinel(self) -> bool {
        self.0 == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortalId(pub usize);

/// What fills the volume of a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeafContents {
    Regular,
    Solid,
    Water,
    Slime,
    Lava,
    Sky,
}

impl LeafContents {
    /// Decodes the negative on-disk contents code (`-1` Regular through
    /// `-6` Sky). Non-negative codes name interior nodes and yield `None`.
    pub fn from_raw(code: i32) -> Option<Self> {
        match code {
            -1 => Some(Self::Regular),
            -2 => Some(Self::Solid),
            -3 => Some(Self::Water),
            -4 => Some(Self::Slime),
            -5 => Some(Self::Lava),
            -6 => Some(Self::Sky),
            _ => None,
        }
    }

    pub fn to_raw(self) -> i32 {
        match self {
            Self::Regular => -1,
            Self::Solid => -2,
            Self::Water => -3,
            Self::Slime => -4,
            Self::Lava => -5,
            Self::Sky => -6,
        }
    }

    #[inline]
    pub fn is_solid(self) -> bool {
        self == Self::Solid
    }
}

/// Fields shared by interior nodes and leaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeHeader {
    pub(crate) parent: Option<NodeId>,
    /// Volume of the subtree.
    pub(crate) node_bounds: BoundingBox,
    /// Extent of the geometry in the subtree.
    pub(crate) geo_bounds: BoundingBox,
    /// Frame this node was last stamped visible; 0 means never.
    pub(crate) last_visible_frame: u32,
}

/// A splitting plane with its two subtrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteriorNode {
    pub(crate) plane: BspPlane,
    pub(crate) front: NodeId,
    pub(crate) back: NodeId,
    pub(crate) portal: Option<PortalId>,
}

impl InteriorNode {
    #[inline]
    pub fn plane(&self) -> &BspPlane {
        &self.plane
    }

    /// Subtree on the positive side of the plane.
    #[inline]
    pub fn front(&self) -> NodeId {
        self.front
    }

    #[inline]
    pub fn back(&self) -> NodeId {
        self.back
    }

    /// The opening on the split plane through which one side sees the other.
    /// `None` means the plane is fully open.
    #[inline]
    pub fn portal(&self) -> Option<PortalId> {
        self.portal
    }

    #[inline]
    pub fn children(&self) -> [NodeId; 2] {
        [self.front, self.back]
    }
}

/// A convex cell of the level holding renderable surfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafNode {
    pub(crate) contents: LeafContents,
    /// Range into the level's mark-surface list.
    pub(crate) surfaces: Range<usize>,
    pub(crate) bsp_key: i32,
    pub(crate) leaf_index: LeafIndex,
    /// Range into the level's PVS blob.
    pub(crate) pvs_row: Option<Range<usize>>,
}

impl LeafNode {
    #[inline]
    pub fn contents(&self) -> LeafContents {
        self.contents
    }

    /// Key used to order surfaces between leaves.
    #[inline]
    pub fn bsp_key(&self) -> i32 {
        self.bsp_key
    }

    #[inline]
    pub fn leaf_index(&self) -> LeafIndex {
        self.leaf_index
    }

    #[inline]
    pub fn has_pvs(&self) -> bool {
        self.pvs_row.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Interior(InteriorNode),
    Leaf(LeafNode),
}

/// A node of the level BSP.
#[derive(Debug, Clone, PartialEq)]
pub struct BspNode {
    pub(crate) header: NodeHeader,
    pub(crate) kind: NodeKind,
}

impl BspNode {
    pub(crate) fn new(kind: NodeKind, geo_bounds: BoundingBox) -> Self {
        Self {
            header: NodeHeader {
                parent: None,
                node_bounds: geo_bounds,
                geo_bounds,
                last_visible_frame: 0,
            },
            kind,
        }
    }

    #[inline]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.header.parent
    }

    #[inline]
    pub fn node_bounds(&self) -> &BoundingBox {
        &self.header.node_bounds
    }

    #[inline]
    pub fn geo_bounds(&self) -> &BoundingBox {
        &self.header.geo_bounds
    }

    #[inline]
    pub fn last_visible_frame(&self) -> u32 {
        self.header.last_visible_frame
    }

    /// Whether the node was stamped visible in `frame`.
    #[inline]
    pub fn is_visible_in(&self, frame: u32) -> bool {
        frame != 0 && self.header.last_visible_frame == frame
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    pub fn as_interior(&self) -> Option<&InteriorNode> {
        match &self.kind {
            NodeKind::Interior(interior) => Some(interior),
            NodeKind::Leaf(_) => None,
        }
    }

    pub fn as_leaf(&self) -> Option<&LeafNode> {
        match &self.kind {
            NodeKind::Leaf(leaf) => Some(leaf),
            NodeKind::Interior(_) => None,
        }
    }

    /// The raw contents code: a leaf's negative contents, or the front
    /// child's index for an interior node.
    pub fn contents_code(&self) -> i32 {
        match &self.kind {
            NodeKind::Interior(interior) => interior.front.0 as i32,
            NodeKind::Leaf(leaf) => leaf.contents.to_raw(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plane::Axis;
    use nalgebra::Point3;

    fn make_bounds() -> BoundingBox {
        BoundingBox::new(Point3::new(0, 0, 0), Point3::new(64, 64, 64))
    }

    fn make_leaf(contents: LeafContents) -> BspNode {
        BspNode::new(
            NodeKind::Leaf(LeafNode {
                contents,
                surfaces: 0..0,
                bsp_key: 0,
                leaf_index: LeafIndex(1),
                pvs_row: None,
            }),
            make_bounds(),
        )
    }

    #[test]
    fn contents_codes_round_trip() {
        for code in -6..=-1 {
            let contents = LeafContents::from_raw(code).unwrap();
            assert_eq!(contents.to_raw(), code);
        }
        assert_eq!(LeafContents::from_raw(0), None);
        assert_eq!(LeafContents::from_raw(-7), None);
        assert!(LeafContents::from_raw(-2).unwrap().is_solid());
    }

    #[test]
    fn contents_code_discriminates_variants() {
        let leaf = make_leaf(LeafContents::Water);
        assert_eq!(leaf.contents_code(), -3);

        let interior = BspNode::new(
            NodeKind::Interior(InteriorNode {
                plane: BspPlane::axial(Axis::X, 0),
                front: NodeId(4),
                back: NodeId(5),
                portal: None,
            }),
            make_bounds(),
        );
        assert_eq!(interior.contents_code(), 4);
        assert!(interior.as_leaf().is_none());
        assert_eq!(interior.as_interior().unwrap().children(), [NodeId(4), NodeId(5)]);
    }

    #[test]
    fn new_node_is_never_visible() {
        let leaf = make_leaf(LeafContents::Regular);
        assert_eq!(leaf.last_visible_frame(), 0);
        assert!(!leaf.is_visible_in(0));
        assert!(!leaf.is_visible_in(1));
        assert!(leaf.is_leaf());
    }

    #[test]
    fn sentinel_leaf_index() {
        assert!(LeafIndex::SENTINEL.is_sentinel());
        assert!(!LeafIndex(3).is_sentinel());
    }
}
