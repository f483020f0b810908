//! Level container and construction.

use nalgebra::Point3;

use crate::error::{LevelError, RenderError};
use crate::plane::{BoundingBox, BspPlane, PlaneSide};

use super::node::{
    BspNode, InteriorNode, LeafContents, LeafIndex, LeafNode, NodeId, NodeKind, PortalId,
    SurfaceId,
};

/// Node arena slot of the outside-the-level sentinel leaf.
const SENTINEL_NODE: NodeId = NodeId(0);

/// A renderable polygon in world space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    vertices: Vec<Point3<i32>>,
}

impl Surface {
    pub fn new(vertices: Vec<Point3<i32>>) -> Self {
        Self { vertices }
    }

    #[inline]
    pub fn vertices(&self) -> &[Point3<i32>] {
        &self.vertices
    }
}

/// A convex opening between two regions of the level, lying on the split
/// plane of the interior node that owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Portal {
    vertices: Vec<Point3<i32>>,
}

impl Portal {
    pub fn new(vertices: Vec<Point3<i32>>) -> Self {
        Self { vertices }
    }

    #[inline]
    pub fn vertices(&self) -> &[Point3<i32>] {
        &self.vertices
    }
}

/// Everything needed to add a leaf to a [`LevelBuilder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafDesc {
    pub contents: LeafContents,
    /// Volume of the leaf cell.
    pub bounds: BoundingBox,
    pub surfaces: Vec<SurfaceId>,
    /// Compressed PVS row, if the level has visibility data.
    pub pvs: Option<Vec<u8>>,
    pub bsp_key: i32,
}

impl LeafDesc {
    pub fn new(contents: LeafContents, bounds: BoundingBox) -> Self {
        Self {
            contents,
            bounds,
            surfaces: Vec::new(),
            pvs: None,
            bsp_key: 0,
        }
    }

    pub fn with_surfaces(mut self, surfaces: Vec<SurfaceId>) -> Self {
        self.surfaces = surfaces;
        self
    }

    pub fn with_pvs(mut self, row: Vec<u8>) -> Self {
        self.pvs = Some(row);
        self
    }

    pub fn with_bsp_key(mut self, key: i32) -> Self {
        self.bsp_key = key;
        self
    }
}

/// Assembles a [`Level`] from leaves and interior nodes.
///
/// Leaf indices are handed out in insertion order starting at 1; leaf 0 is
/// the solid sentinel created by [`LevelBuilder::new`]. Nodes may be added in
/// any order, references are only checked by [`LevelBuilder::build`].
#[derive(Debug, Clone)]
pub struct LevelBuilder {
    nodes: Vec<BspNode>,
    leaves: Vec<NodeId>,
    surfaces: Vec<Surface>,
    mark_surfaces: Vec<SurfaceId>,
    portals: Vec<Portal>,
    visibility: Vec<u8>,
}

impl Default for LevelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LevelBuilder {
    pub fn new() -> Self {
        let origin = Point3::origin();
        let sentinel = BspNode::new(
            NodeKind::Leaf(LeafNode {
                contents: LeafContents::Solid,
                surfaces: 0..0,
                bsp_key: 0,
                leaf_index: LeafIndex::SENTINEL,
                pvs_row: None,
            }),
            BoundingBox::new(origin, origin),
        );

        Self {
            nodes: vec![sentinel],
            leaves: vec![SENTINEL_NODE],
            surfaces: Vec::new(),
            mark_surfaces: Vec::new(),
            portals: Vec::new(),
            visibility: Vec::new(),
        }
    }

    /// The sentinel leaf's node, usable as a child standing for "outside".
    #[inline]
    pub fn sentinel(&self) -> NodeId {
        SENTINEL_NODE
    }

    pub fn add_surface(&mut self, surface: Surface) -> SurfaceId {
        self.surfaces.push(surface);
        SurfaceId(self.surfaces.len() - 1)
    }

    pub fn add_portal(&mut self, portal: Portal) -> PortalId {
        self.portals.push(portal);
        PortalId(self.portals.len() - 1)
    }

    pub fn add_leaf(&mut self, desc: LeafDesc) -> NodeId {
        let start = self.mark_surfaces.len();
        self.mark_surfaces.extend_from_slice(&desc.surfaces);

        let pvs_row = desc.pvs.map(|row| {
            let offset = self.visibility.len();
            self.visibility.extend_from_slice(&row);
            offset..self.visibility.len()
        });

        let id = NodeId(self.nodes.len());
        let leaf_index = LeafIndex(self.leaves.len());
        self.nodes.push(BspNode::new(
            NodeKind::Leaf(LeafNode {
                contents: desc.contents,
                surfaces: start..self.mark_surfaces.len(),
                bsp_key: desc.bsp_key,
                leaf_index,
                pvs_row,
            }),
            desc.bounds,
        ));
        self.leaves.push(id);
        id
    }

    pub fn add_interior(
        &mut self,
        plane: BspPlane,
        front: NodeId,
        back: NodeId,
        portal: Option<PortalId>,
    ) -> NodeId {
        let origin = Point3::origin();
        self.nodes.push(BspNode::new(
            NodeKind::Interior(InteriorNode {
                plane,
                front,
                back,
                portal,
            }),
            BoundingBox::new(origin, origin),
        ));
        NodeId(self.nodes.len() - 1)
    }

    /// Leaves added so far, sentinel included.
    #[inline]
    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// Validates the tree rooted at `root` and computes parents and bounds.
    pub fn build(mut self, root: NodeId) -> Result<Level, LevelError> {
        let count = self.nodes.len();
        if root.0 >= count || root == SENTINEL_NODE {
            return Err(LevelError::MissingRoot(root));
        }

        for index in 0..count {
            let node = NodeId(index);
            let Some(interior) = self.nodes[index].as_interior().copied() else {
                continue;
            };

            if let Some(portal) = interior.portal {
                let Some(polygon) = self.portals.get(portal.0) else {
                    return Err(LevelError::MissingPortal { node, portal });
                };
                if polygon.vertices.len() < 3 {
                    return Err(LevelError::DegeneratePortal {
                        portal,
                        count: polygon.vertices.len(),
                    });
                }
            }

            for child in interior.children() {
                if child.0 >= count {
                    return Err(LevelError::MissingChild { node, child });
                }
                // Any number of nodes may point at the sentinel.
                if child == SENTINEL_NODE {
                    continue;
                }
                if let Some(first) = self.nodes[child.0].header.parent {
                    return Err(LevelError::MultipleParents {
                        child,
                        first,
                        second: node,
                    });
                }
                self.nodes[child.0].header.parent = Some(node);
            }
        }

        if self.nodes[root.0].header.parent.is_some() {
            return Err(LevelError::RootHasParent(root));
        }

        if let Some(&missing) = self
            .mark_surfaces
            .iter()
            .find(|s| s.0 >= self.surfaces.len())
        {
            return Err(LevelError::MissingSurface(missing));
        }

        let reached = self.compute_bounds(root);
        let unreachable = count - 1 - reached;
        if unreachable > 0 {
            return Err(LevelError::Unreachable { count: unreachable });
        }

        let level = Level {
            nodes: self.nodes,
            root,
            leaves: self.leaves,
            surfaces: self.surfaces,
            mark_surfaces: self.mark_surfaces,
            portals: self.portals,
            visibility: self.visibility,
        };
        log::info!(
            "built level: {} nodes, {} leaves, {} surfaces, {} portals, {} PVS bytes, depth {}",
            level.node_count(),
            level.leaf_count(),
            level.surfaces.len(),
            level.portals.len(),
            level.visibility.len(),
            level.depth()
        );
        Ok(level)
    }

    /// Fills in bounds below `id`, returning the number of nodes visited.
    fn compute_bounds(&mut self, id: NodeId) -> usize {
        let children = self.nodes[id.0].as_interior().map(InteriorNode::children);

        let Some(children) = children else {
            if let NodeKind::Leaf(leaf) = &self.nodes[id.0].kind {
                let geo = BoundingBox::enclosing(
                    self.mark_surfaces[leaf.surfaces.clone()]
                        .iter()
                        .flat_map(|s| self.surfaces[s.0].vertices.iter()),
                );
                if let Some(geo) = geo {
                    self.nodes[id.0].header.geo_bounds = geo;
                }
            }
            return 1;
        };

        let mut reached = 1;
        let mut bounds: Option<(BoundingBox, BoundingBox)> = None;
        for child in children {
            if child == SENTINEL_NODE {
                continue;
            }
            reached += self.compute_bounds(child);
            let header = &self.nodes[child.0].header;
            bounds = Some(match bounds {
                None => (header.node_bounds, header.geo_bounds),
                Some((node, geo)) => (
                    node.union(&header.node_bounds),
                    geo.union(&header.geo_bounds),
                ),
            });
        }

        if let Some((node, geo)) = bounds {
            let header = &mut self.nodes[id.0].header;
            header.node_bounds = node;
            header.geo_bounds = geo;
        }
        reached
    }
}

/// Immutable level data plus the per-node visibility stamps.
#[derive(Debug, Clone)]
pub struct Level {
    nodes: Vec<BspNode>,
    root: NodeId,
    leaves: Vec<NodeId>,
    surfaces: Vec<Surface>,
    mark_surfaces: Vec<SurfaceId>,
    portals: Vec<Portal>,
    visibility: Vec<u8>,
}

impl Level {
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// # Panics
    /// Panics if `id` does not belong to this level.
    #[inline]
    pub fn node(&self, id: NodeId) -> &BspNode {
        &self.nodes[id.0]
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&BspNode> {
        self.nodes.get(id.0)
    }

    #[inline]
    pub fn nodes(&self) -> &[BspNode] {
        &self.nodes
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of leaves, sentinel included.
    #[inline]
    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    pub fn leaf_node(&self, leaf: LeafIndex) -> Option<NodeId> {
        self.leaves.get(leaf.0).copied()
    }

    pub fn leaf(&self, leaf: LeafIndex) -> Option<&LeafNode> {
        self.leaf_node(leaf).and_then(|id| self.nodes[id.0].as_leaf())
    }

    /// Surfaces marked in the leaf at `id`; empty for interior nodes.
    pub fn leaf_surfaces(&self, id: NodeId) -> &[SurfaceId] {
        match self.nodes.get(id.0).map(BspNode::kind) {
            Some(NodeKind::Leaf(leaf)) => &self.mark_surfaces[leaf.surfaces.clone()],
            _ => &[],
        }
    }

    #[inline]
    pub fn surface(&self, id: SurfaceId) -> &Surface {
        &self.surfaces[id.0]
    }

    #[inline]
    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    #[inline]
    pub fn portal(&self, id: PortalId) -> &Portal {
        &self.portals[id.0]
    }

    /// The compressed PVS row of `leaf`, if it has one.
    pub fn pvs_row(&self, leaf: LeafIndex) -> Option<&[u8]> {
        let range = self.leaf(leaf)?.pvs_row.clone()?;
        self.visibility.get(range)
    }

    /// Finds the leaf containing `point`. Points on a split plane go to the
    /// front side; points outside the level map to the sentinel.
    pub fn find_leaf(&self, point: Point3<i32>) -> LeafIndex {
        if !self.nodes[self.root.0].header.node_bounds.contains(point) {
            return LeafIndex::SENTINEL;
        }

        let mut id = self.root;
        loop {
            match &self.nodes[id.0].kind {
                NodeKind::Leaf(leaf) => return leaf.leaf_index,
                NodeKind::Interior(interior) => {
                    id = match interior.plane.classify_point(point) {
                        PlaneSide::Back => interior.back,
                        PlaneSide::Front | PlaneSide::OnPlane => interior.front,
                    };
                }
            }
        }
    }

    /// Whether `leaf` was stamped visible in `frame`.
    pub fn is_leaf_visible_this_frame(&self, leaf: LeafIndex, frame: u32) -> bool {
        self.leaf_node(leaf)
            .is_some_and(|id| self.nodes[id.0].is_visible_in(frame))
    }

    /// Maximum depth of the tree; a lone leaf has depth 1.
    pub fn depth(&self) -> usize {
        self.depth_below(self.root)
    }

    fn depth_below(&self, id: NodeId) -> usize {
        match &self.nodes[id.0].kind {
            NodeKind::Leaf(_) => 1,
            NodeKind::Interior(interior) => {
                1 + self
                    .depth_below(interior.front)
                    .max(self.depth_below(interior.back))
            }
        }
    }

    /// Stamps `id` and its ancestors with `frame`, stopping at the first
    /// ancestor already stamped. Returns the number of nodes stamped.
    ///
    /// A chain that ends anywhere but the root is reported as
    /// [`RenderError::OrphanNode`].
    pub(crate) fn mark_ancestors_visible(
        &mut self,
        id: NodeId,
        frame: u32,
    ) -> Result<usize, RenderError> {
        self.nodes[id.0].header.last_visible_frame = frame;
        let mut stamped = 1;
        let mut current = id;

        while let Some(parent) = self.nodes[current.0].header.parent {
            let header = &mut self.nodes[parent.0].header;
            if header.last_visible_frame == frame {
                return Ok(stamped);
            }
            header.last_visible_frame = frame;
            stamped += 1;
            current = parent;
        }

        if current != self.root {
            return Err(RenderError::OrphanNode(current));
        }
        Ok(stamped)
    }
}
