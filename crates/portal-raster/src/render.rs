//! Per-frame visibility traversal.
//!
//! The traversal walks the level BSP front to back from the camera. Each far
//! subtree is only entered through the part of the screen its portal leaves
//! open; every leaf that survives PVS, bounds and region clipping is stamped
//! with the frame number and handed to a [`VisibilityVisitor`].

use nalgebra::Point3;

use crate::bsp::{
    CollectingVisitor, InteriorNode, LeafNode, Level, NodeId, NodeKind, PortalId, VisibilityVisitor,
    VisibleLeaf, VisibleSet,
};
use crate::camera::{BoxProjection, Camera, ClipVertex, Projection};
use crate::config::RenderConfig;
use crate::error::{ConfigError, RenderError};
use crate::plane::PlaneSide;
use crate::pvs::PotentiallyVisibleSet;
use crate::raster::{RasterRegion, intersect};
use crate::scratch::ScratchArena;

/// Counters for one rendered frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frame: u32,
    pub nodes_visited: usize,
    pub leaves_visible: usize,
    /// Leaves skipped because their PVS bit was clear.
    pub pvs_rejected: usize,
    /// Far subtrees skipped because their bounds missed the clip region.
    pub bounds_rejected: usize,
    /// Far subtrees skipped because nothing was visible through the portal.
    pub portals_culled: usize,
    /// Leaves whose draw region came out empty.
    pub regions_culled: usize,
    pub portal_regions_built: usize,
    pub leaf_regions_built: usize,
    /// Most scratch cells in use at once during the frame.
    pub arena_high_water: usize,
}

/// Everything the traversal owns across frames: the scratch arena, the PVS
/// buffer, the portal vertex buffer and the frame counter.
#[derive(Debug)]
pub struct RenderContext {
    config: RenderConfig,
    frame: u32,
    arena: ScratchArena,
    pvs: PotentiallyVisibleSet,
    vertex_scratch: Vec<ClipVertex>,
    stats: FrameStats,
}

impl RenderContext {
    pub fn new(config: RenderConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            frame: 0,
            arena: ScratchArena::with_capacity(config.arena_capacity),
            pvs: PotentiallyVisibleSet::new(),
            vertex_scratch: Vec::with_capacity(config.max_polygon_vertices),
            stats: FrameStats::default(),
            config,
        })
    }

    #[inline]
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Number of the last rendered frame; 0 before the first.
    #[inline]
    pub fn frame(&self) -> u32 {
        self.frame
    }

    /// Statistics of the last successful frame.
    #[inline]
    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// The visibility set decompressed for the last frame.
    #[inline]
    pub fn pvs(&self) -> &PotentiallyVisibleSet {
        &self.pvs
    }

    pub fn projection(&self) -> Projection {
        self.config.projection()
    }

    /// A camera using the configured projection.
    pub fn camera(&self, position: Point3<i32>, yaw: f32, pitch: f32) -> Camera {
        Camera::new(position, yaw, pitch, self.projection())
    }

    /// Renders one frame, calling `visitor` for every visible leaf in
    /// front-to-back order.
    ///
    /// On error the frame is abandoned; the arena is still reset, so the
    /// context stays usable.
    pub fn render_frame<V: VisibilityVisitor>(
        &mut self,
        level: &mut Level,
        camera: &Camera,
        visitor: &mut V,
    ) -> Result<FrameStats, RenderError> {
        // Frame 0 means "never visible".
        self.frame = self.frame.wrapping_add(1).max(1);
        self.stats = FrameStats {
            frame: self.frame,
            ..FrameStats::default()
        };
        self.arena.reset_high_water();

        let mark = self.arena.save();
        let result = self.traverse(level, camera, visitor);
        self.arena.restore(mark);
        result?;

        self.stats.arena_high_water = self.arena.high_water();
        log::debug!(
            "frame {}: {} leaves visible, {} nodes visited, rejected {} by PVS, {} by bounds, {} portals culled, {} regions culled, arena high water {}",
            self.stats.frame,
            self.stats.leaves_visible,
            self.stats.nodes_visited,
            self.stats.pvs_rejected,
            self.stats.bounds_rejected,
            self.stats.portals_culled,
            self.stats.regions_culled,
            self.stats.arena_high_water
        );
        Ok(self.stats)
    }

    /// Renders one frame and collects the visible leaves and surfaces.
    pub fn render_frame_collect(
        &mut self,
        level: &mut Level,
        camera: &Camera,
    ) -> Result<VisibleSet, RenderError> {
        let mut visitor = CollectingVisitor::new();
        let stats = self.render_frame(level, camera, &mut visitor)?;
        Ok(visitor.into_visible_set(stats.frame))
    }

    fn traverse<V: VisibilityVisitor>(
        &mut self,
        level: &mut Level,
        camera: &Camera,
        visitor: &mut V,
    ) -> Result<(), RenderError> {
        let camera_leaf = level.find_leaf(camera.position());
        self.pvs.decompress(level, camera_leaf);
        if self.pvs.is_fail_open() {
            log::trace!("no PVS for camera leaf {camera_leaf:?}, every leaf is potentially visible");
        }

        let screen = RasterRegion::full_screen(camera.screen(), &mut self.arena)?;
        let root = level.root();
        self.visit_node(level, camera, root, &screen, visitor)
    }

    fn visit_node<V: VisibilityVisitor>(
        &mut self,
        level: &mut Level,
        camera: &Camera,
        id: NodeId,
        clip: &RasterRegion,
        visitor: &mut V,
    ) -> Result<(), RenderError> {
        self.stats.nodes_visited += 1;

        let interior = match level.node(id).kind() {
            NodeKind::Interior(interior) => *interior,
            NodeKind::Leaf(leaf) => {
                let leaf = leaf.clone();
                return self.visit_leaf(level, camera, id, &leaf, clip, visitor);
            }
        };

        let (near, far) = match interior.plane().classify_point(camera.position()) {
            PlaneSide::Back => (interior.back(), interior.front()),
            PlaneSide::Front | PlaneSide::OnPlane => (interior.front(), interior.back()),
        };

        self.visit_node(level, camera, near, clip, visitor)?;

        let mark = self.arena.save();
        let result = self.visit_far(level, camera, &interior, far, clip, visitor);
        self.arena.restore(mark);
        result
    }

    /// Enters the far side of `interior`, clipped to what its portal leaves
    /// open.
    fn visit_far<V: VisibilityVisitor>(
        &mut self,
        level: &mut Level,
        camera: &Camera,
        interior: &InteriorNode,
        far: NodeId,
        clip: &RasterRegion,
        visitor: &mut V,
    ) -> Result<(), RenderError> {
        // A far leaf can be rejected before any portal work.
        if let Some(leaf) = level.node(far).as_leaf() {
            if leaf.contents().is_solid() {
                return Ok(());
            }
            if !self.pvs.is_leaf_visible(leaf.leaf_index())? {
                self.stats.pvs_rejected += 1;
                log::trace!("leaf {:?} rejected by PVS", leaf.leaf_index());
                return Ok(());
            }
        }

        let in_view = match camera.project_box(level.node(far).node_bounds()) {
            BoxProjection::Behind => false,
            BoxProjection::Straddles => true,
            BoxProjection::Rect(rect) => rect.overlaps(&clip.bounding_rect(&self.arena)),
        };
        if !in_view {
            self.stats.bounds_rejected += 1;
            log::trace!("node {far:?} outside the clip region");
            return Ok(());
        }

        let far_clip = match interior.portal() {
            None => *clip,
            Some(portal) => match self.portal_region(level, camera, portal, clip)? {
                Some(region) => region,
                None => {
                    self.stats.portals_culled += 1;
                    log::trace!("portal {portal:?} culled, skipping node {far:?}");
                    return Ok(());
                }
            },
        };

        self.visit_node(level, camera, far, &far_clip, visitor)
    }

    /// Rasterizes `portal` and clips it to `clip`. `None` if nothing is seen
    /// through it.
    fn portal_region(
        &mut self,
        level: &Level,
        camera: &Camera,
        portal: PortalId,
        clip: &RasterRegion,
    ) -> Result<Option<RasterRegion>, RenderError> {
        let vertices = level.portal(portal).vertices();
        let capacity = self.config.max_polygon_vertices;
        if vertices.len() > capacity {
            return Err(RenderError::PolygonTooLarge {
                count: vertices.len(),
                capacity,
            });
        }

        self.vertex_scratch.clear();
        self.vertex_scratch
            .extend(vertices.iter().map(|&p| camera.clip_vertex(p)));
        self.stats.portal_regions_built += 1;

        let region = RasterRegion::from_clip_polygon(
            &self.vertex_scratch,
            clip,
            camera.projection(),
            &mut self.arena,
        )?;
        let Some(mut region) = region else {
            return Ok(None);
        };
        Ok(intersect(clip, &mut region, &mut self.arena)
            .is_visible()
            .then_some(region))
    }

    fn visit_leaf<V: VisibilityVisitor>(
        &mut self,
        level: &mut Level,
        camera: &Camera,
        id: NodeId,
        leaf: &LeafNode,
        clip: &RasterRegion,
        visitor: &mut V,
    ) -> Result<(), RenderError> {
        if leaf.contents().is_solid() {
            return Ok(());
        }
        if !self.pvs.is_leaf_visible(leaf.leaf_index())? {
            self.stats.pvs_rejected += 1;
            log::trace!("leaf {:?} rejected by PVS", leaf.leaf_index());
            return Ok(());
        }

        let mark = self.arena.save();
        let result = self.emit_leaf(level, camera, id, leaf, clip, visitor);
        self.arena.restore(mark);
        result
    }

    /// Clips the leaf's bounds to `clip`, stamps it and calls the visitor.
    fn emit_leaf<V: VisibilityVisitor>(
        &mut self,
        level: &mut Level,
        camera: &Camera,
        id: NodeId,
        leaf: &LeafNode,
        clip: &RasterRegion,
        visitor: &mut V,
    ) -> Result<(), RenderError> {
        let region = match camera.project_box(level.node(id).geo_bounds()) {
            BoxProjection::Behind => None,
            BoxProjection::Straddles => Some(*clip),
            BoxProjection::Rect(rect) => {
                self.stats.leaf_regions_built += 1;
                match RasterRegion::from_screen_polygon(&rect.corners(), clip, &mut self.arena)? {
                    Some(mut region) => intersect(clip, &mut region, &mut self.arena)
                        .is_visible()
                        .then_some(region),
                    None => None,
                }
            }
        };

        let Some(region) = region else {
            self.stats.regions_culled += 1;
            log::trace!("leaf {:?} region culled", leaf.leaf_index());
            return Ok(());
        };

        level.mark_ancestors_visible(id, self.frame)?;
        self.stats.leaves_visible += 1;

        visitor.visit_leaf(VisibleLeaf {
            node: id,
            leaf: leaf.leaf_index(),
            contents: leaf.contents(),
            surfaces: level.leaf_surfaces(id),
            region: region.view(&self.arena),
        });
        Ok(())
    }
}
