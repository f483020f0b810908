//! Visitor pattern for visible leaves.
//!
//! Visitors receive every leaf the traversal stamps visible, front to back,
//! without coupling the traversal to what is done with them.

use crate::raster::{RegionSpans, RegionView};

use super::node::{LeafContents, LeafIndex, NodeId, SurfaceId};

/// A leaf found visible this frame, with the screen region it may draw into.
#[derive(Debug, Clone, Copy)]
pub struct VisibleLeaf<'a> {
    pub node: NodeId,
    pub leaf: LeafIndex,
    pub contents: LeafContents,
    pub surfaces: &'a [SurfaceId],
    /// The leaf's bounds clipped by every portal on the way to it. Only valid
    /// for the duration of the call.
    pub region: RegionView<'a>,
}

/// Visitor for processing visible leaves during a frame.
///
/// Implement this trait to define custom behavior when a leaf becomes
/// visible. Common uses include:
/// - Drawing the leaf's surfaces clipped to its region
/// - Collecting the visible set for later use
pub trait VisibilityVisitor {
    /// Called once per visible leaf, nearest leaves first.
    fn visit_leaf(&mut self, leaf: VisibleLeaf<'_>);
}

/// The draw region of one visible leaf, copied out of the frame arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafSpans {
    pub node: NodeId,
    pub leaf: LeafIndex,
    pub contents: LeafContents,
    pub spans: RegionSpans,
}

/// Everything found visible in one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibleSet {
    pub frame: u32,
    /// Leaves in visiting order.
    pub leaves: Vec<LeafSpans>,
    /// Surfaces of the visible leaves, sorted and deduplicated.
    pub surfaces: Vec<SurfaceId>,
}

impl VisibleSet {
    pub fn contains_leaf(&self, leaf: LeafIndex) -> bool {
        self.leaves.iter().any(|l| l.leaf == leaf)
    }

    pub fn leaf_indices(&self) -> impl Iterator<Item = LeafIndex> + '_ {
        self.leaves.iter().map(|l| l.leaf)
    }

    pub fn contains_surface(&self, surface: SurfaceId) -> bool {
        self.surfaces.binary_search(&surface).is_ok()
    }
}

/// A simple visitor that collects every visited leaf.
#[derive(Debug, Default)]
pub struct CollectingVisitor {
    leaves: Vec<LeafSpans>,
    surfaces: Vec<SurfaceId>,
}

impl CollectingVisitor {
    /// Creates a new empty collecting visitor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a reference to the collected leaves.
    pub fn leaves(&self) -> &[LeafSpans] {
        &self.leaves
    }

    /// Finishes collection for `frame`.
    pub fn into_visible_set(mut self, frame: u32) -> VisibleSet {
        self.surfaces.sort_unstable();
        self.surfaces.dedup();
        VisibleSet {
            frame,
            leaves: self.leaves,
            surfaces: self.surfaces,
        }
    }
}

impl VisibilityVisitor for CollectingVisitor {
    fn visit_leaf(&mut self, leaf: VisibleLeaf<'_>) {
        self.surfaces.extend_from_slice(leaf.surfaces);
        self.leaves.push(LeafSpans {
            node: leaf.node,
            leaf: leaf.leaf,
            contents: leaf.contents,
            spans: leaf.region.to_spans(),
        });
    }
}

/// A visitor that calls a closure for each visible leaf.
pub struct FnVisitor<F>
where
    F: FnMut(VisibleLeaf<'_>),
{
    func: F,
}

impl<F> FnVisitor<F>
where
    F: FnMut(VisibleLeaf<'_>),
{
    /// Creates a new visitor from a closure.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> VisibilityVisitor for FnVisitor<F>
where
    F: FnMut(VisibleLeaf<'_>),
{
    fn visit_leaf(&mut self, leaf: VisibleLeaf<'_>) {
        (self.func)(leaf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{ScreenRect, Span};
    use crate::raster::RasterRegion;
    use crate::scratch::ScratchArena;

    fn make_leaf<'a>(
        arena: &'a ScratchArena,
        region: &RasterRegion,
        index: usize,
        surfaces: &'a [SurfaceId],
    ) -> VisibleLeaf<'a> {
        VisibleLeaf {
            node: NodeId(index + 10),
            leaf: LeafIndex(index),
            contents: LeafContents::Regular,
            surfaces,
            region: region.view(arena),
        }
    }

    #[test]
    fn collecting_visitor_empty() {
        let visitor = CollectingVisitor::new();
        assert!(visitor.leaves().is_empty());
        assert_eq!(visitor.into_visible_set(3).frame, 3);
    }

    #[test]
    fn collecting_visitor_collects() {
        let mut arena = ScratchArena::with_capacity(64);
        let region = RasterRegion::from_rect(ScreenRect::new(2, 0, 5, 3), &mut arena).unwrap();
        let first = [SurfaceId(4), SurfaceId(1)];
        let second = [SurfaceId(1), SurfaceId(2)];

        let mut visitor = CollectingVisitor::new();
        visitor.visit_leaf(make_leaf(&arena, &region, 2, &first));
        visitor.visit_leaf(make_leaf(&arena, &region, 1, &second));

        let set = visitor.into_visible_set(7);
        assert_eq!(set.leaf_indices().collect::<Vec<_>>(), vec![LeafIndex(2), LeafIndex(1)]);
        assert_eq!(set.surfaces, vec![SurfaceId(1), SurfaceId(2), SurfaceId(4)]);
        assert!(set.contains_surface(SurfaceId(4)));
        assert!(!set.contains_surface(SurfaceId(3)));
        assert_eq!(set.leaves[0].spans.span(3), Some(Span::new(2, 5)));
    }

    #[test]
    fn fn_visitor_calls_closure() {
        let mut arena = ScratchArena::with_capacity(64);
        let region = RasterRegion::from_rect(ScreenRect::new(0, 0, 9, 1), &mut arena).unwrap();
        let mut pixels = 0;
        {
            let mut visitor = FnVisitor::new(|leaf: VisibleLeaf<'_>| {
                pixels += leaf.region.to_spans().pixel_count();
            });
            visitor.visit_leaf(make_leaf(&arena, &region, 1, &[]));
            visitor.visit_leaf(make_leaf(&arena, &region, 2, &[]));
        }
        assert_eq!(pixels, 40);
    }
}
