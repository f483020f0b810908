//! Narrowing a region to the part of it seen through a portal.

use crate::math::Span;
use crate::scratch::ScratchArena;

use super::region::RasterRegion;

/// Outcome of [`intersect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum ClipResult {
    /// Some scanline of the candidate survived.
    Visible,
    /// Nothing is left; the candidate must not be used.
    Culled,
}

impl ClipResult {
    #[inline]
    pub fn is_visible(self) -> bool {
        self == ClipResult::Visible
    }
}

/// Clips `candidate` in place to `portal`.
///
/// Rows outside the shared y-range are dropped; on shared rows the span
/// becomes `[max(left), min(right)]`. Empty rows at either end are trimmed.
/// Rows left empty in the middle are kept, as they are for a concave
/// silhouette. Intersecting a region with itself leaves it unchanged.
pub fn intersect(
    portal: &RasterRegion,
    candidate: &mut RasterRegion,
    arena: &mut ScratchArena,
) -> ClipResult {
    let Some(shared) = portal.y_range().overlap(&candidate.y_range()) else {
        return ClipResult::Culled;
    };

    for y in shared.rows() {
        let p = portal.raw_span(arena, y);
        let c = candidate.raw_span(arena, y);
        candidate.set_span(arena, y, Span::new(p.left.max(c.left), p.right.min(c.right)));
    }
    candidate.set_y_range(shared);

    if candidate.trim(arena) {
        ClipResult::Visible
    } else {
        ClipResult::Culled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{ScreenRect, ScreenSize, Vertex2D, YRange};

    fn make_arena() -> ScratchArena {
        ScratchArena::with_capacity(8 * 1024)
    }

    fn make_region(arena: &mut ScratchArena, parent: &RasterRegion, points: &[(i32, i32)]) -> RasterRegion {
        let vertices: Vec<Vertex2D> = points.iter().map(|&(x, y)| Vertex2D::new(x, y)).collect();
        RasterRegion::from_screen_polygon(&vertices, parent, arena)
            .unwrap()
            .unwrap()
    }

    #[test]
    fn self_intersection_is_identity() {
        let mut arena = make_arena();
        let screen = RasterRegion::full_screen(ScreenSize::new(160, 128), &mut arena).unwrap();
        let region = make_region(&mut arena, &screen, &[(20, 5), (140, 30), (60, 120)]);
        let before = region.to_spans(&arena);

        let mut same = region;
        assert_eq!(intersect(&region, &mut same, &mut arena), ClipResult::Visible);
        assert_eq!(same, region);
        assert_eq!(same.to_spans(&arena), before);
    }

    #[test]
    fn disjoint_rows_are_culled() {
        let mut arena = make_arena();
        let top = RasterRegion::from_rect(ScreenRect::new(0, 0, 159, 9), &mut arena).unwrap();
        let mut bottom = RasterRegion::from_rect(ScreenRect::new(0, 100, 159, 127), &mut arena).unwrap();

        assert_eq!(intersect(&top, &mut bottom, &mut arena), ClipResult::Culled);
    }

    #[test]
    fn disjoint_columns_are_culled() {
        // Left half [0, 79] against right half [80, 159] of the same rows.
        let mut arena = make_arena();
        let left = RasterRegion::from_rect(ScreenRect::new(0, 0, 79, 127), &mut arena).unwrap();
        let mut right = RasterRegion::from_rect(ScreenRect::new(80, 0, 159, 127), &mut arena).unwrap();

        assert_eq!(intersect(&left, &mut right, &mut arena), ClipResult::Culled);
    }

    #[test]
    fn overlap_narrows_rows_and_spans() {
        let mut arena = make_arena();
        let portal = RasterRegion::from_rect(ScreenRect::new(40, 20, 120, 100), &mut arena).unwrap();
        let mut candidate = RasterRegion::from_rect(ScreenRect::new(0, 50, 60, 127), &mut arena).unwrap();

        assert!(intersect(&portal, &mut candidate, &mut arena).is_visible());
        assert_eq!(candidate.y_range(), YRange::new(50, 100));
        assert_eq!(candidate.span(&arena, 50), Some(Span::new(40, 60)));
        assert_eq!(candidate.span(&arena, 101), None);
        assert_eq!(candidate.bounding_rect(&arena), ScreenRect::new(40, 50, 60, 100));
    }

    #[test]
    fn empty_end_rows_are_trimmed() {
        // A triangle whose apex rows fall outside the portal's columns.
        let mut arena = make_arena();
        let screen = RasterRegion::full_screen(ScreenSize::new(160, 128), &mut arena).unwrap();
        let portal = RasterRegion::from_rect(ScreenRect::new(0, 0, 50, 127), &mut arena).unwrap();
        let mut candidate = make_region(&mut arena, &screen, &[(80, 10), (80, 90), (0, 90)]);

        assert!(intersect(&portal, &mut candidate, &mut arena).is_visible());
        // The hypotenuse reaches x = 50 at y = 40.
        assert_eq!(candidate.y_range(), YRange::new(40, 90));
        assert_eq!(candidate.span(&arena, 40), Some(Span::new(50, 50)));
        assert_eq!(candidate.span(&arena, 90), Some(Span::new(0, 50)));
    }

    #[test]
    fn intersection_never_widens() {
        let mut arena = make_arena();
        let screen = RasterRegion::full_screen(ScreenSize::new(160, 128), &mut arena).unwrap();
        let portal = make_region(&mut arena, &screen, &[(30, 0), (130, 20), (100, 127), (10, 90)]);
        let mut candidate = make_region(&mut arena, &screen, &[(0, 40), (159, 40), (80, 127)]);
        let original = candidate.to_spans(&arena);

        assert!(intersect(&portal, &mut candidate, &mut arena).is_visible());
        for (y, span) in candidate.spans(&arena) {
            let outer = original.span(y).unwrap();
            let bound = portal.span(&arena, y).unwrap();
            assert!(span.left >= outer.left.max(bound.left));
            assert!(span.right <= outer.right.min(bound.right));
        }
    }
}
