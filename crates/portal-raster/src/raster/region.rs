//! Per-scanline span regions: the "visible area" primitive.

use crate::camera::{ClipVertex, Projection};
use crate::error::{RenderError, ScratchError};
use crate::math::{ScreenRect, ScreenSize, Span, Vertex2D, YRange};
use crate::scratch::{ScratchArena, ScratchSlice};

use super::edge::RasterEdge;

/// A set of scanlines, each carrying one `[left, right]` span.
///
/// The span arrays live in the frame [`ScratchArena`]; the region itself is a
/// small `Copy` handle. Rows are allocated for the parent region's full
/// y-range and indexed from `origin`, so clipping only ever narrows
/// `y_range` in place.
///
/// For every `y` in `y_range`, `left <= right`. Construction reports an empty
/// region as `None` instead of returning one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterRegion {
    y_range: YRange,
    origin: i32,
    x_left: ScratchSlice,
    x_right: ScratchSlice,
}

impl RasterRegion {
    /// A region covering the whole screen; the root clip region of a frame.
    pub fn full_screen(screen: ScreenSize, arena: &mut ScratchArena) -> Result<Self, ScratchError> {
        Self::from_rect(screen.rect(), arena)
    }

    /// A region covering `rect` exactly. `rect` must not be empty.
    pub fn from_rect(rect: ScreenRect, arena: &mut ScratchArena) -> Result<Self, ScratchError> {
        let rows = rect.y_range();
        Ok(Self {
            y_range: rows,
            origin: rows.min,
            x_left: arena.alloc(rows.len(), rect.left)?,
            x_right: arena.alloc(rows.len(), rect.right)?,
        })
    }

    /// Rows for `rows`, with every span inverted so any edge widens it.
    fn unfilled(rows: YRange, arena: &mut ScratchArena) -> Result<Self, ScratchError> {
        Ok(Self {
            y_range: rows,
            origin: rows.min,
            x_left: arena.alloc(rows.len(), i32::MAX)?,
            x_right: arena.alloc(rows.len(), i32::MIN)?,
        })
    }

    /// Rasterizes a closed screen-space polygon, clipped to `parent`'s rows.
    ///
    /// Returns `Ok(None)` when no scanline of the polygon survives.
    pub fn from_screen_polygon(
        vertices: &[Vertex2D],
        parent: &RasterRegion,
        arena: &mut ScratchArena,
    ) -> Result<Option<Self>, RenderError> {
        if vertices.len() < 3 {
            return Ok(None);
        }

        let mut region = Self::unfilled(parent.y_range, arena)?;
        let mut covered = None;

        for (i, &a) in vertices.iter().enumerate() {
            let b = vertices[(i + 1) % vertices.len()];
            let mark = arena.save();
            let edge = RasterEdge::generate(a, b, parent.y_range, arena)?;
            region.fold_edge(&edge, arena, &mut covered);
            arena.restore(mark);
        }

        Ok(region.finish(covered, arena))
    }

    /// Rasterizes a closed polygon of projected vertices, clipping it against
    /// the near plane and `parent`'s rows.
    ///
    /// A convex polygon crossing the near plane has exactly two near-clipped
    /// edges; the segment joining their crossing points closes the silhouette.
    /// Any other non-zero count means the polygon was not convex.
    pub fn from_clip_polygon(
        vertices: &[ClipVertex],
        parent: &RasterRegion,
        projection: &Projection,
        arena: &mut ScratchArena,
    ) -> Result<Option<Self>, RenderError> {
        if vertices.len() < 3 {
            return Ok(None);
        }

        let mut region = Self::unfilled(parent.y_range, arena)?;
        let mut covered = None;
        let mut crossings = [Vertex2D::default(); 2];
        let mut crossing_count = 0;

        for (i, a) in vertices.iter().enumerate() {
            let b = &vertices[(i + 1) % vertices.len()];
            let mark = arena.save();
            let edge = RasterEdge::generate_clipped(a, b, parent.y_range, projection, arena)?;

            if let Some(clip) = edge.near_clip() {
                if crossing_count < crossings.len() {
                    crossings[crossing_count] = clip.point;
                }
                crossing_count += 1;
            }

            region.fold_edge(&edge, arena, &mut covered);
            arena.restore(mark);
        }

        match crossing_count {
            0 => {}
            2 => {
                let mark = arena.save();
                let closing = RasterEdge::generate(crossings[0], crossings[1], parent.y_range, arena)?;
                region.fold_edge(&closing, arena, &mut covered);
                arena.restore(mark);
            }
            count => return Err(RenderError::NearClipEdges { count }),
        }

        Ok(region.finish(covered, arena))
    }

    /// Widens the spans on every row the edge covers.
    fn fold_edge(&self, edge: &RasterEdge, arena: &mut ScratchArena, covered: &mut Option<YRange>) {
        if edge.flags().invisible {
            return;
        }

        let rows = edge.y_range();
        if edge.flags().horizontal {
            let extent = edge.x_extent();
            self.widen(arena, rows.min, extent.left, extent.right);
        } else if let Some(table) = edge.table_slice() {
            for (i, y) in rows.rows().enumerate() {
                let x = arena.get(table)[i];
                self.widen(arena, y, x, x);
            }
        }

        *covered = Some(match *covered {
            None => rows,
            Some(c) => YRange::new(c.min.min(rows.min), c.max.max(rows.max)),
        });
    }

    #[inline]
    fn widen(&self, arena: &mut ScratchArena, y: i32, left: i32, right: i32) {
        let row = self.row(y);
        let l = &mut arena.get_mut(self.x_left)[row];
        *l = (*l).min(left);
        let r = &mut arena.get_mut(self.x_right)[row];
        *r = (*r).max(right);
    }

    fn finish(mut self, covered: Option<YRange>, arena: &ScratchArena) -> Option<Self> {
        self.y_range = covered?;
        self.trim(arena).then_some(self)
    }

    /// Shrinks `y_range` past empty rows at the top and bottom. Returns
    /// `false` if nothing is left.
    pub(crate) fn trim(&mut self, arena: &ScratchArena) -> bool {
        while !self.y_range.is_empty() && self.raw_span(arena, self.y_range.min).is_empty() {
            self.y_range.min += 1;
        }
        while !self.y_range.is_empty() && self.raw_span(arena, self.y_range.max).is_empty() {
            self.y_range.max -= 1;
        }
        !self.y_range.is_empty()
    }

    #[inline]
    fn row(&self, y: i32) -> usize {
        (y - self.origin) as usize
    }

    /// The stored span at `y`, which must lie within the allocated rows.
    #[inline]
    pub(crate) fn raw_span(&self, arena: &ScratchArena, y: i32) -> Span {
        let row = self.row(y);
        Span::new(arena.get(self.x_left)[row], arena.get(self.x_right)[row])
    }

    #[inline]
    pub(crate) fn set_span(&self, arena: &mut ScratchArena, y: i32, span: Span) {
        let row = self.row(y);
        arena.get_mut(self.x_left)[row] = span.left;
        arena.get_mut(self.x_right)[row] = span.right;
    }

    #[inline]
    pub(crate) fn set_y_range(&mut self, rows: YRange) {
        self.y_range = rows;
    }

    #[inline]
    pub fn y_range(&self) -> YRange {
        self.y_range
    }

    /// The span on scanline `y`, or `None` outside the region.
    pub fn span(&self, arena: &ScratchArena, y: i32) -> Option<Span> {
        if !self.y_range.contains(y) {
            return None;
        }
        let span = self.raw_span(arena, y);
        (!span.is_empty()).then_some(span)
    }

    /// Iterates over `(y, span)` pairs, top to bottom.
    pub fn spans<'a>(&self, arena: &'a ScratchArena) -> impl Iterator<Item = (i32, Span)> + 'a {
        let region = *self;
        region
            .y_range
            .rows()
            .filter_map(move |y| region.span(arena, y).map(|span| (y, span)))
    }

    /// The smallest rectangle enclosing every span.
    pub fn bounding_rect(&self, arena: &ScratchArena) -> ScreenRect {
        let (left, right) = self
            .spans(arena)
            .fold((i32::MAX, i32::MIN), |(l, r), (_, span)| {
                (l.min(span.left), r.max(span.right))
            });
        ScreenRect::new(left, self.y_range.min, right, self.y_range.max)
    }

    /// Copies the spans out of the arena.
    pub fn to_spans(&self, arena: &ScratchArena) -> RegionSpans {
        RegionSpans {
            y_range: self.y_range,
            spans: self.y_range.rows().map(|y| self.raw_span(arena, y)).collect(),
        }
    }

    /// Borrows the region together with the arena holding its spans.
    #[inline]
    pub fn view<'a>(&self, arena: &'a ScratchArena) -> RegionView<'a> {
        RegionView { region: *self, arena }
    }
}

/// A [`RasterRegion`] paired with the arena its spans live in.
#[derive(Debug, Clone, Copy)]
pub struct RegionView<'a> {
    region: RasterRegion,
    arena: &'a ScratchArena,
}

impl<'a> RegionView<'a> {
    #[inline]
    pub fn region(&self) -> &RasterRegion {
        &self.region
    }

    #[inline]
    pub fn y_range(&self) -> YRange {
        self.region.y_range()
    }

    pub fn span(&self, y: i32) -> Option<Span> {
        self.region.span(self.arena, y)
    }

    pub fn spans(&self) -> impl Iterator<Item = (i32, Span)> + 'a {
        self.region.spans(self.arena)
    }

    pub fn bounding_rect(&self) -> ScreenRect {
        self.region.bounding_rect(self.arena)
    }

    pub fn to_spans(&self) -> RegionSpans {
        self.region.to_spans(self.arena)
    }
}

/// An owned copy of a region's spans that outlives the frame arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionSpans {
    y_range: YRange,
    spans: Vec<Span>,
}

impl RegionSpans {
    #[inline]
    pub fn y_range(&self) -> YRange {
        self.y_range
    }

    pub fn span(&self, y: i32) -> Option<Span> {
        if !self.y_range.contains(y) {
            return None;
        }
        let span = self.spans[(y - self.y_range.min) as usize];
        (!span.is_empty()).then_some(span)
    }

    /// Iterates over `(y, span)` pairs, top to bottom.
    pub fn iter(&self) -> impl Iterator<Item = (i32, Span)> + '_ {
        self.y_range
            .rows()
            .zip(self.spans.iter().copied())
            .filter(|(_, span)| !span.is_empty())
    }

    /// Total number of pixels covered.
    pub fn pixel_count(&self) -> usize {
        self.spans.iter().map(Span::width).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Fixed;
    use nalgebra::Vector3;

    const SCREEN: ScreenSize = ScreenSize::new(160, 128);

    fn make_arena() -> ScratchArena {
        ScratchArena::with_capacity(16 * 1024)
    }

    fn make_projection() -> Projection {
        Projection::new(SCREEN, Fixed::from_num(80), Fixed::from_num(1))
    }

    fn make_vertex(projection: &Projection, x: f64, y: f64, z: f64) -> ClipVertex {
        projection.clip_vertex(Vector3::new(
            Fixed::from_num(x),
            Fixed::from_num(y),
            Fixed::from_num(z),
        ))
    }

    fn v(x: i32, y: i32) -> Vertex2D {
        Vertex2D::new(x, y)
    }

    /// Simple seeded random number generator (LCG).
    struct Rng {
        state: u64,
    }

    impl Rng {
        fn new(seed: u64) -> Self {
            Self { state: seed }
        }

        fn range(&mut self, min: i32, max: i32) -> i32 {
            self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
            min + ((self.state >> 33) % (max - min + 1) as u64) as i32
        }
    }

    #[test]
    fn full_screen_covers_every_pixel() {
        let mut arena = make_arena();
        let screen = RasterRegion::full_screen(SCREEN, &mut arena).unwrap();

        assert_eq!(screen.y_range(), YRange::new(0, 127));
        assert_eq!(screen.span(&arena, 0), Some(Span::new(0, 159)));
        assert_eq!(screen.span(&arena, 127), Some(Span::new(0, 159)));
        assert_eq!(screen.to_spans(&arena).pixel_count(), 160 * 128);
    }

    #[test]
    fn triangle_spans() {
        let mut arena = make_arena();
        let screen = RasterRegion::full_screen(SCREEN, &mut arena).unwrap();
        let region = RasterRegion::from_screen_polygon(
            &[v(10, 10), v(50, 10), v(10, 50)],
            &screen,
            &mut arena,
        )
        .unwrap()
        .unwrap();

        assert_eq!(region.y_range(), YRange::new(10, 50));
        assert_eq!(region.span(&arena, 10), Some(Span::new(10, 50)));
        assert_eq!(region.span(&arena, 30), Some(Span::new(10, 30)));
        assert_eq!(region.span(&arena, 50), Some(Span::new(10, 10)));
        assert_eq!(region.span(&arena, 51), None);
    }

    #[test]
    fn polygon_clipped_to_parent_rows() {
        let mut arena = make_arena();
        let screen = RasterRegion::full_screen(SCREEN, &mut arena).unwrap();
        let region = RasterRegion::from_screen_polygon(
            &[v(20, -40), v(60, -40), v(60, 200), v(20, 200)],
            &screen,
            &mut arena,
        )
        .unwrap()
        .unwrap();

        assert_eq!(region.y_range(), YRange::new(0, 127));
        assert_eq!(region.bounding_rect(&arena), ScreenRect::new(20, 0, 60, 127));
    }

    #[test]
    fn polygon_outside_parent_is_culled() {
        let mut arena = make_arena();
        let screen = RasterRegion::full_screen(SCREEN, &mut arena).unwrap();
        let culled = RasterRegion::from_screen_polygon(
            &[v(0, 300), v(50, 300), v(25, 400)],
            &screen,
            &mut arena,
        )
        .unwrap();
        assert!(culled.is_none());
    }

    #[test]
    fn degenerate_vertex_lists_are_culled() {
        let mut arena = make_arena();
        let screen = RasterRegion::full_screen(SCREEN, &mut arena).unwrap();
        let culled = RasterRegion::from_screen_polygon(&[v(0, 0), v(5, 5)], &screen, &mut arena);
        assert_eq!(culled, Ok(None));
    }

    #[test]
    fn edge_tables_are_released_after_construction() {
        let mut arena = make_arena();
        let screen = RasterRegion::full_screen(SCREEN, &mut arena).unwrap();
        let before = arena.used();
        RasterRegion::from_screen_polygon(&[v(10, 10), v(50, 10), v(10, 50)], &screen, &mut arena)
            .unwrap()
            .unwrap();

        // Only the two span arrays remain.
        assert_eq!(arena.used() - before, 2 * 128);
    }

    #[test]
    fn random_polygons_keep_spans_ordered() {
        let mut arena = make_arena();
        let screen = RasterRegion::full_screen(SCREEN, &mut arena).unwrap();
        let mut rng = Rng::new(0x5eed);

        for _ in 0..200 {
            let mark = arena.save();
            let count = rng.range(3, 7) as usize;
            let vertices: Vec<Vertex2D> = (0..count)
                .map(|_| v(rng.range(-100, 260), rng.range(-100, 230)))
                .collect();

            if let Some(region) =
                RasterRegion::from_screen_polygon(&vertices, &screen, &mut arena).unwrap()
            {
                assert!(!region.y_range().is_empty());
                for y in region.y_range().rows() {
                    let span = region.raw_span(&arena, y);
                    assert!(span.left <= span.right, "row {y} of {vertices:?}");
                }
            }
            arena.restore(mark);
        }
    }

    #[test]
    fn near_clipped_polygon_is_closed_at_the_near_plane() {
        let projection = make_projection();
        let mut arena = make_arena();
        let screen = RasterRegion::full_screen(SCREEN, &mut arena).unwrap();

        // v0 sits behind the eye; both edges leaving it cross z = 1 halfway,
        // at screen (40, 64) and (80, 40).
        let vertices = [
            make_vertex(&projection, -0.5, 0.5, -1.0),
            make_vertex(&projection, -0.5, -0.5, 3.0),
            make_vertex(&projection, 0.5, 0.1, 3.0),
        ];
        let region = RasterRegion::from_clip_polygon(&vertices, &screen, &projection, &mut arena)
            .unwrap()
            .unwrap();

        assert_eq!(region.y_range(), YRange::new(40, 77));
        // Row 52: closing edge at x = 60 on the left, (80,40)-(93,61) on the right.
        assert_eq!(region.span(&arena, 52), Some(Span::new(60, 87)));
        assert_eq!(region.span(&arena, 64), Some(Span::new(40, 88)));
    }

    #[test]
    fn polygon_behind_the_eye_is_culled() {
        let projection = make_projection();
        let mut arena = make_arena();
        let screen = RasterRegion::full_screen(SCREEN, &mut arena).unwrap();
        let vertices = [
            make_vertex(&projection, -5.0, 0.0, -1.0),
            make_vertex(&projection, 5.0, 0.0, -1.0),
            make_vertex(&projection, 0.0, 5.0, -3.0),
        ];

        let region = RasterRegion::from_clip_polygon(&vertices, &screen, &projection, &mut arena);
        assert_eq!(region, Ok(None));
    }

    #[test]
    fn concave_near_crossing_is_an_invariant_violation() {
        let projection = make_projection();
        let mut arena = make_arena();
        let screen = RasterRegion::full_screen(SCREEN, &mut arena).unwrap();
        // Alternating depths: every edge crosses the near plane.
        let vertices = [
            make_vertex(&projection, -2.0, -2.0, 5.0),
            make_vertex(&projection, 2.0, -2.0, -5.0),
            make_vertex(&projection, 2.0, 2.0, 5.0),
            make_vertex(&projection, -2.0, 2.0, -5.0),
        ];

        let err = RasterRegion::from_clip_polygon(&vertices, &screen, &projection, &mut arena)
            .unwrap_err();
        assert_eq!(err, RenderError::NearClipEdges { count: 4 });
    }

    #[test]
    fn owned_spans_iterate_rows() {
        let mut arena = make_arena();
        let region = RasterRegion::from_rect(ScreenRect::new(3, 5, 6, 7), &mut arena).unwrap();
        let spans = region.to_spans(&arena);

        let rows: Vec<_> = spans.iter().collect();
        assert_eq!(
            rows,
            vec![(5, Span::new(3, 6)), (6, Span::new(3, 6)), (7, Span::new(3, 6))]
        );
        assert_eq!(spans.pixel_count(), 12);
        assert_eq!(spans.span(8), None);
    }
}
