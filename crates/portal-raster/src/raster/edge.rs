//! Per-scanline x tables for a single polygon edge.

use crate::camera::{ClipVertex, Projection};
use crate::error::ScratchError;
use crate::math::{Fixed, RoundedDda, Span, Vertex2D, YRange, lerp};
use crate::scratch::{ScratchArena, ScratchSlice};

/// State bits of a [`RasterEdge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EdgeFlags {
    /// Both endpoints share a scanline; only the x extent is stored.
    pub horizontal: bool,
    /// Nothing of the edge survives clipping; no table was allocated.
    pub invisible: bool,
    /// One endpoint was moved onto the near plane.
    pub near_clipped: bool,
    /// The endpoints were swapped to walk the edge top to bottom.
    pub vertex_order_swapped: bool,
}

/// The point where an edge crosses the near plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearClip {
    pub point: Vertex2D,
    pub scale: Fixed,
}

/// One polygon edge rasterized to an x coordinate per scanline.
///
/// The x-table lives in the frame [`ScratchArena`] and is present only when
/// the edge is neither horizontal nor invisible. Entry `i` holds the x of
/// scanline `y_range.min + i`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterEdge {
    y_range: YRange,
    x_at_y: Option<ScratchSlice>,
    x_extent: Span,
    flags: EdgeFlags,
    start: Vertex2D,
    end: Vertex2D,
    near_clip: Option<NearClip>,
}

impl RasterEdge {
    fn authored(start: Vertex2D, end: Vertex2D) -> Self {
        Self {
            y_range: YRange::new(start.y.min(end.y), start.y.max(end.y)),
            x_at_y: None,
            x_extent: Span::new(start.x.min(end.x), start.x.max(end.x)),
            flags: EdgeFlags::default(),
            start,
            end,
            near_clip: None,
        }
    }

    /// Rasterizes the screen-space edge `a -> b`, clipped to `parent`.
    ///
    /// An edge that misses `parent` entirely is flagged invisible before any
    /// table is allocated.
    pub fn generate(
        a: Vertex2D,
        b: Vertex2D,
        parent: YRange,
        arena: &mut ScratchArena,
    ) -> Result<Self, ScratchError> {
        let mut edge = Self::authored(a, b);
        edge.rasterize(a, b, parent, arena)?;
        Ok(edge)
    }

    /// Rasterizes an edge between two projected vertices, clipping it against
    /// the near plane of `projection` first.
    ///
    /// When exactly one endpoint lies behind the near plane it is moved to
    /// the crossing point and the edge is flagged `near_clipped`; the
    /// crossing is available from [`RasterEdge::near_clip`]. An edge entirely
    /// behind the near plane is invisible.
    pub fn generate_clipped(
        a: &ClipVertex,
        b: &ClipVertex,
        parent: YRange,
        projection: &Projection,
        arena: &mut ScratchArena,
    ) -> Result<Self, ScratchError> {
        let mut edge = Self::authored(a.screen, b.screen);
        let near = projection.near();

        match (a.depth() >= near, b.depth() >= near) {
            (true, true) => edge.rasterize(a.screen, b.screen, parent, arena)?,
            (false, false) => edge.flags.invisible = true,
            (true, false) => {
                let clip = near_crossing(b, a, projection);
                edge.flags.near_clipped = true;
                edge.near_clip = Some(clip);
                edge.rasterize(a.screen, clip.point, parent, arena)?;
            }
            (false, true) => {
                let clip = near_crossing(a, b, projection);
                edge.flags.near_clipped = true;
                edge.near_clip = Some(clip);
                edge.rasterize(clip.point, b.screen, parent, arena)?;
            }
        }

        Ok(edge)
    }

    fn rasterize(
        &mut self,
        mut a: Vertex2D,
        mut b: Vertex2D,
        parent: YRange,
        arena: &mut ScratchArena,
    ) -> Result<(), ScratchError> {
        if a.y > b.y {
            std::mem::swap(&mut a, &mut b);
            self.flags.vertex_order_swapped = true;
        }

        self.y_range = YRange::new(a.y, b.y);
        self.x_extent = Span::new(a.x.min(b.x), a.x.max(b.x));
        self.flags.horizontal = a.y == b.y;

        let Some(visible) = self.y_range.overlap(&parent) else {
            self.flags.invisible = true;
            return Ok(());
        };
        self.y_range = visible;

        if self.flags.horizontal {
            return Ok(());
        }

        // Endpoints may lie anywhere in i32, so differences are taken in i64.
        let dx = b.x as i64 - a.x as i64;
        let dy = b.y as i64 - a.y as i64;
        let dda = RoundedDda::new(a.x as i64, dx, dy, visible.min as i64 - a.y as i64);

        let table = arena.alloc(visible.len(), 0)?;
        // Every row's x lies between the endpoints' x, so it fits in i32.
        for (cell, x) in arena.get_mut(table).iter_mut().zip(dda) {
            *cell = x as i32;
        }
        self.x_at_y = Some(table);

        Ok(())
    }

    /// Scanlines covered after clipping.
    #[inline]
    pub fn y_range(&self) -> YRange {
        self.y_range
    }

    #[inline]
    pub fn flags(&self) -> EdgeFlags {
        self.flags
    }

    /// First vertex as authored, before any reordering or clipping.
    #[inline]
    pub fn start_vertex(&self) -> Vertex2D {
        self.start
    }

    /// Second vertex as authored, before any reordering or clipping.
    #[inline]
    pub fn end_vertex(&self) -> Vertex2D {
        self.end
    }

    /// Horizontal extent of the (near-clipped) edge.
    #[inline]
    pub fn x_extent(&self) -> Span {
        self.x_extent
    }

    #[inline]
    pub fn near_clip(&self) -> Option<NearClip> {
        self.near_clip
    }

    /// Whether the edge owns an x-table.
    #[inline]
    pub fn has_table(&self) -> bool {
        self.x_at_y.is_some()
    }

    #[inline]
    pub(crate) fn table_slice(&self) -> Option<ScratchSlice> {
        self.x_at_y
    }

    /// The x-table, indexed by `y - y_range().min`.
    pub fn table<'a>(&self, arena: &'a ScratchArena) -> Option<&'a [i32]> {
        self.x_at_y.map(|slice| arena.get(slice))
    }

    /// The x coordinate of the edge on scanline `y`.
    pub fn x_at(&self, arena: &ScratchArena, y: i32) -> Option<i32> {
        if !self.y_range.contains(y) {
            return None;
        }
        self.table(arena)
            .map(|table| table[(y - self.y_range.min) as usize])
    }
}

/// Moves `outside` onto the near plane along the edge toward `inside`.
///
/// The interpolation factor is the share of the edge's depth span that lies
/// in front of the plane; position and scale are both lerped by it.
fn near_crossing(outside: &ClipVertex, inside: &ClipVertex, projection: &Projection) -> NearClip {
    let near = projection.near();
    let d_out = near - outside.depth();
    let d_in = inside.depth() - near;
    let t = d_out / (d_out + d_in);

    let view = nalgebra::Vector3::new(
        lerp(outside.view.x, inside.view.x, t),
        lerp(outside.view.y, inside.view.y, t),
        near,
    );

    NearClip {
        point: projection.project(&view),
        scale: lerp(outside.scale, inside.scale, t),
    }
}
