//! Fixed-point scalar and screen-space primitives.

use fixed::types::I32F32;

/// Signed fixed-point scalar used for depths, plane distances and scale
/// factors.
pub type Fixed = I32F32;

/// Tallest screen a render config may request.
pub const MAX_SCREEN_ROWS: i32 = 1 << 13;

/// Screen coordinates produced by projection are clamped to this magnitude.
pub const SCREEN_COORD_LIMIT: i32 = 1 << 20;

/// An integer screen-space point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Vertex2D {
    pub x: i32,
    pub y: i32,
}

impl Vertex2D {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// An inclusive range of scanlines `[min, max]`.
///
/// A range with `min > max` is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct YRange {
    pub min: i32,
    pub max: i32,
}

impl YRange {
    #[inline]
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    /// Returns `true` if the range holds no scanline.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    /// Number of scanlines in the range (0 when empty).
    #[inline]
    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.max as i64 - self.min as i64) as usize + 1
        }
    }

    #[inline]
    pub fn contains(&self, y: i32) -> bool {
        y >= self.min && y <= self.max
    }

    /// Returns the scanlines shared by both ranges, or `None` if they are disjoint.
    #[inline]
    pub fn overlap(&self, other: &YRange) -> Option<YRange> {
        let range = YRange::new(self.min.max(other.min), self.max.min(other.max));
        if range.is_empty() { None } else { Some(range) }
    }

    /// Iterates over the scanlines of the range, top to bottom.
    #[inline]
    pub fn rows(&self) -> std::ops::RangeInclusive<i32> {
        self.min..=self.max
    }
}

/// A horizontal pixel span `[left, right]` on one scanline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub left: i32,
    pub right: i32,
}

impl Span {
    #[inline]
    pub const fn new(left: i32, right: i32) -> Self {
        Self { left, right }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.left > self.right
    }

    /// Number of pixels covered (0 when empty).
    #[inline]
    pub fn width(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.right as i64 - self.left as i64) as usize + 1
        }
    }
}

/// An inclusive screen rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl ScreenRect {
    #[inline]
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    /// Smallest rectangle containing every point, or `None` for no points.
    pub fn enclosing(points: impl IntoIterator<Item = Vertex2D>) -> Option<Self> {
        points.into_iter().fold(None, |rect, p| {
            Some(match rect {
                None => ScreenRect::new(p.x, p.y, p.x, p.y),
                Some(r) => ScreenRect::new(
                    r.left.min(p.x),
                    r.top.min(p.y),
                    r.right.max(p.x),
                    r.bottom.max(p.y),
                ),
            })
        })
    }

    /// Returns `true` if the two rectangles share at least one pixel.
    #[inline]
    pub fn overlaps(&self, other: &ScreenRect) -> bool {
        self.left <= other.right
            && other.left <= self.right
            && self.top <= other.bottom
            && other.top <= self.bottom
    }

    #[inline]
    pub fn y_range(&self) -> YRange {
        YRange::new(self.top, self.bottom)
    }

    /// Corners in clockwise screen order, starting top-left.
    pub fn corners(&self) -> [Vertex2D; 4] {
        [
            Vertex2D::new(self.left, self.top),
            Vertex2D::new(self.right, self.top),
            Vertex2D::new(self.right, self.bottom),
            Vertex2D::new(self.left, self.bottom),
        ]
    }
}

/// Dimensions of the target screen in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

impl ScreenSize {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn y_range(&self) -> YRange {
        YRange::new(0, self.height as i32 - 1)
    }

    #[inline]
    pub fn rect(&self) -> ScreenRect {
        ScreenRect::new(0, 0, self.width as i32 - 1, self.height as i32 - 1)
    }
}

/// Integer DDA over `x0 + dx * k / dy` for successive rows `k`, each value
/// rounded half up (`floor(x + 1/2)`).
///
/// The walk keeps the quotient and remainder of `(2 * (x0 * dy + dx * k) +
/// dy) / (2 * dy)` separately, so every row is exact for any `dy` and a step
/// costs two additions and a compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundedDda {
    x: i64,
    rem: i64,
    step: i64,
    step_rem: i64,
    denom: i64,
}

impl RoundedDda {
    /// Starts the walk at row `k`. `dy` must be positive; `x0`, `dx` and `k`
    /// must fit in 33 bits, as differences of `i32` coordinates do.
    pub fn new(x0: i64, dx: i64, dy: i64, k: i64) -> Self {
        debug_assert!(dy > 0, "DDA over an empty row span");
        let denom = 2 * dy;
        // x0 * dy and dx * k can both exceed 64 bits.
        let start = 2 * (x0 as i128 * dy as i128 + dx as i128 * k as i128) + dy as i128;
        Self {
            x: start.div_euclid(denom as i128) as i64,
            rem: start.rem_euclid(denom as i128) as i64,
            step: (2 * dx).div_euclid(denom),
            step_rem: (2 * dx).rem_euclid(denom),
            denom,
        }
    }

    /// The rounded x of the current row.
    #[inline]
    pub fn x(&self) -> i64 {
        self.x
    }

    /// Moves to the next row.
    #[inline]
    pub fn advance(&mut self) {
        self.x += self.step;
        self.rem += self.step_rem;
        if self.rem >= self.denom {
            self.rem -= self.denom;
            self.x += 1;
        }
    }
}

impl Iterator for RoundedDda {
    type Item = i64;

    #[inline]
    fn next(&mut self) -> Option<i64> {
        let x = self.x;
        self.advance();
        Some(x)
    }
}

/// Linear interpolation `a + (b - a) * t`.
#[inline]
pub fn lerp(a: Fixed, b: Fixed, t: Fixed) -> Fixed {
    a + (b - a) * t
}
