//! Stack-discipline scratch arena for per-frame span tables.
//!
//! Every [`RasterEdge`](crate::RasterEdge) x-table and every
//! [`RasterRegion`](crate::RasterRegion) span array lives here. Callers take a
//! [`Mark`] with [`ScratchArena::save`] before descending into a portal and
//! hand it back to [`ScratchArena::restore`] on return, so nested portal work
//! never outlives the recursion level that produced it.

use crate::error::ScratchError;

/// A saved arena offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "an arena mark is only useful if it is restored"]
pub struct Mark(usize);

/// Handle to a run of cells allocated from a [`ScratchArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScratchSlice {
    start: u32,
    len: u32,
}

impl ScratchSlice {
    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    fn range(&self) -> std::ops::Range<usize> {
        self.start as usize..(self.start + self.len) as usize
    }
}

/// Bounded bump allocator of `i32` cells, reset by [`Mark`]s.
#[derive(Debug)]
pub struct ScratchArena {
    cells: Vec<i32>,
    top: usize,
    high_water: usize,
}

impl ScratchArena {
    /// Creates an arena holding `capacity` cells. This is the only allocation
    /// the arena ever makes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cells: vec![0; capacity],
            top: 0,
            high_water: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    /// Cells currently in use.
    #[inline]
    pub fn used(&self) -> usize {
        self.top
    }

    #[inline]
    pub fn available(&self) -> usize {
        self.cells.len() - self.top
    }

    /// Largest number of cells ever in use at once.
    #[inline]
    pub fn high_water(&self) -> usize {
        self.high_water
    }

    /// Restarts high-water tracking from the current top.
    #[inline]
    pub fn reset_high_water(&mut self) {
        self.high_water = self.top;
    }

    #[inline]
    pub fn save(&self) -> Mark {
        Mark(self.top)
    }

    /// Releases everything allocated since `mark` was taken.
    ///
    /// # Panics
    /// Panics if `mark` lies above the current top, i.e. marks were restored
    /// out of order.
    #[inline]
    pub fn restore(&mut self, mark: Mark) {
        assert!(
            mark.0 <= self.top,
            "scratch mark {} restored above arena top {}",
            mark.0,
            self.top
        );
        self.top = mark.0;
    }

    /// Allocates `len` cells, each set to `fill`.
    pub fn alloc(&mut self, len: usize, fill: i32) -> Result<ScratchSlice, ScratchError> {
        if len > self.available() {
            return Err(ScratchError::Exhausted {
                requested: len,
                available: self.available(),
                capacity: self.capacity(),
            });
        }

        let slice = ScratchSlice {
            start: self.top as u32,
            len: len as u32,
        };
        self.top += len;
        self.high_water = self.high_water.max(self.top);
        self.cells[slice.range()].fill(fill);
        Ok(slice)
    }

    #[inline]
    pub fn get(&self, slice: ScratchSlice) -> &[i32] {
        &self.cells[slice.range()]
    }

    #[inline]
    pub fn get_mut(&mut self, slice: ScratchSlice) -> &mut [i32] {
        &mut self.cells[slice.range()]
    }
}
