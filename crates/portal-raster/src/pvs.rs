//! Potentially visible sets: per-leaf RLE rows decompressed into a bitset.
//!
//! A compressed row is a byte stream in which `0x00 n` stands for `n` zero
//! bytes and every other byte is copied verbatim. Leaf `i >= 1` maps to bit
//! `i - 1`; leaf 0 is the outside-the-level sentinel and never tests visible.

use crate::bsp::{LeafIndex, Level};
use crate::error::RenderError;

/// Bytes in a decompressed row for a level with `leaf_count` leaves
/// (sentinel included).
#[inline]
pub fn row_bytes(leaf_count: usize) -> usize {
    leaf_count.div_ceil(8)
}

/// Run-length encodes a decompressed row. Zero runs longer than 255 bytes
/// are split across several markers.
pub fn compress_row(bits: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bits.len());
    let mut i = 0;

    while i < bits.len() {
        if bits[i] != 0 {
            out.push(bits[i]);
            i += 1;
            continue;
        }

        let mut run: u8 = 0;
        while i < bits.len() && bits[i] == 0 && run < u8::MAX {
            run += 1;
            i += 1;
        }
        out.extend_from_slice(&[0, run]);
    }

    out
}

/// The decompressed visibility set for the camera's current leaf.
///
/// One buffer is kept for the lifetime of the render context and rewritten
/// every frame.
#[derive(Debug, Clone, Default)]
pub struct PotentiallyVisibleSet {
    bits: Vec<u8>,
    fail_open: bool,
}

impl PotentiallyVisibleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decompresses the row of `leaf`.
    ///
    /// The sentinel leaf, or a leaf without visibility data, marks every
    /// leaf visible.
    pub fn decompress(&mut self, level: &Level, leaf: LeafIndex) {
        let row = if leaf.is_sentinel() { None } else { level.pvs_row(leaf) };
        self.decompress_row(row, level.leaf_count());
    }

    /// Decompresses `row` for a level of `leaf_count` leaves. A missing or
    /// truncated row falls back to [`mark_all_visible`](Self::mark_all_visible).
    pub fn decompress_row(&mut self, row: Option<&[u8]>, leaf_count: usize) {
        let len = row_bytes(leaf_count);
        let Some(row) = row else {
            self.mark_all_visible(leaf_count);
            return;
        };

        self.bits.clear();
        self.fail_open = false;
        let mut input = row.iter().copied();

        while self.bits.len() < len {
            match input.next() {
                Some(0) => {
                    let Some(run) = input.next() else {
                        log::warn!("PVS row ends inside a zero run, marking all {leaf_count} leaves visible");
                        self.mark_all_visible(leaf_count);
                        return;
                    };
                    let run = (run as usize).min(len - self.bits.len());
                    self.bits.resize(self.bits.len() + run, 0);
                }
                Some(byte) => self.bits.push(byte),
                None => {
                    log::warn!(
                        "PVS row holds {} of {len} bytes, marking all {leaf_count} leaves visible",
                        self.bits.len()
                    );
                    self.mark_all_visible(leaf_count);
                    return;
                }
            }
        }
    }

    /// Sets every bit of the row.
    pub fn mark_all_visible(&mut self, leaf_count: usize) {
        self.bits.clear();
        self.bits.resize(row_bytes(leaf_count), 0xff);
        self.fail_open = true;
    }

    /// Whether the current set came from missing or unusable data.
    #[inline]
    pub fn is_fail_open(&self) -> bool {
        self.fail_open
    }

    /// The decompressed bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    /// Tests the bit of `leaf`. The sentinel leaf is never visible.
    pub fn is_leaf_visible(&self, leaf: LeafIndex) -> Result<bool, RenderError> {
        if leaf.is_sentinel() {
            return Ok(false);
        }
        let bit = leaf.0 - 1;
        let byte = self.bits.get(bit / 8).ok_or(RenderError::PvsIndexOutOfBounds {
            leaf: leaf.0,
            bytes: self.bits.len(),
        })?;
        Ok(byte & (1 << (bit % 8)) != 0)
    }

    /// Number of set bits.
    pub fn visible_count(&self) -> usize {
        self.bits.iter().map(|b| b.count_ones() as usize).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Simple seeded random number generator (LCG).
    struct Rng {
        state: u64,
    }

    impl Rng {
        fn new(seed: u64) -> Self {
            Self { state: seed }
        }

        fn next_u32(&mut self) -> u32 {
            self.state = self
                .state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (self.state >> 33) as u32
        }
    }

    fn make_bits(leaf_count: usize, visible: &[usize]) -> Vec<u8> {
        let mut bits = vec![0; row_bytes(leaf_count)];
        for &leaf in visible {
            bits[(leaf - 1) / 8] |= 1 << ((leaf - 1) % 8);
        }
        bits
    }

    #[test]
    fn row_bytes_rounds_up() {
        assert_eq!(row_bytes(1), 1);
        assert_eq!(row_bytes(8), 1);
        assert_eq!(row_bytes(9), 2);
        assert_eq!(row_bytes(20), 3);
    }

    #[test]
    fn decompress_expands_zero_runs() {
        // 20 leaves -> 3 bytes: [0x05, 0, 0x80] compressed as 05 00 01 80.
        let mut pvs = PotentiallyVisibleSet::new();
        pvs.decompress_row(Some(&[0x05, 0x00, 0x01, 0x80]), 20);

        assert_eq!(pvs.as_bytes(), &[0x05, 0x00, 0x80]);
        assert!(!pvs.is_fail_open());
        assert_eq!(pvs.is_leaf_visible(LeafIndex(1)), Ok(true));
        assert_eq!(pvs.is_leaf_visible(LeafIndex(2)), Ok(false));
        assert_eq!(pvs.is_leaf_visible(LeafIndex(3)), Ok(true));
        assert_eq!(pvs.is_leaf_visible(LeafIndex(24)), Ok(true));
        assert_eq!(pvs.visible_count(), 3);
    }

    #[test]
    fn decompression_stops_at_row_length() {
        let mut pvs = PotentiallyVisibleSet::new();
        pvs.decompress_row(Some(&[0xff, 0x00, 0x09, 0x42, 0x42]), 16);
        assert_eq!(pvs.as_bytes(), &[0xff, 0x00]);
    }

    #[test]
    fn sentinel_leaf_is_never_visible() {
        let mut pvs = PotentiallyVisibleSet::new();
        pvs.mark_all_visible(12);
        assert_eq!(pvs.is_leaf_visible(LeafIndex(0)), Ok(false));
        assert_eq!(pvs.is_leaf_visible(LeafIndex(1)), Ok(true));
    }

    #[test]
    fn missing_row_fails_open() {
        let mut pvs = PotentiallyVisibleSet::new();
        pvs.decompress_row(None, 30);

        assert!(pvs.is_fail_open());
        for leaf in 1..30 {
            assert_eq!(pvs.is_leaf_visible(LeafIndex(leaf)), Ok(true));
        }
    }

    #[test]
    fn truncated_row_fails_open() {
        let mut pvs = PotentiallyVisibleSet::new();
        pvs.decompress_row(Some(&[0x01]), 30);
        assert!(pvs.is_fail_open());
        assert_eq!(pvs.is_leaf_visible(LeafIndex(2)), Ok(true));

        pvs.decompress_row(Some(&[0x01, 0x00]), 30);
        assert!(pvs.is_fail_open());
    }

    #[test]
    fn reuse_after_fail_open_resets_state() {
        let mut pvs = PotentiallyVisibleSet::new();
        pvs.decompress_row(None, 16);
        pvs.decompress_row(Some(&[0x00, 0x02]), 16);

        assert!(!pvs.is_fail_open());
        assert_eq!(pvs.visible_count(), 0);
    }

    #[test]
    fn query_past_the_set_is_out_of_bounds() {
        let mut pvs = PotentiallyVisibleSet::new();
        pvs.decompress_row(Some(&[0x00, 0x01]), 8);

        assert_eq!(
            pvs.is_leaf_visible(LeafIndex(9)),
            Err(RenderError::PvsIndexOutOfBounds { leaf: 9, bytes: 1 })
        );
    }

    #[test]
    fn compress_splits_long_zero_runs() {
        let bits = vec![0; 300];
        assert_eq!(compress_row(&bits), vec![0, 255, 0, 45]);
    }

    #[test]
    fn compress_then_decompress_reproduces_sets() {
        let mut rng = Rng::new(42);
        let mut pvs = PotentiallyVisibleSet::new();

        for _ in 0..100 {
            let leaf_count = 2 + (rng.next_u32() % 3000) as usize;
            // Sparse sets, so long zero runs are common.
            let visible: Vec<bool> = (0..leaf_count)
                .map(|leaf| leaf > 0 && rng.next_u32() % 17 == 0)
                .collect();
            let listed: Vec<usize> = (1..leaf_count).filter(|&leaf| visible[leaf]).collect();
            let bits = make_bits(leaf_count, &listed);

            let compressed = compress_row(&bits);
            pvs.decompress_row(Some(&compressed), leaf_count);

            assert_eq!(pvs.as_bytes(), &bits[..]);
            for leaf in 1..leaf_count {
                assert_eq!(
                    pvs.is_leaf_visible(LeafIndex(leaf)),
                    Ok(visible[leaf]),
                    "leaf {leaf} of {leaf_count}"
                );
            }
        }
    }
}
