//! The blocked store: layers grouped into fixed-size blocks whose buffers are
//! allocated lazily on first write.

use crate::storage::{debug_validate_cell, RetainsPyramid, Storage, UNSET};

/// Number of layers per allocation block. Small enough that a worker touching
/// only a band of the pyramid never pays for the layers it does not own.
const LAYERS_PER_BLOCK: i32 = 20;

/// Total number of cells in a pyramid of `l` layers, one slot per lattice
/// cell (layer `d` holds `d + 1` values).
#[inline]
fn pyramid_size(l: i32) -> usize {
    (l as usize * (l as usize + 1)) / 2
}

/// Lazily allocated blocked pyramid. Each block stores its layers back to
/// back in one contiguous buffer; cell addresses are pure arithmetic on
/// `(d, k)`, so reads in the recurrence loop stay branch-light.
pub struct FastStorage {
    d_max: i32,
    blocks: Vec<Option<Box<[i32]>>>,
}

impl FastStorage {
    #[inline]
    fn address(d: i32, k: i32) -> (usize, usize) {
        let block_idx = (d / LAYERS_PER_BLOCK) as usize;
        let block_first_layer = block_idx as i32 * LAYERS_PER_BLOCK;
        let layer_start = pyramid_size(d) - pyramid_size(block_first_layer);
        let offset = ((k + d) / 2) as usize;
        (block_idx, layer_start + offset)
    }

    fn allocate_block(block_idx: usize) -> Box<[i32]> {
        let first = block_idx as i32 * LAYERS_PER_BLOCK;
        let size = pyramid_size(first + LAYERS_PER_BLOCK) - pyramid_size(first);
        vec![UNSET; size].into_boxed_slice()
    }
}

impl Storage for FastStorage {
    fn with_layers(d_max: i32) -> Self {
        assert!(d_max >= 0);
        let num_blocks = (d_max / LAYERS_PER_BLOCK + 1) as usize;
        let mut blocks: Vec<Option<Box<[i32]>>> = (0..num_blocks).map(|_| None).collect();
        blocks[0] = Some(Self::allocate_block(0));
        Self { d_max, blocks }
    }

    fn d_max(&self) -> i32 {
        self.d_max
    }

    #[inline]
    fn set(&mut self, d: i32, k: i32, x: i32) {
        debug_validate_cell(d, k, self.d_max);
        let (block_idx, offset) = Self::address(d, k);
        let block = self.blocks[block_idx].get_or_insert_with(|| Self::allocate_block(block_idx));
        debug_assert!(block[offset] == UNSET, "duplicate write to ({d}, {k})");
        block[offset] = x;
    }

    #[inline]
    fn get(&self, d: i32, k: i32) -> i32 {
        debug_validate_cell(d, k, self.d_max);
        let (block_idx, offset) = Self::address(d, k);
        let x = self.blocks[block_idx]
            .as_ref()
            .map_or(UNSET, |block| block[offset]);
        debug_assert!(x != UNSET, "read of unwritten cell ({d}, {k})");
        x
    }

    #[inline]
    fn has_value(&self, d: i32, k: i32) -> bool {
        debug_validate_cell(d, k, self.d_max);
        let (block_idx, offset) = Self::address(d, k);
        self.blocks[block_idx]
            .as_ref()
            .map_or(false, |block| block[offset] != UNSET)
    }
}

impl RetainsPyramid for FastStorage {}
