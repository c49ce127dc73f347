//! The straightforward store: one eagerly allocated vector per layer.

use crate::storage::{debug_validate_cell, RetainsPyramid, Storage, UNSET};

/// Per-layer vectors of width `2d + 1`, indexed by `k + d`. Simple to reason
/// about and the baseline the other stores are tested against.
pub struct SimpleStorage {
    d_max: i32,
    data: Vec<Vec<i32>>,
}

impl SimpleStorage {
    #[inline]
    fn index(d: i32, k: i32) -> (usize, usize) {
        (d as usize, (k + d) as usize)
    }
}

impl Storage for SimpleStorage {
    fn with_layers(d_max: i32) -> Self {
        assert!(d_max >= 0);
        let data = (0..=d_max)
            .map(|d| vec![UNSET; (2 * d + 1) as usize])
            .collect();
        Self { d_max, data }
    }

    fn d_max(&self) -> i32 {
        self.d_max
    }

    #[inline]
    fn set(&mut self, d: i32, k: i32, x: i32) {
        debug_validate_cell(d, k, self.d_max);
        let (layer, offset) = Self::index(d, k);
        debug_assert!(
            self.data[layer][offset] == UNSET,
            "duplicate write to ({d}, {k})"
        );
        self.data[layer][offset] = x;
    }

    #[inline]
    fn get(&self, d: i32, k: i32) -> i32 {
        debug_validate_cell(d, k, self.d_max);
        let (layer, offset) = Self::index(d, k);
        let x = self.data[layer][offset];
        debug_assert!(x != UNSET, "read of unwritten cell ({d}, {k})");
        x
    }

    #[inline]
    fn has_value(&self, d: i32, k: i32) -> bool {
        debug_validate_cell(d, k, self.d_max);
        let (layer, offset) = Self::index(d, k);
        self.data[layer][offset] != UNSET
    }
}

impl RetainsPyramid for SimpleStorage {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trip() {
        let mut storage = SimpleStorage::with_layers(4);
        storage.set(0, 0, 3);
        storage.set(2, -2, 0);
        storage.set(2, 2, 5);
        assert_eq!(storage.get(0, 0), 3);
        assert_eq!(storage.get(2, -2), 0);
        assert_eq!(storage.get(2, 2), 5);
    }

    #[test]
    fn has_value_tracks_writes() {
        let mut storage = SimpleStorage::with_layers(3);
        assert!(!storage.has_value(1, 1));
        storage.set(1, 1, 2);
        assert!(storage.has_value(1, 1));
        assert!(!storage.has_value(1, -1));
    }

    #[test]
    #[should_panic(expected = "duplicate write")]
    fn duplicate_write_is_detected() {
        let mut storage = SimpleStorage::with_layers(2);
        storage.set(1, 1, 1);
        storage.set(1, 1, 2);
    }

    #[test]
    #[should_panic(expected = "unwritten cell")]
    fn unwritten_read_is_detected() {
        let storage = SimpleStorage::with_layers(2);
        storage.get(2, 0);
    }
}
