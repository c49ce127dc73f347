//! The rolling store: a single column vector holding only the latest value
//! per diagonal.

use crate::storage::{debug_validate_cell, Storage, UNSET};

/// One slot per diagonal `k in -d_max..=d_max`, overwritten as the
/// computation advances through the layers. Enough to answer every
/// `(d - 1, k +/- 1)` read the recurrence makes, and therefore enough to find
/// the edit distance; useless for the backtrace, which is why this store does
/// not implement `RetainsPyramid`.
///
/// # Note:
/// In debug builds a parallel column records the layer that last wrote each
/// diagonal, so a consumer asking for a stale `(d, k)` is caught immediately
/// instead of silently reading a newer layer's value.
pub struct FrontierStorage {
    d_max: i32,
    column: Vec<i32>,
    #[cfg(debug_assertions)]
    written_d: Vec<i32>,
}

impl FrontierStorage {
    #[inline]
    fn index(&self, k: i32) -> usize {
        (k + self.d_max) as usize
    }
}

impl Storage for FrontierStorage {
    fn with_layers(d_max: i32) -> Self {
        assert!(d_max >= 0);
        Self {
            d_max,
            column: vec![UNSET; (2 * d_max + 1) as usize],
            #[cfg(debug_assertions)]
            written_d: vec![UNSET; (2 * d_max + 1) as usize],
        }
    }

    fn d_max(&self) -> i32 {
        self.d_max
    }

    #[inline]
    fn set(&mut self, d: i32, k: i32, x: i32) {
        debug_validate_cell(d, k, self.d_max);
        let idx = self.index(k);
        #[cfg(debug_assertions)]
        {
            debug_assert!(
                self.written_d[idx] < d,
                "column {k} rolled backwards from layer {} to {d}",
                self.written_d[idx]
            );
            self.written_d[idx] = d;
        }
        self.column[idx] = x;
    }

    #[inline]
    fn get(&self, d: i32, k: i32) -> i32 {
        debug_validate_cell(d, k, self.d_max);
        let idx = self.index(k);
        #[cfg(debug_assertions)]
        debug_assert!(
            self.written_d[idx] == d,
            "stale read of ({d}, {k}): column holds layer {}",
            self.written_d[idx]
        );
        self.column[idx]
    }

    #[inline]
    fn has_value(&self, d: i32, k: i32) -> bool {
        debug_validate_cell(d, k, self.d_max);
        // answers for the latest value the column still holds
        self.column[self.index(k)] != UNSET
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_the_latest_layer_per_diagonal() {
        let mut storage = FrontierStorage::with_layers(6);
        storage.set(1, 1, 2);
        assert_eq!(storage.get(1, 1), 2);
        storage.set(3, 1, 5);
        assert_eq!(storage.get(3, 1), 5);
    }

    #[test]
    fn neighboring_diagonals_do_not_interfere() {
        let mut storage = FrontierStorage::with_layers(4);
        storage.set(2, 0, 1);
        storage.set(2, 2, 3);
        storage.set(2, -2, 0);
        assert_eq!(storage.get(2, 0), 1);
        assert_eq!(storage.get(2, 2), 3);
        assert_eq!(storage.get(2, -2), 0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "stale read")]
    fn stale_read_is_detected() {
        let mut storage = FrontierStorage::with_layers(6);
        storage.set(4, 0, 3);
        storage.get(2, 0);
    }

    #[test]
    fn has_value_reflects_latest_write() {
        let mut storage = FrontierStorage::with_layers(5);
        assert!(!storage.has_value(1, -1));
        storage.set(1, -1, 0);
        assert!(storage.has_value(1, -1));
    }
}
