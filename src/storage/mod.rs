//! This module provides the implementations of the usual DP-value stores.
//!
//! All three stores realise the same partial map `(d, k) -> x` over the cells
//! of the Myers pyramid; they differ in how much of the pyramid they retain
//! and how eagerly they allocate. Reads and writes compile down to plain
//! index arithmetic so the recurrence loop pays no hashing or lookup cost.

/// Sentinel stored in slots that were never written. Legal x values lie in
/// `[0, |A|]`, so -1 can never be produced by the recurrence.
pub(crate) const UNSET: i32 = -1;

/// The uniform `(d, k) -> x` contract shared by all stores.
///
/// # Note:
/// Writing the same cell twice and reading a cell that was never written are
/// invariant violations; the stores detect both in debug builds. The
/// single-column [`FrontierStorage`] is the exception on the write side: it
/// deliberately overwrites its column as `d` advances.
pub trait Storage {
    /// Creates a store able to hold every layer `0..=d_max`.
    fn with_layers(d_max: i32) -> Self;

    /// The deepest layer this store was sized for.
    fn d_max(&self) -> i32;

    /// Records `x` for the cell `(d, k)`.
    fn set(&mut self, d: i32, k: i32, x: i32);

    /// Reads the value previously recorded for `(d, k)`.
    fn get(&self, d: i32, k: i32) -> i32;

    /// True iff `(d, k)` currently holds a value. Used by receive paths to
    /// deduplicate; stores that roll over old layers answer for the latest
    /// value they still hold.
    fn has_value(&self, d: i32, k: i32) -> bool;
}

/// Marker for stores that keep every layer alive until the end of the run.
/// The edit-script backtrace reads arbitrary past layers, so it is only
/// callable with a store carrying this marker. [`FrontierStorage`] does not
/// implement it, which rules the distance-only store out at compile time.
pub trait RetainsPyramid: Storage {}

pub(crate) fn debug_validate_cell(d: i32, k: i32, d_max: i32) {
    debug_assert!(d >= 0 && d <= d_max, "layer {d} out of range 0..={d_max}");
    debug_assert!(k.abs() <= d, "diagonal {k} invalid in layer {d}");
    debug_assert!((d - k).rem_euclid(2) == 0, "cell ({d}, {k}) off the lattice");
}

pub mod fast;
pub mod frontier_column;
pub mod simple;

pub use fast::*;
pub use frontier_column::*;
pub use simple::*;
