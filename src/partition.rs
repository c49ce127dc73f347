//! Round-robin ownership of the DP pyramid and the send/receive schedules
//! derived from it.
//!
//! Walking `d` upwards, each new layer extends exactly one worker's band by
//! one cell on each flank; workers are extended in rank order, cyclically.
//! Because the procedure is deterministic, a worker can derive — without any
//! communication — exactly which boundary cells it will receive from and
//! produce for each neighbor, as two replayable iterators.

use crate::geometry::CellLocation;
use crate::side::{PerSide, Side};

/// The partition state of one worker, positioned on some layer `d`.
///
/// `size_before`, `size_target` and `size_after` count how many of the layers
/// walked so far extended workers below, equal to, and above `rank`; the
/// owned k-range of the current layer follows from those counters alone.
#[derive(Debug, Clone)]
pub struct RoundRobinPartition {
    num_workers: usize,
    rank: usize,
    d: i32,
    next_worker_to_extend: usize,
    last_extended: usize,
    size_before: i32,
    size_target: i32,
    size_after: i32,
}

impl RoundRobinPartition {
    /// Creates the partition for `rank` positioned on layer 0.
    pub fn new(num_workers: usize, rank: usize) -> Self {
        assert!(num_workers > 0);
        assert!(rank < num_workers);
        let mut partition = Self {
            num_workers,
            rank,
            d: -1,
            next_worker_to_extend: 0,
            last_extended: 0,
            size_before: 0,
            size_target: 0,
            size_after: 0,
        };
        partition.next_d_layer();
        partition
    }

    /// Advances to the next layer, extending the next worker in the cycle.
    pub fn next_d_layer(&mut self) {
        self.extend(self.next_worker_to_extend);
        self.last_extended = self.next_worker_to_extend;
        self.next_worker_to_extend = (self.next_worker_to_extend + 1) % self.num_workers;
        self.d += 1;
    }

    fn extend(&mut self, worker: usize) {
        if worker < self.rank {
            self.size_before += 1;
        } else if worker > self.rank {
            self.size_after += 1;
        } else {
            self.size_target += 1;
        }
    }

    /// The layer this partition is currently positioned on.
    pub fn d(&self) -> i32 {
        self.d
    }

    /// True iff this worker owns at least one cell of the current layer.
    pub fn has_work(&self) -> bool {
        self.size_target > 0
    }

    /// The inclusive `[k_min, k_max]` band owned on the current layer.
    pub fn k_range(&self) -> (i32, i32) {
        assert!(self.has_work());
        let k_min = -self.d + 2 * self.size_before;
        let k_max = k_min + 2 * self.size_target - 2;
        (k_min, k_max)
    }

    /// Which flanks of the current layer depend on a neighbor's value from
    /// the previous layer.
    ///
    /// The left flank cell `(d, k_min)` needs `(d - 1, k_min - 1)` from the
    /// left neighbor unless this worker itself was just extended leftwards
    /// past it, and symmetrically on the right; the pyramid edges
    /// (`k_min == -d` / `k_max == d`) never need anything.
    pub fn should_receive(&self) -> PerSide<bool> {
        if !self.has_work() {
            return PerSide::new(false, false);
        }
        let (k_min, k_max) = self.k_range();
        PerSide::new(
            self.last_extended >= self.rank && k_min > -self.d,
            self.last_extended <= self.rank && k_max < self.d,
        )
    }

    /// Which flank values of the current layer a neighbor will need before
    /// it can finish its next layer.
    pub fn should_send(&self) -> PerSide<bool> {
        if !self.has_work() {
            return PerSide::new(false, false);
        }
        PerSide::new(
            self.rank > self.next_worker_to_extend,
            self.rank < self.next_worker_to_extend,
        )
    }

    /// Sides on which no message will ever flow, because the ring ends there.
    pub fn will_not_use_side_in_future(&self) -> PerSide<bool> {
        PerSide::new(self.rank == 0, self.rank == self.num_workers - 1)
    }
}

/// The stream of cells a worker will receive from its neighbor on one side,
/// in arrival order: `(d - 1, k_min - 1)` or `(d - 1, k_max + 1)` for every
/// layer `d <= d_max` whose flank depends on that neighbor.
///
/// Two iterators constructed with the same parameters enumerate the same
/// sequence, so the schedule can be replayed independently on both ends of a
/// link.
pub struct ReceiveSideIterator {
    partition: RoundRobinPartition,
    side: Side,
    d_max: i32,
}

impl ReceiveSideIterator {
    pub fn new(num_workers: usize, rank: usize, side: Side, d_max: i32) -> Self {
        Self {
            partition: RoundRobinPartition::new(num_workers, rank),
            side,
            d_max,
        }
    }
}

impl Iterator for ReceiveSideIterator {
    type Item = CellLocation;

    fn next(&mut self) -> Option<CellLocation> {
        if self.partition.will_not_use_side_in_future()[self.side] {
            return None;
        }
        loop {
            if self.partition.d() > self.d_max {
                return None;
            }
            let wanted = self.partition.should_receive()[self.side];
            let cell = wanted.then(|| {
                let (k_min, k_max) = self.partition.k_range();
                match self.side {
                    Side::Left => CellLocation::new(self.partition.d() - 1, k_min - 1),
                    Side::Right => CellLocation::new(self.partition.d() - 1, k_max + 1),
                }
            });
            self.partition.next_d_layer();
            if let Some(cell) = cell {
                return Some(cell);
            }
        }
    }
}

/// The stream of cells a worker must hand to its neighbor on one side, in
/// production order: `(d, k_min)` or `(d, k_max)` for every layer `d < d_max`
/// after which that neighbor is extended.
pub struct SendSideIterator {
    partition: RoundRobinPartition,
    side: Side,
    d_max: i32,
}

impl SendSideIterator {
    pub fn new(num_workers: usize, rank: usize, side: Side, d_max: i32) -> Self {
        Self {
            partition: RoundRobinPartition::new(num_workers, rank),
            side,
            d_max,
        }
    }
}

impl Iterator for SendSideIterator {
    type Item = CellLocation;

    fn next(&mut self) -> Option<CellLocation> {
        if self.partition.will_not_use_side_in_future()[self.side] {
            return None;
        }
        loop {
            if self.partition.d() >= self.d_max {
                return None;
            }
            let wanted = self.partition.should_send()[self.side];
            let cell = wanted.then(|| {
                let (k_min, k_max) = self.partition.k_range();
                match self.side {
                    Side::Left => CellLocation::new(self.partition.d(), k_min),
                    Side::Right => CellLocation::new(self.partition.d(), k_max),
                }
            });
            self.partition.next_d_layer();
            if let Some(cell) = cell {
                return Some(cell);
            }
        }
    }
}

/// The `[k_min, k_max]` bands a worker owns on every layer `0..=d_last`,
/// `None` where the worker owns nothing. The backtrace walks layers
/// downwards, so it replays the partition once up front.
pub fn k_ranges_through(
    num_workers: usize,
    rank: usize,
    d_last: i32,
) -> Vec<Option<(i32, i32)>> {
    let mut partition = RoundRobinPartition::new(num_workers, rank);
    let mut ranges = Vec::with_capacity(d_last as usize + 1);
    for _ in 0..=d_last {
        ranges.push(partition.has_work().then(|| partition.k_range()));
        partition.next_d_layer();
    }
    ranges
}
