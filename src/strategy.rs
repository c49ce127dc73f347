//! The per-worker scheduling strategy.
//!
//! Each call to [`Strategy::run`] performs one decision cycle: work out how
//! far the worker may safely compute given what it has received, carve one
//! diamond of cells out of the uncovered region, compute it, and hand any
//! boundary values a neighbor is waiting for to the follower. The strategy
//! itself never touches the fabric or the storage directly; everything goes
//! through the follower capability set.

use std::iter::Peekable;

use log::trace;

use crate::frontier::Frontier;
use crate::geometry::{
    intersect_diagonals, is_valid_diamond, limit_diamond_height, point_is_outside_of_triangle,
    CellDiamond, CellLocation,
};
use crate::side::{PerSide, Side, BOTH_SIDES};

/// The capability set a strategy drives: storage access, the Myers kernel
/// and boundary sends.
pub trait StrategyFollower {
    /// Records a value received from a neighbor.
    fn set(&mut self, d: i32, k: i32, v: i32);

    /// Computes `V[d, k]`; returns true when that cell completes the search.
    fn calculate(&mut self, d: i32, k: i32) -> bool;

    /// Computes one layer's cells over `[k_min, k_max]`, returning the
    /// completing diagonal if the search ended inside the row. Followers with
    /// a row-shaped storage view override this to keep the inner loop free
    /// of per-cell dispatch.
    fn calculate_row(&mut self, d: i32, k_min: i32, k_max: i32) -> Option<i32> {
        let mut k = k_min;
        while k <= k_max {
            if self.calculate(d, k) {
                return Some(k);
            }
            k += 2;
        }
        None
    }

    /// Hands the stored value of `(d, k)` to the neighbor on `to`.
    fn send(&mut self, d: i32, k: i32, to: Side);
}

/// Scheduling state of one worker.
///
/// The receive and send schedules are the partition-derived iterators; the
/// strategy only ever looks at their next pending element. Once a receive
/// schedule runs dry, the limiter frozen from its last delivery keeps
/// bounding the target region.
pub struct Strategy<'a, F, IR, IS>
where
    F: StrategyFollower,
    IR: Iterator<Item = CellLocation>,
    IS: Iterator<Item = CellLocation>,
{
    follower: &'a mut F,
    future_receives: PerSide<Peekable<IR>>,
    future_sends: PerSide<Peekable<IS>>,
    final_known_limiters: PerSide<CellLocation>,
    frontier: Frontier,
    d_max: i32,
    diamond_height_limit: Option<i32>,
    done: bool,
    blocked_waiting_for_receive: bool,
    final_result_location: Option<CellLocation>,
}

impl<'a, F, IR, IS> Strategy<'a, F, IR, IS>
where
    F: StrategyFollower,
    IR: Iterator<Item = CellLocation>,
    IS: Iterator<Item = CellLocation>,
{
    pub fn new(
        follower: &'a mut F,
        future_receives: PerSide<IR>,
        future_sends: PerSide<IS>,
        d_max: i32,
        diamond_height_limit: Option<i32>,
    ) -> Self {
        assert!(d_max >= 0);
        assert!(diamond_height_limit.map_or(true, |limit| limit > 0));
        Self {
            follower,
            future_receives: per_side_peekable(future_receives),
            future_sends: per_side_peekable(future_sends),
            final_known_limiters: PerSide::new(
                CellLocation::new(d_max + 1, -(d_max + 1)),
                CellLocation::new(d_max + 1, d_max + 1),
            ),
            frontier: Frontier::new(
                CellLocation::new(d_max, -d_max - 2),
                CellLocation::new(d_max, d_max + 2),
            ),
            d_max,
            diamond_height_limit,
            done: false,
            blocked_waiting_for_receive: false,
            final_result_location: None,
        }
    }

    /// Feeds one value received from the neighbor on `from`. The cell it
    /// belongs to is the next element of that side's receive schedule.
    pub fn receive(&mut self, from: Side, v: i32) {
        let loc = self
            .future_receives[from]
            .next()
            .expect("received more values than the schedule announces");

        // Anything we may still receive from that side lies two layers above
        // this cell or beyond.
        self.final_known_limiters[from] = CellLocation::new(loc.d + 2, loc.k);

        self.follower.set(loc.d, loc.k, v);
        self.frontier.cover_triangle(loc);
    }

    /// One decision cycle. See the module documentation.
    pub fn run(&mut self) {
        assert!(!self.done);

        // 1. The target: everything strictly above the intersection of the
        //    two limiting diagonals is safe to compute.
        let mut limiters = self.final_known_limiters;
        let mut limited_by_receives = false;
        for side in BOTH_SIDES {
            if let Some(&next_receive) = self.future_receives[side].peek() {
                limiters[side] = next_receive;
                if next_receive.d < self.d_max {
                    limited_by_receives = true;
                }
            }
        }
        let mut target = intersect_diagonals(limiters[Side::Left], limiters[Side::Right]);
        target.d -= 2;

        // 2. If a pending send lies within reach, compute towards it first so
        //    the neighbor is not kept waiting. When both sides qualify,
        //    unblock the neighbor that has made less progress; equal progress
        //    is broken pseudorandomly on the parity of d.
        let mut limited_by_sends = false;
        let mut target_from_send_limit = CellLocation::new(i32::MAX, 0);
        for side in BOTH_SIDES {
            if let Some(&send_loc) = self.future_sends[side].peek() {
                if send_loc.d < self.d_max && !point_is_outside_of_triangle(send_loc, target) {
                    if send_loc.d < target_from_send_limit.d
                        || (send_loc.d == target_from_send_limit.d && send_loc.d % 2 == 0)
                    {
                        target_from_send_limit = send_loc;
                        limited_by_sends = true;
                    }
                }
            }
        }
        if limited_by_sends {
            target = target_from_send_limit;
        }

        // 3. + 4. Expose one diamond, compute it, cover it.
        let exposed_diamond = self.frontier.get_next_exposed_diamond(target);
        if let Some(mut diamond) = exposed_diamond {
            if !limited_by_sends {
                if let Some(limit) = self.diamond_height_limit {
                    diamond = limit_diamond_height(diamond, limit);
                }
            }
            trace!("computing diamond {} .. {}", diamond.top, diamond.bottom);
            self.calculate_all_in_diamond(diamond);
            if self.done {
                return;
            }
            self.frontier.cover_triangle(diamond.bottom);
        }

        // 5. Drain every send that is ready.
        for side in BOTH_SIDES {
            while let Some(&send_loc) = self.future_sends[side].peek() {
                if send_loc.d >= self.d_max || point_is_outside_of_triangle(send_loc, target) {
                    break;
                }
                self.follower.send(send_loc.d, send_loc.k, side);
                self.future_sends[side].next();
            }
        }

        // 6. Classify the cycle.
        if exposed_diamond.is_none() && !limited_by_receives && !limited_by_sends {
            self.done = true;
        }
        self.blocked_waiting_for_receive =
            exposed_diamond.is_none() && limited_by_receives && !limited_by_sends;
    }

    fn calculate_all_in_diamond(&mut self, diamond: CellDiamond) {
        assert!(is_valid_diamond(&diamond));
        let last_d = diamond.bottom.d.min(self.d_max);
        for d in diamond.top.d..=last_d {
            let k_min = (diamond.top.k - (d - diamond.top.d))
                .max(diamond.bottom.k - (diamond.bottom.d - d));
            let k_max = (diamond.top.k + (d - diamond.top.d))
                .min(diamond.bottom.k + (diamond.bottom.d - d));
            debug_assert!(k_max >= k_min && (k_max - k_min) % 2 == 0);
            if let Some(k) = self.follower.calculate_row(d, k_min, k_max) {
                debug_assert!(self.final_result_location.is_none());
                self.final_result_location = Some(CellLocation::new(d, k));
                self.done = true;
                return;
            }
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn is_blocked_waiting_for_receive(&self) -> bool {
        !self.done && self.blocked_waiting_for_receive
    }

    /// The cell where this worker completed the search, if it was the one.
    pub fn final_result_location(&self) -> Option<CellLocation> {
        self.final_result_location
    }
}

fn per_side_peekable<I: Iterator<Item = CellLocation>>(
    iterators: PerSide<I>,
) -> PerSide<Peekable<I>> {
    iterators.map(Iterator::peekable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::SendSideIterator;
    use crate::storage::{SimpleStorage, Storage};

    /// A follower that fakes the Myers kernel: it checks that every
    /// dependency of a calculated cell is present and records the order of
    /// calculations and sends.
    struct DebugStrategyFollower {
        storage: SimpleStorage,
        calculated: Vec<CellLocation>,
        sent: Vec<(CellLocation, Side)>,
    }

    impl DebugStrategyFollower {
        fn new(d_max: i32) -> Self {
            Self {
                storage: SimpleStorage::with_layers(d_max),
                calculated: vec![],
                sent: vec![],
            }
        }
    }

    impl StrategyFollower for DebugStrategyFollower {
        fn set(&mut self, d: i32, k: i32, v: i32) {
            self.storage.set(d, k, v);
        }

        fn calculate(&mut self, d: i32, k: i32) -> bool {
            assert!(d >= 0 && k.abs() <= d);
            if k > -d {
                self.storage.get(d - 1, k - 1);
            }
            if k < d {
                self.storage.get(d - 1, k + 1);
            }
            self.storage.set(d, k, 0);
            self.calculated.push(CellLocation::new(d, k));
            false
        }

        fn send(&mut self, d: i32, k: i32, to: Side) {
            self.storage.get(d, k);
            self.sent.push((CellLocation::new(d, k), to));
        }
    }

    fn cell(d: i32, k: i32) -> CellLocation {
        CellLocation::new(d, k)
    }

    /// Drives the worker-1-of-3 schedule (d_max = 7) by hand, checking the
    /// number of locally calculated cells after every delivery.
    #[test]
    fn three_worker_schedule_advances_as_expected() {
        let d_max = 7;
        let mut follower = DebugStrategyFollower::new(d_max);

        let receives = PerSide::new(
            vec![cell(0, 0), cell(1, -1), cell(3, -1), cell(4, -2), cell(6, -2)].into_iter(),
            vec![cell(2, 2), cell(3, 3), cell(5, 3), cell(6, 4)].into_iter(),
        );
        let sends = PerSide::new(
            SendSideIterator::new(3, 1, Side::Left, d_max),
            SendSideIterator::new(3, 1, Side::Right, d_max),
        );
        let mut strategy = Strategy::new(&mut follower, receives, sends, d_max, None);

        let feed = [
            (Side::Left, cell(0, 0)),
            (Side::Left, cell(1, -1)),
            (Side::Left, cell(3, -1)),
            (Side::Right, cell(2, 2)),
            (Side::Right, cell(3, 3)),
            (Side::Right, cell(5, 3)),
            (Side::Left, cell(4, -2)),
            (Side::Left, cell(6, -2)),
            (Side::Right, cell(6, 4)),
        ];
        let expected_counts = [0, 1, 2, 2, 4, 5, 7, 8, 11, 12];

        strategy.run();
        assert_eq!(strategy.follower.calculated.len(), expected_counts[0]);
        assert!(strategy.is_blocked_waiting_for_receive());

        for (i, (side, _)) in feed.iter().enumerate() {
            strategy.receive(*side, 12);
            strategy.run();
            assert_eq!(
                strategy.follower.calculated.len(),
                expected_counts[i + 1],
                "after delivery {i}"
            );
        }

        // let the strategy settle: with nothing left to receive or send it
        // must notice completion on its own
        while !strategy.is_done() {
            assert!(!strategy.is_blocked_waiting_for_receive());
            strategy.run();
        }
        assert_eq!(strategy.follower.calculated.len(), 12);
        assert_eq!(
            strategy.follower.sent,
            vec![
                (cell(1, 1), Side::Right),
                (cell(2, 0), Side::Left),
                (cell(4, 2), Side::Right),
                (cell(5, -1), Side::Left),
            ]
        );
    }

    /// A single worker has empty schedules and computes the whole pyramid in
    /// height-limited diamonds.
    #[test]
    fn single_worker_computes_everything() {
        let d_max = 6;
        let mut follower = DebugStrategyFollower::new(d_max);
        let receives = PerSide::new(vec![].into_iter(), vec![].into_iter());
        let sends = PerSide::new(vec![].into_iter(), vec![].into_iter());
        let mut strategy = Strategy::new(&mut follower, receives, sends, d_max, Some(3));

        while !strategy.is_done() {
            assert!(!strategy.is_blocked_waiting_for_receive());
            strategy.run();
        }
        let expected: usize = (0..=d_max).map(|d| d as usize + 1).sum();
        assert_eq!(strategy.follower.calculated.len(), expected);
    }

    #[test]
    fn strategy_reports_the_final_result_location() {
        struct CompletingFollower {
            inner: DebugStrategyFollower,
            complete_at: CellLocation,
        }
        impl StrategyFollower for CompletingFollower {
            fn set(&mut self, d: i32, k: i32, v: i32) {
                self.inner.set(d, k, v);
            }
            fn calculate(&mut self, d: i32, k: i32) -> bool {
                self.inner.calculate(d, k);
                CellLocation::new(d, k) == self.complete_at
            }
            fn send(&mut self, d: i32, k: i32, to: Side) {
                self.inner.send(d, k, to);
            }
        }

        let d_max = 5;
        let mut follower = CompletingFollower {
            inner: DebugStrategyFollower::new(d_max),
            complete_at: cell(2, 0),
        };
        let receives = PerSide::new(vec![].into_iter(), vec![].into_iter());
        let sends = PerSide::new(vec![].into_iter(), vec![].into_iter());
        let mut strategy = Strategy::new(&mut follower, receives, sends, d_max, None);

        while !strategy.is_done() {
            strategy.run();
        }
        assert_eq!(strategy.final_result_location(), Some(cell(2, 0)));
    }
}
