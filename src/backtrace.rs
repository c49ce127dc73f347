//! Distributed reconstruction of the edit script.
//!
//! After the forward pass every worker retains the DP values of the band it
//! owned, so the script can only be recovered by walking the pyramid from
//! `(edit_len, |A| - |B|)` down to the apex, hopping to a neighbor whenever
//! the walk leaves the local band. Finished step segments are shipped to
//! rank 0, which stitches them together and declares the pass complete once
//! the covered layer intervals merge into `[0, edit_len]`.

use std::fmt::Display;

use log::{debug, trace};

use crate::fabric::{Envelope, Message, WorkerLink};
use crate::partition::k_ranges_through;
use crate::storage::{RetainsPyramid, Storage};

/// One insert or delete of the edit script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EditStep {
    /// Position in A at which to perform the step: the number of preceding
    /// A-elements for an insert, the 1-based element index for a delete.
    pub x: i32,
    /// Value to insert; ignored in delete mode.
    pub insert_val: i32,
    pub mode: EditMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditMode {
    Insert,
    #[default]
    Delete,
}

impl Display for EditStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.mode {
            EditMode::Insert => write!(f, "{} + {}", self.x, self.insert_val),
            EditMode::Delete => write!(f, "{} -", self.x),
        }
    }
}

/// Sorted set of half-open layer intervals, merged on touching endpoints.
/// Rank 0 uses it to decide when every segment of the script has arrived.
struct IntervalSet {
    intervals: Vec<(i32, i32)>,
}

impl IntervalSet {
    fn new() -> Self {
        Self { intervals: vec![] }
    }

    fn insert(&mut self, min: i32, max: i32) {
        trace!("interval set: inserting ({min}, {max})");
        debug_assert!(min <= max);
        let position = self
            .intervals
            .iter()
            .position(|&(lo, _)| lo >= min)
            .unwrap_or(self.intervals.len());
        self.intervals.insert(position, (min, max));
        // merge with the right neighbor, then with the left
        if position + 1 < self.intervals.len() && self.intervals[position + 1].0 == max {
            self.intervals[position].1 = self.intervals[position + 1].1;
            self.intervals.remove(position + 1);
        }
        if position > 0 && self.intervals[position - 1].1 == min {
            self.intervals[position - 1].1 = self.intervals[position].1;
            self.intervals.remove(position);
        }
    }

    fn is_exactly(&self, min: i32, max: i32) -> bool {
        self.intervals == [(min, max)]
    }
}

enum WalkEnd {
    /// The walk reached the apex; the script is complete below `start_d`.
    Root,
    /// The walk left the local band: continue at `(d, k)` on `neighbor`.
    HandOff { d: i32, k: i32, neighbor: usize },
}

/// Walks the local band downwards from `(d, k)`, emitting one step per
/// layer. Returns the produced segment (in ascending layer order, starting
/// at global step index `end.d`) together with how the walk ended.
fn walk_local<S: Storage>(
    storage: &S,
    b: &[i32],
    ranges: &[Option<(i32, i32)>],
    rank: usize,
    mut d: i32,
    mut k: i32,
) -> (Vec<EditStep>, WalkEnd) {
    let mut segment = vec![];
    loop {
        debug_assert!(d > 0);
        debug_assert!(
            matches!(ranges[d as usize], Some((k_min, k_max)) if k_min <= k && k <= k_max),
            "walk entered ({d}, {k}) outside the local band"
        );
        if k == -d || (k != d && storage.get(d - 1, k - 1) < storage.get(d - 1, k + 1)) {
            k += 1;
            let x = storage.get(d - 1, k);
            let y = x - k;
            segment.push(EditStep {
                x,
                insert_val: b[y as usize],
                mode: EditMode::Insert,
            });
        } else {
            k -= 1;
            let x = storage.get(d - 1, k) + 1;
            segment.push(EditStep {
                x,
                insert_val: -1,
                mode: EditMode::Delete,
            });
        }
        d -= 1;
        if d == 0 {
            segment.reverse();
            return (segment, WalkEnd::Root);
        }
        let in_band =
            matches!(ranges[d as usize], Some((k_min, k_max)) if k_min <= k && k <= k_max);
        if !in_band {
            let neighbor = match ranges[d as usize] {
                Some((_, k_max)) if k > k_max => rank + 1,
                // left of the band, or below the band's first layer (the
                // lower layers always belong to lower ranks)
                _ => rank - 1,
            };
            segment.reverse();
            return (segment, WalkEnd::HandOff { d, k, neighbor });
        }
    }
}

/// Runs the edit-script pass on one worker. Returns the assembled script on
/// rank 0 and `None` everywhere else.
///
/// # Note:
/// Only storage types retaining the full pyramid can back this walk; the
/// `RetainsPyramid` bound makes selecting the rolling distance-only store a
/// compile error rather than a silent stale read.
pub fn run_backtrace<S: Storage + RetainsPyramid>(
    link: &WorkerLink,
    storage: &S,
    a: &[i32],
    b: &[i32],
    edit_len: i32,
    active_workers: usize,
) -> Option<Vec<EditStep>> {
    let rank = link.rank();
    let num_workers = link.num_workers();
    let ranges = if rank < active_workers {
        k_ranges_through(active_workers, rank, edit_len)
    } else {
        // idle ranks own nothing; they only wait for the stop signal
        vec![None; edit_len as usize + 1]
    };
    let k_final = a.len() as i32 - b.len() as i32;

    let is_initial_holder = matches!(
        ranges[edit_len as usize],
        Some((k_min, k_max)) if k_min <= k_final && k_final <= k_max
    );
    debug!("{rank} | backtrace starting, holder: {is_initial_holder}");

    let mut assembled = if rank == 0 {
        Some(vec![EditStep::default(); edit_len as usize])
    } else {
        None
    };
    let mut received = IntervalSet::new();
    if rank == 0 {
        // pin the top so a partially assembled script can never look complete
        received.insert(edit_len, edit_len);
    }

    let mut pending_walk = if is_initial_holder {
        Some((edit_len, k_final))
    } else {
        None
    };

    loop {
        if let Some((d_start, k_start)) = pending_walk.take() {
            let (segment, end) = if d_start == 0 {
                (vec![], WalkEnd::Root)
            } else {
                walk_local(storage, b, &ranges, rank, d_start, k_start)
            };
            let segment_start = d_start - segment.len() as i32;
            if let Some(steps) = assembled.as_mut() {
                steps[segment_start as usize..d_start as usize].copy_from_slice(&segment);
                received.insert(segment_start, d_start);
            } else if !segment.is_empty() || d_start == 0 {
                link.send(
                    0,
                    Message::ReadOutData {
                        start_d: segment_start,
                        edit_len,
                        steps: segment,
                    },
                );
            }
            if let WalkEnd::HandOff { d, k, neighbor } = end {
                debug!("{rank} | handing backtrace at ({d}, {k}) to {neighbor}");
                link.send(neighbor, Message::ReadOut { d, k, edit_len });
            }
        }

        if rank == 0 {
            if received.is_exactly(0, edit_len) {
                for other in 1..num_workers {
                    link.send(other, Message::ReadOutStopWorkers);
                }
                debug!("0 | edit script assembled");
                return assembled;
            }
        }

        let Envelope { from, msg } = link.blocking_receive_raw();
        match msg {
            Message::ReadOut { d, k, edit_len: e } => {
                debug_assert!(e == edit_len);
                trace!("{rank} | received backtrace continuation ({d}, {k}) from {from}");
                pending_walk = Some((d, k));
            }
            Message::ReadOutData {
                start_d,
                edit_len: e,
                steps,
            } => {
                debug_assert!(rank == 0);
                debug_assert!(e == edit_len);
                let steps_len = steps.len() as i32;
                let assembled_steps = assembled.as_mut().expect("only rank 0 assembles");
                assembled_steps[start_d as usize..(start_d + steps_len) as usize]
                    .copy_from_slice(&steps);
                received.insert(start_d, start_d + steps_len);
            }
            Message::ReadOutStopWorkers => {
                debug!("{rank} | backtrace stopped by {from}");
                return None;
            }
            // stale forward-pass traffic
            Message::ReportWork { .. } | Message::ReportLcsLength { .. } => continue,
            Message::Input { .. } => unreachable!("input arrives before the barrier"),
        }
    }
}
