//! The worker entry point and the embedding API.
//!
//! [`solve`] spawns one thread per rank on the in-process fabric, runs the
//! strategy-driven forward pass on each of them, spreads the edit distance
//! through the announcement round and optionally follows up with the
//! distributed edit-script pass. Rank 0 runs on the calling thread and
//! returns the result.

use std::time::{Duration, Instant};

use log::debug;
use thiserror::Error;

use crate::backtrace::{run_backtrace, EditStep};
use crate::fabric::{create_fabric, Message, WorkerLink};
use crate::myers::{calculate_cell, calculate_row};
use crate::partition::{ReceiveSideIterator, SendSideIterator};
use crate::side::{PerSide, Side};
use crate::storage::{FastStorage, FrontierStorage, RetainsPyramid, Storage};
use crate::strategy::{Strategy, StrategyFollower};

/// Failures surfaced by [`solve`] and the input helpers.
#[derive(Debug, Error)]
pub enum Error {
    #[error("could not open file {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid integer token {token:?} in {path}")]
    Parse { path: String, token: String },
    #[error("at least one worker is required")]
    NoWorkers,
}

/// Tunables of a run.
#[derive(Debug, Clone)]
pub struct SolveOptions {
    /// Number of peer workers. Defaults to the number of hardware threads.
    pub num_workers: usize,
    /// Upper bound on the height of a single diamond of work. Small diamonds
    /// keep boundary values flowing to the neighbors early; `None` lets a
    /// worker compute its whole exposed region in one go.
    pub diamond_height_limit: Option<i32>,
    /// Whether the edit script is reconstructed after the distance is known.
    /// Selecting the script switches every worker from the rolling
    /// single-column store to the retained pyramid store.
    pub compute_script: bool,
    /// Growth threshold of the retired growth-phase partitioning scheme.
    /// Accepted for command-line compatibility; the round-robin engine
    /// ignores it.
    pub min_entries: Option<usize>,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            num_workers: num_cpus::get(),
            diamond_height_limit: Some(20),
            compute_script: false,
            min_entries: None,
        }
    }
}

/// Result of a run, as observed by rank 0.
#[derive(Debug, Clone)]
pub struct Solution {
    pub edit_len: i32,
    /// Present iff the script was requested.
    pub script: Option<Vec<EditStep>>,
    /// Wall time of the forward pass, input broadcast included.
    pub solution_time: Duration,
    /// Wall time of the edit-script pass; zero when no script was requested.
    pub script_time: Duration,
}

/// Computes the edit distance (and optionally the edit script) between `a`
/// and `b` using `opts.num_workers` message-passing workers.
pub fn solve(a: &[i32], b: &[i32], opts: &SolveOptions) -> Result<Solution, Error> {
    if opts.num_workers == 0 {
        return Err(Error::NoWorkers);
    }
    if opts.min_entries.is_some() {
        log::warn!("-min_entries has no effect: the round-robin partition is always used");
    }

    let mut links = create_fabric(opts.num_workers);
    let rank0_link = links.remove(0);

    std::thread::scope(|scope| {
        for link in links {
            let opts = opts.clone();
            scope.spawn(move || {
                let (a, b) = link.receive_input();
                link.barrier_wait();
                if opts.compute_script {
                    let _ = run_with_script::<FastStorage>(&link, &a, &b, &opts);
                } else {
                    let _ = run_distance_only::<FrontierStorage>(&link, &a, &b, &opts);
                }
            });
        }

        rank0_link.broadcast_input(a, b);
        rank0_link.barrier_wait();
        let solution = if opts.compute_script {
            run_with_script::<FastStorage>(&rank0_link, a, b, opts)
        } else {
            run_distance_only::<FrontierStorage>(&rank0_link, a, b, opts)
        };
        Ok(solution.expect("rank 0 always produces the solution"))
    })
}

/// The follower binding the strategy to this worker's storage, the input
/// sequences and the fabric.
struct FabricFollower<'a, S: Storage> {
    storage: S,
    a: &'a [i32],
    b: &'a [i32],
    link: &'a WorkerLink,
}

impl<S: Storage> StrategyFollower for FabricFollower<'_, S> {
    #[inline]
    fn set(&mut self, d: i32, k: i32, v: i32) {
        self.storage.set(d, k, v);
    }

    #[inline]
    fn calculate(&mut self, d: i32, k: i32) -> bool {
        calculate_cell(&mut self.storage, self.a, self.b, d, k)
    }

    fn calculate_row(&mut self, d: i32, k_min: i32, k_max: i32) -> Option<i32> {
        calculate_row(&mut self.storage, self.a, self.b, d, k_min, k_max)
    }

    fn send(&mut self, d: i32, k: i32, to: Side) {
        let to_rank = match to {
            Side::Left => self.link.rank() - 1,
            Side::Right => self.link.rank() + 1,
        };
        let x = self.storage.get(d, k);
        // the value arrives on the receiver's opposite flank
        self.link.send(
            to_rank,
            Message::ReportWork {
                side: to.opposite(),
                x,
            },
        );
    }
}

/// Number of ranks that take part in the computation. A band narrower than
/// one cell per worker would leave the outermost participating ranks with
/// silent flanks, free to race over territory they do not own; capping the
/// ring at `d_max` keeps every participant's band bounded by a neighbor or
/// by the pyramid edge.
fn active_workers(num_workers: usize, d_max: i32) -> usize {
    num_workers.min(d_max as usize).max(1)
}

/// Forward pass followed by the edit-script pass.
fn run_with_script<S: Storage + RetainsPyramid>(
    link: &WorkerLink,
    a: &[i32],
    b: &[i32],
    opts: &SolveOptions,
) -> Option<Solution> {
    let solution_start = Instant::now();
    let (follower, edit_len) = forward_pass_and_announce::<S>(link, a, b, opts);
    let solution_time = solution_start.elapsed();

    let script_start = Instant::now();
    let num_active = active_workers(link.num_workers(), (a.len() + b.len()) as i32);
    let script = run_backtrace(link, &follower.storage, a, b, edit_len, num_active);
    let script_time = script_start.elapsed();

    (link.rank() == 0).then(|| Solution {
        edit_len,
        script: Some(script.expect("rank 0 assembles the script")),
        solution_time,
        script_time,
    })
}

/// Forward pass only; the rolling store is enough for the distance.
fn run_distance_only<S: Storage>(
    link: &WorkerLink,
    a: &[i32],
    b: &[i32],
    opts: &SolveOptions,
) -> Option<Solution> {
    let solution_start = Instant::now();
    let (_follower, edit_len) = forward_pass_and_announce::<S>(link, a, b, opts);
    let solution_time = solution_start.elapsed();

    (link.rank() == 0).then(|| Solution {
        edit_len,
        script: None,
        solution_time,
        script_time: Duration::ZERO,
    })
}

/// The forward event loop (calculating, with blocked-wait excursions while a
/// needed boundary value is in flight), followed by the announcement round
/// through which every worker learns the edit distance.
fn forward_pass_and_announce<'a, S: Storage>(
    link: &'a WorkerLink,
    a: &'a [i32],
    b: &'a [i32],
    opts: &SolveOptions,
) -> (FabricFollower<'a, S>, i32) {
    let rank = link.rank();
    let d_max = (a.len() + b.len()) as i32;
    let num_active = active_workers(link.num_workers(), d_max);

    let mut follower = FabricFollower {
        storage: S::with_layers(d_max),
        a,
        b,
        link,
    };

    // Ranks outside the active ring own no cells; they just wait for the
    // announcement.
    if rank >= num_active {
        let (edit_len, _) = link.receive_lcs_length();
        debug!("{rank} | idle worker learned min edit length {edit_len}");
        return (follower, edit_len);
    }

    let receives = PerSide::new(Side::Left, Side::Right)
        .map(|side| ReceiveSideIterator::new(num_active, rank, side, d_max));
    let sends = PerSide::new(Side::Left, Side::Right)
        .map(|side| SendSideIterator::new(num_active, rank, side, d_max));

    let final_location;
    {
        let mut strategy = Strategy::new(
            &mut follower,
            receives,
            sends,
            d_max,
            opts.diamond_height_limit,
        );

        loop {
            strategy.run();
            if strategy.is_done() {
                break;
            }
            if strategy.is_blocked_waiting_for_receive() || link.has_incoming_message() {
                match link.blocking_receive() {
                    // a peer announced the result
                    None => break,
                    Some((side, x)) => strategy.receive(side, x),
                }
            }
        }
        final_location = strategy.final_result_location();
    }

    // Announcement round: the finder reports to rank 0, rank 0 forwards to
    // everyone else.
    let (edit_len, found_by) = match final_location {
        Some(location) => {
            debug!("{rank} | found the result at {location}");
            if rank != 0 {
                link.send(0, Message::ReportLcsLength { d: location.d });
            }
            (location.d, rank)
        }
        None => link.receive_lcs_length(),
    };
    if rank == 0 {
        for other in 1..link.num_workers() {
            if other != found_by {
                link.send(other, Message::ReportLcsLength { d: edit_len });
            }
        }
    }
    debug!("{rank} | min edit length {edit_len}");

    (follower, edit_len)
}
