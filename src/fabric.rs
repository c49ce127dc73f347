//! The in-process message fabric connecting the worker ring.
//!
//! Workers are threads; each owns a mailbox other workers push envelopes
//! into. The fabric guarantees exactly the properties the engine relies on:
//! per-pair FIFO delivery, tag-based typing, a non-blocking probe and a
//! blocking receive that refuses to consume work once a result announcement
//! is in sight.

use std::collections::VecDeque;
use std::sync::{Arc, Barrier};

use log::trace;
use parking_lot::{Condvar, Mutex};

use crate::backtrace::EditStep;
use crate::side::Side;

/// Everything that travels between workers.
///
/// `ReportWork` and `ReportLcsLength` carry the forward pass; the `ReadOut`
/// family carries the edit-script pass. The `side` of a work message names
/// the side *of the receiver* the value arrives on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Broadcast of both input sequences from rank 0.
    Input { a: Vec<i32>, b: Vec<i32> },
    /// A boundary DP value for the receiver's next scheduled receive.
    ReportWork { side: Side, x: i32 },
    /// The edit distance, announced by the finder and fanned out by rank 0.
    ReportLcsLength { d: i32 },
    /// Backtrace continuation handed to a neighbor.
    ReadOut { d: i32, k: i32, edit_len: i32 },
    /// A finished segment of edit steps, shipped to rank 0.
    /// `start_d` is the global index of the first step in `steps`.
    ReadOutData {
        start_d: i32,
        edit_len: i32,
        steps: Vec<EditStep>,
    },
    /// Backtrace finished; every worker still waiting may stop.
    ReadOutStopWorkers,
}

/// A message together with its sender.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub from: usize,
    pub msg: Message,
}

struct Mailbox {
    queue: Mutex<VecDeque<Envelope>>,
    monitor: Condvar,
}

impl Mailbox {
    fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            monitor: Condvar::new(),
        }
    }
}

/// One worker's handle onto the fabric. All operations take `&self`; the
/// mailbox locks provide the necessary exclusion.
pub struct WorkerLink {
    rank: usize,
    mailboxes: Arc<Vec<Mailbox>>,
    start_barrier: Arc<Barrier>,
}

/// Creates the fully connected fabric for `num_workers` ranks.
pub fn create_fabric(num_workers: usize) -> Vec<WorkerLink> {
    assert!(num_workers > 0);
    let mailboxes = Arc::new((0..num_workers).map(|_| Mailbox::new()).collect::<Vec<_>>());
    let start_barrier = Arc::new(Barrier::new(num_workers));
    (0..num_workers)
        .map(|rank| WorkerLink {
            rank,
            mailboxes: Arc::clone(&mailboxes),
            start_barrier: Arc::clone(&start_barrier),
        })
        .collect()
}

impl WorkerLink {
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn num_workers(&self) -> usize {
        self.mailboxes.len()
    }

    /// Point-to-point send. Delivery between any fixed pair of ranks is in
    /// send order.
    pub fn send(&self, to: usize, msg: Message) {
        trace!("{} | sending {:?} to {}", self.rank, msg, to);
        let mailbox = &self.mailboxes[to];
        mailbox.queue.lock().push_back(Envelope {
            from: self.rank,
            msg,
        });
        mailbox.monitor.notify_all();
    }

    /// Non-blocking probe for any queued message.
    pub fn has_incoming_message(&self) -> bool {
        !self.mailboxes[self.rank].queue.lock().is_empty()
    }

    /// Blocks until a message arrives. Returns the payload of the next work
    /// message, or `None` once a result announcement is visible anywhere in
    /// the queue — the announcement itself is left queued for
    /// [`WorkerLink::receive_lcs_length`] to pick up.
    pub fn blocking_receive(&self) -> Option<(Side, i32)> {
        let mailbox = &self.mailboxes[self.rank];
        let mut queue = mailbox.queue.lock();
        loop {
            if queue
                .iter()
                .any(|env| matches!(env.msg, Message::ReportLcsLength { .. }))
            {
                return None;
            }
            match queue.front() {
                Some(Envelope {
                    msg: Message::ReportWork { .. },
                    ..
                }) => {
                    let env = queue.pop_front().expect("front was just inspected");
                    match env.msg {
                        Message::ReportWork { side, x } => return Some((side, x)),
                        _ => unreachable!(),
                    }
                }
                // any other tag ends the calculation loop
                Some(_) => return None,
                None => mailbox.monitor.wait(&mut queue),
            }
        }
    }

    /// Blocks until a `ReportLcsLength` announcement arrives and consumes
    /// exactly that envelope, skipping unrelated queued messages.
    pub fn receive_lcs_length(&self) -> (i32, usize) {
        let mailbox = &self.mailboxes[self.rank];
        let mut queue = mailbox.queue.lock();
        loop {
            let position = queue
                .iter()
                .position(|env| matches!(env.msg, Message::ReportLcsLength { .. }));
            if let Some(position) = position {
                let env = queue.remove(position).expect("position was just found");
                match env.msg {
                    Message::ReportLcsLength { d } => return (d, env.from),
                    _ => unreachable!(),
                }
            }
            mailbox.monitor.wait(&mut queue);
        }
    }

    /// Blocks until any message arrives and consumes it. The backtrace loop
    /// does its own tag dispatch.
    pub fn blocking_receive_raw(&self) -> Envelope {
        let mailbox = &self.mailboxes[self.rank];
        let mut queue = mailbox.queue.lock();
        loop {
            if let Some(env) = queue.pop_front() {
                return env;
            }
            mailbox.monitor.wait(&mut queue);
        }
    }

    /// Rank 0 hands both sequences to every other worker.
    pub fn broadcast_input(&self, a: &[i32], b: &[i32]) {
        assert!(self.rank == 0);
        for to in 1..self.num_workers() {
            self.send(
                to,
                Message::Input {
                    a: a.to_vec(),
                    b: b.to_vec(),
                },
            );
        }
    }

    /// Counterpart of [`WorkerLink::broadcast_input`] on ranks above 0.
    pub fn receive_input(&self) -> (Vec<i32>, Vec<i32>) {
        assert!(self.rank != 0);
        let mailbox = &self.mailboxes[self.rank];
        let mut queue = mailbox.queue.lock();
        loop {
            let position = queue
                .iter()
                .position(|env| matches!(env.msg, Message::Input { .. }));
            if let Some(position) = position {
                let env = queue.remove(position).expect("position was just found");
                match env.msg {
                    Message::Input { a, b } => return (a, b),
                    _ => unreachable!(),
                }
            }
            mailbox.monitor.wait(&mut queue);
        }
    }

    /// All workers start calculating together.
    pub fn barrier_wait(&self) {
        self.start_barrier.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_to_point_is_fifo() {
        let links = create_fabric(2);
        for x in 0..5 {
            links[0].send(
                1,
                Message::ReportWork {
                    side: Side::Left,
                    x,
                },
            );
        }
        for x in 0..5 {
            assert_eq!(links[1].blocking_receive(), Some((Side::Left, x)));
        }
    }

    #[test]
    fn probe_reports_queued_messages() {
        let links = create_fabric(2);
        assert!(!links[1].has_incoming_message());
        links[0].send(1, Message::ReportLcsLength { d: 4 });
        assert!(links[1].has_incoming_message());
    }

    #[test]
    fn result_announcement_preempts_queued_work() {
        let links = create_fabric(2);
        links[0].send(
            1,
            Message::ReportWork {
                side: Side::Right,
                x: 3,
            },
        );
        links[0].send(1, Message::ReportLcsLength { d: 7 });
        // the work message is older, but the announcement wins
        assert_eq!(links[1].blocking_receive(), None);
        // and is still consumable afterwards
        assert_eq!(links[1].receive_lcs_length(), (7, 0));
    }

    #[test]
    fn input_broadcast_round_trip() {
        let links = create_fabric(3);
        links[0].broadcast_input(&[1, 2], &[3]);
        assert_eq!(links[1].receive_input(), (vec![1, 2], vec![3]));
        assert_eq!(links[2].receive_input(), (vec![1, 2], vec![3]));
    }

    #[test]
    fn blocking_receive_wakes_on_late_send() {
        let links = create_fabric(2);
        std::thread::scope(|scope| {
            scope.spawn(|| {
                std::thread::sleep(std::time::Duration::from_millis(10));
                links[0].send(
                    1,
                    Message::ReportWork {
                        side: Side::Left,
                        x: 9,
                    },
                );
            });
            assert_eq!(links[1].blocking_receive(), Some((Side::Left, 9)));
        });
    }
}
