use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use crate::foundation::error::FrameSeqResult;

/// Lanes in the process-wide default pool.
pub const DEFAULT_LANES: usize = 4;

type Task = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Now(Task),
    At(Instant, Task),
}

/// Handle to one single-threaded executor. Tasks posted to a lane run in order.
#[derive(Clone)]
pub struct Lane {
    id: usize,
    thread: ThreadId,
    sender: mpsc::Sender<Message>,
}

impl std::fmt::Debug for Lane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lane").field("id", &self.id).finish()
    }
}

impl Lane {
    fn spawn(id: usize) -> FrameSeqResult<Self> {
        let (sender, receiver) = mpsc::channel();
        let handle = thread::Builder::new()
            .name(format!("frameseq-lane-{id}"))
            .spawn(move || run_lane(id, receiver))?;
        Ok(Self {
            id,
            thread: handle.thread().id(),
            sender,
        })
    }

    /// Slot of this lane in its pool.
    pub fn id(&self) -> usize {
        self.id
    }

    /// `true` when called from this lane's own thread.
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread
    }

    /// Queue `task`. Returns `false` if the lane thread is gone.
    pub fn post(&self, task: impl FnOnce() + Send + 'static) -> bool {
        self.sender.send(Message::Now(Box::new(task))).is_ok()
    }

    /// Queue `task` to run no earlier than `delay` from now.
    pub fn post_delayed(&self, delay: Duration, task: impl FnOnce() + Send + 'static) -> bool {
        if delay.is_zero() {
            return self.post(task);
        }
        let at = Instant::now() + delay;
        self.sender.send(Message::At(at, Box::new(task))).is_ok()
    }

    /// Run `task` on the lane and block until it returns.
    ///
    /// Runs inline when already on the lane. `None` when the task panicked or the lane
    /// is gone.
    pub fn execute<T: Send + 'static>(&self, task: impl FnOnce() -> T + Send + 'static) -> Option<T> {
        if self.is_current() {
            return Some(task());
        }
        let (tx, rx) = mpsc::sync_channel(1);
        let posted = self.post(move || {
            let _ = tx.send(task());
        });
        if !posted {
            return None;
        }
        rx.recv().ok()
    }
}

struct Delayed {
    at: Instant,
    seq: u64,
    task: Task,
}

impl PartialEq for Delayed {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for Delayed {}

impl PartialOrd for Delayed {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Delayed {
    // Reversed: BinaryHeap is a max-heap, the earliest deadline must pop first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .at
            .cmp(&self.at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

fn run_lane(id: usize, receiver: mpsc::Receiver<Message>) {
    let mut timers: BinaryHeap<Delayed> = BinaryHeap::new();
    let mut seq = 0u64;
    loop {
        let now = Instant::now();
        while timers.peek().is_some_and(|d| d.at <= now) {
            if let Some(due) = timers.pop() {
                run_task(id, due.task);
            }
        }

        // Due tasks may have run for a while; measure the wait from after them.
        let now = Instant::now();
        let message = match timers.peek() {
            Some(next) => receiver.recv_timeout(next.at.saturating_duration_since(now)),
            None => receiver.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match message {
            Ok(Message::Now(task)) => run_task(id, task),
            Ok(Message::At(at, task)) => {
                seq += 1;
                timers.push(Delayed { at, seq, task });
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    tracing::debug!(lane = id, dropped = timers.len(), "lane exiting");
}

fn run_task(id: usize, task: Task) {
    if catch_unwind(AssertUnwindSafe(task)).is_err() {
        tracing::error!(lane = id, "task panicked; lane continues");
    }
}

/// Fixed-size set of lanes handed out round-robin.
///
/// Lane threads start on first use and exit once every handle to them is dropped.
pub struct LanePool {
    size: usize,
    counter: AtomicUsize,
    lanes: Mutex<Vec<Option<Lane>>>,
}

impl std::fmt::Debug for LanePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanePool").field("size", &self.size).finish()
    }
}

impl LanePool {
    /// Pool of `size` lanes (at least one).
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            size,
            counter: AtomicUsize::new(0),
            lanes: Mutex::new(vec![None; size]),
        }
    }

    /// Process-wide pool of [`DEFAULT_LANES`] lanes.
    pub fn global() -> Arc<LanePool> {
        static GLOBAL: OnceLock<Arc<LanePool>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(LanePool::new(DEFAULT_LANES))))
    }

    /// Number of lanes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Next lane in round-robin order, spawning its thread if needed.
    pub fn acquire(&self) -> FrameSeqResult<Lane> {
        let slot = self.counter.fetch_add(1, AtomicOrdering::Relaxed) % self.size;
        let mut lanes = self.lanes.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(lane) = &lanes[slot] {
            return Ok(lane.clone());
        }
        let lane = Lane::spawn(slot)?;
        tracing::debug!(lane = slot, "spawned playback lane");
        lanes[slot] = Some(lane.clone());
        Ok(lane)
    }
}

impl Default for LanePool {
    fn default() -> Self {
        Self::new(DEFAULT_LANES)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/lanes.rs"]
mod tests;
