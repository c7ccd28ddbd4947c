// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Frame clocks drive cursor animations one display frame at a time.
//!
//! Callbacks receive the frame timestamp in milliseconds on the clock's own
//! timeline and are never run from inside [`FrameClock::request_frame`].

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub type FrameId = u64;
pub type FrameCallback = Box<dyn FnOnce(f64) + Send + 'static>;

pub trait FrameClock: Send + Sync {
    /// Current time in milliseconds.
    fn now(&self) -> f64;

    /// Schedule `callback` for the next frame.
    fn request_frame(&self, callback: FrameCallback) -> FrameId;

    /// Drop a pending frame. Unknown or already fired ids are ignored.
    fn cancel_frame(&self, id: FrameId);
}

#[derive(Default)]
struct ManualState {
    now: f64,
    next_id: FrameId,
    pending: BTreeMap<FrameId, FrameCallback>,
}

/// Deterministic clock stepped by hand.
///
/// Each [`advance`](Self::advance) is one display refresh: time moves
/// forward, then every frame requested before the call runs with the new
/// timestamp. Frames requested by those callbacks wait for the next advance.
#[derive(Clone, Default)]
pub struct ManualFrameClock {
    state: Arc<Mutex<ManualState>>,
}

impl ManualFrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward by `ms` and run due frames. Returns how many ran.
    pub fn advance(&self, ms: f64) -> usize {
        let (now, due) = {
            let mut state = self.state.lock();
            state.now += ms;
            (state.now, std::mem::take(&mut state.pending))
        };
        let count = due.len();
        for callback in due.into_values() {
            callback(now);
        }
        count
    }

    /// Advance in steps of `frame_ms` until no frames are pending or
    /// `max_frames` steps have run.
    pub fn run_until_idle(&self, frame_ms: f64, max_frames: usize) -> usize {
        let mut steps = 0;
        while steps < max_frames && self.pending_frames() > 0 {
            self.advance(frame_ms);
            steps += 1;
        }
        steps
    }

    pub fn pending_frames(&self) -> usize {
        self.state.lock().pending.len()
    }
}

impl FrameClock for ManualFrameClock {
    fn now(&self) -> f64 {
        self.state.lock().now
    }

    fn request_frame(&self, callback: FrameCallback) -> FrameId {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = state.next_id;
        state.pending.insert(id, callback);
        id
    }

    fn cancel_frame(&self, id: FrameId) {
        self.state.lock().pending.remove(&id);
    }
}

/// Frames fired by Tokio timers, one task per pending frame.
pub struct TokioFrameClock {
    handle: Handle,
    interval: Duration,
    origin: Instant,
    next_id: AtomicU64,
    tasks: Arc<Mutex<HashMap<FrameId, JoinHandle<()>>>>,
}

impl TokioFrameClock {
    pub fn new(handle: Handle, interval: Duration) -> Self {
        Self {
            handle,
            interval,
            origin: Instant::now(),
            next_id: AtomicU64::new(1),
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// A clock on the current runtime.
    ///
    /// # Panics
    ///
    /// Outside a Tokio runtime.
    pub fn current(interval: Duration) -> Self {
        Self::new(Handle::current(), interval)
    }
}

impl FrameClock for TokioFrameClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }

    fn request_frame(&self, callback: FrameCallback) -> FrameId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let interval = self.interval;
        let origin = self.origin;
        let tasks = Arc::clone(&self.tasks);

        // Held across spawn so the task cannot remove itself before insertion.
        let mut pending = self.tasks.lock();
        let task = self.handle.spawn(async move {
            tokio::time::sleep(interval).await;
            if tasks.lock().remove(&id).is_some() {
                callback(origin.elapsed().as_secs_f64() * 1000.0);
            }
        });
        pending.insert(id, task);
        id
    }

    fn cancel_frame(&self, id: FrameId) {
        if let Some(task) = self.tasks.lock().remove(&id) {
            task.abort();
        }
    }
}

impl Drop for TokioFrameClock {
    fn drop(&mut self) {
        for (_, task) in self.tasks.lock().drain() {
            task.abort();
        }
    }
}
