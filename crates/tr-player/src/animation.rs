// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Frame-driven click and drag animations
//!
//! An animation samples its progress `p = min(elapsed / duration, 1)` on
//! every frame of a [`FrameClock`], reports the derived values through
//! callbacks and reschedules itself until `p` reaches 1.

use std::f64::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tr_domain_types::Position;

use crate::clock::{FrameClock, FrameId};

/// Fraction of a click spent pressing down.
pub const CLICK_PRESS_PHASE: f64 = 0.3;

/// Progress window in which the legacy midpoint callback fires.
const MIDPOINT_WINDOW: std::ops::RangeInclusive<f64> = 0.30..=0.32;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickTiming {
    pub duration_ms: f64,
    /// Smallest cursor scale, reached at the end of the press phase.
    pub min_scale: f64,
    /// Also fire the completion callback on a frame whose progress falls in
    /// `[0.30, 0.32]`.
    pub repeat_midpoint_callback: bool,
}

impl Default for ClickTiming {
    fn default() -> Self {
        Self {
            duration_ms: 300.0,
            min_scale: 0.5,
            repeat_midpoint_callback: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragTiming {
    pub duration_ms: f64,
}

impl Default for DragTiming {
    fn default() -> Self {
        Self { duration_ms: 500.0 }
    }
}

/// Cursor scale at click progress `progress`.
///
/// Linear press from 1 down to `min_scale`, then a damped bounce back up.
/// The bounce is only sampled for `progress < 1`; the animation itself
/// settles on exactly 1.
pub fn click_scale(progress: f64, min_scale: f64) -> f64 {
    let p = progress.clamp(0.0, 1.0);
    if p < CLICK_PRESS_PHASE {
        1.0 - (1.0 - min_scale) * (p / CLICK_PRESS_PHASE)
    } else {
        let q = (p - CLICK_PRESS_PHASE) / min_scale;
        let bounce = (q * PI * 2.0).sin() * 0.1 * (1.0 - q).powi(2);
        min_scale + (1.0 - min_scale) * q + bounce
    }
}

fn progress(start: f64, now: f64, duration_ms: f64) -> f64 {
    ((now - start) / duration_ms).clamp(0.0, 1.0)
}

struct Shared {
    clock: Arc<dyn FrameClock>,
    cancelled: AtomicBool,
    finished: AtomicBool,
    frame: Mutex<Option<FrameId>>,
}

/// Cancels its animation when [`cancel`](Self::cancel)led or dropped.
pub struct AnimationHandle {
    shared: Arc<Shared>,
}

impl AnimationHandle {
    /// Remove the pending frame; no callback runs afterwards.
    pub fn cancel(&self) {
        if self.shared.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(id) = self.shared.frame.lock().take() {
            self.shared.clock.cancel_frame(id);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.shared.finished.load(Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::SeqCst)
    }
}

impl Drop for AnimationHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for AnimationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationHandle")
            .field("finished", &self.is_finished())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

type Step = Box<dyn FnMut(f64) -> bool + Send>;

/// Runs `step` once per frame while it returns `true`.
struct Driver {
    shared: Arc<Shared>,
    step: Mutex<Step>,
}

impl Driver {
    fn start(clock: Arc<dyn FrameClock>, step: Step) -> AnimationHandle {
        let shared = Arc::new(Shared {
            clock,
            cancelled: AtomicBool::new(false),
            finished: AtomicBool::new(false),
            frame: Mutex::new(None),
        });
        let driver = Arc::new(Driver {
            shared: Arc::clone(&shared),
            step: Mutex::new(step),
        });
        driver.schedule();
        AnimationHandle { shared }
    }

    fn schedule(self: Arc<Self>) {
        if self.is_cancelled() {
            return;
        }
        let shared = Arc::clone(&self.shared);
        let id = shared.clock.request_frame(Box::new(move |ts| self.frame(ts)));
        *shared.frame.lock() = Some(id);
        if shared.cancelled.load(Ordering::SeqCst) {
            shared.clock.cancel_frame(id);
        }
    }

    fn frame(self: Arc<Self>, ts: f64) {
        self.shared.frame.lock().take();
        if self.is_cancelled() {
            return;
        }
        let again = {
            let mut step = self.step.lock();
            (*step)(ts)
        };
        if again {
            self.schedule();
        } else {
            self.shared.finished.store(true, Ordering::SeqCst);
        }
    }

    fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::SeqCst)
    }
}

/// Animate a click press-and-release.
///
/// `on_scale` receives the cursor scale every frame; at completion it gets
/// exactly 1 and `on_complete` fires.
pub fn animate_click<S, C>(
    clock: Arc<dyn FrameClock>,
    timing: ClickTiming,
    mut on_scale: S,
    mut on_complete: C,
) -> AnimationHandle
where
    S: FnMut(f64) + Send + 'static,
    C: FnMut() + Send + 'static,
{
    let start = clock.now();
    let step: Step = Box::new(move |ts| {
        let p = progress(start, ts, timing.duration_ms);
        on_scale(click_scale(p, timing.min_scale));

        if p >= 1.0 {
            on_scale(1.0);
            on_complete();
            return false;
        }
        if timing.repeat_midpoint_callback && MIDPOINT_WINDOW.contains(&p) {
            on_complete();
        }
        true
    });
    Driver::start(clock, step)
}

/// Animate the cursor from `from` to `to` along a straight line.
///
/// `on_progress` and `on_position` fire every frame; at completion progress
/// is reported as exactly 1 and `on_complete` fires once.
pub fn animate_drag<P, M, C>(
    clock: Arc<dyn FrameClock>,
    timing: DragTiming,
    from: Position,
    to: Position,
    mut on_progress: P,
    mut on_position: M,
    on_complete: C,
) -> AnimationHandle
where
    P: FnMut(f64) + Send + 'static,
    M: FnMut(Position) + Send + 'static,
    C: FnOnce() + Send + 'static,
{
    let start = clock.now();
    let mut on_complete = Some(on_complete);
    let step: Step = Box::new(move |ts| {
        let p = progress(start, ts, timing.duration_ms);
        on_progress(p);
        on_position(from.lerp(to, p));

        if p >= 1.0 {
            on_progress(1.0);
            if let Some(done) = on_complete.take() {
                done();
            }
            return false;
        }
        true
    });
    Driver::start(clock, step)
}

/// Fire `on_complete` on the first frame at least `duration_ms` after now.
pub fn animate_delay<C>(clock: Arc<dyn FrameClock>, duration_ms: f64, on_complete: C) -> AnimationHandle
where
    C: FnOnce() + Send + 'static,
{
    let start = clock.now();
    let mut on_complete = Some(on_complete);
    let step: Step = Box::new(move |ts| {
        if ts - start < duration_ms {
            return true;
        }
        if let Some(done) = on_complete.take() {
            done();
        }
        false
    });
    Driver::start(clock, step)
}
