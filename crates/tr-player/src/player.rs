// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Playback controller
//!
//! Walks a [`TurnStore`] one turn at a time, either by explicit navigation or
//! on a recurring timer whose period is the base interval divided by the
//! playback speed.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tr_domain_types::Turn;

use crate::config::PlaybackConfig;
use crate::store::TurnStore;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackState {
    pub index: usize,
    pub playing: bool,
    pub speed: f64,
    /// Whether the presentation should keep the current turn scrolled into
    /// view.
    pub scroll: bool,
}

/// The running timer, if any. Bumping `generation` invalidates every timer
/// started before.
#[derive(Debug, Default)]
struct TimerSlot {
    task: Option<JoinHandle<()>>,
    generation: u64,
}

impl TimerSlot {
    fn stop(&mut self) {
        self.generation += 1;
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct Inner {
    store: TurnStore,
    config: PlaybackConfig,
    runtime: Option<Handle>,
    state: watch::Sender<PlaybackState>,
    timer: Mutex<TimerSlot>,
}

impl Inner {
    fn state(&self) -> PlaybackState {
        *self.state.borrow()
    }

    fn has_next(&self) -> bool {
        self.state().index + 1 < self.store.total()
    }

    /// One timer tick. Returns `false` once the timer should stop.
    fn tick(&self, generation: u64) -> bool {
        let mut timer = self.timer.lock();
        if timer.generation != generation {
            return false;
        }
        if self.has_next() {
            self.state.send_modify(|state| state.index += 1);
            tracing::debug!(index = self.state().index, "playback advanced");
            true
        } else {
            // Our own task: detach instead of aborting mid-tick.
            timer.generation += 1;
            timer.task = None;
            self.state.send_modify(|state| state.playing = false);
            tracing::debug!("playback reached the last turn");
            false
        }
    }

    fn start_timer(self: &Arc<Self>, timer: &mut TimerSlot) {
        timer.stop();
        let Some(runtime) = self.runtime.as_ref() else {
            tracing::error!("playback timer needs a Tokio runtime");
            self.state.send_modify(|state| state.playing = false);
            return;
        };

        let generation = timer.generation;
        let period = self.config.base_interval().div_f64(self.state().speed);
        let inner: Weak<Inner> = Arc::downgrade(self);
        timer.task = Some(runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                if !inner.tick(generation) {
                    break;
                }
            }
        }));
        tracing::debug!(period_ms = period.as_millis() as u64, generation, "playback timer started");
    }
}

/// Controls playback over a shared [`TurnStore`]. Dropping the player stops
/// its timer.
pub struct Player {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player").field("state", &self.state()).finish_non_exhaustive()
    }
}

impl Player {
    /// A paused player at index 0. The playback timer runs on the runtime
    /// current at construction, if there is one.
    pub fn new(store: TurnStore, config: PlaybackConfig) -> Self {
        Self::with_runtime(store, config, Handle::try_current().ok())
    }

    pub fn with_runtime(store: TurnStore, config: PlaybackConfig, runtime: Option<Handle>) -> Self {
        let initial = PlaybackState {
            index: 0,
            playing: false,
            speed: config.clamp_speed(config.initial_speed),
            scroll: true,
        };
        let (state, _) = watch::channel(initial);
        Self {
            inner: Arc::new(Inner {
                store,
                config,
                runtime,
                state,
                timer: Mutex::new(TimerSlot::default()),
            }),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.inner.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.inner.state.subscribe()
    }

    pub fn store(&self) -> &TurnStore {
        &self.inner.store
    }

    pub fn index(&self) -> usize {
        self.state().index
    }

    pub fn is_playing(&self) -> bool {
        self.state().playing
    }

    pub fn speed(&self) -> f64 {
        self.state().speed
    }

    pub fn current(&self) -> Option<Turn> {
        self.inner.store.get(self.index())
    }

    pub fn has_next(&self) -> bool {
        self.inner.has_next()
    }

    pub fn has_prev(&self) -> bool {
        self.index() > 0
    }

    pub fn total(&self) -> usize {
        self.inner.store.total()
    }

    /// Current timer period.
    pub fn interval(&self) -> Duration {
        self.inner.config.base_interval().div_f64(self.speed())
    }

    fn set_index(&self, index: usize) {
        self.inner.state.send_if_modified(|state| {
            let changed = state.index != index;
            state.index = index;
            changed
        });
    }

    pub fn next(&self) {
        if self.has_next() {
            self.set_index(self.index() + 1);
        }
    }

    pub fn prev(&self) {
        if self.has_prev() {
            self.set_index(self.index() - 1);
        }
    }

    /// Jump to `index` if it names an existing turn.
    pub fn goto(&self, index: i64) {
        if let Ok(index) = usize::try_from(index) {
            if index < self.total() {
                self.set_index(index);
            }
        }
    }

    pub fn first(&self) {
        self.set_index(0);
    }

    pub fn last(&self) {
        self.set_index(self.total().saturating_sub(1));
    }

    pub fn play(&self) {
        let mut timer = self.inner.timer.lock();
        if self.is_playing() {
            return;
        }
        self.inner.state.send_modify(|state| state.playing = true);
        self.inner.start_timer(&mut timer);
    }

    pub fn pause(&self) {
        let mut timer = self.inner.timer.lock();
        timer.stop();
        self.inner.state.send_if_modified(|state| std::mem::replace(&mut state.playing, false));
    }

    /// Pause if playing; otherwise play, rewinding first when parked on the
    /// last turn.
    pub fn toggle(&self) {
        if self.is_playing() {
            self.pause();
            return;
        }
        if !self.has_next() && self.total() > 0 {
            self.set_index(0);
        }
        self.play();
    }

    /// Clamp and apply a new speed; a running timer restarts at the new
    /// period.
    pub fn set_speed(&self, speed: f64) {
        let speed = self.inner.config.clamp_speed(speed);
        let mut timer = self.inner.timer.lock();
        self.inner.state.send_modify(|state| state.speed = speed);
        if self.is_playing() {
            self.inner.start_timer(&mut timer);
        }
    }

    pub fn set_scroll(&self, scroll: bool) {
        self.inner.state.send_if_modified(|state| std::mem::replace(&mut state.scroll, scroll) != scroll);
    }

    pub fn reset(&self) {
        self.pause();
        self.inner.state.send_modify(|state| {
            state.index = 0;
            state.scroll = true;
        });
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.inner.timer.lock().stop();
    }
}
