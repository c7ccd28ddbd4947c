// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Simulated cursor driven by recorded actions
//!
//! The animator owns only interpolation state. Presentations read it through
//! [`CursorAnimator::state`] or follow it with [`CursorAnimator::subscribe`].

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::watch;
use tr_domain_types::{Action, Position};

use crate::animation::{self, AnimationHandle, ClickTiming, DragTiming};
use crate::clock::FrameClock;
use crate::config::CursorConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorState {
    pub position: Position,
    pub scale: f64,
    pub is_dragging: bool,
    pub drag_start: Position,
    pub drag_end: Position,
    pub drag_progress: f64,
    pub is_click_animating: bool,
    pub is_moving_cursor: bool,
}

impl Default for CursorState {
    fn default() -> Self {
        Self {
            position: Position::ORIGIN,
            scale: 1.0,
            is_dragging: false,
            drag_start: Position::ORIGIN,
            drag_end: Position::ORIGIN,
            drag_progress: 0.0,
            is_click_animating: false,
            is_moving_cursor: false,
        }
    }
}

/// In-flight animations; at most one of each kind.
#[derive(Debug, Default)]
struct Animations {
    click: Option<AnimationHandle>,
    drag: Option<AnimationHandle>,
    move_indicator: Option<AnimationHandle>,
}

struct Inner {
    clock: Arc<dyn FrameClock>,
    click_timing: ClickTiming,
    drag_timing: DragTiming,
    move_indicator_ms: f64,
    state: watch::Sender<CursorState>,
    animations: Mutex<Animations>,
}

impl Inner {
    fn update(&self, f: impl FnOnce(&mut CursorState)) {
        self.state.send_modify(f);
    }
}

/// Cheap-to-clone handle to one simulated cursor.
#[derive(Clone)]
pub struct CursorAnimator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for CursorAnimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CursorAnimator").field("state", &self.state()).finish_non_exhaustive()
    }
}

impl CursorAnimator {
    pub fn new(clock: Arc<dyn FrameClock>, config: &CursorConfig) -> Self {
        let (state, _) = watch::channel(CursorState::default());
        Self {
            inner: Arc::new(Inner {
                clock,
                click_timing: config.click_timing(),
                drag_timing: config.drag_timing(),
                move_indicator_ms: config.move_indicator_ms as f64,
                state,
                animations: Mutex::new(Animations::default()),
            }),
        }
    }

    pub fn state(&self) -> CursorState {
        *self.inner.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<CursorState> {
        self.inner.state.subscribe()
    }

    /// Apply `f` to the state if the animator is still alive.
    fn updater(&self) -> impl Fn(&dyn Fn(&mut CursorState)) + Send + 'static {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        move |f: &dyn Fn(&mut CursorState)| {
            if let Some(inner) = weak.upgrade() {
                inner.update(|state| f(state));
            }
        }
    }

    /// Jump to `(x, y)`; `is_moving_cursor` stays set for a short while.
    pub fn move_to(&self, x: f64, y: f64) {
        self.inner.update(|state| {
            state.position = Position(x, y);
            state.is_moving_cursor = true;
        });

        let update = self.updater();
        let handle = animation::animate_delay(
            Arc::clone(&self.inner.clock),
            self.inner.move_indicator_ms,
            move || update(&|state| state.is_moving_cursor = false),
        );
        self.inner.animations.lock().move_indicator = Some(handle);
    }

    /// Move to `(x, y)` and play the click animation, replacing any click in
    /// progress.
    pub fn click(&self, x: f64, y: f64) {
        self.inner.update(|state| {
            state.position = Position(x, y);
            state.is_click_animating = true;
        });

        let previous = self.inner.animations.lock().click.take();
        drop(previous);

        let on_scale = self.updater();
        let on_complete = self.updater();
        let handle = animation::animate_click(
            Arc::clone(&self.inner.clock),
            self.inner.click_timing,
            move |scale| on_scale(&|state| state.scale = scale),
            move || on_complete(&|state| state.is_click_animating = false),
        );
        self.inner.animations.lock().click = Some(handle);
    }

    pub fn start_drag(&self, x: f64, y: f64) {
        self.inner.update(|state| {
            state.position = Position(x, y);
            state.drag_start = Position(x, y);
            state.is_dragging = true;
            state.drag_progress = 0.0;
        });
    }

    /// Place the cursor `progress` of the way from the drag start to `(x, y)`.
    pub fn update_drag(&self, x: f64, y: f64, progress: f64) {
        let progress = if progress.is_nan() { 0.0 } else { progress.clamp(0.0, 1.0) };
        self.inner.update(|state| {
            state.drag_end = Position(x, y);
            state.drag_progress = progress;
            state.position = state.drag_start.lerp(state.drag_end, progress);
        });
    }

    /// Animate from the drag start to `(x, y)`, ending the drag when done.
    pub fn animate_drag(&self, x: f64, y: f64) {
        let from = {
            let mut from = Position::ORIGIN;
            self.inner.update(|state| {
                state.drag_end = Position(x, y);
                state.is_dragging = true;
                from = state.drag_start;
            });
            from
        };

        let previous = self.inner.animations.lock().drag.take();
        drop(previous);

        let on_progress = self.updater();
        let on_position = self.updater();
        let weak = Arc::downgrade(&self.inner);
        let handle = animation::animate_drag(
            Arc::clone(&self.inner.clock),
            self.inner.drag_timing,
            from,
            Position(x, y),
            move |progress| on_progress(&|state| state.drag_progress = progress),
            move |position| on_position(&|state| state.position = position),
            move || {
                if let Some(inner) = weak.upgrade() {
                    CursorAnimator { inner }.end_drag();
                }
            },
        );
        self.inner.animations.lock().drag = Some(handle);
    }

    pub fn end_drag(&self) {
        self.inner.update(|state| {
            state.is_dragging = false;
            state.drag_progress = 0.0;
        });
        let previous = self.inner.animations.lock().drag.take();
        drop(previous);
    }

    /// Visualize a turn's actions. Only clicks and drags move the cursor.
    pub fn process_actions(&self, actions: &[Action]) {
        for action in actions {
            match action {
                Action::Click { position, .. } => {
                    tracing::debug!(x = position.x(), y = position.y(), "cursor click");
                    self.click(position.x(), position.y());
                }
                Action::Drag { from, to, .. } => {
                    tracing::debug!(
                        from_x = from.x(),
                        from_y = from.y(),
                        to_x = to.x(),
                        to_y = to.y(),
                        "cursor drag"
                    );
                    self.start_drag(from.x(), from.y());
                    self.animate_drag(to.x(), to.y());
                }
                Action::Type { .. } | Action::Scroll { .. } | Action::Key { .. } => {}
            }
        }
    }

    pub fn set_scale(&self, scale: f64) {
        self.inner.update(|state| state.scale = scale);
    }

    /// Cancel every animation and restore the initial state.
    pub fn reset(&self) {
        let animations = std::mem::take(&mut *self.inner.animations.lock());
        drop(animations);
        self.inner.update(|state| *state = CursorState::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualFrameClock;
    use pretty_assertions::assert_eq;

    fn animator() -> (ManualFrameClock, CursorAnimator) {
        let clock = ManualFrameClock::new();
        let cursor = CursorAnimator::new(Arc::new(clock.clone()), &CursorConfig::default());
        (clock, cursor)
    }

    #[test]
    fn move_to_flags_movement_briefly() {
        let (clock, cursor) = animator();
        cursor.move_to(3.0, 4.0);
        assert_eq!(cursor.state().position, Position(3.0, 4.0));
        assert!(cursor.state().is_moving_cursor);

        clock.advance(50.0);
        assert!(cursor.state().is_moving_cursor);
        clock.advance(50.0);
        assert!(!cursor.state().is_moving_cursor);
    }

    #[test]
    fn click_animates_scale_and_clears_flag() {
        let (clock, cursor) = animator();
        cursor.click(10.0, 20.0);
        let state = cursor.state();
        assert_eq!(state.position, Position(10.0, 20.0));
        assert!(state.is_click_animating);

        clock.advance(90.0);
        assert_eq!(cursor.state().scale, 0.5);

        clock.run_until_idle(16.0, 100);
        let state = cursor.state();
        assert_eq!(state.scale, 1.0);
        assert!(!state.is_click_animating);
    }

    #[test]
    fn new_click_replaces_the_old_one() {
        let (clock, cursor) = animator();
        cursor.click(1.0, 1.0);
        clock.advance(16.0);
        cursor.click(2.0, 2.0);
        assert_eq!(clock.pending_frames(), 1);
        clock.run_until_idle(16.0, 100);
        assert_eq!(cursor.state().position, Position(2.0, 2.0));
    }

    #[test]
    fn update_drag_clamps_progress() {
        let (_clock, cursor) = animator();
        cursor.start_drag(0.0, 0.0);
        cursor.update_drag(10.0, 20.0, 0.5);
        assert_eq!(cursor.state().position, Position(5.0, 10.0));
        cursor.update_drag(10.0, 20.0, 7.0);
        assert_eq!(cursor.state().drag_progress, 1.0);
        assert_eq!(cursor.state().position, Position(10.0, 20.0));
        cursor.update_drag(10.0, 20.0, -1.0);
        assert_eq!(cursor.state().position, Position(0.0, 0.0));
    }

    #[test]
    fn drag_action_animates_then_ends_drag() {
        let (clock, cursor) = animator();
        cursor.process_actions(&[Action::Drag {
            from: Position(0.0, 0.0),
            to: Position(10.0, 20.0),
            timestamp: None,
        }]);
        assert!(cursor.state().is_dragging);

        clock.advance(250.0);
        let state = cursor.state();
        assert_eq!(state.position, Position(5.0, 10.0));
        assert_eq!(state.drag_progress, 0.5);

        clock.advance(250.0);
        let state = cursor.state();
        assert_eq!(state.position, Position(10.0, 20.0));
        assert!(!state.is_dragging);
        assert_eq!(state.drag_progress, 0.0);
        assert_eq!(state.drag_end, Position(10.0, 20.0));
    }

    #[test]
    fn non_pointer_actions_leave_cursor_alone() {
        let (clock, cursor) = animator();
        cursor.process_actions(&[
            Action::Type {
                text: "hi".into(),
                timestamp: None,
            },
            Action::Key {
                key: "Enter".into(),
                modifiers: None,
                timestamp: None,
            },
        ]);
        assert_eq!(cursor.state(), CursorState::default());
        assert_eq!(clock.pending_frames(), 0);
    }

    #[test]
    fn reset_cancels_animations() {
        let (clock, cursor) = animator();
        cursor.click(5.0, 5.0);
        cursor.process_actions(&[Action::Drag {
            from: Position(1.0, 1.0),
            to: Position(2.0, 2.0),
            timestamp: None,
        }]);
        cursor.reset();
        assert_eq!(clock.pending_frames(), 0);
        clock.advance(1000.0);
        assert_eq!(cursor.state(), CursorState::default());
    }

    #[test]
    fn subscribers_see_updates() {
        let (_clock, cursor) = animator();
        let mut rx = cursor.subscribe();
        cursor.set_scale(0.8);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().scale, 0.8);
    }
}
