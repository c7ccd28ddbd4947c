// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Playback engine for recorded agent trajectories
//!
//! [`TurnStore`] holds the loaded turns, [`Player`] walks them on a timer and
//! [`CursorAnimator`] turns each turn's pointer actions into cursor motion
//! on a [`FrameClock`].

pub mod animation;
pub mod clock;
pub mod config;
pub mod cursor;
pub mod player;
pub mod store;

pub use animation::{AnimationHandle, ClickTiming, DragTiming};
pub use clock::{FrameClock, ManualFrameClock, TokioFrameClock};
pub use config::{ConfigError, CursorConfig, PlaybackConfig, ReplayerConfig, StreamingConfig};
pub use cursor::{CursorAnimator, CursorState};
pub use player::{PlaybackState, Player};
pub use store::{LoadStatus, LoadSummary, TurnStore};
