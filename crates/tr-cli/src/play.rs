// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Headless playback
//!
//! Loads the source into a [`TurnStore`] in the background, plays it with a
//! [`Player`] and feeds each shown turn's actions to a [`CursorAnimator`].
//! Turns and cursor changes are reported through `tracing`.

use anyhow::{Context, Result};
use clap::Args;
use std::sync::Arc;
use std::time::Duration;
use tr_player::{
    CursorAnimator, CursorState, FrameClock, Player, ReplayerConfig, TokioFrameClock, TurnStore,
};

use crate::source::SourceArgs;

/// Play a trajectory back, logging each turn and cursor event
#[derive(Args, Debug, Clone)]
pub struct PlayArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Playback speed multiplier (clamped to the configured range)
    #[arg(long)]
    pub speed: Option<f64>,
}

impl PlayArgs {
    pub async fn run(self, config: &ReplayerConfig) -> Result<()> {
        let stream = self.source.open(&config.streaming).await?;

        let store = TurnStore::new();
        let mut loader = {
            let store = store.clone();
            tokio::spawn(async move { store.load_from_stream(stream).await })
        };

        let player = Player::new(store.clone(), config.playback.clone());
        if let Some(speed) = self.speed {
            player.set_speed(speed);
        }
        let clock: Arc<dyn FrameClock> =
            Arc::new(TokioFrameClock::current(config.cursor.frame_interval()));
        let cursor = CursorAnimator::new(clock, &config.cursor);

        let mut store_rx = store.subscribe();
        let mut player_rx = player.subscribe();
        let mut cursor_rx = cursor.subscribe();
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        let mut loaded = false;
        let mut shown: Option<usize> = None;

        loop {
            if let Some(index) = show_current(&player, &cursor, shown) {
                shown = Some(index);
            }

            if !player.is_playing() {
                if loaded && store.is_complete() && !player.has_next() {
                    break;
                }
                if player.has_next() {
                    player.play();
                }
            }

            tokio::select! {
                result = &mut loader, if !loaded => {
                    loaded = true;
                    let summary = result
                        .context("loader task failed")?
                        .with_context(|| format!("failed to load {}", self.source.source))?;
                    tracing::info!(turns = summary.turns, "source loaded");
                }
                Ok(()) = store_rx.changed() => {}
                Ok(()) = player_rx.changed() => {
                    let state = *player_rx.borrow_and_update();
                    tracing::debug!(index = state.index, playing = state.playing, speed = state.speed, "playback");
                }
                Ok(()) = cursor_rx.changed() => {
                    log_cursor(&cursor_rx.borrow_and_update());
                }
                _ = &mut ctrl_c => {
                    tracing::info!("interrupted");
                    player.pause();
                    cursor.reset();
                    return Ok(());
                }
            }
        }

        // Let the last turn's cursor animations play out.
        let settle = config.cursor.click_duration_ms.max(config.cursor.drag_duration_ms);
        tokio::time::sleep(Duration::from_millis(settle)).await;
        log_cursor(&cursor.state());
        tracing::info!(turns = store.total(), "playback finished");
        Ok(())
    }
}

/// Report the current turn and animate its actions if it has not been
/// shown yet. Returns the index when something was shown.
fn show_current(player: &Player, cursor: &CursorAnimator, shown: Option<usize>) -> Option<usize> {
    let index = player.index();
    if shown == Some(index) {
        return None;
    }
    let turn = player.current()?;
    tracing::info!(
        index,
        id = %turn.id,
        kind = ?turn.kind,
        actions = turn.actions.len(),
        thought = turn.thought.as_deref().unwrap_or(""),
        "turn"
    );
    for action in &turn.actions {
        tracing::info!(index, action = action.kind(), "action");
    }
    cursor.process_actions(&turn.actions);
    Some(index)
}

fn log_cursor(state: &CursorState) {
    tracing::debug!(
        x = state.position.x(),
        y = state.position.y(),
        scale = state.scale,
        dragging = state.is_dragging,
        clicking = state.is_click_animating,
        "cursor"
    );
}
