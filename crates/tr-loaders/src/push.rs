// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Push loader for live agent sessions
//!
//! The session owner keeps a [`PushHandle`] and appends turns as the agent
//! produces them; the replayer consumes the matching [`PushSource`] as an
//! ordinary [`TurnStream`].

use futures::StreamExt;
use tokio::sync::mpsc;
use tr_domain_types::{Turn, TurnsMetadata};

use crate::source::TurnStream;

#[derive(Debug)]
enum PushMessage {
    Turn(Box<Turn>),
    Complete,
}

/// Producer side of a live session. Cheap to clone.
#[derive(Debug, Clone)]
pub struct PushHandle {
    tx: mpsc::UnboundedSender<PushMessage>,
}

impl PushHandle {
    /// Append a turn. Returns `false` once the consumer is gone.
    pub fn add_turn(&self, turn: Turn) -> bool {
        self.tx.send(PushMessage::Turn(Box::new(turn))).is_ok()
    }

    /// Mark the session finished; turns added afterwards are ignored.
    pub fn complete(&self) {
        let _ = self.tx.send(PushMessage::Complete);
    }
}

/// Consumer side of a live session.
#[derive(Debug)]
pub struct PushSource {
    initial: Vec<Turn>,
    rx: mpsc::UnboundedReceiver<PushMessage>,
}

impl PushSource {
    pub fn new(initial: Vec<Turn>) -> (Self, PushHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { initial, rx }, PushHandle { tx })
    }

    /// Initial turns first, then pushed turns in arrival order, until
    /// [`PushHandle::complete`] is called or every handle is dropped.
    pub fn into_stream(self) -> TurnStream {
        let metadata = TurnsMetadata {
            total_count: Some(self.initial.len()),
            done: false,
            estimated: Some(true),
        };
        let Self { initial, mut rx } = self;
        let turns = async_stream::stream! {
            for turn in initial {
                yield Ok(turn);
            }
            while let Some(message) = rx.recv().await {
                match message {
                    PushMessage::Turn(turn) => yield Ok(*turn),
                    PushMessage::Complete => break,
                }
            }
            tracing::debug!("push session finished");
        };
        TurnStream::new(turns.boxed(), metadata)
    }
}
