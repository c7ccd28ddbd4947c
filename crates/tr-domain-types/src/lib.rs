// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Domain types for the trajectory replayer
//!
//! A recorded agent session is a sequence of [`Turn`]s. Every turn may carry a
//! screenshot, the agent's free-text reasoning and an ordered list of
//! [`Action`]s. These types are the canonical model every loader normalizes
//! into, and the only model the playback engine consumes.

pub mod action;
pub mod turn;

pub use action::*;
pub use turn::*;
