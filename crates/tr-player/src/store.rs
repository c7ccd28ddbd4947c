// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Turn sequence store
//!
//! Holds the turns of the current trajectory together with completion
//! metadata and the status of the load that fills it. Handles are cheap to
//! clone and all share the same state; every mutation bumps a version that
//! [`TurnStore::subscribe`] receivers observe.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use parking_lot::RwLock;
use tokio::sync::watch;
use tr_domain_types::{Screenshot, Turn, TurnsMetadata, TurnsMetadataUpdate};
use tr_loaders::{LoadError, TurnStream};

/// Progress of the most recent load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadStatus {
    pub loading: bool,
    /// Turns received so far.
    pub progress: usize,
    pub message: String,
    pub error: Option<String>,
}

/// Outcome of [`TurnStore::load_from_stream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    /// Turns this load added to the store.
    pub turns: usize,
    /// A newer load started before this one finished; it stopped early
    /// without touching the store again.
    pub superseded: bool,
}

enum LoadStep {
    Continue,
    Superseded,
    Failed(LoadError),
}

#[derive(Debug, Default)]
struct Inner {
    turns: Vec<Turn>,
    metadata: TurnsMetadata,
    status: LoadStatus,
}

#[derive(Debug, Clone)]
pub struct TurnStore {
    inner: Arc<RwLock<Inner>>,
    generation: Arc<AtomicU64>,
    version: Arc<watch::Sender<u64>>,
}

impl Default for TurnStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnStore {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
            generation: Arc::new(AtomicU64::new(0)),
            version: Arc::new(version),
        }
    }

    /// Receiver whose value changes on every mutation.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let result = f(&mut self.inner.write());
        self.notify();
        result
    }

    fn notify(&self) {
        self.version.send_modify(|version| *version = version.wrapping_add(1));
    }

    /// Replace all turns at once. Metadata defaults to a finished sequence.
    pub fn set(&self, turns: Vec<Turn>, metadata: Option<TurnsMetadata>) {
        self.mutate(|inner| {
            inner.turns = turns;
            inner.metadata = metadata.unwrap_or_default();
        });
    }

    pub fn add(&self, turn: Turn) {
        self.mutate(|inner| inner.turns.push(turn));
    }

    pub fn add_many(&self, turns: impl IntoIterator<Item = Turn>) {
        self.mutate(|inner| inner.turns.extend(turns));
    }

    pub fn update_metadata(&self, update: TurnsMetadataUpdate) {
        self.mutate(|inner| inner.metadata.merge(update));
    }

    pub fn get(&self, index: usize) -> Option<Turn> {
        self.inner.read().turns.get(index).cloned()
    }

    /// Snapshot of every turn.
    pub fn turns(&self) -> Vec<Turn> {
        self.inner.read().turns.clone()
    }

    pub fn metadata(&self) -> TurnsMetadata {
        self.inner.read().metadata.clone()
    }

    pub fn clear(&self) {
        self.mutate(|inner| {
            inner.turns.clear();
            inner.metadata = TurnsMetadata::default();
        });
    }

    pub fn find_by_name(&self, id: &str) -> Option<Turn> {
        self.inner.read().turns.iter().find(|turn| turn.id == id).cloned()
    }

    /// Nearest screenshot strictly before `index`.
    pub fn previous_screenshot(&self, index: usize) -> Option<Screenshot> {
        let inner = self.inner.read();
        let end = index.min(inner.turns.len());
        inner.turns[..end].iter().rev().find_map(|turn| turn.screenshot.clone())
    }

    pub fn total(&self) -> usize {
        self.inner.read().turns.len()
    }

    /// Expected total: the producer's count if it announced one.
    pub fn total_count(&self) -> usize {
        let inner = self.inner.read();
        inner.metadata.total_count.unwrap_or(inner.turns.len())
    }

    pub fn is_complete(&self) -> bool {
        self.inner.read().metadata.done
    }

    pub fn load_status(&self) -> LoadStatus {
        self.inner.read().status.clone()
    }

    /// Forget the outcome of the previous load.
    pub fn reset_status(&self) {
        self.mutate(|inner| inner.status = LoadStatus::default());
    }

    /// Clear the store and fill it from `stream`.
    ///
    /// The sequence is marked done only when the stream ends normally. On an
    /// error the turns received so far stay in place, the error is recorded
    /// in [`LoadStatus`] and returned. Starting another load supersedes this
    /// one: it stops at its next item and reports `superseded`.
    pub async fn load_from_stream(&self, stream: TurnStream) -> Result<LoadSummary, LoadError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let TurnStream { mut turns, metadata } = stream;
        self.mutate(|inner| {
            inner.turns.clear();
            inner.metadata = metadata;
            inner.status = LoadStatus {
                loading: true,
                progress: 0,
                message: "Loading...".to_string(),
                error: None,
            };
        });
        tracing::info!(generation, "load started");

        let mut loaded = 0;
        while let Some(item) = turns.next().await {
            match self.record_item(generation, item, &mut loaded) {
                LoadStep::Continue => self.notify(),
                LoadStep::Superseded => {
                    tracing::debug!(generation, "load superseded");
                    return Ok(LoadSummary {
                        turns: loaded,
                        superseded: true,
                    });
                }
                LoadStep::Failed(err) => {
                    self.notify();
                    tracing::error!(generation, error = %err, loaded, "load failed");
                    return Err(err);
                }
            }
        }

        let finished = self.mutate(|inner| {
            if !self.is_current(generation) {
                return false;
            }
            inner.metadata.done = true;
            inner.status.loading = false;
            inner.status.message.clear();
            true
        });
        if finished {
            tracing::info!(generation, turns = loaded, "load finished");
        }

        Ok(LoadSummary {
            turns: loaded,
            superseded: !finished,
        })
    }

    /// Apply one streamed item under the write lock.
    fn record_item(
        &self,
        generation: u64,
        item: Result<Turn, LoadError>,
        loaded: &mut usize,
    ) -> LoadStep {
        let mut inner = self.inner.write();
        if !self.is_current(generation) {
            return LoadStep::Superseded;
        }
        match item {
            Ok(turn) => {
                inner.turns.push(turn);
                *loaded += 1;
                inner.status.progress = *loaded;
                inner.status.message = format!("Loaded {loaded} turns...");
                LoadStep::Continue
            }
            Err(err) => {
                inner.status.loading = false;
                inner.status.message.clear();
                inner.status.error = Some(err.to_string());
                LoadStep::Failed(err)
            }
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn turn(id: &str, index: u64) -> Turn {
        Turn::new(id, index)
    }

    #[test]
    fn set_defaults_metadata_to_done() {
        let store = TurnStore::new();
        store.set(vec![turn("a", 0), turn("b", 1)], None);
        assert_eq!(store.total(), 2);
        assert_eq!(store.total_count(), 2);
        assert!(store.is_complete());
        assert_eq!(store.get(1).map(|t| t.id), Some("b".to_string()));
        assert_eq!(store.get(2), None);
    }

    #[test]
    fn total_count_prefers_announced_count() {
        let store = TurnStore::new();
        store.set(
            vec![turn("a", 0)],
            Some(TurnsMetadata {
                total_count: Some(10),
                done: false,
                estimated: Some(true),
            }),
        );
        assert_eq!(store.total_count(), 10);
        assert!(!store.is_complete());

        store.update_metadata(TurnsMetadataUpdate::done(true));
        assert!(store.is_complete());
        assert_eq!(store.metadata().total_count, Some(10));
    }

    #[test]
    fn previous_screenshot_scans_backwards() {
        let store = TurnStore::new();
        store.set(
            vec![
                turn("a", 0).with_screenshot(Screenshot::uri("a.png")),
                turn("b", 1),
                turn("c", 2),
            ],
            None,
        );
        assert_eq!(store.previous_screenshot(2), Some(Screenshot::uri("a.png")));
        assert_eq!(store.previous_screenshot(0), None);
        assert_eq!(store.previous_screenshot(99), Some(Screenshot::uri("a.png")));
    }

    #[test]
    fn find_by_name_returns_first_match() {
        let store = TurnStore::new();
        store.add_many([turn("x", 0).with_thought("first"), turn("x", 1).with_thought("second")]);
        assert_eq!(
            store.find_by_name("x").and_then(|t| t.thought),
            Some("first".to_string())
        );
        assert_eq!(store.find_by_name("y"), None);
    }

    #[test]
    fn clear_restores_default_metadata() {
        let store = TurnStore::new();
        store.set(vec![turn("a", 0)], Some(TurnsMetadata::open()));
        store.clear();
        assert_eq!(store.total(), 0);
        assert_eq!(store.metadata(), TurnsMetadata::default());
    }

    #[test]
    fn mutations_bump_the_version() {
        let store = TurnStore::new();
        let mut rx = store.subscribe();
        assert!(!rx.has_changed().unwrap());
        store.add(turn("a", 0));
        assert!(rx.has_changed().unwrap());
        let first = *rx.borrow_and_update();
        store.clear();
        assert_ne!(*rx.borrow_and_update(), first);
    }
}
