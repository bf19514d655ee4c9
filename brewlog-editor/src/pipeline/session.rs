//! Shared state of one editing session
//!
//! The composition store, dirty tracker and metrics live behind one lock so
//! a mutation, its dirty re-evaluation and its sequence number are observed
//! together. The lock is never held across an await.
//!
//! Every applied mutation bumps `seq` and publishes it on the recompute
//! request channel. The recompute loop publishes each settled outcome on the
//! settled channel; callers wait there for `settled.seq >= their seq`.

use super::status::StatusTracker;
use crate::catalog::IngredientCatalog;
use crate::collaborators::Calculator;
use crate::composition::{CompositionStore, DirtyTracker, Snapshot};
use crate::error::{EditorError, Result};
use brewlog_common::events::{EditorEvent, EventBus};
use brewlog_common::models::{IngredientAddition, Metrics, Recipe};
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub(crate) struct SessionState {
    pub(crate) store: CompositionStore,
    pub(crate) tracker: DirtyTracker,
    /// Sequence number of the last applied mutation (0 = initial composition)
    pub(crate) seq: u64,
    pub(crate) metrics: Option<Metrics>,
    /// Sequence number `metrics` was computed against
    pub(crate) metrics_seq: Option<u64>,
    pub(crate) metrics_error: Option<EditorError>,
    pub(crate) has_unsaved_changes: bool,
}

impl SessionState {
    pub(crate) fn new(store: CompositionStore, tracker: DirtyTracker) -> Self {
        let has_unsaved_changes = tracker.is_dirty(&store);
        Self {
            store,
            tracker,
            seq: 0,
            metrics: None,
            metrics_seq: None,
            metrics_error: None,
            has_unsaved_changes,
        }
    }
}

/// Outcome of one recompute that was applied to the session
#[derive(Debug, Clone)]
pub(crate) struct Settled {
    pub(crate) seq: u64,
    pub(crate) result: Result<Metrics>,
}

/// Composition captured for a recompute or a save
pub(crate) struct Captured {
    pub(crate) seq: u64,
    pub(crate) recipe: Recipe,
    pub(crate) ingredients: Vec<IngredientAddition>,
    pub(crate) snapshot: Snapshot,
}

pub(crate) struct Session {
    state: Mutex<SessionState>,
    pub(crate) catalog: Arc<IngredientCatalog>,
    pub(crate) calculator: Arc<dyn Calculator>,
    pub(crate) event_bus: EventBus,
    pub(crate) status: Arc<StatusTracker>,
    recompute_tx: watch::Sender<u64>,
    settled_tx: watch::Sender<Option<Settled>>,
    pub(crate) shutdown: CancellationToken,
}

impl Session {
    pub(crate) fn new(
        state: SessionState,
        catalog: Arc<IngredientCatalog>,
        calculator: Arc<dyn Calculator>,
        event_bus: EventBus,
    ) -> Self {
        let (recompute_tx, _) = watch::channel(state.seq);
        let (settled_tx, _) = watch::channel(None);
        Self {
            state: Mutex::new(state),
            catalog,
            calculator,
            status: Arc::new(StatusTracker::new(event_bus.clone())),
            event_bus,
            recompute_tx,
            settled_tx,
            shutdown: CancellationToken::new(),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Apply one store mutation as a single step
    ///
    /// On success the sequence number advances, dirty state is re-evaluated,
    /// observers are notified and a recompute is requested. On failure
    /// nothing changes and no recompute is requested.
    pub(crate) fn commit<T>(
        &self,
        mutate: impl FnOnce(&mut CompositionStore) -> Result<T>,
    ) -> Result<(u64, T)> {
        if self.is_closed() {
            return Err(EditorError::SessionClosed);
        }
        let mut guard = self.lock();
        let state = &mut *guard;
        let value = mutate(&mut state.store)?;
        state.seq += 1;
        state.has_unsaved_changes = state.tracker.is_dirty(&state.store);
        let seq = state.seq;
        debug!(seq, dirty = state.has_unsaved_changes, "Composition mutated");

        self.event_bus.emit_lossy(EditorEvent::CompositionChanged {
            seq,
            has_unsaved_changes: state.has_unsaved_changes,
            timestamp: Utc::now(),
        });
        self.recompute_tx.send_replace(seq);
        Ok((seq, value))
    }

    pub(crate) fn capture(&self) -> Result<Captured> {
        if self.is_closed() {
            return Err(EditorError::SessionClosed);
        }
        let state = self.lock();
        Ok(Captured {
            seq: state.seq,
            recipe: state.store.recipe().clone(),
            ingredients: state.store.ingredients().to_vec(),
            snapshot: Snapshot::capture(&state.store),
        })
    }

    /// Apply a recompute result if it still matches the latest composition
    ///
    /// Returns false (and changes nothing) when a later mutation has
    /// superseded the composition the result was computed against.
    pub(crate) fn apply_metrics(&self, seq: u64, result: Result<Metrics>) -> bool {
        if self.is_closed() {
            return false;
        }
        let mut state = self.lock();
        if state.seq != seq {
            return false;
        }
        match &result {
            Ok(metrics) => {
                state.metrics = Some(*metrics);
                state.metrics_seq = Some(seq);
                state.metrics_error = None;
                self.event_bus.emit_lossy(EditorEvent::MetricsUpdated {
                    seq,
                    metrics: *metrics,
                    timestamp: Utc::now(),
                });
            }
            Err(e) => {
                warn!(
                    seq,
                    retryable = e.is_transient(),
                    "Metrics recompute failed, keeping previous metrics: {}",
                    e
                );
                state.metrics_error = Some(e.clone());
                self.event_bus.emit_lossy(EditorEvent::MetricsUnavailable {
                    seq,
                    reason: e.to_string(),
                    timestamp: Utc::now(),
                });
            }
        }
        self.settled_tx.send_replace(Some(Settled { seq, result }));
        true
    }

    /// Subscribe to recompute requests (latest mutation sequence number)
    pub(crate) fn recompute_requests(&self) -> watch::Receiver<u64> {
        self.recompute_tx.subscribe()
    }

    /// Wait until a recompute at or after `seq` has settled
    pub(crate) async fn await_settled(&self, seq: u64) -> Result<Metrics> {
        let mut settled = self.settled_tx.subscribe();
        let wait = async {
            settled
                .wait_for(|outcome| outcome.as_ref().is_some_and(|s| s.seq >= seq))
                .await
                .map(|outcome| (*outcome).as_ref().map(|s| s.result.clone()))
        };
        tokio::select! {
            _ = self.shutdown.cancelled() => Err(EditorError::SessionClosed),
            waited = wait => match waited {
                Ok(Some(result)) => result,
                _ => Err(EditorError::SessionClosed),
            },
        }
    }

    /// Record a successful persistence round-trip
    ///
    /// `saved` is the snapshot that was sent; edits made while the save was
    /// in flight keep the session dirty.
    pub(crate) fn mark_saved(&self, persisted: &Recipe, saved: Snapshot) {
        let mut guard = self.lock();
        let state = &mut *guard;
        state.store.adopt_persisted_identity(persisted);
        state.tracker.mark_persisted(saved);
        state.has_unsaved_changes = state.tracker.is_dirty(&state.store);
    }
}
