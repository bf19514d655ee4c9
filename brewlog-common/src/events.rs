//! Event types for the recipe editor
//!
//! Provides the editor event definitions and the EventBus the UI layer
//! subscribes to. Every composition change, metrics settlement, status flag
//! transition and save outcome is published here.

use crate::models::Metrics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// In-flight status flags of one editing session
///
/// A flag stays true while at least one operation of that kind is pending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorStatus {
    pub adding_ingredient: bool,
    pub updating_ingredient: bool,
    pub importing: bool,
    pub calculating_metrics: bool,
    pub saving: bool,
}

impl EditorStatus {
    /// True when nothing is in flight
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

/// Editor event types
///
/// Events are broadcast via EventBus and can be serialized for transmission
/// to a UI process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EditorEvent {
    /// A mutation was applied to the composition
    CompositionChanged {
        /// Mutation sequence number (monotonic per session)
        seq: u64,
        /// Dirty state after the mutation
        has_unsaved_changes: bool,
        timestamp: DateTime<Utc>,
    },

    /// A recompute settled against the latest composition
    MetricsUpdated {
        seq: u64,
        metrics: Metrics,
        timestamp: DateTime<Utc>,
    },

    /// A recompute failed; previously shown metrics remain in place
    MetricsUnavailable {
        seq: u64,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// One of the in-flight status flags flipped
    StatusChanged {
        status: EditorStatus,
        timestamp: DateTime<Utc>,
    },

    /// Composition persisted
    RecipeSaved {
        recipe_id: Uuid,
        version: u32,
        timestamp: DateTime<Utc>,
    },

    /// Persistence attempt failed; composition untouched
    SaveFailed {
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// Ingredient catalog cache was dropped and will be refetched
    CatalogInvalidated { timestamp: DateTime<Utc> },

    /// Editing session torn down
    SessionClosed { timestamp: DateTime<Utc> },
}

impl EditorEvent {
    /// Event type name as used in the serialized `type` tag
    pub fn event_type(&self) -> &'static str {
        match self {
            EditorEvent::CompositionChanged { .. } => "CompositionChanged",
            EditorEvent::MetricsUpdated { .. } => "MetricsUpdated",
            EditorEvent::MetricsUnavailable { .. } => "MetricsUnavailable",
            EditorEvent::StatusChanged { .. } => "StatusChanged",
            EditorEvent::RecipeSaved { .. } => "RecipeSaved",
            EditorEvent::SaveFailed { .. } => "SaveFailed",
            EditorEvent::CatalogInvalidated { .. } => "CatalogInvalidated",
            EditorEvent::SessionClosed { .. } => "SessionClosed",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus for one or more editing sessions
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block the editor)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use brewlog_common::events::{EditorEvent, EventBus};
///
/// let event_bus = EventBus::new(16);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(EditorEvent::CatalogInvalidated {
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(matches!(rx.try_recv(), Ok(EditorEvent::CatalogInvalidated { .. })));
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EditorEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<EditorEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: EditorEvent,
    ) -> Result<usize, broadcast::error::SendError<EditorEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: EditorEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
