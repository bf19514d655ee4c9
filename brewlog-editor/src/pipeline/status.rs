//! In-flight status flags
//!
//! Each flag is backed by a counter so overlapping operations of the same
//! kind keep it raised until the last one finishes. Flags are lowered by
//! dropping the [`ActivityGuard`], which also covers early returns via `?`.

use brewlog_common::events::{EditorEvent, EditorStatus, EventBus};
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Activity {
    AddingIngredient,
    UpdatingIngredient,
    Importing,
    CalculatingMetrics,
    Saving,
}

impl Activity {
    fn slot(self) -> usize {
        match self {
            Activity::AddingIngredient => 0,
            Activity::UpdatingIngredient => 1,
            Activity::Importing => 2,
            Activity::CalculatingMetrics => 3,
            Activity::Saving => 4,
        }
    }
}

pub(crate) struct StatusTracker {
    counters: [AtomicUsize; 5],
    event_bus: EventBus,
}

impl StatusTracker {
    pub(crate) fn new(event_bus: EventBus) -> Self {
        Self {
            counters: Default::default(),
            event_bus,
        }
    }

    /// Raise the flag for `activity` until the returned guard is dropped
    pub(crate) fn begin(self: &Arc<Self>, activity: Activity) -> ActivityGuard {
        if self.counters[activity.slot()].fetch_add(1, Ordering::SeqCst) == 0 {
            self.publish();
        }
        ActivityGuard {
            tracker: Arc::clone(self),
            activity,
        }
    }

    pub(crate) fn snapshot(&self) -> EditorStatus {
        let active = |activity: Activity| self.counters[activity.slot()].load(Ordering::SeqCst) > 0;
        EditorStatus {
            adding_ingredient: active(Activity::AddingIngredient),
            updating_ingredient: active(Activity::UpdatingIngredient),
            importing: active(Activity::Importing),
            calculating_metrics: active(Activity::CalculatingMetrics),
            saving: active(Activity::Saving),
        }
    }

    fn publish(&self) {
        self.event_bus.emit_lossy(EditorEvent::StatusChanged {
            status: self.snapshot(),
            timestamp: Utc::now(),
        });
    }
}

/// Keeps one activity flagged while alive
pub(crate) struct ActivityGuard {
    tracker: Arc<StatusTracker>,
    activity: Activity,
}

impl Drop for ActivityGuard {
    fn drop(&mut self) {
        if self.tracker.counters[self.activity.slot()].fetch_sub(1, Ordering::SeqCst) == 1 {
            self.tracker.publish();
        }
    }
}
