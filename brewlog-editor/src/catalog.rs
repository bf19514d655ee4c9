//! Ingredient catalog cache
//!
//! Read-through cache of the global ingredient catalog, shared by every
//! editing session in the process.
//!
//! **Single-flight:** fetches go through a FIFO lane. A caller that queued
//! behind a fetch which completed while it waited takes that fetch's outcome
//! (success or failure) instead of issuing its own request, as long as the
//! fetch started no earlier than the caller's last observed invalidation.
//!
//! **Invalidation:** `invalidate()` drops the cache and bumps a generation
//! counter. A fetch that started before the bump still answers its own
//! waiters but never repopulates the cache.

use crate::collaborators::CatalogSource;
use crate::error::{EditorError, Result};
use brewlog_common::models::{IngredientDefinition, IngredientId};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

static GLOBAL_CATALOG: OnceCell<Arc<IngredientCatalog>> = OnceCell::new();

/// Immutable, id-indexed view of one catalog fetch
///
/// Cheap to clone; all clones share the same entries.
#[derive(Debug, Clone)]
pub struct CatalogLookup {
    entries: Arc<[IngredientDefinition]>,
    index: Arc<HashMap<IngredientId, usize>>,
}

impl CatalogLookup {
    pub fn new(entries: Vec<IngredientDefinition>) -> Self {
        let index = entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (entry.id, position))
            .collect();
        Self {
            entries: entries.into(),
            index: Arc::new(index),
        }
    }

    pub fn get(&self, id: IngredientId) -> Option<&IngredientDefinition> {
        self.index.get(&id).map(|&position| &self.entries[position])
    }

    pub fn contains(&self, id: IngredientId) -> bool {
        self.index.contains_key(&id)
    }

    /// Entries in catalog order
    pub fn entries(&self) -> &[IngredientDefinition] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

struct FetchRecord {
    generation: u64,
    result: Result<CatalogLookup>,
}

#[derive(Default)]
struct CatalogState {
    cached: Option<CatalogLookup>,
    generation: u64,
    completed_fetches: u64,
    last_fetch: Option<FetchRecord>,
}

/// Process-wide ingredient catalog cache
pub struct IngredientCatalog {
    source: Arc<dyn CatalogSource>,
    state: Mutex<CatalogState>,
    fetch_lane: tokio::sync::Mutex<()>,
}

impl IngredientCatalog {
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self {
            source,
            state: Mutex::new(CatalogState::default()),
            fetch_lane: tokio::sync::Mutex::new(()),
        }
    }

    /// Process-wide instance, constructed on first access
    ///
    /// `init` only runs for the very first caller; later callers get the
    /// existing instance regardless of the source they would have supplied.
    pub fn global_or_init<F>(init: F) -> Arc<IngredientCatalog>
    where
        F: FnOnce() -> Arc<dyn CatalogSource>,
    {
        GLOBAL_CATALOG
            .get_or_init(|| {
                info!("Initializing process-wide ingredient catalog");
                Arc::new(IngredientCatalog::new(init()))
            })
            .clone()
    }

    /// Process-wide instance, if one has been constructed
    pub fn global() -> Option<Arc<IngredientCatalog>> {
        GLOBAL_CATALOG.get().cloned()
    }

    fn lock_state(&self) -> MutexGuard<'_, CatalogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetch the whole catalog
    ///
    /// Served from cache unless `force_refresh` is set or the cache has been
    /// invalidated. Failures surface as `CatalogUnavailable` and are not
    /// retried until the next call.
    pub async fn fetch_all(&self, force_refresh: bool) -> Result<CatalogLookup> {
        let (entry_generation, entry_fetches) = {
            let state = self.lock_state();
            if !force_refresh {
                if let Some(cached) = &state.cached {
                    return Ok(cached.clone());
                }
            }
            (state.generation, state.completed_fetches)
        };

        let _lane = self.fetch_lane.lock().await;

        let fetch_generation = {
            let state = self.lock_state();
            if state.completed_fetches > entry_fetches {
                if let Some(record) = &state.last_fetch {
                    if record.generation >= entry_generation {
                        debug!("Sharing catalog fetch completed while waiting");
                        return record.result.clone();
                    }
                }
            }
            if !force_refresh {
                if let Some(cached) = &state.cached {
                    return Ok(cached.clone());
                }
            }
            state.generation
        };

        debug!(generation = fetch_generation, force_refresh, "Fetching ingredient catalog");
        let result = self
            .source
            .fetch_all()
            .await
            .map(CatalogLookup::new)
            .map_err(|e| EditorError::CatalogUnavailable(e.to_string()));

        let mut state = self.lock_state();
        state.completed_fetches += 1;
        match &result {
            Ok(lookup) if state.generation == fetch_generation => {
                info!(count = lookup.len(), "Ingredient catalog loaded");
                state.cached = Some(lookup.clone());
            }
            Ok(_) => {
                debug!("Catalog invalidated during fetch; result not cached");
            }
            Err(e) => {
                warn!("Ingredient catalog fetch failed: {}", e);
            }
        }
        state.last_fetch = Some(FetchRecord {
            generation: fetch_generation,
            result: result.clone(),
        });
        result
    }

    /// Drop the cached catalog without fetching
    pub fn invalidate(&self) {
        let mut state = self.lock_state();
        state.generation += 1;
        state.cached = None;
        debug!(generation = state.generation, "Ingredient catalog invalidated");
    }

    /// Cached entry for `id`, without fetching
    pub fn peek(&self, id: IngredientId) -> Option<IngredientDefinition> {
        self.lock_state()
            .cached
            .as_ref()
            .and_then(|lookup| lookup.get(id).cloned())
    }

    /// Whether a catalog is currently cached
    pub fn is_cached(&self) -> bool {
        self.lock_state().cached.is_some()
    }
}
