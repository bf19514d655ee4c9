//! Composition: the recipe scalars and ordered ingredient list being edited

mod snapshot;
mod store;

pub use snapshot::{DirtyTracker, Snapshot};
pub use store::CompositionStore;
