//! Mutation pipeline
//!
//! Sequences every externally requested change into exactly one store
//! mutation followed by one metrics recompute request:
//! - `worker`: FIFO command loop applying mutations to the store
//! - `recompute`: single recompute loop with last-writer-wins application
//! - `session`: shared locked state and the sequence-number channels
//! - `status`: in-flight flags exposed to the UI

pub(crate) mod recompute;
pub(crate) mod session;
pub(crate) mod status;
pub(crate) mod worker;
