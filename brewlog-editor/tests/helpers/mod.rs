//! Test Helper Utilities
//!
//! Shared utilities for testing brewlog-editor

#![allow(dead_code)]

pub mod fakes;
pub mod fixtures;

// Re-export commonly used items
pub use fakes::{
    metrics_for, CountingCatalogSource, Gate, InMemoryRepository, ScriptedCalculator,
    ScriptedExporter, StaticImporter,
};
pub use fixtures::{definition, drain_events, eventually, Harness};
