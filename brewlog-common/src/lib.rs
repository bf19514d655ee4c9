//! # Brewlog Common Library
//!
//! Shared code for the Brewlog recipe tracker crates:
//! - Domain models (recipes, ingredient additions, catalog entries, metrics)
//! - Editor event types and the broadcast EventBus
//! - Configuration loading
//! - Common error type

pub mod config;
pub mod error;
pub mod events;
pub mod models;

pub use error::{Error, Result};
