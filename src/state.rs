//! Shared application state for Axum handlers.
//!
//! Cloned into every handler invocation. Everything inside is either
//! immutable after startup (`Config`) or behind `Arc` trait objects that
//! are safe for concurrent use (`Storage`).

use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::store::Storage;

#[derive(Clone)]
pub struct AppState {
    /// Issue, user and admin repositories
    pub storage: Storage,
    /// Application configuration
    pub config: Arc<Config>,
    /// Timestamp when the application started
    pub started_at: Instant,
}

impl AppState {
    pub fn new(storage: Storage, config: Config) -> Self {
        Self {
            storage,
            config: Arc::new(config),
            started_at: Instant::now(),
        }
    }

    /// State backed by a fresh in-memory store.
    pub fn in_memory(config: Config) -> Self {
        Self::new(Storage::in_memory(), config)
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
