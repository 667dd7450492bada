//! Storage abstractions for persisted watcher state.
//!
//! The state is a single mapping from `"site:sku"` keys to the
//! last-known view of each item. It is loaded once at run start and
//! saved once at run end; nothing writes it mid-run, so a killed run
//! can never leave a partially updated file behind.

pub mod local;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::StateMap;

// Re-export for convenience
pub use local::JsonStateStore;

/// Trait for state persistence backends.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the full state mapping.
    ///
    /// Returns an empty mapping when no prior state exists; on the
    /// first-ever run every observed item is reported as new.
    async fn load(&self) -> Result<StateMap>;

    /// Atomically replace the persisted state with `state`.
    ///
    /// Serialization is deterministic: saving the same mapping twice
    /// must produce byte-identical output.
    async fn save(&self, state: &StateMap) -> Result<()>;
}
