//! JSON file state store.
//!
//! Persists the state mapping as pretty-printed JSON with sorted keys
//! (the in-memory `BTreeMap` ordering), so two runs over identical
//! input produce byte-identical files. Writes go to a temp file first
//! and are renamed into place.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::StateMap;
use crate::storage::StateStore;

/// State store backed by a single JSON file.
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    /// Create a store for the given state file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the persisted state file.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl StateStore for JsonStateStore {
    async fn load(&self) -> Result<StateMap> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!(
                    "No state file at {}; starting from an empty state",
                    self.path.display()
                );
                Ok(StateMap::new())
            }
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn save(&self, state: &StateMap) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(state)?;
        self.write_bytes(&bytes).await?;
        log::info!(
            "State saved: {} entries to {}",
            state.len(),
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StableKey, StateEntry};
    use tempfile::TempDir;

    fn entry(site: &str, sku: &str, price: Option<u32>) -> StateEntry {
        StateEntry {
            site: site.to_string(),
            sku: sku.to_string(),
            name: format!("{} {}", site, sku),
            price_cents: price,
            image_url: Some(format!("https://cdn.example.com/{}.png", sku)),
            image_hash: Some("a".repeat(64)),
            text_hash: None,
            url: format!("https://{}.example.com/p/{}", site, sku),
            last_seen: 1_700_000_000,
        }
    }

    fn sample_state() -> StateMap {
        let mut state = StateMap::new();
        state.insert(StableKey::new("kkiosk", "123"), entry("kkiosk", "123", Some(790)));
        state.insert(StableKey::new("velo", "ice-4"), entry("velo", "ice-4", None));
        state
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let store = JsonStateStore::new(tmp.path().join("state.json"));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_load_round_trip() {
        let tmp = TempDir::new().unwrap();
        let store = JsonStateStore::new(tmp.path().join("state.json"));

        let state = sample_state();
        store.save(&state).await.unwrap();
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, state);
    }

    #[tokio::test]
    async fn save_is_byte_deterministic() {
        let tmp = TempDir::new().unwrap();
        let store = JsonStateStore::new(tmp.path().join("state.json"));
        let state = sample_state();

        store.save(&state).await.unwrap();
        let first = tokio::fs::read(store.path()).await.unwrap();
        store.save(&state).await.unwrap();
        let second = tokio::fs::read(store.path()).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn save_leaves_no_temp_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("state.json");
        let store = JsonStateStore::new(&path);

        store.save(&sample_state()).await.unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn save_creates_parent_directories() {
        let tmp = TempDir::new().unwrap();
        let store = JsonStateStore::new(tmp.path().join("nested/dir/state.json"));
        store.save(&sample_state()).await.unwrap();
        assert_eq!(store.load().await.unwrap().len(), 2);
    }
}
