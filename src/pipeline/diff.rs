// src/pipeline/diff.rs

//! Catalog diff engine.
//!
//! Compares a batch of observed product records against the persisted
//! state and emits classified change events, mutating the state in
//! place. Each tracked field has its own sensor with "no signal means
//! no event and no mutation" semantics: a transient parse or fetch
//! failure must neither fire an event nor clobber last known-good
//! data, because partial observations are the norm when watching
//! third-party sites.

use std::collections::HashSet;
use std::collections::btree_map::Entry;
use std::sync::Arc;

use crate::fingerprint::{image_fingerprint, text_fingerprint};
use crate::models::{
    ChangeEvent, ChangeKind, ProductRecord, RemovalPolicy, StableKey, StateEntry, StateMap,
};
use crate::services::ImageSource;

/// The diff engine: classifies changes between observations and state.
pub struct DiffEngine {
    images: Arc<dyn ImageSource>,
    removal_policy: RemovalPolicy,
}

impl DiffEngine {
    pub fn new(images: Arc<dyn ImageSource>, removal_policy: RemovalPolicy) -> Self {
        Self {
            images,
            removal_policy,
        }
    }

    /// Diff a batch of records against the state, mutating it in place.
    ///
    /// Events for one key come out in a fixed order (NEW, PRICE,
    /// IMAGE, TEXT) so output is deterministic for identical input.
    /// Removal detection is a separate pass; see [`detect_removals`].
    ///
    /// [`detect_removals`]: DiffEngine::detect_removals
    pub async fn diff_batch(
        &self,
        state: &mut StateMap,
        batch: &[ProductRecord],
        now: i64,
    ) -> Vec<ChangeEvent> {
        let mut events = Vec::new();

        for record in batch {
            let key = record.key();
            match state.entry(key.clone()) {
                Entry::Vacant(slot) => {
                    let image_hash = self.fetch_fingerprint(record.image_url.as_deref()).await;
                    let text_hash = record.text_snapshot.as_deref().and_then(text_fingerprint);

                    events.push(ChangeEvent {
                        key,
                        name: record.name.clone(),
                        url: record.url.clone(),
                        kind: ChangeKind::New {
                            price_cents: record.price_cents,
                        },
                    });
                    slot.insert(StateEntry::from_record(record, image_hash, text_hash, now));
                }
                Entry::Occupied(mut slot) => {
                    self.apply_sensors(slot.get_mut(), record, now, &mut events).await;
                }
            }
        }

        events
    }

    /// Run the independent field sensors for one tracked record.
    async fn apply_sensors(
        &self,
        stored: &mut StateEntry,
        record: &ProductRecord,
        now: i64,
        events: &mut Vec<ChangeEvent>,
    ) {
        let key = record.key();

        // Price sensor. A missing new price is a non-observation:
        // never an event, never an overwrite of a known price.
        if let Some(new_price) = record.price_cents {
            if stored.price_cents != Some(new_price) {
                events.push(ChangeEvent {
                    key: key.clone(),
                    name: record.name.clone(),
                    url: record.url.clone(),
                    kind: ChangeKind::Price {
                        old: stored.price_cents,
                        new: new_price,
                    },
                });
                stored.price_cents = Some(new_price);
            }
        }

        // Image sensor. A failed fetch or hash yields no signal and
        // preserves the last known-good fingerprint.
        if let Some(new_hash) = self.fetch_fingerprint(record.image_url.as_deref()).await {
            if stored.image_hash.as_deref() != Some(new_hash.as_str()) {
                events.push(ChangeEvent {
                    key: key.clone(),
                    name: record.name.clone(),
                    url: record.url.clone(),
                    kind: ChangeKind::Image {
                        old: stored.image_hash.clone(),
                        new: new_hash.clone(),
                    },
                });
                stored.image_hash = Some(new_hash);
                stored.image_url = record.image_url.clone();
            }
        }

        // Text sensor. Absent or empty text is a non-observation, not
        // a change to empty.
        if let Some(new_hash) = record.text_snapshot.as_deref().and_then(text_fingerprint) {
            if stored.text_hash.as_deref() != Some(new_hash.as_str()) {
                events.push(ChangeEvent {
                    key,
                    name: record.name.clone(),
                    url: record.url.clone(),
                    kind: ChangeKind::Text {
                        old: stored.text_hash.clone(),
                        new: new_hash.clone(),
                    },
                });
                stored.text_hash = Some(new_hash);
            }
        }

        // Cosmetic fields carry no sensor; refresh silently.
        stored.name = record.name.clone();
        stored.url = record.url.clone();
        stored.last_seen = now;
    }

    /// Detect keys that vanished from their site this run.
    ///
    /// Only sites in `complete_sites` are scanned: a site whose fetch
    /// failed must never produce phantom removals. What happens to a
    /// vanished entry is the configured [`RemovalPolicy`].
    pub fn detect_removals(
        &self,
        state: &mut StateMap,
        seen: &HashSet<StableKey>,
        complete_sites: &HashSet<String>,
    ) -> Vec<ChangeEvent> {
        if self.removal_policy == RemovalPolicy::Disabled {
            return Vec::new();
        }

        // BTreeMap iteration gives key order, so removal events are
        // deterministic too.
        let vanished: Vec<StableKey> = state
            .iter()
            .filter(|(key, _)| complete_sites.contains(&key.site) && !seen.contains(key))
            .map(|(key, _)| key.clone())
            .collect();

        let mut events = Vec::new();
        for key in vanished {
            let entry = match self.removal_policy {
                RemovalPolicy::Drop => state.remove(&key),
                _ => state.get(&key).cloned(),
            };
            let Some(entry) = entry else { continue };

            events.push(ChangeEvent {
                key,
                name: entry.name.clone(),
                url: entry.url.clone(),
                kind: ChangeKind::Removed {
                    last_price_cents: entry.price_cents,
                },
            });
        }

        events
    }

    /// Fetch and fingerprint an image, degrading every failure to `None`.
    async fn fetch_fingerprint(&self, image_url: Option<&str>) -> Option<String> {
        let url = image_url?;
        match self.images.fetch_image(url).await {
            Ok(bytes) if !bytes.is_empty() => Some(image_fingerprint(&bytes)),
            Ok(_) => {
                log::warn!("Empty image response for {}", url);
                None
            }
            Err(e) => {
                log::warn!("Image fetch failed for {}: {}", url, e);
                None
            }
        }
    }
}
