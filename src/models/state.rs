//! Persisted last-known state of tracked items.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{ProductRecord, StableKey};

/// In-memory state: one entry per stable key.
///
/// A `BTreeMap` keeps keys sorted, so serialization is deterministic
/// and state-file diffs stay reviewable.
pub type StateMap = BTreeMap<StableKey, StateEntry>;

/// The authoritative last-known view of one tracked item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEntry {
    /// Site identifier
    pub site: String,

    /// Storefront sku or fallback identity
    pub sku: String,

    /// Display name as of the last observation
    pub name: String,

    /// Last known price in cents
    pub price_cents: Option<u32>,

    /// Last known image URL
    pub image_url: Option<String>,

    /// Fingerprint of the last successfully fetched image
    pub image_hash: Option<String>,

    /// Fingerprint of the last observed listing text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_hash: Option<String>,

    /// URL reported in change events
    pub url: String,

    /// Epoch seconds of the most recent observation
    pub last_seen: i64,
}

impl StateEntry {
    /// Build a fresh entry from a first observation.
    ///
    /// The image hash is supplied by the caller since computing it
    /// requires fetching the image bytes.
    pub fn from_record(
        record: &ProductRecord,
        image_hash: Option<String>,
        text_hash: Option<String>,
        now: i64,
    ) -> Self {
        Self {
            site: record.site.clone(),
            sku: record.sku.clone(),
            name: record.name.clone(),
            price_cents: record.price_cents,
            image_url: record.image_url.clone(),
            image_hash,
            text_hash,
            url: record.url.clone(),
            last_seen: now,
        }
    }
}
