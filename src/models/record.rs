//! Product observation data structures.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AppError;

/// Stable identity of a trackable item across runs.
///
/// Serialized as `"site:sku"` so it can key a JSON mapping. The sku is
/// the storefront's native identifier when one exists; fallback keys
/// derived from names or card content are a known churn source under
/// renames.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StableKey {
    pub site: String,
    pub sku: String,
}

impl StableKey {
    pub fn new(site: impl Into<String>, sku: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            sku: sku.into(),
        }
    }
}

impl fmt::Display for StableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.site, self.sku)
    }
}

impl FromStr for StableKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Split on the first colon only; skus may themselves contain colons.
        let (site, sku) = s
            .split_once(':')
            .ok_or_else(|| AppError::validation(format!("invalid key '{}': missing ':'", s)))?;
        if site.is_empty() {
            return Err(AppError::validation(format!("invalid key '{}': empty site", s)));
        }
        if sku.is_empty() {
            return Err(AppError::validation(format!("invalid key '{}': empty sku", s)));
        }
        Ok(Self::new(site, sku))
    }
}

impl Serialize for StableKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StableKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One observation of a sellable unit, produced by a fetcher.
///
/// Ephemeral; the diff engine compares it against the persisted
/// [`StateEntry`](crate::models::StateEntry) for the same key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Site identifier (config-assigned, e.g. "kkiosk")
    pub site: String,

    /// Storefront sku, or a fallback identity (name / content hash)
    pub sku: String,

    /// Display name
    pub name: String,

    /// Price in cents; `None` when the price text was unparseable
    pub price_cents: Option<u32>,

    /// Product image URL, if the listing carried one
    pub image_url: Option<String>,

    /// Visible text of the listing, for sites without structured fields
    pub text_snapshot: Option<String>,

    /// URL to report in change events
    pub url: String,
}

impl ProductRecord {
    /// Identity key for this observation.
    pub fn key(&self) -> StableKey {
        StableKey::new(self.site.clone(), self.sku.clone())
    }
}
