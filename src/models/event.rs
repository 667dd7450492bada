//! Classified change events emitted by the diff engine.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::StableKey;
use crate::utils::price::format_price_cents;

/// What changed for one tracked item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeKind {
    /// First observation of this key
    New { price_cents: Option<u32> },

    /// Price moved from a known or unknown value to a known one
    Price { old: Option<u32>, new: u32 },

    /// Image fingerprint moved
    Image { old: Option<String>, new: String },

    /// Listing text fingerprint moved
    Text { old: Option<String>, new: String },

    /// Key vanished from a fully observed site
    Removed { last_price_cents: Option<u32> },
}

impl ChangeKind {
    /// Tag used in the display line and for ordering within a key.
    pub fn label(&self) -> &'static str {
        match self {
            ChangeKind::New { .. } => "NEW",
            ChangeKind::Price { .. } => "PRICE",
            ChangeKind::Image { .. } => "IMAGE",
            ChangeKind::Text { .. } => "TEXT",
            ChangeKind::Removed { .. } => "REMOVED",
        }
    }
}

/// An immutable fact about one run: something changed for `key`.
///
/// Events are emitted to the notifier and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Identity of the item the event concerns
    pub key: StableKey,

    /// Display name at observation time
    pub name: String,

    /// URL to include in the digest
    pub url: String,

    /// The classified change
    pub kind: ChangeKind,
}

impl fmt::Display for ChangeEvent {
    /// Render the one-line digest form:
    /// `[KIND] site · sku · name · <detail> · url`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let detail = match &self.kind {
            ChangeKind::New { price_cents } => format_price_cents(*price_cents),
            ChangeKind::Price { old, new } => format!(
                "{} → {}",
                format_price_cents(*old),
                format_price_cents(Some(*new))
            ),
            ChangeKind::Image { .. } => "image changed".to_string(),
            ChangeKind::Text { .. } => "text changed".to_string(),
            ChangeKind::Removed { last_price_cents } => {
                format!("removed, was {}", format_price_cents(*last_price_cents))
            }
        };

        write!(
            f,
            "[{}] {} · {} · {} · {} · {}",
            self.kind.label(),
            self.key.site,
            self.key.sku,
            self.name,
            detail,
            self.url
        )
    }
}
