//! Catalog fetcher services.
//!
//! Each storefront variant implements [`Fetcher`], turning a target
//! descriptor into canonical [`ProductRecord`]s. The diff engine is
//! written once against those records and never sees site quirks.

pub mod html;
pub mod shopify;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::Result;
use crate::models::{ProductRecord, Target, TargetKind};
use crate::utils::http;

// Re-export for convenience
pub use html::HtmlFetcher;
pub use shopify::ShopifyFetcher;

/// Trait for per-site catalog fetchers.
///
/// Implementations must yield one record per sellable unit (one per
/// variant, not one per product) wherever price or image vary by
/// variant.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the current catalog of a target.
    async fn fetch(&self, target: &Target) -> Result<Vec<ProductRecord>>;
}

/// Trait for fetching raw image bytes, used by the image sensor.
///
/// Kept separate from [`Fetcher`] so the diff engine can be tested
/// without a network.
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Fetch an image as raw bytes.
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>>;
}

/// HTTP-backed image source.
pub struct HttpImageSource {
    client: Client,
}

impl HttpImageSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageSource for HttpImageSource {
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>> {
        http::fetch_bytes(&self.client, url).await
    }
}

/// The full set of fetchers, dispatched by target kind.
pub struct FetcherSet {
    shopify: ShopifyFetcher,
    html: HtmlFetcher,
}

impl FetcherSet {
    /// Build fetchers sharing one HTTP client.
    pub fn new(client: Client) -> Self {
        Self {
            shopify: ShopifyFetcher::new(client.clone()),
            html: HtmlFetcher::new(client),
        }
    }

    /// Pick the fetcher for a target kind.
    pub fn for_kind(&self, kind: TargetKind) -> &dyn Fetcher {
        match kind {
            TargetKind::Shopify => &self.shopify,
            TargetKind::Html => &self.html,
        }
    }
}

#[async_trait]
impl Fetcher for FetcherSet {
    async fn fetch(&self, target: &Target) -> Result<Vec<ProductRecord>> {
        self.for_kind(target.kind).fetch(target).await
    }
}
