// src/services/shopify.rs

//! Shopify collection fetcher.
//!
//! Shopify exposes collections as paginated JSON at
//! `/collections/{handle}/products.json`, which is far more stable
//! than scraping the rendered storefront. One record is produced per
//! variant so per-variant prices and images are tracked individually.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{ProductRecord, Target};
use crate::services::Fetcher;
use crate::utils::price::parse_price_cents;
use crate::utils::{http, normalize_scheme};

/// Page size requested from the products endpoint (Shopify's maximum).
const PAGE_LIMIT: usize = 250;

/// Upper bound on pages fetched per collection.
const MAX_PAGES: usize = 50;

/// Fetcher for Shopify collection targets.
pub struct ShopifyFetcher {
    client: reqwest::Client,
}

impl ShopifyFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Derive `(origin, handle)` from a collection URL like
    /// `https://shop.example.com/collections/snus?sort=price`.
    fn collection_parts(collection_url: &str) -> Result<(String, String)> {
        let url = Url::parse(collection_url)?;
        let host = url
            .host_str()
            .ok_or_else(|| AppError::validation(format!("URL has no host: {}", collection_url)))?;
        let origin = format!("{}://{}", url.scheme(), host);

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|p| !p.is_empty()).collect())
            .unwrap_or_default();

        let handle = segments
            .iter()
            .position(|s| *s == "collections")
            .and_then(|i| segments.get(i + 1))
            .or_else(|| segments.last())
            .ok_or_else(|| {
                AppError::validation(format!("No collection handle in URL: {}", collection_url))
            })?;

        Ok((origin, handle.to_string()))
    }
}

#[async_trait]
impl Fetcher for ShopifyFetcher {
    async fn fetch(&self, target: &Target) -> Result<Vec<ProductRecord>> {
        let (origin, handle) = Self::collection_parts(&target.url)?;
        let endpoint = format!("{}/collections/{}/products.json", origin, handle);

        let mut records = Vec::new();
        for page in 1..=MAX_PAGES {
            let url = format!("{}?limit={}&page={}", endpoint, PAGE_LIMIT, page);
            let body = http::fetch_text(&self.client, &url)
                .await
                .map_err(|e| AppError::fetch(&target.site, e))?;

            let parsed: ProductsPage = serde_json::from_str(&body)?;
            if parsed.products.is_empty() {
                return Ok(records);
            }
            records.extend(map_products(&target.site, &origin, parsed.products));

            if page == MAX_PAGES {
                log::warn!(
                    "Collection {} did not terminate within {} pages; truncating",
                    handle,
                    MAX_PAGES
                );
            }
        }
        Ok(records)
    }
}

/// Flatten Shopify products into one record per variant.
fn map_products(site: &str, origin: &str, products: Vec<ShopifyProduct>) -> Vec<ProductRecord> {
    let mut records = Vec::new();

    for product in products {
        let image_by_id: HashMap<u64, String> = product
            .images
            .iter()
            .filter_map(|img| Some((img.id?, normalize_scheme(img.src.as_deref()?))))
            .collect();

        let product_image = product
            .image
            .as_ref()
            .and_then(|img| img.src.as_deref())
            .map(normalize_scheme);

        let product_url = format!("{}/products/{}", origin, product.handle);

        for variant in product.variants {
            let sku = variant
                .sku
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| variant.id.to_string());

            let name = match variant.title.as_deref() {
                Some(vt) if !vt.trim().is_empty() => {
                    format!("{} {}", product.title, vt.trim())
                }
                _ => product.title.clone(),
            };

            let image_url = variant
                .image_id
                .and_then(|id| image_by_id.get(&id).cloned())
                .or_else(|| product_image.clone());

            records.push(ProductRecord {
                site: site.to_string(),
                sku,
                name: name.trim().to_string(),
                price_cents: variant.price.as_deref().and_then(parse_price_cents),
                image_url,
                text_snapshot: None,
                url: product_url.clone(),
            });
        }
    }

    records
}

#[derive(Debug, Deserialize)]
struct ProductsPage {
    #[serde(default)]
    products: Vec<ShopifyProduct>,
}

#[derive(Debug, Deserialize)]
struct ShopifyProduct {
    title: String,
    handle: String,
    #[serde(default)]
    image: Option<ShopifyImage>,
    #[serde(default)]
    images: Vec<ShopifyImage>,
    #[serde(default)]
    variants: Vec<ShopifyVariant>,
}

#[derive(Debug, Deserialize)]
struct ShopifyImage {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    src: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ShopifyVariant {
    id: u64,
    #[serde(default)]
    sku: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    price: Option<String>,
    #[serde(default)]
    image_id: Option<u64>,
}
