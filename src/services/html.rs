// src/services/html.rs

//! Generic HTML category page fetcher.
//!
//! For storefronts without a structured catalog endpoint, product
//! cards are located with configurable CSS selector alternatives.
//! These sites rarely expose a native sku, so identity falls back to
//! the card name or a content hash; see the selector defaults in the
//! config module for what "broad on purpose" looks like.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::fingerprint::text_fingerprint;
use crate::models::{HtmlSelectors, ProductRecord, Target};
use crate::services::Fetcher;
use crate::utils::price::parse_price_cents;
use crate::utils::{http, normalize_scheme, resolve_url};

/// Fetcher for generic HTML category targets.
pub struct HtmlFetcher {
    client: reqwest::Client,
}

impl HtmlFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HtmlFetcher {
    async fn fetch(&self, target: &Target) -> Result<Vec<ProductRecord>> {
        let html = http::fetch_text(&self.client, &target.url)
            .await
            .map_err(|e| AppError::fetch(&target.site, e))?;
        let document = Html::parse_document(&html);
        extract_records(&document, target)
    }
}

/// Parse a comma-separated selector list into individual selectors.
fn parse_alternatives(list: &str) -> Result<Vec<Selector>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| Selector::parse(s).map_err(|e| AppError::selector(s, e)))
        .collect()
}

/// First element inside `card` matched by any alternative, in order.
fn select_first<'a>(card: &ElementRef<'a>, alternatives: &[Selector]) -> Option<ElementRef<'a>> {
    alternatives
        .iter()
        .find_map(|sel| card.select(sel).next())
}

/// Visible text of an element, whitespace-collapsed.
fn visible_text(el: &ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extract canonical records from a parsed category page.
pub(crate) fn extract_records(document: &Html, target: &Target) -> Result<Vec<ProductRecord>> {
    let selectors: &HtmlSelectors = &target.selectors;
    // The card list is a union: every alternative contributes cards.
    // Name/price/image lists are ordered fallbacks within one card.
    let card_sel = Selector::parse(&selectors.card)
        .map_err(|e| AppError::selector(&selectors.card, e))?;
    let name_sels = parse_alternatives(&selectors.name)?;
    let price_sels = parse_alternatives(&selectors.price)?;
    let image_sels = parse_alternatives(&selectors.image)?;

    let base = Url::parse(&target.url)?;

    let mut records = Vec::new();
    for card in document.select(&card_sel) {
        let name = select_first(&card, &name_sels)
            .map(|el| visible_text(&el))
            .filter(|s| !s.is_empty());

        let price_cents = select_first(&card, &price_sels)
            .and_then(|el| parse_price_cents(&visible_text(&el)));

        let image_url = select_first(&card, &image_sels)
            .and_then(|el| el.value().attr("src"))
            .map(|src| resolve_url(&base, &normalize_scheme(src)));

        let card_text = visible_text(&card);

        // Identity: native sku attribute, else the name, else a
        // short content hash. The latter two churn under renames.
        let sku = card
            .value()
            .attr("data-sku")
            .or_else(|| card.value().attr("data-id"))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| name.clone())
            .or_else(|| {
                text_fingerprint(&card_text).map(|hash| format!("card_{}", &hash[..12]))
            });

        let Some(sku) = sku else {
            log::debug!("Skipping unidentifiable empty card on {}", target.url);
            continue;
        };

        records.push(ProductRecord {
            site: target.site.clone(),
            sku,
            name: name.unwrap_or_default(),
            price_cents,
            image_url,
            text_snapshot: if card_text.is_empty() {
                None
            } else {
                Some(card_text)
            },
            url: target.url.clone(),
        });
    }

    Ok(records)
}
