//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP client behavior
    #[serde(default)]
    pub http: HttpConfig,

    /// Diff engine policy knobs
    #[serde(default)]
    pub diff: DiffConfig,

    /// SMTP digest delivery; digests are logged when absent
    #[serde(default)]
    pub smtp: Option<SmtpConfig>,

    /// Watched storefront targets
    #[serde(default)]
    pub targets: Vec<Target>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if self.targets.is_empty() {
            return Err(AppError::validation("No targets defined"));
        }
        for target in &self.targets {
            if target.site.trim().is_empty() {
                return Err(AppError::validation(format!(
                    "Target {} has an empty site name",
                    target.url
                )));
            }
            // Site names become the prefix of "site:sku" state keys.
            if target.site.contains(':') {
                return Err(AppError::validation(format!(
                    "Site name '{}' must not contain ':'",
                    target.site
                )));
            }
            url::Url::parse(&target.url).map_err(|e| {
                AppError::validation(format!("Target URL '{}' is invalid: {}", target.url, e))
            })?;
        }
        if let Some(smtp) = &self.smtp {
            if smtp.to.is_empty() {
                return Err(AppError::validation("smtp.to has no recipients"));
            }
        }
        Ok(())
    }
}

/// HTTP client behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between requests in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
        }
    }
}

/// Diff engine policy settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DiffConfig {
    /// What to do when a tracked key vanishes from a fully observed site
    #[serde(default)]
    pub removal_policy: RemovalPolicy,
}

/// Removal detection policy.
///
/// Vanished-sku semantics are deliberately a configuration choice:
/// `disabled` keeps entries forever with a stale `last_seen`,
/// `retain` reports the removal but keeps the entry (a restock is not
/// a second NEW), `drop` reports it and deletes the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
    #[default]
    Disabled,
    Retain,
    Drop,
}

/// SMTP delivery settings for the change digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,

    #[serde(default = "defaults::smtp_port")]
    pub port: u16,

    pub username: String,
    pub password: String,

    /// From address; defaults to `username` when empty
    #[serde(default)]
    pub from: String,

    /// Recipient addresses
    pub to: Vec<String>,

    /// Subject line for the digest mail
    #[serde(default = "defaults::smtp_subject")]
    pub subject: String,
}

impl SmtpConfig {
    /// Effective From address.
    pub fn from_address(&self) -> &str {
        if self.from.trim().is_empty() {
            &self.username
        } else {
            &self.from
        }
    }
}

/// One watched catalog page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    /// Site identifier, the prefix of every state key for this target
    pub site: String,

    /// Collection or category URL
    pub url: String,

    /// Which fetcher understands this target
    #[serde(default)]
    pub kind: TargetKind,

    /// CSS selectors for `kind = "html"`; built-in defaults otherwise
    #[serde(default)]
    pub selectors: HtmlSelectors,
}

/// Fetcher variant for a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// Shopify collection, read via the `products.json` endpoint
    Shopify,

    /// Generic category page, read via CSS selectors
    #[default]
    Html,
}

/// CSS selector alternatives for generic HTML category pages.
///
/// Each field is a comma-separated list tried left to right; the first
/// alternative that matches inside a card wins. Defaults are broad on
/// purpose and work for many storefront themes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HtmlSelectors {
    #[serde(default = "defaults::card_selector")]
    pub card: String,

    #[serde(default = "defaults::name_selector")]
    pub name: String,

    #[serde(default = "defaults::price_selector")]
    pub price: String,

    #[serde(default = "defaults::image_selector")]
    pub image: String,
}

impl Default for HtmlSelectors {
    fn default() -> Self {
        Self {
            card: defaults::card_selector(),
            name: defaults::name_selector(),
            price: defaults::price_selector(),
            image: defaults::image_selector(),
        }
    }
}

mod defaults {
    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"
            .into()
    }
    pub fn timeout() -> u64 {
        45
    }
    pub fn request_delay() -> u64 {
        100
    }

    // SMTP defaults
    pub fn smtp_port() -> u16 {
        587
    }
    pub fn smtp_subject() -> String {
        "Shopwatch: changes detected".into()
    }

    // Selector defaults
    pub fn card_selector() -> String {
        ".product-card, .product-tile, .product, li[data-sku], article.product, \
         div.product-item, div.product-card"
            .into()
    }
    pub fn name_selector() -> String {
        ".product-name, .name, .title, h3, h2, [data-name]".into()
    }
    pub fn price_selector() -> String {
        ".price, .product-price, .currency, [data-price], .price__current, .product__price"
            .into()
    }
    pub fn image_selector() -> String {
        "img".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_target(site: &str, url: &str) -> Config {
        Config {
            targets: vec![Target {
                site: site.to_string(),
                url: url.to_string(),
                kind: TargetKind::Html,
                selectors: HtmlSelectors::default(),
            }],
            ..Config::default()
        }
    }

    #[test]
    fn validate_rejects_empty_targets() {
        assert!(Config::default().validate().is_err());
    }

    #[test]
    fn validate_accepts_minimal_target() {
        let config = config_with_target("velo", "https://www.velo.com/ch/en/velo");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_colon_in_site() {
        let config = config_with_target("ve:lo", "https://www.velo.com/ch/en/velo");
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_url() {
        let config = config_with_target("velo", "not a url");
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_toml_with_defaults() {
        let toml = r#"
            [[targets]]
            site = "kkiosk"
            url = "https://tabak.kkiosk.ch/collections/snus"
            kind = "shopify"

            [[targets]]
            site = "ploom"
            url = "https://www.ploom.ch/en/shop/sticks"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.targets.len(), 2);
        assert_eq!(config.targets[0].kind, TargetKind::Shopify);
        assert_eq!(config.targets[1].kind, TargetKind::Html);
        assert_eq!(config.diff.removal_policy, RemovalPolicy::Disabled);
        assert!(config.targets[1].selectors.card.contains(".product-card"));
    }

    #[test]
    fn parses_removal_policy() {
        let toml = r#"
            [diff]
            removal_policy = "retain"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.diff.removal_policy, RemovalPolicy::Retain);
    }

    #[test]
    fn smtp_from_falls_back_to_username() {
        let smtp = SmtpConfig {
            host: "smtp.example.com".into(),
            port: 587,
            username: "watch@example.com".into(),
            password: "secret".into(),
            from: String::new(),
            to: vec!["me@example.com".into()],
            subject: "s".into(),
        };
        assert_eq!(smtp.from_address(), "watch@example.com");
    }
}
