// src/pipeline/run.rs

//! Run orchestration: fetch, diff, persist, notify.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::error::Result;
use crate::models::{ChangeEvent, Config, ProductRecord};
use crate::notify::Notifier;
use crate::pipeline::DiffEngine;
use crate::services::{Fetcher, FetcherSet, HttpImageSource, ImageSource};
use crate::storage::StateStore;
use crate::utils::http;

/// Summary of one watch run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub targets_total: usize,
    pub targets_failed: usize,
    pub records_seen: usize,
    pub events: Vec<ChangeEvent>,
}

impl RunSummary {
    pub fn has_changes(&self) -> bool {
        !self.events.is_empty()
    }
}

/// Execute one watch run.
///
/// State is loaded once up front and saved once at the end; nothing is
/// persisted mid-run, so an interrupted run leaves the previous state
/// file intact. A failed target degrades to "no signal" for its
/// records and suppresses removal detection for its site. A save
/// failure is fatal; a notification failure is logged and swallowed —
/// and notification only happens after the save, so a delivery outage
/// cannot cause the same changes to be re-detected next run.
pub async fn run_watch(
    config: &Config,
    store: &dyn StateStore,
    notifier: &dyn Notifier,
    dry_run: bool,
) -> Result<RunSummary> {
    let client = http::create_async_client(&config.http)?;
    let fetchers = FetcherSet::new(client.clone());
    let images: Arc<dyn ImageSource> = Arc::new(HttpImageSource::new(client));
    run_watch_with(config, store, notifier, &fetchers, images, dry_run).await
}

/// [`run_watch`] with the fetch side injected, so the persist/notify
/// contract is testable without a network.
async fn run_watch_with(
    config: &Config,
    store: &dyn StateStore,
    notifier: &dyn Notifier,
    fetcher: &dyn Fetcher,
    images: Arc<dyn ImageSource>,
    dry_run: bool,
) -> Result<RunSummary> {
    config.validate()?;

    let delay = Duration::from_millis(config.http.request_delay_ms);
    let now = Utc::now().timestamp();

    let mut state = store.load().await?;
    log::info!(
        "Run starting: {} target(s), {} tracked item(s)",
        config.targets.len(),
        state.len()
    );

    // Fetch all targets sequentially, tolerating per-target failures.
    let mut batch: Vec<ProductRecord> = Vec::new();
    let mut failed_sites: HashSet<String> = HashSet::new();
    let mut targets_failed = 0;

    for target in &config.targets {
        match fetcher.fetch(target).await {
            Ok(records) => {
                log::info!("{}: {} record(s) from {}", target.site, records.len(), target.url);
                batch.extend(records);
            }
            Err(e) => {
                log::warn!("{}: fetch failed for {}: {}", target.site, target.url, e);
                targets_failed += 1;
                failed_sites.insert(target.site.clone());
            }
        }

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    // Removal detection only trusts sites with no failed target.
    let complete_sites: HashSet<String> = config
        .targets
        .iter()
        .map(|t| t.site.clone())
        .filter(|site| !failed_sites.contains(site))
        .collect();

    let engine = DiffEngine::new(images, config.diff.removal_policy);

    let mut events = engine.diff_batch(&mut state, &batch, now).await;
    let seen = batch.iter().map(|r| r.key()).collect();
    events.extend(engine.detect_removals(&mut state, &seen, &complete_sites));

    let summary = RunSummary {
        targets_total: config.targets.len(),
        targets_failed,
        records_seen: batch.len(),
        events,
    };

    if dry_run {
        log::info!(
            "Dry run: {} event(s) detected, state not saved",
            summary.events.len()
        );
        return Ok(summary);
    }

    // Losing the state silently would re-classify everything as NEW
    // next run, so persistence errors propagate.
    store.save(&state).await?;

    if summary.has_changes() {
        if let Err(e) = notifier.notify(&summary.events).await {
            log::error!("Notification failed: {}", e);
        }
    } else {
        log::info!("No changes detected");
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{HtmlSelectors, StateMap, Target, TargetKind};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Call journal shared between stubs, to assert ordering.
    type CallLog = Arc<Mutex<Vec<&'static str>>>;

    struct StubStore {
        calls: CallLog,
        fail_save: bool,
    }

    #[async_trait]
    impl StateStore for StubStore {
        async fn load(&self) -> Result<StateMap> {
            Ok(StateMap::new())
        }

        async fn save(&self, _state: &StateMap) -> Result<()> {
            self.calls.lock().unwrap().push("save");
            if self.fail_save {
                return Err(std::io::Error::other("disk full").into());
            }
            Ok(())
        }
    }

    struct FailingNotifier {
        calls: CallLog,
    }

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn notify(&self, _events: &[ChangeEvent]) -> Result<()> {
            self.calls.lock().unwrap().push("notify");
            Err(AppError::notify("relay unreachable"))
        }
    }

    /// Fetcher serving the same canned records for every target.
    struct StubFetcher {
        records: Vec<ProductRecord>,
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        async fn fetch(&self, _target: &Target) -> Result<Vec<ProductRecord>> {
            Ok(self.records.clone())
        }
    }

    struct FailingFetcher;

    #[async_trait]
    impl Fetcher for FailingFetcher {
        async fn fetch(&self, target: &Target) -> Result<Vec<ProductRecord>> {
            Err(AppError::fetch(&target.site, "connection refused"))
        }
    }

    struct NoImages;

    #[async_trait]
    impl ImageSource for NoImages {
        async fn fetch_image(&self, url: &str) -> Result<Vec<u8>> {
            Err(AppError::fetch("stub", format!("no bytes for {}", url)))
        }
    }

    fn config() -> Config {
        let mut config = Config {
            targets: vec![Target {
                site: "a".to_string(),
                url: "https://a.example.com/catalog".to_string(),
                kind: TargetKind::Html,
                selectors: HtmlSelectors::default(),
            }],
            ..Config::default()
        };
        config.http.request_delay_ms = 0;
        config
    }

    fn record(sku: &str, price: Option<u32>) -> ProductRecord {
        ProductRecord {
            site: "a".to_string(),
            sku: sku.to_string(),
            name: format!("Product {}", sku),
            price_cents: price,
            image_url: None,
            text_snapshot: None,
            url: format!("https://a.example.com/p/{}", sku),
        }
    }

    fn calls() -> CallLog {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[tokio::test]
    async fn save_failure_aborts_the_run() {
        let calls = calls();
        let store = StubStore {
            calls: calls.clone(),
            fail_save: true,
        };
        let notifier = FailingNotifier {
            calls: calls.clone(),
        };
        let fetcher = StubFetcher {
            records: vec![record("1", Some(500))],
        };

        let result = run_watch_with(
            &config(),
            &store,
            &notifier,
            &fetcher,
            Arc::new(NoImages),
            false,
        )
        .await;

        assert!(result.is_err());
        // A digest must never go out for a run whose state was lost.
        assert_eq!(*calls.lock().unwrap(), vec!["save"]);
    }

    #[tokio::test]
    async fn notify_failure_is_swallowed_after_save() {
        let calls = calls();
        let store = StubStore {
            calls: calls.clone(),
            fail_save: false,
        };
        let notifier = FailingNotifier {
            calls: calls.clone(),
        };
        let fetcher = StubFetcher {
            records: vec![record("1", Some(500))],
        };

        let summary = run_watch_with(
            &config(),
            &store,
            &notifier,
            &fetcher,
            Arc::new(NoImages),
            false,
        )
        .await
        .unwrap();

        assert_eq!(summary.events.len(), 1);
        assert_eq!(*calls.lock().unwrap(), vec!["save", "notify"]);
    }

    #[tokio::test]
    async fn no_changes_save_but_skip_notification() {
        let calls = calls();
        let store = StubStore {
            calls: calls.clone(),
            fail_save: false,
        };
        let notifier = FailingNotifier {
            calls: calls.clone(),
        };
        let fetcher = StubFetcher { records: vec![] };

        let summary = run_watch_with(
            &config(),
            &store,
            &notifier,
            &fetcher,
            Arc::new(NoImages),
            false,
        )
        .await
        .unwrap();

        assert!(!summary.has_changes());
        assert_eq!(*calls.lock().unwrap(), vec!["save"]);
    }

    #[tokio::test]
    async fn dry_run_neither_saves_nor_notifies() {
        let calls = calls();
        let store = StubStore {
            calls: calls.clone(),
            fail_save: false,
        };
        let notifier = FailingNotifier {
            calls: calls.clone(),
        };
        let fetcher = StubFetcher {
            records: vec![record("1", Some(500))],
        };

        let summary = run_watch_with(
            &config(),
            &store,
            &notifier,
            &fetcher,
            Arc::new(NoImages),
            true,
        )
        .await
        .unwrap();

        assert_eq!(summary.events.len(), 1);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_target_degrades_without_aborting() {
        let calls = calls();
        let store = StubStore {
            calls: calls.clone(),
            fail_save: false,
        };
        let notifier = FailingNotifier {
            calls: calls.clone(),
        };

        let summary = run_watch_with(
            &config(),
            &store,
            &notifier,
            &FailingFetcher,
            Arc::new(NoImages),
            false,
        )
        .await
        .unwrap();

        assert_eq!(summary.targets_failed, 1);
        assert_eq!(summary.records_seen, 0);
        assert!(summary.events.is_empty());
        // State is still saved so last_seen survives a bad run.
        assert_eq!(*calls.lock().unwrap(), vec!["save"]);
    }
}
