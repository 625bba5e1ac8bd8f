//! Feed scanning: fetch, parse, score, and filter.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use thiserror::Error;

use crate::feed::{parse_feed, FeedEntry, FeedError, FeedSource, FetchError};
use crate::opportunity::Opportunity;
use crate::privacy;
use crate::scoring::RelevanceScorer;
use crate::settings::{AppConfig, PrivacyConfig};

/// Why a single feed could not be scanned.
#[derive(Debug, Error)]
pub enum FeedScanError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] FeedError),
}

impl FeedScanError {
    /// Description that never includes URLs or server-provided text.
    pub fn redacted(&self) -> String {
        match self {
            FeedScanError::Fetch(FetchError::Status(code)) => format!("HTTP {}", code),
            FeedScanError::Fetch(FetchError::RateLimited) => "rate limited".to_string(),
            FeedScanError::Fetch(_) => "fetch failed".to_string(),
            FeedScanError::Parse(FeedError::NotAFeed) => "not a feed".to_string(),
            FeedScanError::Parse(FeedError::Malformed(_)) => "malformed feed".to_string(),
        }
    }
}

/// A feed that failed during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedFailure {
    /// Feed URL, hashed unless sensitive logging is enabled
    pub feed: String,
    pub reason: String,
}

/// Outcome of scanning every configured feed.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Accepted opportunities in feed order
    pub opportunities: Vec<Opportunity>,
    pub feeds_scanned: usize,
    /// Entries examined, after the per-feed cap
    pub entries_seen: usize,
    pub failures: Vec<FeedFailure>,
}

impl ScanReport {
    pub fn feeds_succeeded(&self) -> usize {
        self.feeds_scanned - self.failures.len()
    }
}

struct FeedOutcome {
    entries_seen: usize,
    accepted: Vec<Opportunity>,
}

/// Scans feeds through any [`FeedSource`].
pub struct Scanner<S> {
    source: S,
    config: AppConfig,
    scorer: RelevanceScorer,
}

impl<S: FeedSource> Scanner<S> {
    pub fn new(source: S, config: AppConfig) -> Self {
        let scorer = RelevanceScorer::from_profile(&config.user_profile);
        Self {
            source,
            config,
            scorer,
        }
    }

    pub fn scorer(&self) -> &RelevanceScorer {
        &self.scorer
    }

    /// Scan every configured feed.
    ///
    /// Each request is preceded by the configured delay. Up to
    /// `max_concurrent_feeds` feeds are in flight at once, and results are
    /// reported in feed order regardless of completion order. A failing feed
    /// is recorded in the report and never stops the scan.
    pub async fn scan(&self) -> ScanReport {
        let scanning = &self.config.scanning;
        let concurrency = scanning.max_concurrent_feeds.max(1);

        tracing::info!("Scanning {} feeds for PhD opportunities", scanning.feeds.len());

        let results: Vec<(String, Result<FeedOutcome, FeedScanError>)> =
            stream::iter(scanning.feeds.iter())
                .map(|url| async move { (url.clone(), self.scan_feed(url).await) })
                .buffered(concurrency)
                .collect()
                .await;

        let mut report = ScanReport {
            feeds_scanned: results.len(),
            ..ScanReport::default()
        };

        for (url, result) in results {
            let shown = privacy::display_url(&url, &self.config.privacy);
            match result {
                Ok(outcome) => {
                    report.entries_seen += outcome.entries_seen;
                    report.opportunities.extend(outcome.accepted);
                }
                Err(e) => {
                    let reason = if self.config.privacy.log_sensitive_data {
                        e.to_string()
                    } else {
                        e.redacted()
                    };
                    tracing::warn!("Error with feed {}: {}", shown, reason);
                    report.failures.push(FeedFailure {
                        feed: shown,
                        reason,
                    });
                }
            }
        }

        tracing::info!(
            "Scan finished: {} opportunities from {}/{} feeds",
            report.opportunities.len(),
            report.feeds_succeeded(),
            report.feeds_scanned
        );

        report
    }

    async fn scan_feed(&self, url: &str) -> Result<FeedOutcome, FeedScanError> {
        let scanning = &self.config.scanning;
        let shown = privacy::display_url(url, &self.config.privacy);

        tracing::info!("Checking: {}", shown);
        tokio::time::sleep(scanning.request_delay()).await;

        let body = self.source.fetch(url).await?;
        let feed = parse_feed(&body)?;

        let entries = &feed.entries[..feed.entries.len().min(scanning.max_entries_per_feed)];
        let mut outcome = FeedOutcome {
            entries_seen: entries.len(),
            accepted: Vec::new(),
        };

        for opportunity in score_entries(entries, url, &self.scorer, &self.config.privacy) {
            if opportunity.relevance >= scanning.min_relevance_score {
                tracing::debug!(
                    "Accepted {} (relevance {:.3})",
                    opportunity.id,
                    opportunity.relevance
                );
                outcome.accepted.push(opportunity);
            } else {
                tracing::trace!(
                    "Skipped {} (relevance {:.3})",
                    opportunity.id,
                    opportunity.relevance
                );
            }
        }

        Ok(outcome)
    }
}

/// Turn feed entries into scored opportunities, with no filtering.
pub fn score_entries(
    entries: &[FeedEntry],
    source_url: &str,
    scorer: &RelevanceScorer,
    privacy: &PrivacyConfig,
) -> Vec<Opportunity> {
    let now = Utc::now();
    entries
        .iter()
        .map(|entry| Opportunity::from_entry(entry, source_url, scorer, privacy, now))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::FetchResult;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// In-memory feed server keyed by URL.
    #[derive(Default, Clone)]
    struct StubSource {
        bodies: HashMap<String, Result<String, u16>>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl StubSource {
        fn with_feed(mut self, url: &str, body: &str) -> Self {
            self.bodies.insert(url.to_string(), Ok(body.to_string()));
            self
        }

        fn with_status(mut self, url: &str, status: u16) -> Self {
            self.bodies.insert(url.to_string(), Err(status));
            self
        }
    }

    #[async_trait]
    impl FeedSource for StubSource {
        async fn fetch(&self, url: &str) -> FetchResult<String> {
            self.calls.lock().unwrap().push(url.to_string());
            match self.bodies.get(url) {
                Some(Ok(body)) => Ok(body.clone()),
                Some(Err(429)) => Err(FetchError::RateLimited),
                Some(Err(code)) => Err(FetchError::Status(*code)),
                None => Err(FetchError::Request("connection refused".to_string())),
            }
        }
    }

    fn rss(items: &[&str]) -> String {
        let items: String = items
            .iter()
            .enumerate()
            .map(|(i, title)| {
                format!(
                    "<item><title>{}</title><link>https://uni.example.edu/{}</link></item>",
                    title, i
                )
            })
            .collect();
        format!("<rss><channel><title>T</title>{}</channel></rss>", items)
    }

    fn test_config(feeds: &[&str]) -> AppConfig {
        let mut config = AppConfig::default();
        config.scanning.feeds = feeds.iter().map(|s| s.to_string()).collect();
        config.scanning.request_delay = 0.0;
        config.scanning.min_relevance_score = 0.3;
        config
    }

    #[tokio::test]
    async fn test_scan_filters_by_relevance() {
        let source = StubSource::default().with_feed(
            "https://a.example.edu/rss",
            &rss(&[
                "Funded PhD studentship in machine learning with PyTorch",
                "Campus parking update",
            ]),
        );
        let scanner = Scanner::new(source, test_config(&["https://a.example.edu/rss"]));

        let report = scanner.scan().await;

        assert_eq!(report.feeds_scanned, 1);
        assert_eq!(report.entries_seen, 2);
        assert!(report.failures.is_empty());
        assert_eq!(report.opportunities.len(), 1);
        assert!(report.opportunities[0].title.contains("Funded PhD"));
        assert!(report.opportunities[0].relevance >= 0.3);
    }

    #[tokio::test]
    async fn test_failing_feed_does_not_abort_scan() {
        let source = StubSource::default()
            .with_status("https://down.example.edu/rss", 503)
            .with_feed("https://b.example.edu/rss", "<html>nope</html>")
            .with_feed(
                "https://c.example.edu/rss",
                &rss(&["Funded PhD research studentship in deep learning"]),
            );
        let scanner = Scanner::new(
            source,
            test_config(&[
                "https://down.example.edu/rss",
                "https://missing.example.edu/rss",
                "https://b.example.edu/rss",
                "https://c.example.edu/rss",
            ]),
        );

        let report = scanner.scan().await;

        assert_eq!(report.feeds_scanned, 4);
        assert_eq!(report.failures.len(), 3);
        assert_eq!(report.feeds_succeeded(), 1);
        assert_eq!(report.opportunities.len(), 1);

        let reasons: Vec<&str> = report.failures.iter().map(|f| f.reason.as_str()).collect();
        assert_eq!(reasons, vec!["HTTP 503", "fetch failed", "not a feed"]);
        // Failures are reported under the pseudonymous URL
        assert_eq!(
            report.failures[0].feed,
            privacy::hash_url("https://down.example.edu/rss")
        );
    }

    #[tokio::test]
    async fn test_sensitive_logging_keeps_raw_details() {
        let source = StubSource::default().with_status("https://down.example.edu/rss", 429);
        let mut config = test_config(&["https://down.example.edu/rss"]);
        config.privacy.log_sensitive_data = true;

        let report = Scanner::new(source, config).scan().await;

        assert_eq!(report.failures[0].feed, "https://down.example.edu/rss");
        assert_eq!(report.failures[0].reason, "rate limited by feed server");
    }

    #[tokio::test]
    async fn test_entries_capped_per_feed() {
        let titles: Vec<String> = (0..15).map(|i| format!("Funded PhD position {}", i)).collect();
        let refs: Vec<&str> = titles.iter().map(String::as_str).collect();
        let source = StubSource::default().with_feed("https://a.example.edu/rss", &rss(&refs));

        let mut config = test_config(&["https://a.example.edu/rss"]);
        config.scanning.max_entries_per_feed = 4;
        config.scanning.min_relevance_score = 0.0;

        let report = Scanner::new(source, config).scan().await;

        assert_eq!(report.entries_seen, 4);
        assert_eq!(report.opportunities.len(), 4);
        assert!(report.opportunities[3].title.ends_with(" 3"));
    }

    #[tokio::test]
    async fn test_concurrent_scan_preserves_feed_order() {
        let source = StubSource::default()
            .with_feed("https://one.example.edu/rss", &rss(&["PhD one"]))
            .with_feed("https://two.example.edu/rss", &rss(&["PhD two"]))
            .with_feed("https://three.example.edu/rss", &rss(&["PhD three"]));
        let calls = source.calls.clone();

        let mut config = test_config(&[
            "https://one.example.edu/rss",
            "https://two.example.edu/rss",
            "https://three.example.edu/rss",
        ]);
        config.scanning.max_concurrent_feeds = 3;
        config.scanning.min_relevance_score = 0.0;

        let report = Scanner::new(source, config).scan().await;

        let titles: Vec<&str> = report
            .opportunities
            .iter()
            .map(|o| o.title.as_str())
            .collect();
        assert_eq!(titles, vec!["PhD one", "PhD two", "PhD three"]);
        assert_eq!(calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_feed_list() {
        let report = Scanner::new(StubSource::default(), test_config(&[]))
            .scan()
            .await;
        assert_eq!(report.feeds_scanned, 0);
        assert!(report.opportunities.is_empty());
    }
}
