//! Scored opportunities derived from feed entries.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::feed::FeedEntry;
use crate::privacy;
use crate::scoring::{RelevanceScorer, RelevanceTier};
use crate::settings::PrivacyConfig;

/// Summaries longer than this many characters are cut.
pub const SUMMARY_LIMIT: usize = 200;

const UNKNOWN_TITLE: &str = "Unknown Title";

/// A PhD listing that has been scored and anonymised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: String,
    pub title: String,
    pub link: String,
    pub summary: String,
    pub published: String,
    /// Pseudonymous form of the feed URL
    pub source: String,
    pub relevance: f64,
    pub processed_date: String,
}

impl Opportunity {
    /// Build an opportunity from a raw entry.
    ///
    /// The score covers the title and the full summary; truncation happens
    /// afterwards and only affects what is stored.
    pub fn from_entry(
        entry: &FeedEntry,
        source_url: &str,
        scorer: &RelevanceScorer,
        privacy: &PrivacyConfig,
        now: DateTime<Utc>,
    ) -> Self {
        let title = entry
            .title
            .clone()
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string());
        let link = entry.link.clone().unwrap_or_default();
        let summary = entry.summary.clone().unwrap_or_default();

        let relevance = scorer.score(&format!("{} {}", title, summary));

        let key = format!("{}{}", title, link);
        let id = if privacy.hash_identifiers {
            privacy::hash_data(&key)
        } else {
            privacy::short_id(&key)
        };

        let timestamp = now.to_rfc3339_opts(SecondsFormat::Secs, true);

        Self {
            id,
            title,
            link,
            summary: truncate_summary(&summary),
            published: entry.published.clone().unwrap_or_else(|| timestamp.clone()),
            source: privacy::hash_url(source_url),
            relevance,
            processed_date: timestamp,
        }
    }

    pub fn tier(&self) -> RelevanceTier {
        RelevanceTier::classify(self.relevance)
    }
}

/// Cut to [`SUMMARY_LIMIT`] characters and mark the cut with `...`.
pub fn truncate_summary(summary: &str) -> String {
    if summary.chars().count() > SUMMARY_LIMIT {
        let cut: String = summary.chars().take(SUMMARY_LIMIT).collect();
        format!("{}...", cut)
    } else {
        summary.to_string()
    }
}
