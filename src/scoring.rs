//! Keyword relevance scoring.
//!
//! The score is the share of profile keywords found in a listing, scaled by
//! 1.5 and capped at 1.0, so matching two thirds of the keywords already
//! counts as a perfect fit. Matching is case-insensitive substring search.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::settings::UserProfile;

/// Generic academic vocabulary that signals a research position.
pub const ACADEMIC_KEYWORDS: &[&str] = &[
    "phd",
    "doctoral",
    "research",
    "graduate",
    "assistant",
    "funded",
    "scholarship",
    "fellowship",
    "studentship",
];

const SCALE: f64 = 1.5;

/// Coarse relevance buckets used by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelevanceTier {
    /// Above 0.7
    High,
    /// 0.5 to 0.7 inclusive
    Medium,
    /// Below 0.5
    Low,
}

impl RelevanceTier {
    pub fn classify(score: f64) -> Self {
        if score > 0.7 {
            RelevanceTier::High
        } else if score >= 0.5 {
            RelevanceTier::Medium
        } else {
            RelevanceTier::Low
        }
    }
}

impl fmt::Display for RelevanceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelevanceTier::High => write!(f, "high"),
            RelevanceTier::Medium => write!(f, "medium"),
            RelevanceTier::Low => write!(f, "low"),
        }
    }
}

/// Scores free text against a fixed keyword list.
#[derive(Debug, Clone)]
pub struct RelevanceScorer {
    keywords: Vec<String>,
}

impl RelevanceScorer {
    /// Academic keywords followed by the profile's interests and skills,
    /// all lowercased. Duplicates are kept; each counts on its own.
    pub fn from_profile(profile: &UserProfile) -> Self {
        let keywords = ACADEMIC_KEYWORDS
            .iter()
            .map(|k| k.to_string())
            .chain(profile.research_interests.iter().map(|k| k.to_lowercase()))
            .chain(profile.all_skills().map(str::to_lowercase))
            .collect();

        Self { keywords }
    }

    pub fn with_keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .collect(),
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Keywords present in `text`.
    pub fn matches<'a>(&'a self, text: &str) -> Vec<&'a str> {
        let text = text.to_lowercase();
        self.keywords
            .iter()
            .filter(|k| text.contains(k.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// Relevance of `text` in [0, 1]. An empty keyword list scores 0.
    pub fn score(&self, text: &str) -> f64 {
        if self.keywords.is_empty() {
            return 0.0;
        }
        let hits = self.matches(text).len() as f64;
        (hits / self.keywords.len() as f64 * SCALE).min(1.0)
    }
}
