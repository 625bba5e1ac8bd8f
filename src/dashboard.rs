//! Opportunity dashboard: ranking, tier summary, CSV export.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use csv::{Terminator, WriterBuilder};
use serde::Serialize;
use thiserror::Error;

use crate::opportunity::Opportunity;
use crate::scoring::RelevanceTier;
use crate::ui::Paint;

/// Application status assigned to every freshly scanned opportunity.
pub const STATUS_NOT_APPLIED: &str = "Not Applied";

const CSV_HEADER: [&str; 6] = [
    "ID",
    "Title",
    "Relevance_Score",
    "Source",
    "Published",
    "Status",
];

/// Rows shown in the terminal report.
pub const TOP_ROWS: usize = 5;

const TITLE_WIDTH: usize = 60;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("failed to write dashboard: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// One dashboard line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardRow {
    pub id: String,
    pub title: String,
    /// Relevance rounded to three decimals
    pub relevance_score: f64,
    pub source: String,
    /// Date part of the publication string, or `Unknown`
    pub published: String,
    pub status: String,
}

impl DashboardRow {
    fn from_opportunity(opportunity: &Opportunity) -> Self {
        let published = if opportunity.published.is_empty() {
            "Unknown".to_string()
        } else {
            opportunity.published.chars().take(10).collect()
        };

        Self {
            id: opportunity.id.clone(),
            title: opportunity.title.clone(),
            relevance_score: round3(opportunity.relevance),
            source: opportunity.source.clone(),
            published,
            status: STATUS_NOT_APPLIED.to_string(),
        }
    }

    pub fn tier(&self) -> RelevanceTier {
        RelevanceTier::classify(self.relevance_score)
    }
}

/// Counts per relevance tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub total: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

/// Ranked view over scanned opportunities.
#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    rows: Vec<DashboardRow>,
}

impl Dashboard {
    /// Rank by relevance, highest first. Ties keep scan order.
    pub fn from_opportunities(opportunities: &[Opportunity]) -> Self {
        let mut ranked: Vec<&Opportunity> = opportunities.iter().collect();
        ranked.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));

        Self {
            rows: ranked
                .into_iter()
                .map(DashboardRow::from_opportunity)
                .collect(),
        }
    }

    pub fn rows(&self) -> &[DashboardRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn top(&self, n: usize) -> &[DashboardRow] {
        &self.rows[..n.min(self.rows.len())]
    }

    pub fn summary(&self) -> DashboardSummary {
        self.rows.iter().fold(
            DashboardSummary {
                total: self.rows.len(),
                ..DashboardSummary::default()
            },
            |mut acc, row| {
                match row.tier() {
                    RelevanceTier::High => acc.high += 1,
                    RelevanceTier::Medium => acc.medium += 1,
                    RelevanceTier::Low => acc.low += 1,
                }
                acc
            },
        )
    }

    /// CSV export with a header row.
    pub fn to_csv(&self) -> Result<String, DashboardError> {
        let mut wtr = WriterBuilder::new()
            .terminator(Terminator::Any(b'\n'))
            .from_writer(vec![]);
        wtr.write_record(CSV_HEADER)?;

        for row in &self.rows {
            let score = row.relevance_score.to_string();
            wtr.write_record([
                row.id.as_str(),
                row.title.as_str(),
                score.as_str(),
                row.source.as_str(),
                row.published.as_str(),
                row.status.as_str(),
            ])?;
        }

        let data = wtr.into_inner().map_err(|e| e.into_error())?;
        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    /// File name for a dashboard written at `at`.
    pub fn file_name<Tz: TimeZone>(at: &DateTime<Tz>) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        format!("opportunities_dashboard_{}.csv", at.format("%Y%m%d_%H%M%S"))
    }

    /// Write the CSV into `dir`, returning the file path.
    pub fn save<Tz: TimeZone>(&self, dir: &Path, at: &DateTime<Tz>) -> Result<PathBuf, DashboardError>
    where
        Tz::Offset: std::fmt::Display,
    {
        fs::create_dir_all(dir)?;
        let path = dir.join(Self::file_name(at));
        fs::write(&path, self.to_csv()?)?;
        Ok(path)
    }

    /// Terminal report: tier counts and the top opportunities.
    pub fn render(&self, paint: &Paint) -> String {
        let theme = paint.theme;
        let summary = self.summary();
        let mut out = String::new();

        out.push_str(&paint.bold("OPPORTUNITY DASHBOARD", theme.heading));
        out.push('\n');
        out.push_str(&"=".repeat(60));
        out.push('\n');
        out.push_str(&format!("Total Opportunities Found: {}\n", summary.total));
        out.push_str(&format!(
            "High Relevance (>0.7): {}\n",
            paint.color(&summary.high.to_string(), theme.high)
        ));
        out.push_str(&format!(
            "Medium Relevance (0.5-0.7): {}\n",
            paint.color(&summary.medium.to_string(), theme.medium)
        ));
        out.push_str(&format!(
            "Low Relevance (<0.5): {}\n",
            paint.color(&summary.low.to_string(), theme.low)
        ));

        out.push('\n');
        out.push_str(&paint.bold("TOP OPPORTUNITIES:", theme.heading));
        out.push('\n');

        let top = self.top(TOP_ROWS);
        let title_width = top
            .iter()
            .map(|r| clip(&r.title, TITLE_WIDTH).chars().count())
            .max()
            .unwrap_or(0)
            .max("Title".len());

        out.push_str(&format!(
            "{}  {}  {}\n",
            pad("Title", title_width),
            "Relevance_Score",
            "Source"
        ));
        for row in top {
            let title = pad(&clip(&row.title, TITLE_WIDTH), title_width);
            let score = format!("{:>15.3}", row.relevance_score);
            out.push_str(&format!(
                "{}  {}  {}\n",
                title,
                paint.color(&score, theme.tier(row.tier())),
                paint.color(&row.source, theme.muted)
            ));
        }

        out
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

fn clip(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

fn pad(text: &str, width: usize) -> String {
    let len = text.chars().count();
    format!("{}{}", text, " ".repeat(width.saturating_sub(len)))
}
