// Complete scan run: scan feeds, build the dashboard, draft a sample letter

use std::path::{Path, PathBuf};

use chrono::Local;

use crate::dashboard::{Dashboard, DashboardSummary};
use crate::error::AppResult;
use crate::feed::FeedSource;
use crate::letter::CoverLetterGenerator;
use crate::scanner::{FeedFailure, Scanner};
use crate::settings::AppConfig;
use crate::ui::Paint;
use crate::workspace::{Workspace, SAMPLE_LETTER_FILE};

/// Configuration for a run
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub app: AppConfig,
    /// Directory that relative output/data paths resolve against
    pub base_dir: PathBuf,
    /// Seed for the cover letter template choice (random if None)
    pub seed: Option<u64>,
    /// Suppress the stdout report
    pub quiet: bool,
    pub color: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            app: AppConfig::default(),
            base_dir: PathBuf::from("."),
            seed: None,
            quiet: false,
            color: true,
        }
    }
}

/// Result of a complete run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub opportunities_found: usize,
    pub feeds_scanned: usize,
    pub failures: Vec<FeedFailure>,
    pub summary: DashboardSummary,
    /// CSV path, absent when nothing was found
    pub dashboard_path: Option<PathBuf>,
    pub letter_path: Option<PathBuf>,
    pub cleaned_files: Vec<PathBuf>,
}

/// Drives one scan from start to finish
pub struct Runner<S> {
    config: RunnerConfig,
    source: S,
}

impl<S: FeedSource> Runner<S> {
    pub fn new(config: RunnerConfig, source: S) -> Self {
        Self { config, source }
    }

    /// Run the full pipeline. Temp files are cleaned up whether or not the
    /// run succeeds.
    pub async fn run(self) -> AppResult<RunSummary> {
        let Runner { config, source } = self;
        let workspace = Workspace::new(&config.base_dir, &config.app.output, &config.app.privacy);

        let result = run_pipeline(&config, source, &workspace).await;

        let cleaned = workspace.cleanup();
        result.map(|mut summary| {
            summary.cleaned_files = cleaned;
            summary
        })
    }
}

async fn run_pipeline<S: FeedSource>(
    config: &RunnerConfig,
    source: S,
    workspace: &Workspace,
) -> AppResult<RunSummary> {
    let paint = Paint::new(config.color);
    let out = Output {
        quiet: config.quiet,
    };

    out.line(&paint.bold("Starting Secure PhD Application Scan...", paint.theme.heading));
    out.line(&paint.color(
        &Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        paint.theme.muted,
    ));

    workspace.prepare()?;

    let scanner = Scanner::new(source, config.app.clone());
    let mut report = scanner.scan().await;
    report
        .opportunities
        .sort_by(|a, b| b.relevance.total_cmp(&a.relevance));

    let dashboard = Dashboard::from_opportunities(&report.opportunities);
    let mut dashboard_path = None;
    let mut letter_path = None;

    if dashboard.is_empty() {
        out.line("");
        out.line("No opportunities found to display.");
    } else {
        out.line("");
        out.text(&dashboard.render(&paint));

        let path = dashboard.save(workspace.output_dir(), &Local::now())?;
        out.line("");
        out.line(&format!("Dashboard saved: {}", display_path(&path)));
        dashboard_path = Some(path);

        // Sample letter for the most relevant opportunity
        let mut generator = match config.seed {
            Some(seed) => CoverLetterGenerator::with_seed(config.app.letter.clone(), seed),
            None => CoverLetterGenerator::new(config.app.letter.clone()),
        };
        let letter = generator.generate(&report.opportunities[0]);
        let path = workspace.write_output(SAMPLE_LETTER_FILE, &letter)?;
        out.line(&format!(
            "Sample cover letter template saved: {}",
            display_path(&path)
        ));
        letter_path = Some(path);
    }

    if !report.failures.is_empty() {
        out.line(&paint.color(
            &format!(
                "{} of {} feeds could not be scanned",
                report.failures.len(),
                report.feeds_scanned
            ),
            paint.theme.medium,
        ));
    }

    out.line("");
    out.line(&paint.color(
        &format!(
            "Scan completed! Found {} opportunities.",
            report.opportunities.len()
        ),
        paint.theme.high,
    ));

    Ok(RunSummary {
        opportunities_found: report.opportunities.len(),
        feeds_scanned: report.feeds_scanned,
        failures: report.failures,
        summary: dashboard.summary(),
        dashboard_path,
        letter_path,
        cleaned_files: Vec::new(),
    })
}

/// Stdout writer that honours quiet mode
struct Output {
    quiet: bool,
}

impl Output {
    fn line(&self, text: &str) {
        if !self.quiet {
            println!("{}", text);
        }
    }

    fn text(&self, text: &str) {
        if !self.quiet {
            print!("{}", text);
        }
    }
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}
