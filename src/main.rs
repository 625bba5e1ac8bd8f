use clap::{ArgAction, Args, Parser, Subcommand};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use phd_autopilot::error::AppResult;
use phd_autopilot::feed::{parse_feed, HttpFeedSource};
use phd_autopilot::letter::{CoverLetterGenerator, CoverLetterTemplate};
use phd_autopilot::logging::{init_logging, LoggingConfig};
use phd_autopilot::runner::{Runner, RunnerConfig};
use phd_autopilot::scanner::score_entries;
use phd_autopilot::scoring::{RelevanceScorer, RelevanceTier};
use phd_autopilot::settings::AppConfig;
use phd_autopilot::ui::Paint;

/// Personal config picked up from the working directory when `--config` is absent
const DEFAULT_CONFIG_FILE: &str = "my_config.json";

#[derive(Parser, Debug)]
#[command(name = "phd-autopilot")]
#[command(version)]
#[command(about = "Privacy-focused PhD opportunity scanner")]
#[command(after_help = "Examples:
  phd-autopilot                      Scan configured feeds (same as 'scan')
  phd-autopilot init                 Write my_config.json to customise
  phd-autopilot score \"Funded PhD in NLP\"
  phd-autopilot preview feed.xml     Score a saved feed without network access")]
struct Cli {
    /// Personal config file (JSON or TOML) [default: ./my_config.json if present]
    #[arg(long, short, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Suppress all output except errors
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(long, short, global = true, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Disable colors (also respects NO_COLOR environment variable)
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan feeds, save the dashboard, and draft a sample cover letter
    Scan(ScanArgs),
    /// Write a personal configuration template
    Init {
        /// Where to write the template
        #[arg(long, short, default_value = DEFAULT_CONFIG_FILE)]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Score arbitrary text against the research profile
    Score {
        /// Text to score, e.g. a listing title and summary
        text: String,
    },
    /// Print a cover letter for a position title
    Letter {
        /// Position title to address
        #[arg(long, short)]
        title: String,

        /// Template to use [default: random choice]
        #[arg(long, value_enum)]
        template: Option<CoverLetterTemplate>,

        /// Seed for the random template choice
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Score the entries of a saved RSS/Atom file
    Preview {
        /// Feed document on disk
        file: PathBuf,
    },
}

#[derive(Args, Debug, Default)]
struct ScanArgs {
    /// Feed URL to scan instead of the configured list (repeatable)
    #[arg(long = "feed", value_name = "URL")]
    feeds: Vec<String>,

    /// Directory that output and data paths are relative to
    #[arg(long, short = 'd')]
    dir: Option<PathBuf>,

    /// Override the output directory
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Override the minimum relevance score (0-1)
    #[arg(long, value_name = "SCORE")]
    min_score: Option<f64>,

    /// Override the delay between requests, in seconds
    #[arg(long, value_name = "SECONDS")]
    delay: Option<f64>,

    /// Seed for the cover letter template choice
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    init_logging(
        LoggingConfig::from_flags(cli.quiet, cli.verbose)
            .with_ansi(
                !cli.no_color
                    && std::env::var_os("NO_COLOR").is_none()
                    && std::io::stderr().is_terminal(),
            ),
    );

    let paint = Paint::detect(cli.no_color);
    let config = load_config(cli.config.as_deref());

    if let Err(e) = dispatch(&cli, config, &paint).await {
        tracing::debug!("Command failed: {:?}", e);
        eprintln!("{} {}", paint.bold("Error:", paint.theme.error), e);
        return Ok(ExitCode::FAILURE);
    }

    Ok(ExitCode::SUCCESS)
}

async fn dispatch(cli: &Cli, config: AppConfig, paint: &Paint) -> AppResult<()> {
    match &cli.command {
        Some(Commands::Init { path, force }) => {
            AppConfig::write_template(path, *force)?;
            if !cli.quiet {
                println!("{} {}", paint.color("Created", paint.theme.high), path.display());
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your research interests and skills", path.display());
                println!("  2. Run 'phd-autopilot scan --config {}'", path.display());
                println!("  3. Keep the file out of version control; it stays local");
            }
        }
        Some(Commands::Score { text }) => {
            config.validate()?;
            run_score(&config, text, paint);
        }
        Some(Commands::Letter {
            title,
            template,
            seed,
        }) => {
            let mut generator = match seed {
                Some(seed) => CoverLetterGenerator::with_seed(config.letter.clone(), *seed),
                None => CoverLetterGenerator::new(config.letter.clone()),
            };
            let template = match template {
                Some(template) => *template,
                None => generator.choose_template(),
            };
            print!("{}", generator.generate_with(template, title));
        }
        Some(Commands::Preview { file }) => {
            config.validate()?;
            run_preview(&config, file, paint)?;
        }
        Some(Commands::Scan(args)) => {
            run_scan(cli, config, args).await?;
        }
        None => {
            run_scan(cli, config, &ScanArgs::default()).await?;
        }
    }

    Ok(())
}

/// Resolve the config path and load it, falling back to defaults
fn load_config(explicit: Option<&Path>) -> AppConfig {
    match explicit {
        Some(path) => {
            if !path.exists() {
                tracing::warn!("Config file {} not found, using defaults", path.display());
            }
            AppConfig::load_or_default(Some(path))
        }
        None => {
            let local = Path::new(DEFAULT_CONFIG_FILE);
            if local.exists() {
                tracing::debug!("Using {}", DEFAULT_CONFIG_FILE);
                AppConfig::load_or_default(Some(local))
            } else {
                AppConfig::load_or_default(None)
            }
        }
    }
}

async fn run_scan(cli: &Cli, mut config: AppConfig, args: &ScanArgs) -> AppResult<()> {
    if !args.feeds.is_empty() {
        config.scanning.feeds = args.feeds.clone();
    }
    if let Some(dir) = &args.output_dir {
        config.output.output_dir = dir.clone();
    }
    if let Some(score) = args.min_score {
        config.scanning.min_relevance_score = score;
    }
    if let Some(delay) = args.delay {
        config.scanning.request_delay = delay;
    }
    config.validate()?;

    let source = HttpFeedSource::new(&config.scanning)?;
    let base_dir = match &args.dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };

    let runner_config = RunnerConfig {
        app: config,
        base_dir,
        seed: args.seed,
        quiet: cli.quiet,
        color: Paint::detect(cli.no_color).enabled(),
    };

    let summary = Runner::new(runner_config, source).run().await?;
    tracing::debug!(
        "Run summary: {} found, {} failed feeds, {} temp files removed",
        summary.opportunities_found,
        summary.failures.len(),
        summary.cleaned_files.len()
    );

    Ok(())
}

fn run_score(config: &AppConfig, text: &str, paint: &Paint) {
    let scorer = RelevanceScorer::from_profile(&config.user_profile);
    let score = scorer.score(text);
    let tier = RelevanceTier::classify(score);

    println!(
        "Relevance: {} ({})",
        paint.bold(&format!("{:.3}", score), paint.theme.tier(tier)),
        tier
    );
    let matches = scorer.matches(text);
    if matches.is_empty() {
        println!("Matched keywords: none");
    } else {
        println!("Matched keywords: {}", matches.join(", "));
    }
    let verdict = if score >= config.scanning.min_relevance_score {
        paint.color("above threshold", paint.theme.high)
    } else {
        paint.color("below threshold", paint.theme.low)
    };
    println!(
        "Threshold {:.3}: {}",
        config.scanning.min_relevance_score, verdict
    );
}

fn run_preview(config: &AppConfig, file: &Path, paint: &Paint) -> AppResult<()> {
    let xml = std::fs::read_to_string(file)?;
    let feed = parse_feed(&xml)?;
    let scorer = RelevanceScorer::from_profile(&config.user_profile);
    let source = file.display().to_string();
    let opportunities = score_entries(&feed.entries, &source, &scorer, &config.privacy);

    if let Some(title) = &feed.title {
        println!("{}", paint.bold(title, paint.theme.heading));
    }
    println!("{} entries", opportunities.len());
    println!();

    for opportunity in &opportunities {
        let marker = if opportunity.relevance >= config.scanning.min_relevance_score {
            paint.color("+", paint.theme.high)
        } else {
            paint.color("-", paint.theme.muted)
        };
        println!(
            "{} {}  {}",
            marker,
            paint.color(
                &format!("{:.3}", opportunity.relevance),
                paint.theme.tier(opportunity.tier())
            ),
            opportunity.title
        );
    }

    Ok(())
}
