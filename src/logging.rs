//! Diagnostic logging for the scanner.
//!
//! Log records go to stderr so that the dashboard, scores, and letters printed
//! on stdout stay pipeable. `RUST_LOG` always takes precedence over the level
//! chosen on the command line.

use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

/// Log level selected from command line flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    /// Default level when no flag is given
    #[default]
    Info,
    Warn,
    Error,
    /// Disable logging entirely
    Off,
}

impl LogLevel {
    /// Resolve the level from `--quiet` and the `-v` count.
    ///
    /// Quiet mode keeps errors visible; it only silences progress chatter.
    pub fn from_flags(quiet: bool, verbosity: u8) -> Self {
        if quiet {
            LogLevel::Error
        } else {
            LogLevel::from(verbosity)
        }
    }

    fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error | LogLevel::Off => Level::ERROR,
        }
    }
}

impl From<u8> for LogLevel {
    /// 0 = Info, 1 = Debug, 2+ = Trace
    fn from(verbosity: u8) -> Self {
        match verbosity {
            0 => LogLevel::Info,
            1 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

/// Subscriber settings.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub with_timestamps: bool,
    /// Include the module path of each record
    pub with_target: bool,
    pub with_ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            with_timestamps: true,
            with_target: false,
            with_ansi: true,
        }
    }
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.with_timestamps = enabled;
        self
    }

    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }

    pub fn with_ansi(mut self, enabled: bool) -> Self {
        self.with_ansi = enabled;
        self
    }

    /// Build a configuration straight from the CLI flags.
    pub fn from_flags(quiet: bool, verbosity: u8) -> Self {
        Self::default()
            .with_level(LogLevel::from_flags(quiet, verbosity))
            .with_target(verbosity >= 2)
    }
}

/// Install the global subscriber.
///
/// Calling this twice is harmless: the second installation is ignored, which
/// keeps integration tests that share a process from panicking.
///
/// ```no_run
/// use phd_autopilot::logging::{init_logging, LoggingConfig, LogLevel};
///
/// init_logging(LoggingConfig::new().with_level(LogLevel::Debug));
/// ```
pub fn init_logging(config: LoggingConfig) {
    let env_filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(config.level.as_directive())
    };

    let builder = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(config.with_target)
        .with_ansi(config.with_ansi);

    let result = if config.with_timestamps {
        builder.try_init()
    } else {
        builder.without_time().try_init()
    };

    if result.is_err() {
        tracing::debug!("logging subscriber already installed");
    }
}
