//! Layered configuration for the scanner.
//!
//! Values are resolved in three layers, later layers winning:
//! 1. Built-in defaults ([`AppConfig::default`])
//! 2. A personal config file (JSON or TOML, chosen by extension)
//! 3. Environment variables of the form `PHD_AUTOPILOT__<SECTION>__<KEY>`
//!
//! Nested tables merge key by key, so a personal file only needs the values
//! it changes. Arrays replace the default array as a whole.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Prefix for environment overrides.
const ENV_PREFIX: &str = "PHD_AUTOPILOT";

/// Upper bound for `request_delay` and `request_timeout`, in seconds.
const MAX_WAIT_SECS: f64 = 86_400.0;

/// Feeds scanned when no personal list is configured.
const DEFAULT_FEEDS: &[&str] = &[
    "https://www.findaphd.com/rss/latestphds.aspx",
    "https://academicpositions.com/find-jobs/rss",
    "https://www.nature.com/nature/articles?type=career-column",
    "https://career.cornell.edu/feed/",
    "https://career.stanford.edu/feed/",
];

const DEFAULT_USER_AGENT: &str = "Academic Research Bot (phd-autopilot)";

/// Errors raised while loading or writing configuration.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("refusing to overwrite existing file: {0}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SettingsResult<T> = Result<T, SettingsError>;

/// Research profile used for relevance scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub research_interests: Vec<String>,
    /// Skill category name to the skills in it
    pub technical_skills: BTreeMap<String, Vec<String>>,
    pub education_level: String,
    pub experience_years: String,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            research_interests: strings(&[
                "Machine Learning",
                "Artificial Intelligence",
                "Data Science",
                "Computer Vision",
                "Deep Learning",
            ]),
            technical_skills: BTreeMap::from([
                (
                    "programming".to_string(),
                    strings(&["Python", "SQL", "R", "C++"]),
                ),
                (
                    "big_data".to_string(),
                    strings(&["Spark", "Hadoop", "HDFS"]),
                ),
                (
                    "ml_frameworks".to_string(),
                    strings(&["TensorFlow", "PyTorch", "scikit-learn"]),
                ),
            ]),
            education_level: "Masters".to_string(),
            experience_years: "5+".to_string(),
        }
    }
}

impl UserProfile {
    /// Every skill across all categories, in category order.
    pub fn all_skills(&self) -> impl Iterator<Item = &str> {
        self.technical_skills
            .values()
            .flat_map(|skills| skills.iter().map(String::as_str))
    }
}

/// Feed scanning behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanningConfig {
    pub feeds: Vec<String>,
    pub max_entries_per_feed: usize,
    /// Seconds to wait before each feed request
    pub request_delay: f64,
    /// Opportunities scoring below this are dropped
    pub min_relevance_score: f64,
    pub max_concurrent_feeds: usize,
    /// Per-request timeout in seconds
    pub request_timeout: f64,
    pub user_agent: String,
}

impl Default for ScanningConfig {
    fn default() -> Self {
        Self {
            feeds: strings(DEFAULT_FEEDS),
            max_entries_per_feed: 10,
            request_delay: 1.0,
            min_relevance_score: 0.4,
            max_concurrent_feeds: 1,
            request_timeout: 30.0,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ScanningConfig {
    /// Delay before each request. Values outside the accepted range are
    /// clamped; NaN becomes zero.
    pub fn request_delay(&self) -> Duration {
        seconds(self.request_delay)
    }

    pub fn request_timeout(&self) -> Duration {
        seconds(self.request_timeout)
    }
}

fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.clamp(0.0, MAX_WAIT_SECS)).unwrap_or(Duration::ZERO)
}

/// Privacy switches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivacyConfig {
    /// Use the long hashed form for opportunity IDs
    pub hash_identifiers: bool,
    /// Log raw feed URLs and error details instead of hashed domains
    pub log_sensitive_data: bool,
    pub clean_temp_files: bool,
    /// Files removed at the end of a run when `clean_temp_files` is set
    pub temp_files: Vec<String>,
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self {
            hash_identifiers: true,
            log_sensitive_data: false,
            clean_temp_files: true,
            temp_files: strings(&["cv_data.json", "sample_cover_letter.txt"]),
        }
    }
}

/// Where run artifacts are written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub output_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            data_dir: PathBuf::from("data"),
        }
    }
}

/// Free-text values substituted into cover letter templates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LetterConfig {
    pub field_interest: String,
    pub technical_domain: String,
    pub technical_skills: String,
    pub research_area: String,
    pub specific_interests: String,
    pub key_skills: String,
    pub matching_skills: String,
}

impl Default for LetterConfig {
    fn default() -> Self {
        Self {
            field_interest: "computer science and artificial intelligence".to_string(),
            technical_domain: "data science and machine learning".to_string(),
            technical_skills: "programming and data analysis".to_string(),
            research_area: "artificial intelligence".to_string(),
            specific_interests: "machine learning applications".to_string(),
            key_skills: "data analysis and algorithm development".to_string(),
            matching_skills: "computational research methods".to_string(),
        }
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub user_profile: UserProfile,
    pub scanning: ScanningConfig,
    pub privacy: PrivacyConfig,
    pub output: OutputConfig,
    pub letter: LetterConfig,
}

impl AppConfig {
    /// Load configuration, failing on any missing or malformed source.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is given but cannot be read or parsed,
    /// or if the merged values fail [`AppConfig::validate`].
    pub fn load(path: Option<&Path>) -> SettingsResult<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&AppConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let merged = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("scanning.feeds"),
            )
            .build()?;

        let config: AppConfig = merged.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults on failure.
    ///
    /// A missing file is expected (most users run with defaults) and only
    /// logged at debug level. A broken file is reported as a warning.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = match path {
            Some(p) if p.exists() => Some(p),
            Some(p) => {
                tracing::debug!("config file {} not found, using defaults", p.display());
                None
            }
            None => None,
        };

        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("config load error: {}. Using defaults.", e);
                Self::default()
            }
        }
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> SettingsResult<()> {
        let scanning = &self.scanning;

        if !(0.0..=1.0).contains(&scanning.min_relevance_score) {
            return Err(SettingsError::Invalid(format!(
                "min_relevance_score must be within [0, 1], got {}",
                scanning.min_relevance_score
            )));
        }
        if scanning.max_entries_per_feed == 0 {
            return Err(SettingsError::Invalid(
                "max_entries_per_feed must be greater than 0".to_string(),
            ));
        }
        if scanning.max_concurrent_feeds == 0 {
            return Err(SettingsError::Invalid(
                "max_concurrent_feeds must be greater than 0".to_string(),
            ));
        }
        for (name, value) in [
            ("request_delay", scanning.request_delay),
            ("request_timeout", scanning.request_timeout),
        ] {
            if Duration::try_from_secs_f64(value).is_err() || value > MAX_WAIT_SECS {
                return Err(SettingsError::Invalid(format!(
                    "{} must be between 0 and {} seconds, got {}",
                    name, MAX_WAIT_SECS, value
                )));
            }
        }

        Ok(())
    }

    /// Sample personal configuration handed out by `init`.
    pub fn template() -> Self {
        let mut config = Self::default();

        config.user_profile = UserProfile {
            research_interests: strings(&[
                "Machine Learning",
                "Artificial Intelligence",
                "Data Science",
                "Computer Vision",
                "Deep Learning",
                "Natural Language Processing",
            ]),
            technical_skills: BTreeMap::from([
                (
                    "programming".to_string(),
                    strings(&["Python", "SQL", "R", "Java", "C++"]),
                ),
                (
                    "big_data".to_string(),
                    strings(&["Spark", "Hadoop", "HDFS", "Kafka"]),
                ),
                (
                    "ml_frameworks".to_string(),
                    strings(&["TensorFlow", "PyTorch", "scikit-learn", "Keras"]),
                ),
                (
                    "tools".to_string(),
                    strings(&["Docker", "Git", "Linux", "AWS", "Azure"]),
                ),
            ]),
            education_level: "Masters".to_string(),
            experience_years: "3+".to_string(),
        };
        config.scanning.request_delay = 2.0;
        config.scanning.min_relevance_score = 0.3;

        config
    }

    /// Write [`AppConfig::template`], as TOML when the path ends in `.toml`
    /// and pretty JSON otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::AlreadyExists`] if the file exists and
    /// `force` is not set.
    pub fn write_template(path: &Path, force: bool) -> SettingsResult<()> {
        if path.exists() && !force {
            return Err(SettingsError::AlreadyExists(path.to_path_buf()));
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let template = Self::template();
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        let contents = if is_toml {
            toml::to_string_pretty(&template)?
        } else {
            serde_json::to_string_pretty(&template)?
        };
        fs::write(path, contents)?;
        Ok(())
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_reference_values() {
        let config = AppConfig::default();
        assert_eq!(config.scanning.max_entries_per_feed, 10);
        assert_eq!(config.scanning.request_delay, 1.0);
        assert_eq!(config.scanning.min_relevance_score, 0.4);
        assert_eq!(config.scanning.feeds.len(), 5);
        assert_eq!(config.user_profile.research_interests.len(), 5);
        assert_eq!(config.user_profile.experience_years, "5+");
        assert!(config.privacy.hash_identifiers);
        assert!(!config.privacy.log_sensitive_data);
        assert!(config.privacy.clean_temp_files);
    }

    #[test]
    fn test_all_skills_flattens_categories() {
        let profile = UserProfile::default();
        let skills: Vec<&str> = profile.all_skills().collect();
        assert_eq!(skills.len(), 10);
        assert!(skills.contains(&"PyTorch"));
        assert!(skills.contains(&"HDFS"));
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config.scanning, ScanningConfig::default());
        assert_eq!(config.user_profile, UserProfile::default());
    }

    #[test]
    fn test_json_file_merges_over_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("my_config.json");
        fs::write(
            &path,
            r#"{
                "scanning": { "min_relevance_score": 0.25, "request_delay": 0 },
                "user_profile": { "research_interests": ["Robotics"] }
            }"#,
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();

        assert_eq!(config.scanning.min_relevance_score, 0.25);
        assert_eq!(config.scanning.request_delay, 0.0);
        // Untouched keys keep their defaults
        assert_eq!(config.scanning.max_entries_per_feed, 10);
        assert_eq!(config.scanning.feeds.len(), 5);
        // Arrays replace rather than extend
        assert_eq!(config.user_profile.research_interests, vec!["Robotics"]);
        assert_eq!(config.user_profile.education_level, "Masters");
    }

    #[test]
    fn test_toml_file_is_supported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("autopilot.toml");
        fs::write(
            &path,
            r#"
                [scanning]
                max_entries_per_feed = 3
                feeds = ["https://example.edu/rss"]

                [privacy]
                hash_identifiers = false
            "#,
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.scanning.max_entries_per_feed, 3);
        assert_eq!(config.scanning.feeds, vec!["https://example.edu/rss"]);
        assert!(!config.privacy.hash_identifiers);
        assert!(config.privacy.clean_temp_files);
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(AppConfig::load(Some(&path)).is_err());
        assert_eq!(AppConfig::load_or_default(Some(&path)), AppConfig::default());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_or_default(Some(Path::new("does/not/exist.json")));
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        let mut config = AppConfig::default();
        config.scanning.min_relevance_score = 1.5;
        assert!(matches!(config.validate(), Err(SettingsError::Invalid(_))));

        let mut config = AppConfig::default();
        config.scanning.max_entries_per_feed = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.scanning.request_delay = -1.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.scanning.max_concurrent_feeds = 0;
        assert!(config.validate().is_err());

        for huge in [1e20, f64::MAX, f64::INFINITY, f64::NAN, MAX_WAIT_SECS + 1.0] {
            let mut config = AppConfig::default();
            config.scanning.request_delay = huge;
            assert!(config.validate().is_err(), "request_delay {} accepted", huge);

            let mut config = AppConfig::default();
            config.scanning.request_timeout = huge;
            assert!(config.validate().is_err(), "request_timeout {} accepted", huge);
        }

        // Every accepted value converts to a Duration without panicking
        let mut config = AppConfig::default();
        config.scanning.request_delay = MAX_WAIT_SECS;
        config.scanning.request_timeout = 0.0;
        assert!(config.validate().is_ok());
        assert_eq!(config.scanning.request_delay(), Duration::from_secs(86_400));
        assert_eq!(config.scanning.request_timeout(), Duration::ZERO);

        // Unvalidated values still convert
        config.scanning.request_delay = 1e20;
        config.scanning.request_timeout = f64::NAN;
        assert_eq!(config.scanning.request_delay(), Duration::from_secs(86_400));
        assert_eq!(config.scanning.request_timeout(), Duration::ZERO);
    }

    #[test]
    fn test_huge_timeout_in_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("huge.toml");
        fs::write(&path, "[scanning]\nrequest_timeout = 1e20\n").unwrap();

        assert!(matches!(
            AppConfig::load(Some(&path)),
            Err(SettingsError::Invalid(_))
        ));
        assert_eq!(AppConfig::load_or_default(Some(&path)), AppConfig::default());
    }

    #[test]
    fn test_template_values() {
        let template = AppConfig::template();
        assert_eq!(template.user_profile.research_interests.len(), 6);
        assert_eq!(template.user_profile.technical_skills.len(), 4);
        assert_eq!(template.user_profile.experience_years, "3+");
        assert_eq!(template.scanning.request_delay, 2.0);
        assert_eq!(template.scanning.min_relevance_score, 0.3);
        assert!(template.validate().is_ok());
    }

    #[test]
    fn test_write_template_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("my_config.json");

        AppConfig::write_template(&path, false).unwrap();
        let written: AppConfig =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, AppConfig::template());

        let err = AppConfig::write_template(&path, false).unwrap_err();
        assert!(matches!(err, SettingsError::AlreadyExists(_)));

        assert!(AppConfig::write_template(&path, true).is_ok());
    }

    #[test]
    fn test_written_template_loads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("my_config.json");
        AppConfig::write_template(&path, false).unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.user_profile.research_interests.len(), 6);
        assert_eq!(config.scanning.min_relevance_score, 0.3);
    }

    #[test]
    fn test_toml_template_round_trips_through_loader() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("autopilot.toml");
        AppConfig::write_template(&path, false).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("[scanning]"));
        assert_eq!(AppConfig::load(Some(&path)).unwrap(), AppConfig::template());
    }

    #[test]
    fn test_error_display() {
        let err = SettingsError::Invalid("bad".to_string());
        assert_eq!(err.to_string(), "invalid configuration: bad");
    }
}
