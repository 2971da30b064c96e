//! Application configuration for InsightMatch.
//!
//! User config lives at `~/.insightmatch/insightmatch.toml`.
//! CLI flags override config file values, which override defaults.
//! API keys are never stored in the file, only the name of the env var
//! that holds them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{InsightMatchError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "insightmatch.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".insightmatch";

// ---------------------------------------------------------------------------
// Config structs (matching insightmatch.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Registry index and filings API.
    #[serde(default)]
    pub registry: RegistrySection,

    /// News-search feed.
    #[serde(default)]
    pub news: NewsSection,

    /// Homepage scraping.
    #[serde(default)]
    pub scraper: ScraperSection,

    /// Fan-out timeouts.
    #[serde(default)]
    pub aggregation: AggregationSection,
}

/// How a registry lookup picks among several qualifying candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchStrategy {
    /// The first candidate in index order that satisfies any rule.
    #[default]
    FirstMatch,
    /// Strongest rule tier, then highest similarity, then index order.
    BestScore,
}

impl std::str::FromStr for MatchStrategy {
    type Err = InsightMatchError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "first-match" => Ok(Self::FirstMatch),
            "best-score" => Ok(Self::BestScore),
            other => Err(InsightMatchError::validation(format!(
                "unknown match strategy '{other}' (expected first-match or best-score)"
            ))),
        }
    }
}

/// `[registry]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySection {
    /// Name of the env var holding the registry API key.
    #[serde(default = "default_registry_key_env")]
    pub api_key_env: String,

    /// Base URL of the registry API.
    #[serde(default = "default_registry_base_url")]
    pub base_url: String,

    #[serde(default = "default_registry_timeout")]
    pub timeout_secs: u64,

    /// How far back to look for filings.
    #[serde(default = "default_window_days")]
    pub window_days: u32,

    /// Maximum filings per aggregation.
    #[serde(default = "default_filing_limit")]
    pub filing_limit: usize,

    /// How long a downloaded registry index is reused.
    #[serde(default = "default_index_ttl")]
    pub index_ttl_secs: u64,

    #[serde(default)]
    pub match_strategy: MatchStrategy,
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            api_key_env: default_registry_key_env(),
            base_url: default_registry_base_url(),
            timeout_secs: default_registry_timeout(),
            window_days: default_window_days(),
            filing_limit: default_filing_limit(),
            index_ttl_secs: default_index_ttl(),
            match_strategy: MatchStrategy::default(),
        }
    }
}

fn default_registry_key_env() -> String {
    "DART_API_KEY".into()
}
fn default_registry_base_url() -> String {
    "https://opendart.fss.or.kr/api".into()
}
fn default_registry_timeout() -> u64 {
    30
}
fn default_window_days() -> u32 {
    365
}
fn default_filing_limit() -> usize {
    10
}
fn default_index_ttl() -> u64 {
    24 * 60 * 60
}

/// `[news]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsSection {
    /// RSS search endpoint.
    #[serde(default = "default_feed_url")]
    pub feed_url: String,

    #[serde(default = "default_news_timeout")]
    pub timeout_secs: u64,

    /// Maximum news items per aggregation.
    #[serde(default = "default_news_limit")]
    pub limit: usize,

    /// Pause between consecutive queries.
    #[serde(default = "default_query_delay")]
    pub query_delay_ms: u64,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_country")]
    pub country: String,
}

impl Default for NewsSection {
    fn default() -> Self {
        Self {
            feed_url: default_feed_url(),
            timeout_secs: default_news_timeout(),
            limit: default_news_limit(),
            query_delay_ms: default_query_delay(),
            language: default_language(),
            country: default_country(),
        }
    }
}

fn default_feed_url() -> String {
    "https://news.google.com/rss/search".into()
}
fn default_news_timeout() -> u64 {
    10
}
fn default_news_limit() -> usize {
    10
}
fn default_query_delay() -> u64 {
    1000
}
fn default_language() -> String {
    "ko".into()
}
fn default_country() -> String {
    "KR".into()
}

/// `[scraper]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperSection {
    #[serde(default = "default_scraper_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wait after failed attempt `n` is `backoff_base_ms * 2^n`.
    #[serde(default = "default_backoff_base")]
    pub backoff_base_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ScraperSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_scraper_timeout(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_scraper_timeout() -> u64 {
    15
}
fn default_max_attempts() -> u32 {
    3
}
fn default_backoff_base() -> u64 {
    1000
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/124.0 Safari/537.36 InsightMatch"
        .into()
}

/// `[aggregation]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationSection {
    /// Upper bound for any single source.
    #[serde(default = "default_source_timeout")]
    pub source_timeout_secs: u64,

    /// Upper bound for the whole aggregation.
    #[serde(default = "default_deadline")]
    pub deadline_secs: u64,
}

impl Default for AggregationSection {
    fn default() -> Self {
        Self {
            source_timeout_secs: default_source_timeout(),
            deadline_secs: default_deadline(),
        }
    }
}

fn default_source_timeout() -> u64 {
    50
}
fn default_deadline() -> u64 {
    60
}

// ---------------------------------------------------------------------------
// Runtime configs (merged from config file + env + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime registry/filings configuration.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Resolved API key; `None` selects the sample-data path.
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
    pub window_days: u32,
    pub filing_limit: usize,
    pub index_ttl: Duration,
    pub match_strategy: MatchStrategy,
}

impl From<&AppConfig> for RegistryConfig {
    fn from(config: &AppConfig) -> Self {
        let section = &config.registry;
        Self {
            api_key: registry_api_key(config),
            base_url: section.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(section.timeout_secs),
            window_days: section.window_days,
            filing_limit: section.filing_limit,
            index_ttl: Duration::from_secs(section.index_ttl_secs),
            match_strategy: section.match_strategy,
        }
    }
}

/// Runtime news configuration.
#[derive(Debug, Clone)]
pub struct NewsConfig {
    pub feed_url: String,
    pub timeout: Duration,
    pub limit: usize,
    pub query_delay: Duration,
    pub language: String,
    pub country: String,
}

impl From<&AppConfig> for NewsConfig {
    fn from(config: &AppConfig) -> Self {
        let section = &config.news;
        Self {
            feed_url: section.feed_url.clone(),
            timeout: Duration::from_secs(section.timeout_secs),
            limit: section.limit,
            query_delay: Duration::from_millis(section.query_delay_ms),
            language: section.language.clone(),
            country: section.country.clone(),
        }
    }
}

/// Runtime scraper configuration.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub timeout: Duration,
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub user_agent: String,
}

impl From<&AppConfig> for ScraperConfig {
    fn from(config: &AppConfig) -> Self {
        let section = &config.scraper;
        Self {
            timeout: Duration::from_secs(section.timeout_secs),
            max_attempts: section.max_attempts.max(1),
            backoff_base: Duration::from_millis(section.backoff_base_ms),
            user_agent: section.user_agent.clone(),
        }
    }
}

impl ScraperConfig {
    /// Longest a homepage fetch can take: every attempt times out, with a
    /// backoff wait between consecutive attempts.
    pub fn worst_case(&self) -> Duration {
        let waits = (0..self.max_attempts.saturating_sub(1))
            .map(|attempt| {
                self.backoff_base
                    .saturating_mul(2u32.saturating_pow(attempt))
            })
            .fold(Duration::ZERO, Duration::saturating_add);
        self.timeout
            .saturating_mul(self.max_attempts)
            .saturating_add(waits)
    }
}

/// Runtime fan-out configuration.
#[derive(Debug, Clone)]
pub struct AggregationConfig {
    pub registry: RegistryConfig,
    pub news: NewsConfig,
    pub scraper: ScraperConfig,
    pub source_timeout: Duration,
    pub deadline: Duration,
}

impl From<&AppConfig> for AggregationConfig {
    /// The source timeout never cuts the scraper short of its last retry,
    /// and the deadline is never shorter than the source timeout.
    fn from(config: &AppConfig) -> Self {
        let scraper = ScraperConfig::from(config);
        let source_timeout = Duration::from_secs(config.aggregation.source_timeout_secs)
            .max(scraper.worst_case());
        let deadline =
            Duration::from_secs(config.aggregation.deadline_secs).max(source_timeout);
        Self {
            registry: RegistryConfig::from(config),
            news: NewsConfig::from(config),
            scraper,
            source_timeout,
            deadline,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.insightmatch/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| InsightMatchError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.insightmatch/insightmatch.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| InsightMatchError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        InsightMatchError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| InsightMatchError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| InsightMatchError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| InsightMatchError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the registry API key from the configured env var.
///
/// A missing or empty variable is not an error: it selects sample filings.
pub fn registry_api_key(config: &AppConfig) -> Option<String> {
    let var_name = &config.registry.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Some(val.trim().to_string()),
        _ => {
            tracing::debug!(%var_name, "registry API key not set");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("DART_API_KEY"));
        assert!(toml_str.contains("first-match"));
        assert!(toml_str.contains("feed_url"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.registry.window_days, 365);
        assert_eq!(parsed.scraper.max_attempts, 3);
        assert_eq!(parsed.news.query_delay_ms, 1000);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[registry]
base_url = "http://localhost:9000/api/"
match_strategy = "best-score"

[news]
limit = 5
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.registry.match_strategy, MatchStrategy::BestScore);
        assert_eq!(config.registry.timeout_secs, 30);
        assert_eq!(config.news.limit, 5);
        assert_eq!(config.news.language, "ko");

        let registry = RegistryConfig::from(&config);
        assert_eq!(registry.base_url, "http://localhost:9000/api");
    }

    #[test]
    fn aggregation_config_from_app_config() {
        let app = AppConfig::default();
        let agg = AggregationConfig::from(&app);
        assert_eq!(agg.deadline, Duration::from_secs(60));
        assert_eq!(agg.source_timeout, Duration::from_secs(50));
        assert_eq!(agg.scraper.backoff_base, Duration::from_millis(1000));
        assert_eq!(agg.news.query_delay, Duration::from_millis(1000));
    }

    #[test]
    fn scraper_worst_case_counts_retries_and_backoff() {
        let scraper = ScraperConfig::from(&AppConfig::default());
        // 3 attempts of 15 s, waits of 1 s and 2 s between them.
        assert_eq!(scraper.worst_case(), Duration::from_secs(48));

        let agg = AggregationConfig::from(&AppConfig::default());
        assert!(agg.source_timeout >= agg.scraper.worst_case());
        assert!(agg.deadline >= agg.source_timeout);
    }

    #[test]
    fn source_timeout_is_raised_to_scraper_worst_case() {
        let mut app = AppConfig::default();
        app.scraper.timeout_secs = 20;
        app.aggregation.source_timeout_secs = 30;
        app.aggregation.deadline_secs = 40;

        let agg = AggregationConfig::from(&app);
        assert_eq!(agg.source_timeout, Duration::from_secs(63));
        assert_eq!(agg.deadline, Duration::from_secs(63));
    }

    #[test]
    fn missing_api_key_is_none() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.registry.api_key_env = "IM_TEST_NONEXISTENT_KEY_12345".into();
        assert!(registry_api_key(&config).is_none());
        assert!(RegistryConfig::from(&config).api_key.is_none());
    }

    #[test]
    fn match_strategy_parses() {
        assert_eq!(
            "best-score".parse::<MatchStrategy>().expect("parse"),
            MatchStrategy::BestScore
        );
        assert!("closest".parse::<MatchStrategy>().is_err());
    }
}
