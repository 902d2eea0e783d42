mod file_config;

pub use file_config::{FileConfig, RetryConfig};

use anyhow::{bail, Result};
use std::path::PathBuf;

pub const DEFAULT_API_BASE: &str = "https://boardgamegeek.com/xmlapi2";
pub const DEFAULT_SEARCH_TYPES: &str = "boardgame,boardgameexpansion";
pub const DEFAULT_USER_AGENT: &str = concat!("game-catalog-sync/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_MIN_SAVE: usize = 5;
pub const DEFAULT_REQUEST_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_TIMEOUT_SEC: u64 = 30;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub manual_csv: PathBuf,
    pub ids_output: PathBuf,
    pub data_output: PathBuf,
    pub api_base: String,
    pub search_types: String,
    pub user_agent: Option<String>,
    pub bearer_token: Option<String>,
    pub api_key: Option<String>,
    pub max_attempts: u32,
    pub min_save_ids: usize,
    pub min_save_records: usize,
    pub timeout_sec: u64,
    pub request_interval_ms: u64,
    pub workers: usize,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            manual_csv: PathBuf::from("data/manual.csv"),
            ids_output: PathBuf::from("data/bgg_ids.json"),
            data_output: PathBuf::from("data/bgg_data.json"),
            api_base: DEFAULT_API_BASE.to_string(),
            search_types: DEFAULT_SEARCH_TYPES.to_string(),
            user_agent: None,
            bearer_token: None,
            api_key: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            min_save_ids: DEFAULT_MIN_SAVE,
            min_save_records: DEFAULT_MIN_SAVE,
            timeout_sec: DEFAULT_TIMEOUT_SEC,
            request_interval_ms: DEFAULT_REQUEST_INTERVAL_MS,
            workers: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub paths: PathSettings,
    pub http: HttpSettings,
    pub retry: RetrySettings,
    /// Result types accepted from the search endpoint.
    pub search_types: Vec<String>,
    /// Minimum resolved entries before `bgg_ids.json` may be replaced.
    pub min_save_ids: usize,
    /// Minimum fetched records before `bgg_data.json` may be replaced.
    pub min_save_records: usize,
    /// Entries in flight at once. 1 keeps the run strictly sequential.
    pub workers: usize,
}

#[derive(Debug, Clone)]
pub struct PathSettings {
    pub manual_csv: PathBuf,
    pub ids_output: PathBuf,
    pub data_output: PathBuf,
}

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub api_base: String,
    pub user_agent: String,
    pub bearer_token: Option<String>,
    pub api_key: Option<String>,
    pub timeout_sec: u64,
    pub request_interval_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            bearer_token: None,
            api_key: None,
            timeout_sec: DEFAULT_TIMEOUT_SEC,
            request_interval_ms: DEFAULT_REQUEST_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub slow_base_delay_ms: u64,
    pub parse_base_delay_ms: u64,
    pub growth: f64,
    pub jitter_low: f64,
    pub jitter_high: f64,
    pub max_delay_ms: Option<u64>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: 1500,
            slow_base_delay_ms: 2500,
            parse_base_delay_ms: 1000,
            growth: 1.7,
            jitter_low: 0.7,
            jitter_high: 1.3,
            max_delay_ms: Some(16_000),
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let paths = PathSettings {
            manual_csv: file
                .manual_csv
                .map(PathBuf::from)
                .unwrap_or_else(|| cli.manual_csv.clone()),
            ids_output: file
                .ids_output
                .map(PathBuf::from)
                .unwrap_or_else(|| cli.ids_output.clone()),
            data_output: file
                .data_output
                .map(PathBuf::from)
                .unwrap_or_else(|| cli.data_output.clone()),
        };

        let search_types = match file.search_types {
            Some(types) => normalize_search_types(types.iter().map(String::as_str))?,
            None => normalize_search_types(cli.search_types.split(','))?,
        };

        let api_base = file
            .api_base
            .unwrap_or_else(|| cli.api_base.clone())
            .trim_end_matches('/')
            .to_string();
        validate_api_base(&api_base)?;

        let user_agent = file
            .user_agent
            .or_else(|| cli.user_agent.clone())
            .map(|ua| ua.trim().to_string())
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        if user_agent.is_empty() {
            bail!("user_agent must not be empty");
        }

        let http = HttpSettings {
            api_base,
            user_agent,
            bearer_token: non_blank(file.bearer_token.or_else(|| cli.bearer_token.clone())),
            api_key: non_blank(file.api_key.or_else(|| cli.api_key.clone())),
            timeout_sec: file.timeout_sec.unwrap_or(cli.timeout_sec),
            request_interval_ms: file.request_interval_ms.unwrap_or(cli.request_interval_ms),
        };
        if http.timeout_sec == 0 {
            bail!("timeout_sec must be at least 1");
        }

        // Retry settings - merge file config with defaults
        let retry_file = file.retry.unwrap_or_default();
        let defaults = RetrySettings::default();
        let retry = RetrySettings {
            max_attempts: retry_file.max_attempts.unwrap_or(cli.max_attempts),
            base_delay_ms: retry_file.base_delay_ms.unwrap_or(defaults.base_delay_ms),
            slow_base_delay_ms: retry_file
                .slow_base_delay_ms
                .unwrap_or(defaults.slow_base_delay_ms),
            parse_base_delay_ms: retry_file
                .parse_base_delay_ms
                .unwrap_or(defaults.parse_base_delay_ms),
            growth: retry_file.growth.unwrap_or(defaults.growth),
            jitter_low: retry_file.jitter_low.unwrap_or(defaults.jitter_low),
            jitter_high: retry_file.jitter_high.unwrap_or(defaults.jitter_high),
            max_delay_ms: match retry_file.max_delay_ms {
                Some(0) => None,
                Some(ms) => Some(ms),
                None => defaults.max_delay_ms,
            },
        };
        validate_retry(&retry)?;

        let workers = file.workers.unwrap_or(cli.workers);
        if workers == 0 {
            bail!("workers must be at least 1");
        }

        Ok(Self {
            paths,
            http,
            retry,
            search_types,
            min_save_ids: file.min_save_ids.unwrap_or(cli.min_save_ids),
            min_save_records: file.min_save_records.unwrap_or(cli.min_save_records),
            workers,
        })
    }
}

fn normalize_search_types<'a>(raw: impl Iterator<Item = &'a str>) -> Result<Vec<String>> {
    let mut types: Vec<String> = Vec::new();
    for token in raw {
        let token = token.trim().to_ascii_lowercase();
        if token.is_empty() {
            continue;
        }
        if !token
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            bail!("Invalid search type: {:?}", token);
        }
        if !types.contains(&token) {
            types.push(token);
        }
    }
    if types.is_empty() {
        bail!("At least one search type must be configured");
    }
    Ok(types)
}

fn validate_api_base(api_base: &str) -> Result<()> {
    match url::Url::parse(api_base) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Ok(()),
        Ok(url) => bail!("api_base must use http or https, got {:?}", url.scheme()),
        Err(e) => bail!("Invalid api_base {:?}: {}", api_base, e),
    }
}

fn validate_retry(retry: &RetrySettings) -> Result<()> {
    if retry.max_attempts == 0 {
        bail!("max_attempts must be at least 1");
    }
    if !(retry.growth > 1.0) {
        bail!("retry growth must be greater than 1.0, got {}", retry.growth);
    }
    if !(retry.jitter_low > 0.0 && retry.jitter_low < retry.jitter_high) {
        bail!(
            "retry jitter band must satisfy 0 < low < high, got [{}, {})",
            retry.jitter_low,
            retry.jitter_high
        );
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
