use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Paths (can override CLI)
    pub manual_csv: Option<String>,
    pub ids_output: Option<String>,
    pub data_output: Option<String>,

    // Catalog service
    pub api_base: Option<String>,
    pub search_types: Option<Vec<String>>,
    pub user_agent: Option<String>,
    pub bearer_token: Option<String>,
    pub api_key: Option<String>,
    pub timeout_sec: Option<u64>,
    pub request_interval_ms: Option<u64>,
    pub workers: Option<usize>,

    // Regression guard
    pub min_save_ids: Option<usize>,
    pub min_save_records: Option<usize>,

    // Feature configs
    pub retry: Option<RetryConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub slow_base_delay_ms: Option<u64>,
    pub parse_base_delay_ms: Option<u64>,
    pub growth: Option<f64>,
    pub jitter_low: Option<f64>,
    pub jitter_high: Option<f64>,
    /// 0 disables the cap.
    pub max_delay_ms: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::parse(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_file() {
        let config = FileConfig::parse(
            r#"
            manual_csv = "input/manual.csv"
            search_types = ["boardgame"]
            workers = 2
            min_save_ids = 10

            [retry]
            max_attempts = 8
            growth = 2.0
            max_delay_ms = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.manual_csv.as_deref(), Some("input/manual.csv"));
        assert_eq!(config.search_types, Some(vec!["boardgame".to_string()]));
        assert_eq!(config.workers, Some(2));
        assert_eq!(config.min_save_ids, Some(10));
        let retry = config.retry.unwrap();
        assert_eq!(retry.max_attempts, Some(8));
        assert_eq!(retry.growth, Some(2.0));
        assert_eq!(retry.max_delay_ms, Some(0));
        assert!(retry.jitter_low.is_none());
    }

    #[test]
    fn test_parse_empty_file() {
        let config = FileConfig::parse("").unwrap();
        assert!(config.manual_csv.is_none());
        assert!(config.retry.is_none());
    }

    #[test]
    fn test_parse_rejects_wrong_types() {
        assert!(FileConfig::parse("workers = \"many\"").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = FileConfig::load(Path::new("/nonexistent/sync.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
