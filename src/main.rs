use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use game_catalog_sync::bgg::{BggClient, CatalogApi};
use game_catalog_sync::config::{self, AppConfig};
use game_catalog_sync::fetch::{FetchClient, RequestThrottle, RetryPolicy};
use game_catalog_sync::persistence::PersistError;
use game_catalog_sync::pipeline::{run_stage, Stage};

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("SYNC_GIT_REVISION"),
    ")"
);

/// Legacy name for the ids threshold, read when `BGG_MIN_SAVE_IDS` is unset.
const LEGACY_MIN_SAVE_ENV: &str = "BGG_MIN_SAVE";

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(s);
    if path.is_absolute() {
        return Ok(path);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(path))
}

#[derive(Parser, Debug)]
#[command(version = VERSION, about = "Sync curated board games with BoardGameGeek")]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Curated entries (CSV with a header row).
    #[clap(long, default_value = "data/manual.csv")]
    pub manual_csv: PathBuf,

    /// Where the resolve stage publishes its snapshot.
    #[clap(long, default_value = "data/bgg_ids.json")]
    pub ids_output: PathBuf,

    /// Where the fetch stage publishes its snapshot.
    #[clap(long, default_value = "data/bgg_data.json")]
    pub data_output: PathBuf,

    /// Base URL of the XML API.
    #[clap(long, env = "BGG_API_BASE", default_value = config::DEFAULT_API_BASE)]
    pub api_base: String,

    /// Comma-separated result types accepted from search.
    #[clap(long, env = "BGG_SEARCH_TYPES", default_value = config::DEFAULT_SEARCH_TYPES)]
    pub search_types: String,

    /// User-Agent sent with every request.
    #[clap(long, env = "BGG_UA")]
    pub user_agent: Option<String>,

    /// Bearer token for the Authorization header.
    #[clap(long, env = "BGG_TOKEN", hide_env_values = true)]
    pub bearer_token: Option<String>,

    /// Value for the X-API-Key header.
    #[clap(long, env = "BGG_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Attempts per request, first try included.
    #[clap(long, env = "BGG_RETRY", default_value_t = config::DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,

    /// Resolved entries needed before the ids snapshot is replaced.
    #[clap(long, env = "BGG_MIN_SAVE_IDS")]
    pub min_save_ids: Option<usize>,

    /// Fetched records needed before the data snapshot is replaced.
    #[clap(long, env = "BGG_MIN_SAVE_RECORDS", default_value_t = config::DEFAULT_MIN_SAVE)]
    pub min_save_records: usize,

    /// Request timeout in seconds.
    #[clap(long, default_value_t = config::DEFAULT_TIMEOUT_SEC)]
    pub timeout_sec: u64,

    /// Minimum spacing between requests in milliseconds.
    #[clap(long, default_value_t = config::DEFAULT_REQUEST_INTERVAL_MS)]
    pub request_interval_ms: u64,

    /// Entries processed concurrently. 1 keeps the run sequential.
    #[clap(long, default_value_t = 1)]
    pub workers: usize,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Resolve curated entries to catalog ids and publish the ids snapshot.
    Resolve,

    /// Fetch metadata for the ids snapshot and publish the data snapshot.
    Fetch,

    /// Resolve, then fetch. This is the default.
    Run,
}

impl CliArgs {
    fn to_cli_config(&self) -> Result<config::CliConfig> {
        let min_save_ids = match self.min_save_ids {
            Some(value) => value,
            None => match std::env::var(LEGACY_MIN_SAVE_ENV) {
                Ok(raw) => raw
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid {}: {:?}", LEGACY_MIN_SAVE_ENV, raw))?,
                Err(_) => config::DEFAULT_MIN_SAVE,
            },
        };

        Ok(config::CliConfig {
            manual_csv: self.manual_csv.clone(),
            ids_output: self.ids_output.clone(),
            data_output: self.data_output.clone(),
            api_base: self.api_base.clone(),
            search_types: self.search_types.clone(),
            user_agent: self.user_agent.clone(),
            bearer_token: self.bearer_token.clone(),
            api_key: self.api_key.clone(),
            max_attempts: self.max_attempts,
            min_save_ids,
            min_save_records: self.min_save_records,
            timeout_sec: self.timeout_sec,
            request_interval_ms: self.request_interval_ms,
            workers: self.workers,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    // Load TOML config if provided
    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config = cli_args.to_cli_config()?;
    let app_config = AppConfig::resolve(&cli_config, file_config)?;

    info!("game-catalog-sync {}", VERSION);
    info!("Configuration loaded:");
    info!("  manual_csv: {:?}", app_config.paths.manual_csv);
    info!("  ids_output: {:?}", app_config.paths.ids_output);
    info!("  data_output: {:?}", app_config.paths.data_output);
    info!("  api_base: {}", app_config.http.api_base);
    info!("  search_types: {}", app_config.search_types.join(","));
    info!(
        "  max_attempts: {}, workers: {}",
        app_config.retry.max_attempts, app_config.workers
    );

    let throttle = Arc::new(RequestThrottle::new(Duration::from_millis(
        app_config.http.request_interval_ms,
    )));
    let fetch = FetchClient::new(
        &app_config.http,
        RetryPolicy::new(&app_config.retry),
        throttle,
    )?;
    let api: Arc<dyn CatalogApi> = Arc::new(BggClient::new(
        fetch,
        &app_config.http.api_base,
        app_config.search_types.clone(),
    ));

    let stage = match cli_args.command.unwrap_or(Command::Run) {
        Command::Resolve => Stage::Resolve,
        Command::Fetch => Stage::Fetch,
        Command::Run => Stage::Run,
    };
    let result = run_stage(stage, &app_config, api).await;

    if let Err(e) = &result {
        match e.downcast_ref::<PersistError>().and_then(PersistError::kind) {
            Some(kind) => error!("Run aborted ({}): {}", kind, e),
            None => error!("Run failed: {:#}", e),
        }
    }
    result
}
