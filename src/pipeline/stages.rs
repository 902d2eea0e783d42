//! Stage wiring: read inputs, run a pipeline stage, publish behind the guard.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::{fetch_all, resolve_all};
use crate::bgg::CatalogApi;
use crate::config::AppConfig;
use crate::input::read_manual_csv;
use crate::models::ResultSet;
use crate::persistence::{PublishOutcome, SnapshotGuard};
use crate::resolver::Resolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolve,
    Fetch,
    /// Resolve, then fetch.
    Run,
}

pub async fn run_stage(
    stage: Stage,
    app_config: &AppConfig,
    api: Arc<dyn CatalogApi>,
) -> Result<()> {
    match stage {
        Stage::Resolve => resolve_stage(app_config, api).await.map(|_| ()),
        Stage::Fetch => fetch_stage(app_config, api.as_ref()).await.map(|_| ()),
        Stage::Run => {
            resolve_stage(app_config, api.clone()).await?;
            fetch_stage(app_config, api.as_ref()).await.map(|_| ())
        }
    }
}

pub async fn resolve_stage(
    app_config: &AppConfig,
    api: Arc<dyn CatalogApi>,
) -> Result<PublishOutcome> {
    let entries = read_manual_csv(&app_config.paths.manual_csv)?;
    let resolver = Resolver::new(api, app_config.search_types.clone());

    let (results, _) = resolve_all(&resolver, entries, app_config.workers).await;

    let guard = SnapshotGuard::new(&app_config.paths.ids_output, app_config.min_save_ids);
    let outcome = guard.publish(&results, results.resolved_count())?;
    report(outcome, &guard);
    Ok(outcome)
}

/// Reads the published ids snapshot, so a rejected resolve run falls back to
/// the previous good one.
pub async fn fetch_stage(app_config: &AppConfig, api: &dyn CatalogApi) -> Result<PublishOutcome> {
    let results = load_ids_snapshot(&app_config.paths.ids_output)?;

    let (records, _) = fetch_all(api, &results, app_config.workers).await;

    let guard = SnapshotGuard::new(&app_config.paths.data_output, app_config.min_save_records);
    let outcome = guard.publish(&records, records.len())?;
    report(outcome, &guard);
    Ok(outcome)
}

pub fn load_ids_snapshot(path: &Path) -> Result<ResultSet> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read ids snapshot {:?}", path))?;
    let results: ResultSet = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse ids snapshot {:?}", path))?;
    info!(
        "Loaded {} entries ({} resolved) from {:?}",
        results.len(),
        results.resolved_count(),
        path
    );
    Ok(results)
}

fn report(outcome: PublishOutcome, guard: &SnapshotGuard) {
    match outcome {
        PublishOutcome::Published => info!("Published {:?}", guard.path()),
        PublishOutcome::Rejected => info!(
            "Kept previous {:?} (threshold {})",
            guard.path(),
            guard.threshold()
        ),
    }
}
