//! The two run stages: resolve curated entries, then fetch metadata for the
//! resolved ids.
//!
//! Both stages run up to `workers` items at once through an ordered stream
//! buffer, so output order always matches input order. All network calls
//! still share the client's throttle and retry contract.

mod stages;

pub use stages::{fetch_stage, load_ids_snapshot, resolve_stage, run_stage, Stage};

use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::fmt;
use tracing::{info, warn};

use crate::bgg::CatalogApi;
use crate::models::{
    parse_lenient_int, CanonicalId, CanonicalRecord, RecordSet, ResolvedEntry, ResultSet,
    SourceEntry,
};
use crate::normalizer::normalize_with_override;
use crate::resolver::{Resolution, Resolver};

/// Per-stage counters for the run summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageSummary {
    pub found: usize,
    pub missing: usize,
    pub failed: usize,
}

impl fmt::Display for StageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "found={} missing={} failed={}",
            self.found, self.missing, self.failed
        )
    }
}

pub async fn resolve_all(
    resolver: &Resolver,
    entries: Vec<SourceEntry>,
    workers: usize,
) -> (ResultSet, StageSummary) {
    let total = entries.len();

    let outcomes: Vec<(ResolvedEntry, Resolution)> = stream::iter(entries.into_iter().enumerate())
        .map(|(index, entry)| async move {
            let resolution = resolver.resolve(&entry).await;
            info!(
                "[{}/{}] {} -> {} id={} {}",
                index + 1,
                total,
                entry.label(),
                resolution.provenance().as_str(),
                resolution
                    .canonical_id()
                    .map_or_else(|| "-".to_string(), |id| id.to_string()),
                resolution.detail()
            );
            let resolved = ResolvedEntry {
                canonical_id: resolution.canonical_id(),
                provenance: resolution.provenance(),
                source: entry,
            };
            (resolved, resolution)
        })
        .buffered(workers.max(1))
        .collect()
        .await;

    let mut summary = StageSummary::default();
    let mut resolved = Vec::with_capacity(outcomes.len());
    for (entry, resolution) in outcomes {
        match resolution {
            Resolution::Found { .. } => summary.found += 1,
            Resolution::NotFound => summary.missing += 1,
            Resolution::Failed(_) => summary.failed += 1,
        }
        resolved.push(entry);
    }

    info!("Resolve stage: {} entries, {}", total, summary);
    (ResultSet::new(resolved), summary)
}

/// What to fetch for one distinct id.
struct FetchJob<'a> {
    id: CanonicalId,
    source: &'a SourceEntry,
}

pub async fn fetch_all(
    api: &dyn CatalogApi,
    results: &ResultSet,
    workers: usize,
) -> (RecordSet, StageSummary) {
    let mut seen = HashSet::new();
    let jobs: Vec<FetchJob> = results
        .entries
        .iter()
        .filter_map(|entry| {
            let id = entry.canonical_id?;
            seen.insert(id).then_some(FetchJob {
                id,
                source: &entry.source,
            })
        })
        .collect();

    let total = jobs.len();
    let fetched: Vec<Option<CanonicalRecord>> = stream::iter(jobs.into_iter().enumerate())
        .map(|(index, job)| async move {
            let record = fetch_one(api, &job).await;
            if let Some(record) = &record {
                info!(
                    "[{}/{}] {} -> {:?}",
                    index + 1,
                    total,
                    job.id,
                    record.name
                );
            }
            record
        })
        .buffered(workers.max(1))
        .collect()
        .await;

    let records: Vec<CanonicalRecord> = fetched.into_iter().flatten().collect();
    let summary = StageSummary {
        found: records.len(),
        missing: 0,
        failed: total - records.len(),
    };

    info!("Fetch stage: {} distinct ids, {}", total, summary);
    (RecordSet::new(records), summary)
}

async fn fetch_one(api: &dyn CatalogApi, job: &FetchJob<'_>) -> Option<CanonicalRecord> {
    let raw = match api.fetch_item(job.id).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Skipping {}: {} ({})", job.id, e, e.kind());
            return None;
        }
    };

    let curated = job.source.image_override.as_deref();
    let record = match normalize_with_override(&raw, curated) {
        Ok(record) => record,
        Err(e) => {
            warn!("Skipping {}: {} ({})", job.id, e, e.kind());
            return None;
        }
    };
    if curated.is_some() {
        return Some(record);
    }

    // The version lookup only runs once the item itself is known to be usable
    match version_image(api, job).await {
        Some(image) => normalize_with_override(&raw, Some(&image)).ok().or(Some(record)),
        None => Some(record),
    }
}

/// Optional enrichment: failures are logged and ignored.
async fn version_image(api: &dyn CatalogApi, job: &FetchJob<'_>) -> Option<String> {
    let raw = job.source.image_version_id.as_deref()?;
    let Some(version_id) = parse_lenient_int(raw).filter(|v| *v > 0) else {
        warn!("{}: ignoring invalid image_version_id {:?}", job.id, raw);
        return None;
    };

    match api.fetch_version_image(version_id as u64).await {
        Ok(image) => image,
        Err(e) => {
            warn!("{}: version {} image lookup failed: {}", job.id, version_id, e);
            None
        }
    }
}
