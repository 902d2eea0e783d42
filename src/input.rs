//! Reading the curated entry sheet.

use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim};
use std::path::Path;
use tracing::{info, warn};

use crate::models::SourceEntry;

const UTF8_BOM: char = '\u{feff}';

/// Load curated entries from a CSV file with a header row.
///
/// Unknown columns are ignored and blank cells are absent. A missing file is
/// not an error: it yields no entries and the snapshot guard decides what
/// happens next.
pub fn read_manual_csv(path: &Path) -> Result<Vec<SourceEntry>> {
    if !path.exists() {
        warn!("{:?} not found, continuing with no entries", path);
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let entries = parse_manual_csv(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    info!("Loaded {} entries from {:?}", entries.len(), path);
    Ok(entries)
}

pub fn parse_manual_csv(content: &str) -> Result<Vec<SourceEntry>> {
    let content = content.strip_prefix(UTF8_BOM).unwrap_or(content);

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(content.as_bytes());

    let mut entries = Vec::new();
    for (line_num, result) in reader.deserialize().enumerate() {
        // +2: 1-indexed plus the header row
        let entry: SourceEntry =
            result.with_context(|| format!("Failed to parse CSV line {}", line_num + 2))?;
        entries.push(entry);
    }
    Ok(entries)
}
