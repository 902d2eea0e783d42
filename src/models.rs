//! Data model shared by the resolve and fetch stages.
//!
//! Field names on the wire follow the JSON files the rest of the site tooling
//! consumes (`bgg_id`, `bgg_query`, ...), so the Rust names and the serialized
//! names differ in a few places.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

/// Numeric identifier issued by the catalog service for one item.
pub type CanonicalId = u64;

/// A curated input row. Every field is optional and the core never mutates it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceEntry {
    #[serde(deserialize_with = "trimmed")]
    pub name_zh: Option<String>,
    #[serde(deserialize_with = "trimmed")]
    pub name_en_override: Option<String>,
    #[serde(deserialize_with = "trimmed")]
    pub alias_zh: Option<String>,
    #[serde(deserialize_with = "trimmed")]
    pub category_zh: Option<String>,

    // Opaque to the core, carried through to the output.
    #[serde(deserialize_with = "lenient_int")]
    pub price_msrp_twd: Option<i64>,
    #[serde(deserialize_with = "lenient_int")]
    pub price_twd: Option<i64>,
    #[serde(deserialize_with = "lenient_int")]
    pub used_price_twd: Option<i64>,
    #[serde(deserialize_with = "trimmed")]
    pub price_note: Option<String>,
    #[serde(deserialize_with = "trimmed")]
    pub used_note: Option<String>,
    #[serde(deserialize_with = "lenient_int")]
    pub stock: Option<i64>,
    #[serde(deserialize_with = "trimmed")]
    pub manual_override: Option<String>,
    #[serde(deserialize_with = "trimmed")]
    pub description: Option<String>,
    #[serde(deserialize_with = "trimmed")]
    pub link_override: Option<String>,

    /// Identifier typed in by the curator. Kept as text; the resolver decides
    /// whether it is usable.
    #[serde(
        rename(serialize = "explicit_id", deserialize = "bgg_id"),
        alias = "explicit_id",
        deserialize_with = "trimmed_text"
    )]
    pub explicit_id: Option<String>,
    #[serde(rename = "bgg_query", deserialize_with = "trimmed_text")]
    pub free_text_query: Option<String>,
    #[serde(rename = "bgg_url_override", deserialize_with = "trimmed_text")]
    pub url_override: Option<String>,
    #[serde(deserialize_with = "trimmed_text")]
    pub image_override: Option<String>,
    #[serde(deserialize_with = "trimmed_text")]
    pub image_version_id: Option<String>,
}

impl SourceEntry {
    /// Best human-readable label for log lines.
    pub fn label(&self) -> &str {
        self.name_zh
            .as_deref()
            .or(self.name_en_override.as_deref())
            .or(self.free_text_query.as_deref())
            .or(self.url_override.as_deref())
            .or(self.explicit_id.as_deref())
            .unwrap_or("<unnamed>")
    }
}

/// Which resolution method produced the canonical id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    UrlOverride,
    ExplicitId,
    SearchMatch,
    #[default]
    Unresolved,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::UrlOverride => "url_override",
            Provenance::ExplicitId => "explicit_id",
            Provenance::SearchMatch => "search_match",
            Provenance::Unresolved => "unresolved",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedEntry {
    #[serde(flatten)]
    pub source: SourceEntry,
    #[serde(rename = "bgg_id", default, skip_serializing_if = "Option::is_none")]
    pub canonical_id: Option<CanonicalId>,
    #[serde(default)]
    pub provenance: Provenance,
}

impl ResolvedEntry {
    pub fn unresolved(source: SourceEntry) -> Self {
        Self {
            source,
            canonical_id: None,
            provenance: Provenance::Unresolved,
        }
    }
}

/// Output of the resolve stage, in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultSet {
    pub entries: Vec<ResolvedEntry>,
}

impl ResultSet {
    pub fn new(entries: Vec<ResolvedEntry>) -> Self {
        Self { entries }
    }

    pub fn resolved_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.canonical_id.is_some())
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Canonical metadata for one catalog item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    #[serde(rename = "bgg_id")]
    pub canonical_id: CanonicalId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub rating_avg: Option<f64>,
    #[serde(default)]
    pub rating_bayes: Option<f64>,
    #[serde(default)]
    pub users_rated: Option<u64>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub categories: BTreeSet<String>,
    #[serde(default)]
    pub mechanisms: BTreeSet<String>,
}

/// Output of the fetch stage, in first-seen id order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordSet {
    pub records: Vec<CanonicalRecord>,
}

impl RecordSet {
    pub fn new(records: Vec<CanonicalRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Parses integers the way curators type them: `"1200"`, `"1200.0"`, `" 7 "`.
/// Blank and `none` are absent.
pub fn parse_lenient_int(raw: &str) -> Option<i64> {
    let s = raw.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("none") {
        return None;
    }
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    s.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && v.abs() < i64::MAX as f64)
        .map(|v| v.trunc() as i64)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseScalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

fn lenient_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(match Option::<LooseScalar>::deserialize(deserializer)? {
        Some(LooseScalar::Int(v)) => Some(v),
        Some(LooseScalar::Float(v)) if v.is_finite() => Some(v.trunc() as i64),
        Some(LooseScalar::Text(s)) => parse_lenient_int(&s),
        _ => None,
    })
}

fn trimmed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?
        .map(|v| v.trim().to_string())
        .filter(|s| !s.is_empty()))
}

/// Like [`trimmed`], but also treats the literal `none` as absent.
fn trimmed_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(trimmed(deserializer)?.filter(|s| !s.eq_ignore_ascii_case("none")))
}
