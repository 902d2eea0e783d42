//! Maps curated entries to canonical catalog ids.
//!
//! Sources are tried in a fixed order: URL override, explicit id, free-text
//! search. The first one that yields an id wins and the rest are never
//! consulted.

mod matching;

pub use matching::{normalize_name, pick_candidate, MatchKind, SearchMatch};

use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::bgg::CatalogApi;
use crate::error::ErrorKind;
use crate::models::{parse_lenient_int, CanonicalId, Provenance, SourceEntry};

/// Outcome of resolving one entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Found {
        id: CanonicalId,
        provenance: Provenance,
        /// Set for search matches only.
        matched: Option<MatchKind>,
    },
    NotFound,
    /// The search call itself failed. Treated as a miss for the entry.
    Failed(ErrorKind),
}

impl Resolution {
    pub fn canonical_id(&self) -> Option<CanonicalId> {
        match self {
            Resolution::Found { id, .. } => Some(*id),
            _ => None,
        }
    }

    pub fn provenance(&self) -> Provenance {
        match self {
            Resolution::Found { provenance, .. } => *provenance,
            _ => Provenance::Unresolved,
        }
    }

    /// Short reason for audit lines.
    pub fn detail(&self) -> String {
        match self {
            Resolution::Found {
                matched: Some(kind),
                ..
            } => format!("score={} ({})", kind.score(), kind.as_str()),
            Resolution::Found { .. } => "direct".to_string(),
            Resolution::NotFound => ErrorKind::ResolutionMiss.to_string(),
            Resolution::Failed(kind) => format!("failed: {}", kind),
        }
    }
}

pub struct Resolver {
    api: Arc<dyn CatalogApi>,
    search_types: Vec<String>,
}

impl Resolver {
    pub fn new(api: Arc<dyn CatalogApi>, search_types: Vec<String>) -> Self {
        Self { api, search_types }
    }

    pub async fn resolve(&self, entry: &SourceEntry) -> Resolution {
        if let Some(id) = entry.url_override.as_deref().and_then(extract_id_from_url) {
            return Resolution::Found {
                id,
                provenance: Provenance::UrlOverride,
                matched: None,
            };
        }

        if let Some(id) = entry.explicit_id.as_deref().and_then(parse_explicit_id) {
            return Resolution::Found {
                id,
                provenance: Provenance::ExplicitId,
                matched: None,
            };
        }

        let Some(query) = entry.free_text_query.as_deref() else {
            return Resolution::NotFound;
        };

        let candidates = match self.api.search(query).await {
            Ok(candidates) => candidates,
            Err(e) => {
                debug!("Search for {:?} failed: {}", query, e);
                return Resolution::Failed(e.kind());
            }
        };

        match pick_candidate(query, &candidates, &self.search_types) {
            Some(found) => Resolution::Found {
                id: found.id,
                provenance: Provenance::SearchMatch,
                matched: Some(found.kind),
            },
            None => Resolution::NotFound,
        }
    }
}

/// Last path segment made only of digits. Query and fragment are ignored, and
/// a link pasted without a scheme is read as https.
pub fn extract_id_from_url(raw: &str) -> Option<CanonicalId> {
    let raw = raw.trim();
    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) if !raw.is_empty() => {
            Url::parse(&format!("https://{}", raw.trim_start_matches('/'))).ok()?
        }
        Err(_) => return None,
    };
    url.path_segments()?
        .filter(|segment| !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()))
        .last()
        .and_then(|segment| segment.parse::<u64>().ok())
        .filter(|id| *id > 0)
}

/// Positive integer id, accepting fractional text such as `"13.0"`.
pub fn parse_explicit_id(raw: &str) -> Option<CanonicalId> {
    parse_lenient_int(raw)
        .filter(|id| *id > 0)
        .map(|id| id as CanonicalId)
}
