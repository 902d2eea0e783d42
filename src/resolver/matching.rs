//! Scoring of search candidates against a free-text query.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::warn;

use crate::bgg::SearchCandidate;
use crate::models::CanonicalId;

lazy_static! {
    // Whitespace plus the punctuation curators and the catalog disagree on.
    static ref NAME_NOISE: Regex = Regex::new(r#"[\s\-–—:•·.,!"'®™()\[\]{}]"#).unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Prefix,
    Substring,
    /// Nothing matched; the first candidate seen was taken anyway.
    Weak,
}

impl MatchKind {
    pub fn score(&self) -> i32 {
        match self {
            MatchKind::Exact => 3,
            MatchKind::Prefix => 2,
            MatchKind::Substring => 1,
            MatchKind::Weak => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchKind::Exact => "exact",
            MatchKind::Prefix => "prefix",
            MatchKind::Substring => "substring",
            MatchKind::Weak => "weak",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchMatch {
    pub id: CanonicalId,
    pub kind: MatchKind,
}

/// Lowercase, then drop whitespace and [`NAME_NOISE`] characters.
pub fn normalize_name(name: &str) -> String {
    NAME_NOISE.replace_all(&name.to_lowercase(), "").into_owned()
}

/// Choose the best candidate for `query`.
///
/// An exact normalized match returns immediately. Otherwise prefix beats
/// substring beats nothing, and the first candidate wins ties. Candidates with
/// no primary name only count when nothing has been picked yet.
pub fn pick_candidate(
    query: &str,
    candidates: &[SearchCandidate],
    allowed_types: &[String],
) -> Option<SearchMatch> {
    let target = normalize_name(query);
    let mut best: Option<SearchMatch> = None;

    for candidate in candidates {
        if !allowed_types.iter().any(|t| *t == candidate.item_type) {
            continue;
        }

        let Some(name) = candidate.primary_name.as_deref() else {
            if best.is_none() {
                best = Some(SearchMatch {
                    id: candidate.id,
                    kind: MatchKind::Weak,
                });
            }
            continue;
        };

        let primary = normalize_name(name);
        if primary == target {
            return Some(SearchMatch {
                id: candidate.id,
                kind: MatchKind::Exact,
            });
        }

        let kind = if primary.starts_with(&target) {
            MatchKind::Prefix
        } else if primary.contains(&target) {
            MatchKind::Substring
        } else {
            MatchKind::Weak
        };

        let best_score = best.map_or(-1, |b| b.kind.score());
        if kind.score() > best_score {
            best = Some(SearchMatch {
                id: candidate.id,
                kind,
            });
        }
    }

    if let Some(SearchMatch {
        id,
        kind: MatchKind::Weak,
    }) = best
    {
        warn!(
            "Weak match for {:?}: falling back to first candidate {}",
            query, id
        );
    }

    best
}
