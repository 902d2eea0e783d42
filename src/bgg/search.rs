//! Parsing of `/search` responses.

use crate::models::CanonicalId;
use crate::normalizer::ParseError;
use tracing::debug;

/// One item returned by the search endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCandidate {
    pub id: CanonicalId,
    /// Declared result type, e.g. `boardgame`.
    pub item_type: String,
    /// Value of the first `name` element flagged `primary`, if any.
    pub primary_name: Option<String>,
}

/// Parse a search response into candidates, in document order.
///
/// Items without a usable id are dropped; a document that is not XML at all
/// is an error so the caller can retry.
pub fn parse_search_results(xml: &str) -> Result<Vec<SearchCandidate>, ParseError> {
    let doc = roxmltree::Document::parse(xml)?;

    let candidates = doc
        .root_element()
        .children()
        .filter(|n| n.has_tag_name("item"))
        .filter_map(|item| {
            let id = match item.attribute("id").and_then(|v| v.trim().parse::<u64>().ok()) {
                Some(id) if id > 0 => id,
                _ => {
                    debug!("Skipping search item without a valid id");
                    return None;
                }
            };
            let primary_name = item
                .children()
                .filter(|n| n.has_tag_name("name"))
                .find(|n| n.attribute("type") == Some("primary"))
                .and_then(|n| n.attribute("value"))
                .map(str::to_string);
            Some(SearchCandidate {
                id,
                item_type: item.attribute("type").unwrap_or_default().to_string(),
                primary_name,
            })
        })
        .collect();

    Ok(candidates)
}
