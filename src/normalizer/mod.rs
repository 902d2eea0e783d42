//! Turns item metadata documents into [`CanonicalRecord`]s.
//!
//! Only the id is mandatory. Everything else is extracted independently, so a
//! broken statistics block or a missing image never costs the rest of the
//! record.

mod image_url;

pub use image_url::normalize_image_url;

use crate::error::ErrorKind;
use crate::models::{CanonicalId, CanonicalRecord};
use roxmltree::Node;
use thiserror::Error;
use tracing::debug;

const CATEGORY_LINK: &str = "boardgamecategory";
const MECHANIC_LINK: &str = "boardgamemechanic";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("payload has no item element")]
    MissingItem,

    #[error("item has no valid id (got {0:?})")]
    InvalidId(Option<String>),
}

impl ParseError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Parse
    }
}

/// Parse one metadata payload.
pub fn normalize(raw: &str) -> Result<CanonicalRecord, ParseError> {
    normalize_with_override(raw, None)
}

/// Parse one metadata payload, preferring `image_override` (already resolved
/// upstream, e.g. a version image) over the item's own image fields.
pub fn normalize_with_override(
    raw: &str,
    image_override: Option<&str>,
) -> Result<CanonicalRecord, ParseError> {
    let doc = roxmltree::Document::parse(raw)?;
    let item = first_item(&doc)?;

    let id_attr = item.attribute("id");
    let canonical_id: CanonicalId = id_attr
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|id| *id > 0)
        .ok_or_else(|| ParseError::InvalidId(id_attr.map(str::to_string)))?;

    let name = item
        .children()
        .filter(|n| n.has_tag_name("name"))
        .find(|n| n.attribute("type") == Some("primary"))
        .and_then(|n| n.attribute("value"))
        .unwrap_or_default()
        .to_string();

    let image_field = child_text(item, "image").and_then(normalize_image_url);
    let thumbnail = child_text(item, "thumbnail").and_then(normalize_image_url);
    let image = image_override
        .and_then(normalize_image_url)
        .or(image_field)
        .or_else(|| thumbnail.clone());

    let ratings = item
        .children()
        .find(|n| n.has_tag_name("statistics"))
        .and_then(|stats| stats.children().find(|n| n.has_tag_name("ratings")));

    let mut record = CanonicalRecord {
        canonical_id,
        name,
        image,
        thumbnail,
        ..Default::default()
    };

    if let Some(ratings) = ratings {
        record.rating_avg = stat_f64(ratings, "average", canonical_id);
        record.rating_bayes = stat_f64(ratings, "bayesaverage", canonical_id);
        record.users_rated = stat_f64(ratings, "usersrated", canonical_id)
            .filter(|v| *v >= 0.0)
            .map(|v| v.round() as u64);
        record.weight = stat_f64(ratings, "averageweight", canonical_id);
    }

    for link in item.children().filter(|n| n.has_tag_name("link")) {
        let Some(value) = link.attribute("value").map(str::trim).filter(|v| !v.is_empty()) else {
            continue;
        };
        match link.attribute("type") {
            Some(CATEGORY_LINK) => {
                record.categories.insert(value.to_string());
            }
            Some(MECHANIC_LINK) => {
                record.mechanisms.insert(value.to_string());
            }
            _ => {}
        }
    }

    Ok(record)
}

/// Image URL of a version payload: `image`, falling back to `thumbnail`.
pub fn parse_version_image(raw: &str) -> Result<Option<String>, ParseError> {
    let doc = roxmltree::Document::parse(raw)?;
    let item = first_item(&doc)?;
    Ok(child_text(item, "image")
        .and_then(normalize_image_url)
        .or_else(|| child_text(item, "thumbnail").and_then(normalize_image_url)))
}

fn first_item<'a, 'input>(
    doc: &'a roxmltree::Document<'input>,
) -> Result<Node<'a, 'input>, ParseError> {
    let root = doc.root_element();
    if root.has_tag_name("item") {
        return Ok(root);
    }
    root.children()
        .find(|n| n.has_tag_name("item"))
        .ok_or(ParseError::MissingItem)
}

fn child_text<'a>(node: Node<'a, '_>, tag: &str) -> Option<&'a str> {
    node.children()
        .find(|n| n.has_tag_name(tag))
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Numeric statistic from the `value` attribute, with the element text as a
/// fallback. Unparseable values are dropped on their own.
fn stat_f64(ratings: Node, tag: &str, id: CanonicalId) -> Option<f64> {
    let node = ratings.children().find(|n| n.has_tag_name(tag))?;
    let raw = node.attribute("value").or_else(|| node.text())?.trim();
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => {
            debug!("Item {}: ignoring unparseable {} value {:?}", id, tag, raw);
            None
        }
    }
}
