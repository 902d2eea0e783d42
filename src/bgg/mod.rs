//! BoardGameGeek XML API v2 client.
//!
//! Only the three calls the pipeline needs are covered: free-text search,
//! item metadata with statistics, and version lookup for alternate images.

mod search;

pub use search::{parse_search_results, SearchCandidate};

use async_trait::async_trait;
use tracing::debug;

use crate::fetch::{FetchClient, FetchError};
use crate::models::CanonicalId;
use crate::normalizer::parse_version_image;

/// The catalog operations the resolver and the fetch stage depend on.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Search by free text, restricted to the configured result types.
    async fn search(&self, query: &str) -> Result<Vec<SearchCandidate>, FetchError>;

    /// Raw metadata document (with statistics) for one item.
    async fn fetch_item(&self, id: CanonicalId) -> Result<String, FetchError>;

    /// Image URL of a specific published version, if it has one.
    async fn fetch_version_image(&self, version_id: u64) -> Result<Option<String>, FetchError>;
}

pub struct BggClient {
    fetch: FetchClient,
    api_base: String,
    search_types: Vec<String>,
}

impl BggClient {
    pub fn new(fetch: FetchClient, api_base: &str, search_types: Vec<String>) -> Self {
        Self {
            fetch,
            api_base: api_base.trim_end_matches('/').to_string(),
            search_types,
        }
    }

    pub fn search_url(&self, query: &str) -> String {
        format!(
            "{}/search?type={}&query={}",
            self.api_base,
            self.search_types.join(","),
            urlencoding::encode(query)
        )
    }

    pub fn item_url(&self, id: CanonicalId) -> String {
        format!("{}/thing?id={}&stats=1", self.api_base, id)
    }

    pub fn version_url(&self, version_id: u64) -> String {
        format!("{}/thing?type=boardgameversion&id={}", self.api_base, version_id)
    }
}

#[async_trait]
impl CatalogApi for BggClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchCandidate>, FetchError> {
        let url = self.search_url(query);
        self.fetch.get_parsed(&url, parse_search_results).await
    }

    async fn fetch_item(&self, id: CanonicalId) -> Result<String, FetchError> {
        self.fetch.get(&self.item_url(id)).await
    }

    async fn fetch_version_image(&self, version_id: u64) -> Result<Option<String>, FetchError> {
        let body = self.fetch.get(&self.version_url(version_id)).await?;
        match parse_version_image(&body) {
            Ok(image) => Ok(image),
            Err(e) => {
                debug!("Unreadable version {} payload: {}", version_id, e);
                Ok(None)
            }
        }
    }
}
