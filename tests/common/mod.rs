//! Common test infrastructure
//!
//! End-to-end tests talk to a [`MockCatalog`], a local HTTP server that
//! mimics the catalog XML API with scripted responses per request.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{catalog_client, search_xml, MockCatalog};
//!
//! #[tokio::test]
//! async fn test_search() {
//!     let mock = MockCatalog::spawn().await;
//!     mock.script_search("Catan", vec![(200, search_xml(&[(13, "CATAN")]))]);
//!     let client = catalog_client(&mock);
//! }
//! ```

mod fixtures;
mod server;

#[allow(unused_imports)]
pub use fixtures::*;
pub use server::MockCatalog;

use game_catalog_sync::bgg::BggClient;
use game_catalog_sync::config::{HttpSettings, RetrySettings};
use game_catalog_sync::fetch::{FetchClient, RequestThrottle, RetryPolicy};
use std::sync::Arc;

pub const TEST_USER_AGENT: &str = "e2e-agent/1.0";
pub const TEST_TOKEN: &str = "e2e-token";
pub const TEST_API_KEY: &str = "e2e-key";
pub const TEST_MAX_ATTEMPTS: u32 = 3;

/// Retry settings with millisecond delays so retry tests stay fast.
pub fn fast_retry() -> RetrySettings {
    RetrySettings {
        max_attempts: TEST_MAX_ATTEMPTS,
        base_delay_ms: 1,
        slow_base_delay_ms: 2,
        parse_base_delay_ms: 1,
        growth: 1.5,
        jitter_low: 0.9,
        jitter_high: 1.1,
        max_delay_ms: Some(10),
    }
}

pub fn test_http_settings(mock: &MockCatalog) -> HttpSettings {
    HttpSettings {
        api_base: mock.api_base(),
        user_agent: TEST_USER_AGENT.to_string(),
        bearer_token: Some(TEST_TOKEN.to_string()),
        api_key: Some(TEST_API_KEY.to_string()),
        timeout_sec: 5,
        request_interval_ms: 0,
    }
}

/// A catalog client pointed at `mock`, restricted to board games and
/// expansions.
pub fn catalog_client(mock: &MockCatalog) -> BggClient {
    let settings = test_http_settings(mock);
    let fetch = FetchClient::new(
        &settings,
        RetryPolicy::new(&fast_retry()),
        Arc::new(RequestThrottle::disabled()),
    )
    .expect("Failed to build fetch client");
    BggClient::new(
        fetch,
        &settings.api_base,
        vec!["boardgame".to_string(), "boardgameexpansion".to_string()],
    )
}
