//! Game Catalog Sync Library
//!
//! Resolves curated board-game entries to BoardGameGeek ids, fetches their
//! metadata, and publishes both snapshots behind a regression guard.

pub mod bgg;
pub mod config;
pub mod error;
pub mod fetch;
pub mod input;
pub mod models;
pub mod normalizer;
pub mod persistence;
pub mod pipeline;
pub mod resolver;

// Re-export commonly used types for convenience
pub use bgg::{BggClient, CatalogApi};
pub use error::ErrorKind;
pub use fetch::{FetchClient, FetchError, RequestThrottle, RetryPolicy};
pub use models::{CanonicalRecord, Provenance, RecordSet, ResolvedEntry, ResultSet, SourceEntry};
pub use persistence::{PersistError, PublishOutcome, SnapshotGuard};
pub use resolver::{Resolution, Resolver};
