//! HTTP adapters.
//!
//! - `HttpSnapshotFetcher` - Authoritative session snapshot reads

mod snapshot_fetcher;

pub use snapshot_fetcher::{HttpSnapshotFetcher, SnapshotFetcherConfig, DEFAULT_SNAPSHOT_PATH};
