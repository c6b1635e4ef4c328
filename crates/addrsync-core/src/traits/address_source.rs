// # Address Source Trait
//
// Defines the interface for fetching desired addresses from an external
// source (static list, HTTP line list, JSON feed, DNS resolution).
//
// ## Implementations
//
// - Static list: `addrsync_core::sources::StaticSource`
// - HTTP line list and JSON feed: `addrsync-source-http` crate
// - DNS A/AAAA: `addrsync-source-dns` crate
//
// ## Usage
//
// ```rust,ignore
// use addrsync_core::AddressSource;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* AddressSource implementation */;
//
//     let records = source.fetch().await?;
//     println!("{} returned {} records", source.source_name(), records.len());
//
//     Ok(())
// }
// ```

use crate::aggregate::SourceRecord;
use async_trait::async_trait;

/// Trait for address source implementations
///
/// A source is a single-shot fetch: one call, one list. Results of all
/// configured sources are collected before aggregation, so sources may be
/// fetched concurrently.
///
/// ## Allowed
/// - Perform the I/O needed to reach their endpoint (HTTP, DNS)
/// - Apply a request timeout
///
/// ## Not allowed
/// - Retry or back off (a failed fetch aborts the run)
/// - Normalize, sort or deduplicate (owned by the aggregator)
/// - Touch the device
#[async_trait]
pub trait AddressSource: Send + Sync {
    /// Fetch the current list of addresses
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<SourceRecord>)`: Raw records, in source order
    /// - `Err(Error)`: The fetch failed; the whole run must be aborted
    async fn fetch(&self) -> Result<Vec<SourceRecord>, crate::Error>;

    /// Label for logs and descriptions (URL, host, "static")
    fn source_name(&self) -> &str;
}

/// Helper trait for constructing address sources from configuration
pub trait AddressSourceFactory: Send + Sync {
    /// Create an AddressSource instance from configuration
    fn create(
        &self,
        config: &crate::config::SourceConfig,
    ) -> Result<Box<dyn AddressSource>, crate::Error>;
}
