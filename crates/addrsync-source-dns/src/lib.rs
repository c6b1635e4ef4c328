// # DNS Address Source
//
// This crate provides an address source that resolves the A and AAAA
// records of a host.
//
// ## Behaviour
//
// - Resolution goes through the system resolver (`tokio::net::lookup_host`)
// - Resolved addresses are deduplicated and returned in ascending order
// - Every record carries the hostname as its external identifier
// - A resolver error fails the fetch; an empty answer is an empty list
//
// ## Configuration
//
// `dns://edge.example.net` or `SourceConfig::Dns { host }`.

use addrsync_core::SyncRegistry;
use addrsync_core::address::AddressFamily;
use addrsync_core::aggregate::SourceRecord;
use addrsync_core::config::SourceConfig;
use addrsync_core::traits::{AddressSource, AddressSourceFactory};
use addrsync_core::{Error, Result};

use std::collections::BTreeSet;
use std::net::IpAddr;

/// A/AAAA records of a host
pub struct DnsSource {
    host: String,
}

impl DnsSource {
    /// Create a new DNS source
    ///
    /// # Parameters
    ///
    /// - `host`: Hostname to resolve (an IP literal resolves to itself)
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    /// Hostname being resolved
    pub fn host(&self) -> &str {
        &self.host
    }
}

/// Turn resolved addresses into records labelled with the host
fn records_for(host: &str, addresses: impl IntoIterator<Item = IpAddr>) -> Vec<SourceRecord> {
    let unique: BTreeSet<IpAddr> = addresses.into_iter().collect();

    unique
        .into_iter()
        .map(|ip| {
            let family = if ip.is_ipv4() {
                AddressFamily::V4
            } else {
                AddressFamily::V6
            };
            SourceRecord::new(ip.to_string())
                .with_id(host)
                .with_family(family)
        })
        .collect()
}

#[async_trait::async_trait]
impl AddressSource for DnsSource {
    async fn fetch(&self) -> Result<Vec<SourceRecord>> {
        let resolved = tokio::net::lookup_host((self.host.as_str(), 0))
            .await
            .map_err(|e| Error::source_fetch(&self.host, format!("Resolution failed: {}", e)))?;

        let records = records_for(&self.host, resolved.map(|addr| addr.ip()));
        if records.is_empty() {
            tracing::warn!("{} resolved to no addresses", self.host);
        } else {
            tracing::debug!("{} resolved to {} addresses", self.host, records.len());
        }
        Ok(records)
    }

    fn source_name(&self) -> &str {
        &self.host
    }
}

/// Factory for creating DNS sources
pub struct DnsFactory;

impl AddressSourceFactory for DnsFactory {
    fn create(&self, config: &SourceConfig) -> Result<Box<dyn AddressSource>> {
        match config {
            SourceConfig::Dns { host } => Ok(Box::new(DnsSource::new(host.clone()))),
            _ => Err(Error::config("Invalid config for DNS source")),
        }
    }
}

/// Register the DNS source with a registry
pub fn register(registry: &SyncRegistry) {
    registry.register_source("dns", Box::new(DnsFactory));
}
