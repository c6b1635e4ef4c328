// # Static Source
//
// An AddressSource that returns a fixed list of addresses. Used for
// embedding, tests and for pinning addresses that no feed publishes.

use async_trait::async_trait;

use crate::Error;
use crate::aggregate::SourceRecord;
use crate::config::SourceConfig;
use crate::traits::address_source::{AddressSource, AddressSourceFactory};

/// Fixed list of addresses
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    records: Vec<SourceRecord>,
}

impl StaticSource {
    /// Create a source from raw addresses
    pub fn new<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            records: addresses.into_iter().map(SourceRecord::new).collect(),
        }
    }

    /// Create a source from prepared records
    pub fn from_records(records: Vec<SourceRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl AddressSource for StaticSource {
    async fn fetch(&self) -> Result<Vec<SourceRecord>, Error> {
        Ok(self.records.clone())
    }

    fn source_name(&self) -> &str {
        "static"
    }
}

/// Factory for creating static sources
pub struct StaticSourceFactory;

impl AddressSourceFactory for StaticSourceFactory {
    fn create(&self, config: &SourceConfig) -> Result<Box<dyn AddressSource>, Error> {
        match config {
            SourceConfig::Static { addresses } => {
                Ok(Box::new(StaticSource::new(addresses.iter().cloned())))
            }
            _ => Err(Error::config("Invalid config for static source")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_addresses_in_order() {
        let source = StaticSource::new(["10.0.0.2", "10.0.0.1"]);
        let records = source.fetch().await.unwrap();

        let addresses: Vec<_> = records.iter().map(|r| r.address.as_str()).collect();
        assert_eq!(addresses, vec!["10.0.0.2", "10.0.0.1"]);
        assert!(records.iter().all(|r| r.active && r.external_id.is_none()));
    }

    #[test]
    fn factory_accepts_static_config_only() {
        let config = SourceConfig::Static {
            addresses: vec!["1.1.1.1".into()],
        };
        assert!(StaticSourceFactory.create(&config).is_ok());

        let dns = SourceConfig::Dns {
            host: "example.net".into(),
        };
        assert!(StaticSourceFactory.create(&dns).is_err());
    }
}
