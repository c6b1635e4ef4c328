//! Configuration types for the reconciliation system
//!
//! This module defines all configuration structures used throughout the crate.

use crate::naming::{CONTENT_DIGEST_LEN, MAX_OBJECT_NAME_LEN, NamingStrategy};
use serde::{Deserialize, Serialize};

/// Separator between source URLs in a single configuration string
pub const SOURCE_LIST_SEPARATOR: &str = ";;";

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Namespace, address-set and naming settings
    pub reconcile: ReconcileConfig,

    /// Desired-state sources
    pub sources: Vec<SourceConfig>,

    /// Device holding the address-book
    #[serde(default)]
    pub device: DeviceConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl SyncConfig {
    /// Create a configuration with the given core settings and no sources
    pub fn new(reconcile: ReconcileConfig) -> Self {
        Self {
            reconcile,
            sources: Vec::new(),
            device: DeviceConfig::default(),
            engine: EngineConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.reconcile.validate()?;

        if self.sources.is_empty() {
            return Err(crate::Error::config("No address sources configured"));
        }
        for source in &self.sources {
            source.validate()?;
        }

        self.device.validate()?;
        self.engine.validate()?;

        Ok(())
    }
}

/// Core reconciliation settings
///
/// This is all the planner sees: no environment, no global state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Prefix of every managed address object (`<namespace>-...`)
    pub namespace: String,

    /// Name of the address-set rebuilt on every run
    pub address_set: String,

    /// Description written on the address-set
    pub description: String,

    /// How address object names are derived
    #[serde(default)]
    pub naming: NamingStrategy,
}

impl ReconcileConfig {
    /// Create settings for an address-set; the namespace defaults to the
    /// set name
    pub fn new(address_set: impl Into<String>) -> Self {
        let address_set = address_set.into();
        Self {
            namespace: address_set.clone(),
            description: format!("IP addresses for {}", address_set),
            address_set,
            naming: NamingStrategy::default(),
        }
    }

    /// Set the object namespace
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the address-set description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the naming strategy
    pub fn with_naming(mut self, naming: NamingStrategy) -> Self {
        self.naming = naming;
        self
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.address_set.is_empty() {
            return Err(crate::Error::config("Address-set name cannot be empty"));
        }
        if self.namespace.is_empty() {
            return Err(crate::Error::config("Namespace cannot be empty"));
        }

        for (field, value) in [
            ("address-set name", &self.address_set),
            ("namespace", &self.namespace),
            ("description", &self.description),
        ] {
            if value.contains('"') {
                return Err(crate::Error::config(format!(
                    "The {} cannot contain '\"': {}",
                    field, value
                )));
            }
        }

        if self.address_set.len() > MAX_OBJECT_NAME_LEN {
            return Err(crate::Error::config(format!(
                "Address-set name too long: {} chars (max {})",
                self.address_set.len(),
                MAX_OBJECT_NAME_LEN
            )));
        }

        let max_namespace = MAX_OBJECT_NAME_LEN - CONTENT_DIGEST_LEN - 1;
        if self.namespace.len() > max_namespace {
            return Err(crate::Error::config(format!(
                "Namespace too long: {} chars (max {})",
                self.namespace.len(),
                max_namespace
            )));
        }

        Ok(())
    }
}

/// Desired-state source configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Fixed list of addresses
    Static {
        /// Raw addresses
        addresses: Vec<String>,
    },

    /// Plain-text list, one address per line, fetched over HTTP
    Http {
        /// URL to fetch
        url: String,
        /// Request timeout in seconds
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },

    /// JSON feed of structured records fetched over HTTP
    Feed {
        /// URL to fetch
        url: String,
        /// Request timeout in seconds
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },

    /// A and AAAA records of a host
    Dns {
        /// Hostname to resolve
        host: String,
    },

    /// Custom source
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl SourceConfig {
    /// Parse a source URL
    ///
    /// - `http://...`, `https://...` → line-list source
    /// - `feed+http://...`, `feed+https://...` → JSON feed source
    /// - `dns://host` → DNS source
    pub fn parse(url: &str) -> Result<Self, crate::Error> {
        let url = url.trim();

        if url.starts_with("http://") || url.starts_with("https://") {
            return Ok(SourceConfig::Http {
                url: url.to_string(),
                timeout_secs: default_timeout_secs(),
            });
        }

        if let Some(inner) = url.strip_prefix("feed+") {
            if inner.starts_with("http://") || inner.starts_with("https://") {
                return Ok(SourceConfig::Feed {
                    url: inner.to_string(),
                    timeout_secs: default_timeout_secs(),
                });
            }
        }

        if let Some(rest) = url.strip_prefix("dns:") {
            let host = rest
                .trim_start_matches('/')
                .split(['/', '?', '#'])
                .next()
                .unwrap_or_default()
                .to_string();
            return Ok(SourceConfig::Dns { host });
        }

        Err(crate::Error::config(format!(
            "Unsupported source URL scheme: {}. Supported: http, https, feed+http(s), dns",
            url
        )))
    }

    /// Parse a `;;`-separated list of source URLs
    pub fn parse_list(urls: &str) -> Result<Vec<Self>, crate::Error> {
        urls.split(SOURCE_LIST_SEPARATOR)
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(Self::parse)
            .collect()
    }

    /// Validate the source configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            SourceConfig::Static { .. } => Ok(()),
            SourceConfig::Http { url, timeout_secs } | SourceConfig::Feed { url, timeout_secs } => {
                if url.is_empty() {
                    return Err(crate::Error::config("Source URL cannot be empty"));
                }
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(crate::Error::config(format!(
                        "Source URL must use HTTP or HTTPS scheme. Got: {}",
                        url
                    )));
                }
                if *timeout_secs == 0 {
                    return Err(crate::Error::config("Source timeout must be > 0"));
                }
                Ok(())
            }
            SourceConfig::Dns { host } => {
                if host.is_empty() {
                    return Err(crate::Error::config("DNS source host cannot be empty"));
                }
                Ok(())
            }
            SourceConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom source factory cannot be empty"));
                }
                if config.is_null() {
                    return Err(crate::Error::config("Custom source config cannot be null"));
                }
                Ok(())
            }
        }
    }

    /// Get the source type name
    pub fn type_name(&self) -> &str {
        match self {
            SourceConfig::Static { .. } => "static",
            SourceConfig::Http { .. } => "http",
            SourceConfig::Feed { .. } => "feed",
            SourceConfig::Dns { .. } => "dns",
            SourceConfig::Custom { factory, .. } => factory,
        }
    }
}

fn default_timeout_secs() -> u64 {
    15
}

/// Device configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceConfig {
    /// In-memory address-book (not persistent)
    #[default]
    Memory,

    /// Address-book kept in a JSON file
    File {
        /// Path to the address-book file
        path: String,
    },

    /// Custom device
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl DeviceConfig {
    /// Validate the device configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            DeviceConfig::Memory => Ok(()),
            DeviceConfig::File { path } => {
                if path.is_empty() {
                    return Err(crate::Error::config("Device file path cannot be empty"));
                }
                Ok(())
            }
            DeviceConfig::Custom { factory, .. } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom device factory cannot be empty"));
                }
                Ok(())
            }
        }
    }

    /// Get the device type name
    pub fn type_name(&self) -> &str {
        match self {
            DeviceConfig::Memory => "memory",
            DeviceConfig::File { .. } => "file",
            DeviceConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Plan and apply, then roll back instead of committing
    #[serde(default)]
    pub dry_run: bool,

    /// Capacity of the engine event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_event_channel_capacity() -> usize {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconcile_defaults_follow_address_set() {
        let config = ReconcileConfig::new("cloudflare");
        assert_eq!(config.namespace, "cloudflare");
        assert_eq!(config.description, "IP addresses for cloudflare");
        assert_eq!(config.naming, NamingStrategy::ContentAddressed);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn quotes_are_rejected() {
        let config = ReconcileConfig::new("cdn").with_description("say \"hi\"");
        assert!(config.validate().is_err());

        let config = ReconcileConfig::new("c\"dn");
        assert!(config.validate().is_err());
    }

    #[test]
    fn namespace_must_leave_room_for_digest() {
        let ok = ReconcileConfig::new("cdn").with_namespace("n".repeat(49));
        assert!(ok.validate().is_ok());

        let too_long = ReconcileConfig::new("cdn").with_namespace("n".repeat(50));
        assert!(too_long.validate().is_err());
    }

    #[test]
    fn source_urls_are_parsed_by_scheme() {
        let sources = SourceConfig::parse_list(
            "https://www.cloudflare.com/ips-v4;;dns://www.example.com;; feed+https://feed.example/x.json",
        )
        .unwrap();

        assert_eq!(sources.len(), 3);
        assert_eq!(sources[0].type_name(), "http");
        assert_eq!(
            sources[1],
            SourceConfig::Dns {
                host: "www.example.com".to_string()
            }
        );
        assert_eq!(
            sources[2],
            SourceConfig::Feed {
                url: "https://feed.example/x.json".to_string(),
                timeout_secs: 15
            }
        );
    }

    #[test]
    fn unsupported_scheme_fails_fast() {
        let err = SourceConfig::parse_list("https://ok.example;;ftp://nope.example").unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }

    #[test]
    fn sync_config_requires_sources() {
        let mut config = SyncConfig::new(ReconcileConfig::new("cdn"));
        assert!(config.validate().is_err());

        config.sources.push(SourceConfig::Static {
            addresses: vec!["1.2.3.4".to_string()],
        });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn source_config_json_shape() {
        let source: SourceConfig =
            serde_json::from_str(r#"{"type":"http","url":"https://example.net/ips"}"#).unwrap();
        assert_eq!(
            source,
            SourceConfig::Http {
                url: "https://example.net/ips".to_string(),
                timeout_secs: 15
            }
        );

        let device: DeviceConfig =
            serde_json::from_str(r#"{"type":"file","path":"/tmp/book.json"}"#).unwrap();
        assert_eq!(device.type_name(), "file");
    }
}
