// # HTTP Address Sources
//
// This crate provides the HTTP-based address sources for the
// reconciliation system.
//
// ## Sources
//
// - **http**: plain-text list, one address per line. Blank lines and lines
//   starting with `#` are skipped. Records carry no external identifier.
// - **feed**: JSON document, either an array of records or an object with a
//   `records` array. Each record has an `address` and optionally an `id`,
//   an `active` flag (default true) and a `family` (`ipv4` | `ipv6`).
//
// ## Behaviour
//
// One GET per fetch, bounded by the configured timeout. A transport error,
// a non-success status or an unparseable body fails the fetch; there are
// no retries, the engine aborts the whole run instead.

use addrsync_core::SyncRegistry;
use addrsync_core::address::AddressFamily;
use addrsync_core::aggregate::SourceRecord;
use addrsync_core::config::SourceConfig;
use addrsync_core::traits::{AddressSource, AddressSourceFactory};
use addrsync_core::{Error, Result};

use serde::Deserialize;
use std::time::Duration;

/// Build the HTTP client shared by both source kinds
fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("addrsync/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))
}

/// GET a URL and return the body of a successful response
async fn fetch_body(client: &reqwest::Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| Error::source_fetch(url, format!("Request failed: {}", e)))?;

    if !response.status().is_success() {
        return Err(Error::source_fetch(
            url,
            format!("HTTP error: {}", response.status()),
        ));
    }

    response
        .text()
        .await
        .map_err(|e| Error::source_fetch(url, format!("Failed to read response: {}", e)))
}

/// Parse a plain-text address list
pub fn parse_line_list(body: &str) -> Vec<SourceRecord> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(SourceRecord::new)
        .collect()
}

/// One record of a JSON feed
#[derive(Debug, Deserialize)]
struct FeedRecord {
    address: String,
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default = "default_active")]
    active: bool,
    #[serde(default)]
    family: Option<AddressFamily>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeedDocument {
    List(Vec<FeedRecord>),
    Wrapped { records: Vec<FeedRecord> },
}

impl From<FeedRecord> for SourceRecord {
    fn from(record: FeedRecord) -> Self {
        let external_id = match record.id {
            Some(serde_json::Value::String(id)) => Some(id),
            Some(serde_json::Value::Number(id)) => Some(id.to_string()),
            _ => None,
        };

        SourceRecord {
            address: record.address.trim().to_string(),
            external_id,
            active: record.active,
            family: record.family,
        }
    }
}

/// Parse a JSON feed document
pub fn parse_feed(body: &str) -> Result<Vec<SourceRecord>> {
    let records = match serde_json::from_str::<FeedDocument>(body)? {
        FeedDocument::List(records) => records,
        FeedDocument::Wrapped { records } => records,
    };
    Ok(records.into_iter().map(SourceRecord::from).collect())
}

/// Plain-text address list fetched over HTTP
pub struct HttpListSource {
    url: String,
    client: reqwest::Client,
}

impl HttpListSource {
    /// Create a new line-list source
    ///
    /// # Parameters
    ///
    /// - `url`: URL of the list (e.g., "https://www.cloudflare.com/ips-v4")
    /// - `timeout`: Request timeout
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            url: url.into(),
            client: build_client(timeout)?,
        })
    }
}

#[async_trait::async_trait]
impl AddressSource for HttpListSource {
    async fn fetch(&self) -> Result<Vec<SourceRecord>> {
        let body = fetch_body(&self.client, &self.url).await?;
        let records = parse_line_list(&body);
        tracing::debug!("Fetched {} addresses from {}", records.len(), self.url);
        Ok(records)
    }

    fn source_name(&self) -> &str {
        &self.url
    }
}

/// JSON feed of structured records fetched over HTTP
pub struct FeedSource {
    url: String,
    client: reqwest::Client,
}

impl FeedSource {
    /// Create a new feed source
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            url: url.into(),
            client: build_client(timeout)?,
        })
    }
}

#[async_trait::async_trait]
impl AddressSource for FeedSource {
    async fn fetch(&self) -> Result<Vec<SourceRecord>> {
        let body = fetch_body(&self.client, &self.url).await?;
        let records = parse_feed(&body)
            .map_err(|e| Error::source_fetch(&self.url, format!("Invalid feed: {}", e)))?;
        tracing::debug!("Fetched {} feed records from {}", records.len(), self.url);
        Ok(records)
    }

    fn source_name(&self) -> &str {
        &self.url
    }
}

/// Factory for creating line-list sources
pub struct HttpListFactory;

impl AddressSourceFactory for HttpListFactory {
    fn create(&self, config: &SourceConfig) -> Result<Box<dyn AddressSource>> {
        match config {
            SourceConfig::Http { url, timeout_secs } => Ok(Box::new(HttpListSource::new(
                url.clone(),
                Duration::from_secs(*timeout_secs),
            )?)),
            _ => Err(Error::config("Invalid config for HTTP source")),
        }
    }
}

/// Factory for creating feed sources
pub struct FeedFactory;

impl AddressSourceFactory for FeedFactory {
    fn create(&self, config: &SourceConfig) -> Result<Box<dyn AddressSource>> {
        match config {
            SourceConfig::Feed { url, timeout_secs } => Ok(Box::new(FeedSource::new(
                url.clone(),
                Duration::from_secs(*timeout_secs),
            )?)),
            _ => Err(Error::config("Invalid config for feed source")),
        }
    }
}

/// Register the HTTP sources with a registry
pub fn register(registry: &SyncRegistry) {
    registry.register_source("http", Box::new(HttpListFactory));
    registry.register_source("feed", Box::new(FeedFactory));
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response on a local port
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });

        format!("http://{}/list", addr)
    }

    #[test]
    fn line_list_skips_blanks_and_comments() {
        let body = "# Cloudflare\n173.245.48.0/20\n\n  103.21.244.0/22  \r\n#2400:cb00::/32\n2606:4700::/32\n";
        let addresses: Vec<String> = parse_line_list(body)
            .into_iter()
            .map(|r| r.address)
            .collect();

        assert_eq!(
            addresses,
            vec!["173.245.48.0/20", "103.21.244.0/22", "2606:4700::/32"]
        );
    }

    #[test]
    fn feed_accepts_array_and_wrapped_forms() {
        let array = r#"[{"address": "1.1.1.1", "id": "edge-1"}]"#;
        let wrapped = r#"{"records": [{"address": "1.1.1.1", "id": "edge-1"}]}"#;

        assert_eq!(parse_feed(array).unwrap(), parse_feed(wrapped).unwrap());
        assert_eq!(
            parse_feed(array).unwrap(),
            vec![SourceRecord::new("1.1.1.1").with_id("edge-1")]
        );
    }

    #[test]
    fn feed_record_fields() {
        let body = r#"[
            {"address": "2001:db8::1", "id": 42, "family": "ipv6"},
            {"address": "10.0.0.1", "active": false},
            {"address": " 10.0.0.2 ", "family": "ipv4"}
        ]"#;
        let records = parse_feed(body).unwrap();

        assert_eq!(records[0].external_id.as_deref(), Some("42"));
        assert_eq!(records[0].family, Some(AddressFamily::V6));
        assert!(records[0].active);
        assert!(!records[1].active);
        assert_eq!(records[1].external_id, None);
        assert_eq!(records[2].address, "10.0.0.2");
        assert_eq!(records[2].family, Some(AddressFamily::V4));
    }

    #[test]
    fn feed_without_address_is_rejected() {
        assert!(parse_feed(r#"[{"id": "edge-1"}]"#).is_err());
        assert!(parse_feed("not json").is_err());
    }

    #[test]
    fn test_factory_creation() {
        let config = SourceConfig::parse("https://www.cloudflare.com/ips-v4").unwrap();
        let source = HttpListFactory.create(&config).unwrap();
        assert_eq!(source.source_name(), "https://www.cloudflare.com/ips-v4");

        let config = SourceConfig::parse("feed+https://feeds.example.net/edge.json").unwrap();
        assert!(FeedFactory.create(&config).is_ok());
        assert!(HttpListFactory.create(&config).is_err());
    }

    #[test]
    fn register_adds_both_kinds() {
        let registry = SyncRegistry::new();
        register(&registry);
        assert!(registry.has_source("http"));
        assert!(registry.has_source("feed"));
    }

    #[tokio::test]
    async fn fetches_line_list_over_http() {
        let url = serve_once("200 OK", "1.1.1.1\n# note\n2.2.2.0/24\n").await;
        let source = HttpListSource::new(url, Duration::from_secs(5)).unwrap();

        let records = source.fetch().await.unwrap();
        assert_eq!(
            records,
            vec![SourceRecord::new("1.1.1.1"), SourceRecord::new("2.2.2.0/24")]
        );
    }

    #[tokio::test]
    async fn non_success_status_fails_the_fetch() {
        let url = serve_once("503 Service Unavailable", "").await;
        let source = HttpListSource::new(url.clone(), Duration::from_secs(5)).unwrap();

        match source.fetch().await {
            Err(Error::SourceFetch {
                source_name,
                message,
            }) => {
                assert_eq!(source_name, url);
                assert!(message.contains("503"));
            }
            other => panic!("expected fetch failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn malformed_feed_fails_the_fetch() {
        let url = serve_once("200 OK", "{\"records\": 5}").await;
        let source = FeedSource::new(url, Duration::from_secs(5)).unwrap();

        let err = source.fetch().await.unwrap_err();
        assert!(err.is_source_failure());
    }
}
