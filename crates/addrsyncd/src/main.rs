// # addrsyncd - Address-Book Reconciliation Runner
//
// The addrsyncd binary is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Registering address sources and devices
// 4. Running one reconciliation and mapping the outcome to an exit code
//
// It is a thin integration layer: all reconciliation logic lives in
// addrsync-core. Scheduling (cron, systemd timers) is left to the host.
//
// ## Configuration
//
// ### Address-set
// - `ADDRSYNC_ADDRESS_SET`: Name of the address-set to rebuild (required)
// - `ADDRSYNC_NAMESPACE`: Prefix of managed address objects (default: the set name)
// - `ADDRSYNC_DESCRIPTION`: Set description (default: "IP addresses from <sources>")
// - `ADDRSYNC_NAMING`: `content` (default) or `identity`
//
// ### Sources
// - `ADDRSYNC_SOURCES`: `;;`-separated source URLs (required).
//   `http(s)://` line lists, `feed+http(s)://` JSON feeds, `dns://host`
//
// ### Device
// - `ADDRSYNC_DEVICE_TYPE`: `file` (default) or `memory`
// - `ADDRSYNC_DEVICE_PATH`: Address-book file (required for `file`)
//
// ### Run
// - `ADDRSYNC_DRY_RUN`: Apply and roll back instead of committing
// - `ADDRSYNC_LOG_LEVEL`: trace, debug, info (default), warn, error
//
// ## Example
//
// ```bash
// export ADDRSYNC_ADDRESS_SET=cloudflare
// export ADDRSYNC_SOURCES="https://www.cloudflare.com/ips-v4;;https://www.cloudflare.com/ips-v6"
// export ADDRSYNC_DEVICE_PATH=/var/lib/addrsync/address-book.json
//
// addrsyncd
// ```

use addrsync_core::{
    DeviceConfig, NamingStrategy, Outcome, ReconcileConfig, ReconcileEvent, Reconciler,
    SourceConfig, SyncConfig, SyncRegistry,
};
use anyhow::{Context, Result};
use std::env;
use std::process::ExitCode;
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// - 0: Run completed (committed, unchanged or dry run)
/// - 1: Configuration or startup error
/// - 2: Runtime error (source, device or interrupted run)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncExitCode {
    /// Run completed
    Success = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error
    RuntimeError = 2,
}

impl From<SyncExitCode> for ExitCode {
    fn from(code: SyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
#[derive(Debug)]
struct Config {
    address_set: String,
    namespace: Option<String>,
    description: Option<String>,
    naming: String,
    sources: String,
    device_type: String,
    device_path: Option<String>,
    dry_run: bool,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through a variable lookup
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            address_set: non_empty("ADDRSYNC_ADDRESS_SET").context(
                "ADDRSYNC_ADDRESS_SET is required. \
                Set it via: export ADDRSYNC_ADDRESS_SET=cloudflare",
            )?,
            namespace: non_empty("ADDRSYNC_NAMESPACE"),
            description: non_empty("ADDRSYNC_DESCRIPTION"),
            naming: non_empty("ADDRSYNC_NAMING").unwrap_or_else(|| "content".to_string()),
            sources: non_empty("ADDRSYNC_SOURCES").context(
                "ADDRSYNC_SOURCES is required. \
                Set it via: export ADDRSYNC_SOURCES=\"https://a.example/ips;;dns://b.example\"",
            )?,
            device_type: non_empty("ADDRSYNC_DEVICE_TYPE").unwrap_or_else(|| "file".to_string()),
            device_path: non_empty("ADDRSYNC_DEVICE_PATH"),
            dry_run: non_empty("ADDRSYNC_DRY_RUN")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
                .unwrap_or(false),
            log_level: non_empty("ADDRSYNC_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the raw values and build the library configuration
    fn to_sync_config(&self) -> Result<SyncConfig> {
        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "ADDRSYNC_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        let sources = SourceConfig::parse_list(&self.sources)?;
        if sources.is_empty() {
            anyhow::bail!("ADDRSYNC_SOURCES must contain at least one source URL");
        }

        let naming: NamingStrategy = self.naming.parse()?;

        let device = match self.device_type.as_str() {
            "memory" => DeviceConfig::Memory,
            "file" => match &self.device_path {
                Some(path) => DeviceConfig::File { path: path.clone() },
                None => anyhow::bail!(
                    "ADDRSYNC_DEVICE_PATH is required when ADDRSYNC_DEVICE_TYPE=file. \
                    Set it via: export ADDRSYNC_DEVICE_PATH=/var/lib/addrsync/address-book.json"
                ),
            },
            other => anyhow::bail!(
                "ADDRSYNC_DEVICE_TYPE '{}' is not supported. \
                Supported types: file, memory",
                other
            ),
        };

        let description = self.description.clone().unwrap_or_else(|| {
            let urls: Vec<&str> = self
                .sources
                .split(addrsync_core::config::SOURCE_LIST_SEPARATOR)
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .collect();
            format!("IP addresses from {}", urls.join(", "))
        });

        let mut reconcile = ReconcileConfig::new(self.address_set.clone())
            .with_description(description)
            .with_naming(naming);
        if let Some(namespace) = &self.namespace {
            reconcile = reconcile.with_namespace(namespace.clone());
        }

        let mut config = SyncConfig::new(reconcile);
        config.sources = sources;
        config.device = device;
        config.engine.dry_run = self.dry_run;

        config.validate()?;
        Ok(config)
    }

    fn tracing_level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return SyncExitCode::ConfigError.into();
        }
    };

    let sync_config = match config.to_sync_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration validation error: {:#}", e);
            return SyncExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.tracing_level())
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return SyncExitCode::ConfigError.into();
    }

    info!(
        "Starting addrsyncd for address-set {}",
        sync_config.reconcile.address_set
    );
    info!(
        "Configuration loaded: {} source(s), {} device",
        sync_config.sources.len(),
        sync_config.device.type_name()
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return SyncExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        let reconciler = match build_reconciler(sync_config) {
            Ok(reconciler) => reconciler,
            Err(e) => {
                error!("Startup error: {:#}", e);
                return SyncExitCode::ConfigError;
            }
        };

        match run(reconciler).await {
            Ok(outcome) => {
                info!("Run finished: {:?}", outcome);
                SyncExitCode::Success
            }
            Err(e) => {
                error!("Run failed: {:#}", e);
                SyncExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Register plugins and build the reconciler
fn build_reconciler(config: SyncConfig) -> Result<Reconciler> {
    let registry = SyncRegistry::with_builtins();

    #[cfg(feature = "http")]
    {
        debug!("Registering HTTP sources");
        addrsync_source_http::register(&registry);
    }

    #[cfg(feature = "dns")]
    {
        debug!("Registering DNS source");
        addrsync_source_dns::register(&registry);
    }

    let sources = registry.create_sources(&config.sources)?;
    let device = registry.create_device(&config.device)?;

    let (reconciler, mut events) = Reconciler::new(sources, device, config)?;

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            log_event(&event);
        }
    });

    Ok(reconciler)
}

fn log_event(event: &ReconcileEvent) {
    debug!("Event: {:?}", event);
}

/// Run one reconciliation, abandoning it on SIGINT/SIGTERM
async fn run(reconciler: Reconciler) -> Result<Outcome> {
    tokio::select! {
        report = reconciler.run_once() => {
            let report = report?;
            info!(
                "{} added, {} removed, {} members, {} commands",
                report.additions,
                report.removals,
                report.members,
                report.commands.len()
            );
            Ok(report.outcome)
        }
        signal = wait_for_shutdown_signal() => {
            let signal = signal?;
            anyhow::bail!("Interrupted by {}, nothing committed", signal)
        }
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    tokio::select! {
        _ = sigterm.recv() => Ok("SIGTERM"),
        _ = sigint.recv() => Ok("SIGINT"),
    }
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn minimal_environment() {
        let config = config(&[
            ("ADDRSYNC_ADDRESS_SET", "cloudflare"),
            (
                "ADDRSYNC_SOURCES",
                "https://www.cloudflare.com/ips-v4;;https://www.cloudflare.com/ips-v6",
            ),
            ("ADDRSYNC_DEVICE_PATH", "/tmp/book.json"),
        ])
        .unwrap();

        let sync = config.to_sync_config().unwrap();
        assert_eq!(sync.reconcile.namespace, "cloudflare");
        assert_eq!(
            sync.reconcile.description,
            "IP addresses from https://www.cloudflare.com/ips-v4, https://www.cloudflare.com/ips-v6"
        );
        assert_eq!(sync.sources.len(), 2);
        assert_eq!(sync.device.type_name(), "file");
        assert!(!sync.engine.dry_run);
    }

    #[test]
    fn required_variables() {
        assert!(config(&[("ADDRSYNC_SOURCES", "dns://a.example")]).is_err());
        assert!(config(&[("ADDRSYNC_ADDRESS_SET", "cdn")]).is_err());
        assert!(config(&[("ADDRSYNC_ADDRESS_SET", " "), ("ADDRSYNC_SOURCES", "dns://a")]).is_err());
    }

    #[test]
    fn file_device_needs_a_path() {
        let config = config(&[
            ("ADDRSYNC_ADDRESS_SET", "cdn"),
            ("ADDRSYNC_SOURCES", "dns://a.example"),
        ])
        .unwrap();
        assert!(config.to_sync_config().is_err());
    }

    #[test]
    fn optional_settings_are_applied() {
        let config = config(&[
            ("ADDRSYNC_ADDRESS_SET", "cdn"),
            ("ADDRSYNC_SOURCES", "feed+https://feeds.example/edge.json"),
            ("ADDRSYNC_NAMESPACE", "edge"),
            ("ADDRSYNC_DESCRIPTION", "Edge nodes"),
            ("ADDRSYNC_NAMING", "identity"),
            ("ADDRSYNC_DEVICE_TYPE", "memory"),
            ("ADDRSYNC_DRY_RUN", "true"),
            ("ADDRSYNC_LOG_LEVEL", "debug"),
        ])
        .unwrap();

        let sync = config.to_sync_config().unwrap();
        assert_eq!(sync.reconcile.namespace, "edge");
        assert_eq!(sync.reconcile.description, "Edge nodes");
        assert_eq!(sync.reconcile.naming, NamingStrategy::IdentityAddressed);
        assert_eq!(sync.device, DeviceConfig::Memory);
        assert!(sync.engine.dry_run);
        assert_eq!(config.tracing_level(), Level::DEBUG);
    }

    #[test]
    fn unsupported_values_are_rejected() {
        let base = [
            ("ADDRSYNC_ADDRESS_SET", "cdn"),
            ("ADDRSYNC_DEVICE_TYPE", "memory"),
        ];

        let bad_scheme = config(&[base[0], base[1], ("ADDRSYNC_SOURCES", "ftp://a.example/list")])
            .unwrap();
        assert!(bad_scheme.to_sync_config().is_err());

        let bad_device = config(&[
            base[0],
            ("ADDRSYNC_SOURCES", "dns://a.example"),
            ("ADDRSYNC_DEVICE_TYPE", "netconf"),
        ])
        .unwrap();
        assert!(bad_device.to_sync_config().is_err());

        let bad_level = config(&[
            base[0],
            base[1],
            ("ADDRSYNC_SOURCES", "dns://a.example"),
            ("ADDRSYNC_LOG_LEVEL", "loud"),
        ])
        .unwrap();
        assert!(bad_level.to_sync_config().is_err());
    }

    #[cfg(feature = "dns")]
    #[tokio::test]
    async fn memory_device_run_succeeds_end_to_end() {
        let config = config(&[
            ("ADDRSYNC_ADDRESS_SET", "cdn"),
            ("ADDRSYNC_SOURCES", "dns://127.0.0.1"),
            ("ADDRSYNC_DEVICE_TYPE", "memory"),
        ])
        .unwrap();

        let reconciler = build_reconciler(config.to_sync_config().unwrap()).unwrap();
        let outcome = reconciler.run_once().await.unwrap().outcome;
        assert_eq!(outcome, Outcome::Committed);
    }
}
