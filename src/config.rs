//! Configuration handling for the server, per spec.md §6's configuration
//! record and the ambient fields the teacher always carries alongside it.

use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use concread::cowcell::asynch::CowCell;
use config::{Config, File};
use serde::{Deserialize, Serialize};

use crate::error::ResolverError;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind_address: String,
    pub dns_port: u16,
    pub workers: usize,
    pub max_concurrent_requests: usize,
    pub request_queue_size: usize,
    pub max_upstream_connections: usize,
    /// Seconds.
    pub connection_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_address: "127.0.0.1".to_string(),
            dns_port: 9953,
            workers: 4,
            max_concurrent_requests: 512,
            request_queue_size: 1024,
            max_upstream_connections: 64,
            connection_timeout: 5,
        }
    }
}

impl ServerConfig {
    pub fn dns_listener_address(&self) -> Result<SocketAddr, ResolverError> {
        format!("{}:{}", self.bind_address, self.dns_port)
            .parse()
            .map_err(|err| ResolverError::StartupError(format!("invalid bind_address/dns_port: {err}")))
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CacheSettings {
    pub max_size: usize,
    pub max_memory_mb: usize,
    pub default_ttl: u32,
    pub min_ttl: u32,
    pub max_ttl: u32,
    pub negative_ttl: u32,
    /// Seconds between background sweeps.
    pub cleanup_interval: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        CacheSettings {
            max_size: 10_000,
            max_memory_mb: 100,
            default_ttl: 300,
            min_ttl: 1,
            max_ttl: 86_400,
            negative_ttl: 300,
            cleanup_interval: 60,
        }
    }
}

impl CacheSettings {
    pub fn max_memory_bytes(&self) -> usize {
        self.max_memory_mb * 1024 * 1024
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct SecuritySettings {
    /// Requests admitted per client IP per rolling 60-second window.
    pub rate_limit_per_ip: u32,
}

/// The main config blob: write this as a JSON file and load it to make
/// things go, per the teacher's `ConfigFile` pattern.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ConfigFile {
    pub server: ServerConfig,
    /// Ordered `host` or `host:port` upstream resolver addresses.
    pub upstream_servers: Vec<String>,
    pub cache: CacheSettings,
    pub security: SecuritySettings,
    /// Default is "info".
    pub log_level: String,
    /// When set, emits the raw wire bytes of client requests at trace
    /// level for offline replay; no file rotation of its own.
    pub capture_packets: bool,
}

impl Default for ConfigFile {
    fn default() -> Self {
        ConfigFile {
            server: ServerConfig::default(),
            upstream_servers: vec!["1.1.1.1".to_string(), "8.8.8.8".to_string()],
            cache: CacheSettings::default(),
            security: SecuritySettings {
                rate_limit_per_ip: 100,
            },
            log_level: "info".to_string(),
            capture_packets: false,
        }
    }
}

impl Display for ConfigFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "bind={}:{} upstreams={:?} cache_max_size={} log_level={}",
            self.server.bind_address,
            self.server.dns_port,
            self.upstream_servers,
            self.cache.max_size,
            self.log_level
        ))
    }
}

impl ConfigFile {
    /// JSONify the config in a pretty way using serde, for `--print-default-config`.
    pub fn as_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).expect("ConfigFile always serializes")
    }

    /// Loads configuration from `config_path` if given, else from the
    /// default locations, falling back to built-in defaults if nothing is
    /// found on disk. Environment variables prefixed `RDNS_` override any
    /// file value, eg `RDNS_SERVER_DNS_PORT=5353`.
    pub fn load(config_path: Option<&str>) -> Result<ConfigFile, ResolverError> {
        let candidates: Vec<String> = match config_path {
            Some(value) => vec![value.to_string()],
            None => DEFAULT_CONFIG_LOCATIONS.iter().map(|s| s.to_string()).collect(),
        };

        for path in &candidates {
            if !std::path::Path::new(path).exists() {
                continue;
            }
            let builder = Config::builder()
                .add_source(File::new(path, config::FileFormat::Json))
                .add_source(config::Environment::with_prefix("rdns").separator("_"));
            let built = builder
                .build()
                .map_err(|err| ResolverError::StartupError(format!("failed to load {path}: {err}")))?;
            let config: ConfigFile = built
                .try_deserialize()
                .map_err(|err| ResolverError::StartupError(format!("invalid config in {path}: {err}")))?;
            return Ok(config);
        }

        if config_path.is_some() {
            return Err(ResolverError::StartupError(format!(
                "config file not found, tried: {}",
                candidates.join(", ")
            )));
        }

        Ok(ConfigFile::default())
    }
}

impl FromStr for ConfigFile {
    type Err = ResolverError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let built = Config::builder()
            .add_source(File::from_str(input, config::FileFormat::Json))
            .build()
            .map_err(|err| ResolverError::StartupError(err.to_string()))?;
        built
            .try_deserialize()
            .map_err(|err| ResolverError::StartupError(err.to_string()))
    }
}

const DEFAULT_CONFIG_LOCATIONS: [&str; 2] = ["./rdns.json", "/etc/rdns/rdns.json"];

/// A `ConfigFile` held behind a copy-on-write cell so readers (every
/// request-handling task that wants to peek at a setting) never block a
/// writer. No hot-reload signal is wired up in this crate - out of scope
/// per spec.md §1 - but this is the seam it would attach to: a SIGHUP
/// handler would load a fresh `ConfigFile` and call [`SharedConfig::replace`].
#[derive(Clone)]
pub struct SharedConfig(std::sync::Arc<CowCell<ConfigFile>>);

impl SharedConfig {
    pub fn new(config: ConfigFile) -> Self {
        SharedConfig(std::sync::Arc::new(CowCell::new(config)))
    }

    /// A read-only snapshot, cheap to take and safe to hold across
    /// `.await` points without contending with a concurrent reload.
    pub async fn current(&self) -> ConfigFile {
        (*self.0.read().await).clone()
    }

    /// Installs `new` as the current configuration. Existing readers that
    /// already took a snapshot keep the config they read; only callers of
    /// `current()` after this returns see the update.
    pub async fn replace(&self, new: ConfigFile) {
        let mut write_txn = self.0.write().await;
        *write_txn = new;
        write_txn.commit().await;
    }
}
