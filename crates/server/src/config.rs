//! TOML file configuration for the server binary.
//!
//! These structs map directly onto `orderbridge.toml`. Environment variables
//! (loaded via dotenvy in `main`) override the file for deployment-specific
//! values; everything is validated once at startup so the pipeline never
//! starts with a configuration it cannot run with.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use orderbridge_domain::config::{SyncSettings, TenantConfig};
use orderbridge_domain::{BridgeError, Result};
use serde::Deserialize;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSection,
    pub database: DatabaseSection,
    pub remote: RemoteSection,
    #[serde(default)]
    pub messaging: MessagingSection,
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub tenants: Vec<TenantConfig>,
}

/// Listener settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self { listen: default_listen_addr() }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

/// Local database settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSection {
    /// Path to the sqlite file; created on first start.
    pub path: PathBuf,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

fn default_pool_size() -> u32 {
    5
}

/// Remote order-management API settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteSection {
    /// RPC endpoint URL.
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Messaging service settings.
#[derive(Debug, Clone, Deserialize)]
pub struct MessagingSection {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for MessagingSection {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9020".to_string(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

impl AppConfig {
    /// Read and parse the TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            BridgeError::Config(format!("failed to read config {}: {e}", path.display()))
        })?;
        let mut config: Self = toml::from_str(&raw).map_err(|e| {
            BridgeError::Config(format!("failed to parse config {}: {e}", path.display()))
        })?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Environment variables take precedence over the file. Only
    /// deployment-specific values are overridable; tuning stays in the file.
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(listen) = std::env::var("ORDERBRIDGE_LISTEN") {
            self.server.listen = listen
                .parse()
                .map_err(|e| BridgeError::Config(format!("invalid ORDERBRIDGE_LISTEN: {e}")))?;
        }
        if let Ok(db_path) = std::env::var("ORDERBRIDGE_DB_PATH") {
            self.database.path = PathBuf::from(db_path);
        }
        if let Ok(url) = std::env::var("ORDERBRIDGE_REMOTE_URL") {
            self.remote.base_url = url;
        }
        if let Ok(url) = std::env::var("ORDERBRIDGE_MESSAGING_URL") {
            self.messaging.base_url = url;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.remote.base_url.trim().is_empty() {
            return Err(BridgeError::Config("remote.base_url must not be empty".into()));
        }
        if self.tenants.is_empty() {
            return Err(BridgeError::Config("at least one [[tenants]] entry is required".into()));
        }
        let mut seen = HashSet::new();
        for tenant in &self.tenants {
            tenant.validate()?;
            if !seen.insert(tenant.id.as_str()) {
                return Err(BridgeError::Config(format!("duplicate tenant id {}", tenant.id)));
            }
        }
        self.sync.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[server]
listen = "127.0.0.1:3000"

[database]
path = "./orderbridge.db"

[remote]
base_url = "https://api.example-oms.com/connector"

[sync]
poll_interval_secs = 30

[[tenants]]
id = "tenant-1"
remote_token = "token-1"
webhook_secret = "secret-1"

[[tenants]]
id = "tenant-2"
remote_token = "token-2"
webhook_secret = "secret-2"
"#;

    fn parse(toml_str: &str) -> AppConfig {
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn sample_config_parses_and_validates() {
        let config = parse(SAMPLE);
        assert_eq!(config.server.listen.port(), 3000);
        assert_eq!(config.sync.poll_interval_secs, 30);
        // Unspecified tuning falls back to the defaults.
        assert_eq!(config.sync.max_retries, 3);
        assert_eq!(config.tenants.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_tenants_fail_validation() {
        let mut config = parse(SAMPLE);
        config.tenants.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn duplicate_tenant_ids_fail_validation() {
        let mut config = parse(SAMPLE);
        config.tenants[1].id = "tenant-1".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn listen_defaults_when_section_absent() {
        let without_server = SAMPLE.replace("[server]\nlisten = \"127.0.0.1:3000\"\n", "");
        let config = parse(&without_server);
        assert_eq!(config.server.listen.port(), 8080);
    }
}
