//! Node configuration.
//!
//! One source of truth for the node's settings, layered environment < TOML
//! file < CLI flags. Validation runs at startup, before any coordination
//! session is opened.

use std::env;
use std::path::Path;
use std::time::Duration;

use bellwether_election::ElectionConfig;
use bellwether_election::ExpiryPolicy;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// Default values for configuration
mod defaults {
    pub fn session_timeout_ms() -> u64 {
        5_000
    }

    pub fn connection_timeout_ms() -> u64 {
        5_000
    }

    pub fn http_port() -> u16 {
        8080
    }

    pub fn http_bind_addr() -> String {
        "0.0.0.0".to_string()
    }

    pub fn contend_on_start() -> bool {
        true
    }
}

/// Errors raised while loading or validating configuration.
///
/// All of these are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting has no value from any layer.
    #[error("required setting '{name}' is missing")]
    Missing {
        /// Name of the setting.
        name: &'static str,
    },

    /// A setting has a value that cannot be used.
    #[error("invalid value for '{name}': {reason}")]
    Invalid {
        /// Name of the setting.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The config file could not be read.
    #[error("failed to read config file '{path}': {source}")]
    Read {
        /// Path of the file.
        path: String,
        /// The underlying error.
        source: std::io::Error,
    },

    /// The config file could not be parsed.
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        /// Path of the file.
        path: String,
        /// The underlying error.
        source: toml::de::Error,
    },
}

/// HTTP control-surface configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Port the control surface listens on.
    #[serde(default = "defaults::http_port")]
    pub port: u16,
    /// Bind address of the control surface.
    #[serde(default = "defaults::http_bind_addr")]
    pub bind_addr: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: defaults::http_port(),
            bind_addr: defaults::http_bind_addr(),
        }
    }
}

/// Complete node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Coordination service endpoint address. Required.
    #[serde(default)]
    pub endpoint: String,
    /// Optional namespace prefix for the peers/leader paths.
    #[serde(default)]
    pub namespace: Option<String>,
    /// Self-description payload registered with the identity. Required.
    #[serde(default)]
    pub description: String,
    /// Coordination session timeout in milliseconds.
    #[serde(default = "defaults::session_timeout_ms")]
    pub session_timeout_ms: u64,
    /// Bounded wait for the initial connection, in milliseconds.
    #[serde(default = "defaults::connection_timeout_ms")]
    pub connection_timeout_ms: u64,
    /// Whether the node contends for leadership at startup.
    #[serde(default = "defaults::contend_on_start")]
    pub contend_on_start: bool,
    /// What to do when the coordination session expires.
    #[serde(default)]
    pub expiry_policy: ExpiryPolicy,
    /// HTTP control-surface settings.
    #[serde(default)]
    pub http: HttpConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            namespace: None,
            description: String::new(),
            session_timeout_ms: defaults::session_timeout_ms(),
            connection_timeout_ms: defaults::connection_timeout_ms(),
            contend_on_start: defaults::contend_on_start(),
            expiry_policy: ExpiryPolicy::default(),
            http: HttpConfig::default(),
        }
    }
}

/// Config-file shape: every field optional so the file only overrides what
/// it names.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    endpoint: Option<String>,
    namespace: Option<String>,
    description: Option<String>,
    session_timeout_ms: Option<u64>,
    connection_timeout_ms: Option<u64>,
    contend_on_start: Option<bool>,
    expiry_policy: Option<ExpiryPolicy>,
    http: Option<FileHttpConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct FileHttpConfig {
    port: Option<u16>,
    bind_addr: Option<String>,
}

impl NodeConfig {
    /// Build a configuration from environment variables over the defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(value) = env::var("BELLWETHER_ENDPOINT") {
            config.endpoint = value;
        }
        if let Ok(value) = env::var("BELLWETHER_NAMESPACE") {
            config.namespace = Some(value);
        }
        if let Ok(value) = env::var("BELLWETHER_DESCRIPTION") {
            config.description = value;
        }
        if let Some(value) = env_parse("BELLWETHER_SESSION_TIMEOUT_MS") {
            config.session_timeout_ms = value;
        }
        if let Some(value) = env_parse("BELLWETHER_CONNECTION_TIMEOUT_MS") {
            config.connection_timeout_ms = value;
        }
        if let Some(value) = env_parse("BELLWETHER_CONTEND_ON_START") {
            config.contend_on_start = value;
        }
        if let Some(value) = env_parse("BELLWETHER_EXPIRY_POLICY") {
            config.expiry_policy = value;
        }
        if let Some(value) = env_parse("BELLWETHER_HTTP_PORT") {
            config.http.port = value;
        }
        if let Ok(value) = env::var("BELLWETHER_HTTP_BIND_ADDR") {
            config.http.bind_addr = value;
        }
        config
    }

    /// Overlay settings from a TOML file; only the fields present in the
    /// file are touched.
    pub fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let file: FileConfig = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        if let Some(endpoint) = file.endpoint {
            self.endpoint = endpoint;
        }
        if let Some(namespace) = file.namespace {
            self.namespace = Some(namespace);
        }
        if let Some(description) = file.description {
            self.description = description;
        }
        if let Some(value) = file.session_timeout_ms {
            self.session_timeout_ms = value;
        }
        if let Some(value) = file.connection_timeout_ms {
            self.connection_timeout_ms = value;
        }
        if let Some(value) = file.contend_on_start {
            self.contend_on_start = value;
        }
        if let Some(policy) = file.expiry_policy {
            self.expiry_policy = policy;
        }
        if let Some(http) = file.http {
            if let Some(port) = http.port {
                self.http.port = port;
            }
            if let Some(bind_addr) = http.bind_addr {
                self.http.bind_addr = bind_addr;
            }
        }
        Ok(())
    }

    /// Reject configurations that cannot produce a working node.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::Missing { name: "endpoint" });
        }
        if self.description.trim().is_empty() {
            return Err(ConfigError::Missing { name: "description" });
        }
        if self.session_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                name: "session_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.connection_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                name: "connection_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// The election-engine view of this configuration.
    pub fn election_config(&self) -> ElectionConfig {
        ElectionConfig {
            namespace: self.namespace.clone(),
            description: self.description.clone(),
            contend_on_start: self.contend_on_start,
            expiry_policy: self.expiry_policy,
            connect_timeout: Duration::from_millis(self.connection_timeout_ms),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|value| value.parse().ok())
}
