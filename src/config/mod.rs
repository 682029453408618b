//! Configuration management

mod profile;

pub use profile::{
    resolve, resolve_profile, CompressionMode, Profile, Tunables, DEFAULT_FRAME_SIZE,
    DEFAULT_KEEPALIVE_SECS, DEFAULT_WINDOW, MAX_FRAME_SIZE,
};

use crate::crypto::{Cipher, CipherKind};
use crate::obfuscation::ObfuscationConfig;
use crate::transport::{TcpTransport, TransportConfig};
use crate::tunnel::TunnelSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Performance profile (balanced, aggressive, performance, stable, latency)
    #[serde(default = "default_profile")]
    pub profile: String,
    /// Pre-shared key; empty disables encryption
    #[serde(default)]
    pub psk: String,
    /// AEAD algorithm
    #[serde(default)]
    pub cipher: CipherKind,
    /// Base tunables before the profile is applied
    #[serde(default)]
    pub tunables: Tunables,
    #[serde(default)]
    pub obfuscation: ObfuscationConfig,
    /// Client configuration
    pub client: Option<ClientConfig>,
    /// Server configuration
    pub server: Option<ServerConfig>,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_profile() -> String {
    Profile::Balanced.as_str().to_string()
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, crate::Error> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config: {}", e)))?;

        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, crate::Error> {
        toml::from_str(content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), crate::Error> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| crate::Error::Config(format!("Failed to write config: {}", e)))
    }

    /// Check values that cannot be fixed up by profile resolution
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.obfuscation
            .validate()
            .map_err(|e| crate::Error::Config(format!("[obfuscation] {}", e)))?;

        if self.profile.parse::<Profile>().is_err() {
            warn!("Unknown profile '{}', balanced will be used", self.profile);
        }

        if self.resolved_tunables().fragment_enabled {
            warn!("fragment_enabled has no effect on the TCP transport and is ignored");
        }

        if let Some(server) = &self.server {
            if server.max_connections == 0 {
                return Err(crate::Error::Config(
                    "[server] max_connections must be at least 1".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Tunables after applying the configured profile
    pub fn resolved_tunables(&self) -> Tunables {
        resolve(&self.tunables, &self.profile)
    }

    /// Obfuscation settings with the resolved profile's switches applied
    pub fn effective_obfuscation(&self, tunables: &Tunables) -> ObfuscationConfig {
        let mut obfuscation = self.obfuscation.clone();
        if !tunables.obfuscation_enabled {
            obfuscation.enabled = false;
        }
        if !tunables.jitter_enabled {
            obfuscation.min_delay_ms = 0;
            obfuscation.max_delay_ms = 0;
        }
        obfuscation
    }

    /// Frame cipher, or `None` when no PSK is configured
    pub fn cipher(&self) -> Result<Option<Arc<Cipher>>, crate::Error> {
        if self.psk.is_empty() {
            warn!("No pre-shared key configured, tunnel traffic will NOT be encrypted");
            return Ok(None);
        }
        Ok(Some(Arc::new(Cipher::from_psk(self.cipher, &self.psk)?)))
    }

    /// Settings for wrapping tunnel connections
    pub fn tunnel_settings(&self, tunables: &Tunables) -> Result<TunnelSettings, crate::Error> {
        Ok(TunnelSettings::new(
            self.cipher()?,
            self.effective_obfuscation(tunables),
            tunables.frame_size,
        )
        .with_compression(tunables.compression))
    }

    /// TCP transport applying `tunables` to every connection
    pub fn transport(tunables: &Tunables, connect_timeout: u64) -> TcpTransport {
        TcpTransport::new(TransportConfig {
            connect_timeout,
            tunables: tunables.clone(),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            psk: String::new(),
            cipher: CipherKind::default(),
            tunables: Tunables::default(),
            obfuscation: ObfuscationConfig::default(),
            client: None,
            server: None,
            logging: LoggingConfig::default(),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub listen: String,
    /// Maximum concurrent connections
    pub max_connections: usize,
    /// Timeout for dialing targets, in seconds
    pub connect_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8443".to_string(),
            max_connections: 1000,
            connect_timeout: 10,
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Tunnel server address
    pub server: String,
    /// Local SOCKS5 proxy address
    pub socks5_listen: String,
    /// Timeout for dialing the tunnel server, in seconds
    pub connect_timeout: u64,
    /// SOCKS5 greeting/request deadline, in seconds
    pub handshake_timeout: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: "127.0.0.1:8443".to_string(),
            socks5_listen: "127.0.0.1:1080".to_string(),
            connect_timeout: 10,
            handshake_timeout: 5,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (pretty, compact)
    pub format: String,
    /// Seconds between stats lines (0 disables)
    pub stats_interval: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            stats_interval: 60,
        }
    }
}

/// Generate example configuration
pub fn generate_example_config() -> Config {
    Config {
        psk: "change-me".to_string(),
        client: Some(ClientConfig::default()),
        server: Some(ServerConfig::default()),
        ..Config::default()
    }
}
