//! Server configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

/// Default listen address when the configuration does not name one.
const DEFAULT_LISTEN: &str = "127.0.0.1:110";

/// Top-level server configuration, deserialized from a JSON file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind, `host:port`.
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Permit USER/PASS on unencrypted connections.
    #[serde(default)]
    pub allow_insecure_auth: bool,
    /// Idle-read timeout in seconds before a session is closed.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Greeting text sent on connect.
    #[serde(default = "default_greeting")]
    pub greeting: String,
    /// TLS material; when present the listener accepts implicit TLS.
    #[serde(default)]
    pub tls: Option<TlsConfig>,
    /// Accounts served from the in-memory store.
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

/// Paths to PEM-encoded TLS material.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TlsConfig {
    /// Certificate chain file.
    pub cert: PathBuf,
    /// Private key file.
    pub key: PathBuf,
}

/// One account in the credential table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserConfig {
    /// Mailbox name.
    pub username: String,
    /// Plaintext password.
    pub password: String,
}

fn default_listen() -> String {
    DEFAULT_LISTEN.to_string()
}

const fn default_idle_timeout_secs() -> u64 {
    60
}

fn default_greeting() -> String {
    "maildrop POP3 server ready".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            allow_insecure_auth: false,
            idle_timeout_secs: default_idle_timeout_secs(),
            greeting: default_greeting(),
            tls: None,
            users: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }

    /// Idle timeout as a [`Duration`].
    #[must_use]
    pub const fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}
