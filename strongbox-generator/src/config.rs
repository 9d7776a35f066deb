//! Generator configuration.

use crate::error::{GeneratorError, GeneratorResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Most history entries kept per user.
pub const DEFAULT_MAX_HISTORY: usize = 100;

/// Endpoints of the email forwarding services.
///
/// Self-hosted services (Addy.io, SimpleLogin) fall back to these when the
/// user's settings do not name a server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwarderConfig {
    pub addy_io_url: String,
    pub duck_duck_go_url: String,
    pub fastmail_url: String,
    pub firefox_relay_url: String,
    pub forward_email_url: String,
    pub simple_login_url: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            addy_io_url: "https://app.addy.io".to_string(),
            duck_duck_go_url: "https://quack.duckduckgo.com".to_string(),
            fastmail_url: "https://api.fastmail.com".to_string(),
            firefox_relay_url: "https://relay.firefox.com".to_string(),
            forward_email_url: "https://api.forwardemail.net".to_string(),
            simple_login_url: "https://app.simplelogin.io".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl ForwarderConfig {
    /// Points every service at one base URL (e.g. a mock server).
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            addy_io_url: base_url.to_string(),
            duck_duck_go_url: base_url.to_string(),
            fastmail_url: base_url.to_string(),
            firefox_relay_url: base_url.to_string(),
            forward_email_url: base_url.to_string(),
            simple_login_url: base_url.to_string(),
            ..Self::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Top-level generator configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub forwarders: ForwarderConfig,

    /// Cap on the per-user generation history.
    pub max_history: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            forwarders: ForwarderConfig::default(),
            max_history: DEFAULT_MAX_HISTORY,
        }
    }
}

impl GeneratorConfig {
    /// Parses a TOML document. Missing fields take their defaults.
    pub fn from_toml_str(source: &str) -> GeneratorResult<Self> {
        toml::from_str(source).map_err(|e| GeneratorError::Config(e.to_string()))
    }

    /// Reads and parses a TOML file.
    pub fn load(path: impl AsRef<Path>) -> GeneratorResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| GeneratorError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }
}
