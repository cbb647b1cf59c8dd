//! Static-configuration bootstrap.
//!
//! Before opening a connection, the launcher fetches a static configuration
//! payload (server endpoints, feature flags, roster toggles) from the backend.
//! The HTTP call itself lives outside this crate; [`ConfigSource`] is the
//! trait seam and [`ServerConfig`] the typed payload:
//! `{ "success": bool, "config": { ... } }`.
//!
//! A failed fetch — or a payload with `success == false` — is fatal to
//! startup. It is surfaced to the caller as
//! [`BrawlNetError::ConfigUnavailable`] and never touches the connection
//! state machine.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{BrawlNetError, Result};

/// Static configuration payload returned by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub success: bool,
    /// Nested key/value configuration; values are free-form JSON.
    #[serde(default)]
    pub config: HashMap<String, serde_json::Value>,
}

impl ServerConfig {
    /// Parse a raw JSON payload and enforce the `success` flag.
    ///
    /// # Errors
    ///
    /// Returns [`BrawlNetError::Serialization`] on malformed JSON and
    /// [`BrawlNetError::ConfigUnavailable`] when the backend reports failure.
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        if !config.success {
            return Err(BrawlNetError::ConfigUnavailable(
                "backend reported success=false".into(),
            ));
        }
        Ok(config)
    }

    /// String value for `key`, if present and a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(|v| v.as_str())
    }

    /// Unsigned integer value for `key`, if present and numeric.
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.config.get(key).and_then(|v| v.as_u64())
    }

    /// Boolean value for `key`, if present and boolean.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.config.get(key).and_then(|v| v.as_bool())
    }
}

/// Source of the static configuration payload.
///
/// Implement this over your HTTP stack of choice; the client only consumes
/// the parsed [`ServerConfig`].
///
/// ```rust,no_run
/// use async_trait::async_trait;
/// use brawlnet_client::bootstrap::{ConfigSource, ServerConfig};
/// use brawlnet_client::error::Result;
///
/// struct HttpConfigSource { url: String }
///
/// #[async_trait]
/// impl ConfigSource for HttpConfigSource {
///     async fn fetch(&self) -> Result<ServerConfig> {
///         // GET self.url, then:
///         # let body = String::new();
///         ServerConfig::from_json(&body)
///     }
/// }
/// ```
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Fetch and validate the static configuration.
    ///
    /// # Errors
    ///
    /// Implementations should map transport failures to
    /// [`BrawlNetError::ConfigUnavailable`] so callers can treat any error
    /// from this method as fatal to startup.
    async fn fetch(&self) -> Result<ServerConfig>;
}
