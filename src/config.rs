//! Configuration management for lmbridge
//!
//! Configuration is loaded from environment variables (and a `.env` file via
//! `dotenvy` in the binary).

use anyhow::{bail, Context, Result};
use std::env;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on (always positive)
    pub port: u16,

    /// Vendor used when selecting provider models
    pub vendor: String,

    /// Base URL of the OpenAI-compatible upstream
    pub provider_api_url: String,
    /// Bearer token for the upstream, if it needs one
    pub provider_api_key: Option<String>,

    /// Emit JSON logs instead of human-readable ones
    pub json_logs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            vendor: "copilot".to_string(),
            provider_api_url: "http://127.0.0.1:11434/v1".to_string(),
            provider_api_key: None,
            json_logs: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = match lookup("LMBRIDGE_PORT") {
            Some(raw) => parse_port(&raw).context("Invalid LMBRIDGE_PORT")?,
            None => defaults.port,
        };

        Ok(Self {
            host: lookup("LMBRIDGE_HOST").unwrap_or(defaults.host),
            port,
            vendor: lookup("LMBRIDGE_VENDOR").unwrap_or(defaults.vendor),
            provider_api_url: lookup("PROVIDER_API_URL").unwrap_or(defaults.provider_api_url),
            provider_api_key: lookup("PROVIDER_API_KEY").filter(|key| !key.is_empty()),
            json_logs: lookup("LMBRIDGE_LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        })
    }

    /// Copy of this configuration listening on another port
    pub fn with_port(&self, port: u16) -> Result<Self> {
        if port == 0 {
            bail!("port must be a positive integer");
        }
        Ok(Self {
            port,
            ..self.clone()
        })
    }

    /// Address string to bind to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parse a listening port; only positive integers are accepted
pub fn parse_port(raw: &str) -> Result<u16> {
    let port: u16 = raw
        .trim()
        .parse()
        .with_context(|| format!("'{}' is not a valid port number", raw))?;
    if port == 0 {
        bail!("port must be a positive integer");
    }
    Ok(port)
}
