use crate::domain::payment::ClaimPolicy;
use crate::error::{RelayError, Result};
use crate::infrastructure::pi_api::{DEFAULT_BASE_URL, PiApiConfig};
use chrono::TimeDelta;
use clap::Parser;
use std::fs::read_to_string;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Pi payment callback relay.
///
/// Every option can also be supplied through the environment variable shown
/// in `--help`.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// IP address to listen on
    #[arg(long, env = "RELAY_BIND", default_value = "0.0.0.0")]
    pub bind: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3001)]
    pub port: u16,

    /// Pi Platform API key used to approve and complete payments
    #[arg(long, env = "PI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// File holding the Pi Platform API key (e.g. a Docker secret)
    #[arg(long, env = "PI_API_KEY_FILE")]
    pub api_key_file: Option<PathBuf>,

    /// App secret sent as X-Pi-App-Secret when verifying access tokens
    #[arg(long, env = "PI_APP_SECRET", hide_env_values = true)]
    pub app_secret: Option<String>,

    /// Base URL of the Pi Platform API
    #[arg(long, env = "PI_API_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub api_base_url: String,

    /// Timeout for calls to the Pi Platform API, in seconds
    #[arg(long, env = "PI_API_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Age after which an unfinished forward no longer blocks retries, in seconds
    #[arg(long, env = "RELAY_CLAIM_TTL_SECS", default_value_t = 120)]
    pub claim_ttl_secs: u64,

    /// Reject `complete` for payments that were never approved
    #[arg(long, env = "RELAY_STRICT_ORDERING")]
    pub strict_ordering: bool,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "RELAY_DB_PATH")]
    pub db_path: Option<PathBuf>,
}

impl Config {
    /// Resolves the API key from `--api-key`, falling back to `--api-key-file`.
    pub fn api_key(&self) -> Result<String> {
        if let Some(key) = self.api_key.as_deref().map(str::trim)
            && !key.is_empty()
        {
            return Ok(key.to_string());
        }

        if let Some(path) = &self.api_key_file {
            let key = read_to_string(path)
                .map_err(|e| {
                    RelayError::Config(format!(
                        "failed to read PI_API_KEY_FILE {}: {e}",
                        path.display()
                    ))
                })?
                .trim()
                .to_string();
            if !key.is_empty() {
                return Ok(key);
            }
        }

        Err(RelayError::Config(
            "Pi API key missing: set PI_API_KEY or PI_API_KEY_FILE".to_string(),
        ))
    }

    pub fn pi_api(&self) -> Result<PiApiConfig> {
        Ok(PiApiConfig {
            base_url: self.api_base_url.clone(),
            api_key: self.api_key()?,
            app_secret: self
                .app_secret
                .clone()
                .filter(|secret| !secret.trim().is_empty()),
            timeout: Duration::from_secs(self.timeout_secs),
        })
    }

    /// The claim TTL must outlive the outbound timeout, otherwise a redelivery
    /// could take over a claim whose forward is still running.
    pub fn claim_policy(&self) -> Result<ClaimPolicy> {
        if self.claim_ttl_secs <= self.timeout_secs {
            return Err(RelayError::Config(format!(
                "RELAY_CLAIM_TTL_SECS ({}) must be greater than PI_API_TIMEOUT_SECS ({})",
                self.claim_ttl_secs, self.timeout_secs
            )));
        }

        let claim_ttl = i64::try_from(self.claim_ttl_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX);

        Ok(ClaimPolicy {
            claim_ttl,
            strict_ordering: self.strict_ordering,
        })
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self.bind.parse().map_err(|e| {
            RelayError::Config(format!("invalid listen address '{}': {e}", self.bind))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}
