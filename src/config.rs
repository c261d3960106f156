//! Client configuration: TOML file, then `BETS_*` environment variables.
//!
//! # Environment Variables
//!
//! - `BETS_CONTRACT_ID`: bet-market contract address (`C…`)
//! - `BETS_TOKEN_ID`: token contract used for stakes and payouts (`C…`)
//! - `BETS_RPC_URL`: Soroban RPC endpoint (default: testnet)
//! - `BETS_NETWORK_PASSPHRASE`: network passphrase (default: testnet)
//! - `BETS_FEE`: base inclusion fee in stroops (default: 1000000)
//! - `BETS_VALIDITY_SECS`: validity window, 0 for none (default: 0)
//! - `BETS_POLL_INTERVAL_MS`: delay between status polls (default: 1000)
//! - `BETS_POLL_TIMEOUT_SECS`: give up polling after this long (default: 30)
//! - `BETS_REQUEST_TIMEOUT_SECS`: per-request HTTP timeout (default: 30)

use crate::builder::{FeePolicy, ValidityPolicy};
use crate::codec::Address;
use crate::engine::{Backoff, PollPolicy};
use crate::{ClientError, Result};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_RPC_URL: &str = "https://soroban-testnet.stellar.org";
pub const DEFAULT_NETWORK_PASSPHRASE: &str = "Test SDF Network ; September 2015";

pub const ENV_CONTRACT_ID: &str = "BETS_CONTRACT_ID";
pub const ENV_TOKEN_ID: &str = "BETS_TOKEN_ID";
pub const ENV_RPC_URL: &str = "BETS_RPC_URL";
pub const ENV_NETWORK_PASSPHRASE: &str = "BETS_NETWORK_PASSPHRASE";
pub const ENV_FEE: &str = "BETS_FEE";
pub const ENV_VALIDITY_SECS: &str = "BETS_VALIDITY_SECS";
pub const ENV_POLL_INTERVAL_MS: &str = "BETS_POLL_INTERVAL_MS";
pub const ENV_POLL_TIMEOUT_SECS: &str = "BETS_POLL_TIMEOUT_SECS";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "BETS_REQUEST_TIMEOUT_SECS";

/// Everything the engine and gateways need, built once and passed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub contract_id: Option<String>,
    pub token_id: Option<String>,
    pub rpc_url: String,
    pub network_passphrase: String,
    pub fee: FeePolicy,
    pub validity: ValidityPolicy,
    pub poll: PollPolicy,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            contract_id: None,
            token_id: None,
            rpc_url: DEFAULT_RPC_URL.to_string(),
            network_passphrase: DEFAULT_NETWORK_PASSPHRASE.to_string(),
            fee: FeePolicy::default(),
            validity: ValidityPolicy::Unbounded,
            poll: PollPolicy::default(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// On-disk shape. Every key is optional; absent keys keep their defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    contract_id: Option<String>,
    token_id: Option<String>,
    rpc_url: Option<String>,
    network_passphrase: Option<String>,
    fee: Option<u32>,
    validity_secs: Option<u64>,
    poll_interval_ms: Option<u64>,
    poll_timeout_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
}

impl ClientConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self> {
        Self::default().with_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by `lookup`, which plays the role of the
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Self::default().with_lookup(lookup)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let file: FileConfig = toml::from_str(raw)
            .map_err(|e| ClientError::Configuration(format!("invalid config file: {}", e)))?;
        Self::default().with_file(file)
    }

    /// Read `path` when given, then apply the environment on top.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    ClientError::Configuration(format!(
                        "cannot read config file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                debug!(path = %path.display(), "Loaded config file");
                Self::from_toml_str(&raw)?
            }
            None => Self::default(),
        };
        base.with_lookup(|key| std::env::var(key).ok())
    }

    fn with_file(mut self, file: FileConfig) -> Result<Self> {
        if file.contract_id.is_some() {
            self.contract_id = file.contract_id;
        }
        if file.token_id.is_some() {
            self.token_id = file.token_id;
        }
        if let Some(url) = file.rpc_url {
            self.rpc_url = url;
        }
        if let Some(passphrase) = file.network_passphrase {
            self.network_passphrase = passphrase;
        }
        if let Some(fee) = file.fee {
            self.fee = FeePolicy { base_fee: fee };
        }
        if let Some(secs) = file.validity_secs {
            self.validity = validity_from_secs(secs);
        }
        if let Some(ms) = file.poll_interval_ms {
            self.poll.backoff = interval_from_ms("poll_interval_ms", ms)?;
        }
        if let Some(secs) = file.poll_timeout_secs {
            self.poll.timeout = Some(timeout_from_secs("poll_timeout_secs", secs)?);
        }
        if let Some(secs) = file.request_timeout_secs {
            self.request_timeout = timeout_from_secs("request_timeout_secs", secs)?;
        }
        Ok(self)
    }

    fn with_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // Empty values count as unset.
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(id) = get(ENV_CONTRACT_ID) {
            self.contract_id = Some(id);
        }
        if let Some(id) = get(ENV_TOKEN_ID) {
            self.token_id = Some(id);
        }
        if let Some(url) = get(ENV_RPC_URL) {
            self.rpc_url = url;
        }
        if let Some(passphrase) = get(ENV_NETWORK_PASSPHRASE) {
            self.network_passphrase = passphrase;
        }
        if let Some(raw) = get(ENV_FEE) {
            self.fee = FeePolicy {
                base_fee: parse_var(ENV_FEE, &raw)?,
            };
        }
        if let Some(raw) = get(ENV_VALIDITY_SECS) {
            self.validity = validity_from_secs(parse_var(ENV_VALIDITY_SECS, &raw)?);
        }
        if let Some(raw) = get(ENV_POLL_INTERVAL_MS) {
            let ms = parse_var(ENV_POLL_INTERVAL_MS, &raw)?;
            self.poll.backoff = interval_from_ms(ENV_POLL_INTERVAL_MS, ms)?;
        }
        if let Some(raw) = get(ENV_POLL_TIMEOUT_SECS) {
            let secs = parse_var(ENV_POLL_TIMEOUT_SECS, &raw)?;
            self.poll.timeout = Some(timeout_from_secs(ENV_POLL_TIMEOUT_SECS, secs)?);
        }
        if let Some(raw) = get(ENV_REQUEST_TIMEOUT_SECS) {
            let secs = parse_var(ENV_REQUEST_TIMEOUT_SECS, &raw)?;
            self.request_timeout = timeout_from_secs(ENV_REQUEST_TIMEOUT_SECS, secs)?;
        }
        Ok(self)
    }

    /// The bet-market contract. Fails before any network traffic when unset.
    pub fn contract(&self) -> Result<Address> {
        contract_address(ENV_CONTRACT_ID, self.contract_id.as_deref())
    }

    /// The token contract stakes are paid in.
    pub fn token(&self) -> Result<Address> {
        contract_address(ENV_TOKEN_ID, self.token_id.as_deref())
    }

    /// Check everything every invocation needs. The token id is only
    /// required by staking and claiming, so it is checked there.
    pub fn validate(&self) -> Result<()> {
        self.contract()?;
        if let Some(token) = self.token_id.as_deref() {
            contract_address(ENV_TOKEN_ID, Some(token))?;
        }
        if !(self.rpc_url.starts_with("http://") || self.rpc_url.starts_with("https://")) {
            return Err(ClientError::Configuration(format!(
                "{} must be an http(s) URL, got '{}'",
                ENV_RPC_URL, self.rpc_url
            )));
        }
        if self.network_passphrase.is_empty() {
            return Err(ClientError::Configuration(format!(
                "{} is not set",
                ENV_NETWORK_PASSPHRASE
            )));
        }
        Ok(())
    }
}

fn contract_address(key: &str, value: Option<&str>) -> Result<Address> {
    let raw = value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ClientError::Configuration(format!("{} is not set", key)))?;
    let address = Address::from_str(raw).map_err(|e| {
        ClientError::Configuration(format!("{} is not a valid address: {}", key, e))
    })?;
    if address.is_account() {
        return Err(ClientError::Configuration(format!(
            "{} must be a contract address (C…), got an account",
            key
        )));
    }
    Ok(address)
}

fn parse_var<T: FromStr>(key: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| ClientError::Configuration(format!("{}='{}': {}", key, raw, e)))
}

fn validity_from_secs(secs: u64) -> ValidityPolicy {
    if secs == 0 {
        ValidityPolicy::Unbounded
    } else {
        ValidityPolicy::Seconds(secs)
    }
}

fn interval_from_ms(key: &str, ms: u64) -> Result<Backoff> {
    if ms == 0 {
        return Err(ClientError::Configuration(format!("{} must be positive", key)));
    }
    Ok(Backoff::Fixed(Duration::from_millis(ms)))
}

fn timeout_from_secs(key: &str, secs: u64) -> Result<Duration> {
    if secs == 0 {
        return Err(ClientError::Configuration(format!("{} must be positive", key)));
    }
    Ok(Duration::from_secs(secs))
}
