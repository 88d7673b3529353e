//! Consensus parameters consumed by the classifier and the status engine.
//!
//! Every threshold that differs between network profiles lives here and is
//! passed explicitly; nothing is read from module-level state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::types::Amount;

/// Lock times below this value are block heights, at or above it timestamps.
pub const LOCKTIME_THRESHOLD: u32 = 500_000_000;

pub const DEFAULT_COINBASE_MATURITY: i32 = 100;
pub const DEFAULT_RECOMMENDED_CONFIRMATIONS: i32 = 6;
pub const DEFAULT_STALE_WINDOW_SECS: i64 = 2 * 60;
pub const DEFAULT_PER_OPERATION_FEE: Amount = 10_000;

/// Network profile selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Main,
    Test,
    Regtest,
}

impl Network {
    pub fn as_str(self) -> &'static str {
        match self {
            Network::Main => "main",
            Network::Test => "test",
            Network::Regtest => "regtest",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "main" | "mainnet" => Ok(Network::Main),
            "test" | "testnet" => Ok(Network::Test),
            "regtest" => Ok(Network::Regtest),
            other => Err(LedgerError::InvalidParams(format!(
                "invalid network '{other}', expected 'main', 'test' or 'regtest'"
            ))),
        }
    }
}

/// Thresholds and fee policy for one network profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusParams {
    #[serde(default)]
    pub network: Network,
    /// Lock-time values below this are heights, otherwise unix timestamps.
    #[serde(default = "default_lock_time_threshold")]
    pub lock_time_threshold: u32,
    /// Blocks a coinbase output must wait before it can be spent.
    #[serde(default = "default_coinbase_maturity")]
    pub coinbase_maturity: i32,
    /// Depth at which a transaction is shown as fully confirmed.
    #[serde(default = "default_recommended_confirmations")]
    pub recommended_confirmations: i32,
    /// Seconds after receipt with no peer request before a transaction is
    /// considered stale.
    #[serde(default = "default_stale_window_secs")]
    pub stale_window_secs: i64,
    /// Assumed fee of one shielded operation where the fee is not observable.
    #[serde(default = "default_per_operation_fee")]
    pub per_operation_fee: Amount,
}

fn default_lock_time_threshold() -> u32 {
    LOCKTIME_THRESHOLD
}

fn default_coinbase_maturity() -> i32 {
    DEFAULT_COINBASE_MATURITY
}

fn default_recommended_confirmations() -> i32 {
    DEFAULT_RECOMMENDED_CONFIRMATIONS
}

fn default_stale_window_secs() -> i64 {
    DEFAULT_STALE_WINDOW_SECS
}

fn default_per_operation_fee() -> Amount {
    DEFAULT_PER_OPERATION_FEE
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self::for_network(Network::Main)
    }
}

impl ConsensusParams {
    /// Built-in profile for a network.
    pub fn for_network(network: Network) -> Self {
        let recommended_confirmations = match network {
            Network::Main | Network::Test => DEFAULT_RECOMMENDED_CONFIRMATIONS,
            Network::Regtest => 1,
        };
        Self {
            network,
            lock_time_threshold: LOCKTIME_THRESHOLD,
            coinbase_maturity: DEFAULT_COINBASE_MATURITY,
            recommended_confirmations,
            stale_window_secs: DEFAULT_STALE_WINDOW_SECS,
            per_operation_fee: DEFAULT_PER_OPERATION_FEE,
        }
    }

    /// Load a profile from `ZWALLET_NETWORK` (default `main`) and apply any
    /// per-field overrides found in the environment.
    pub fn from_env() -> LedgerResult<Self> {
        let network = match std::env::var("ZWALLET_NETWORK") {
            Ok(value) => value.parse()?,
            Err(_) => Network::Main,
        };
        Self::for_network(network).with_env_overrides()
    }

    /// Apply `ZWALLET_*` overrides on top of this profile.
    pub fn with_env_overrides(mut self) -> LedgerResult<Self> {
        if let Some(v) = env_override("ZWALLET_LOCK_TIME_THRESHOLD")? {
            self.lock_time_threshold = v;
        }
        if let Some(v) = env_override("ZWALLET_COINBASE_MATURITY")? {
            self.coinbase_maturity = v;
        }
        if let Some(v) = env_override("ZWALLET_RECOMMENDED_CONFIRMATIONS")? {
            self.recommended_confirmations = v;
        }
        if let Some(v) = env_override("ZWALLET_STALE_WINDOW_SECS")? {
            self.stale_window_secs = v;
        }
        if let Some(v) = env_override("ZWALLET_PER_OPERATION_FEE")? {
            self.per_operation_fee = v;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> LedgerResult<()> {
        if self.coinbase_maturity <= 0 {
            return Err(LedgerError::InvalidParams(format!(
                "coinbase_maturity must be positive, got {}",
                self.coinbase_maturity
            )));
        }
        if self.recommended_confirmations <= 0 {
            return Err(LedgerError::InvalidParams(format!(
                "recommended_confirmations must be positive, got {}",
                self.recommended_confirmations
            )));
        }
        if self.stale_window_secs < 0 {
            return Err(LedgerError::InvalidParams(format!(
                "stale_window_secs must not be negative, got {}",
                self.stale_window_secs
            )));
        }
        if self.per_operation_fee < 0 {
            return Err(LedgerError::InvalidParams(format!(
                "per_operation_fee must not be negative, got {}",
                self.per_operation_fee
            )));
        }
        Ok(())
    }

    pub fn is_height_lock(&self, lock_time: u32) -> bool {
        lock_time < self.lock_time_threshold
    }
}

fn env_override<T: FromStr>(name: &str) -> LedgerResult<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| LedgerError::InvalidParams(format!("{name}: cannot parse '{raw}'"))),
        Err(_) => Ok(None),
    }
}
