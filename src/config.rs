//! Configuration Module
//!
//! This module defines all configuration structures for a batch run.
//! Configuration is loaded from TOML files and parsed using serde.

use ethers::types::{Address, Bytes, U256};
use ethers::utils::{parse_units, ParseUnits};
use serde::Deserialize;
use std::fs;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::batch::{ExecutionMode, ExecutorConfig};
use crate::calldata::{decode_payload, last_nonzero_parameter, patch_parameter, CalldataError, SignaturePosition};
use crate::ledger::FailurePolicy;
use crate::retry::RetryPolicy;
use crate::signature::{SignatureKind, SignatureParams};
use crate::types::GasConfig;

/// Main configuration structure
///
/// Loaded from a TOML file (e.g., config/default.toml).
///
/// # Example TOML
/// ```toml
/// [ledger]
/// rpc_url = "http://127.0.0.1:8545"
/// chain_id = 31337
///
/// [identities]
/// mnemonic = "test test test test test test test test test test test junk"
/// count = 10
///
/// [batch]
/// token_address = "0x..."
/// target_address = "0x..."
/// payload = "0xa9059cbb..."
/// max_concurrency = 10
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub ledger: LedgerConfig,
    pub identities: IdentitiesConfig,
    pub batch: BatchConfig,
    #[serde(default)]
    pub gas: GasSettings,
    #[serde(default)]
    pub retry: RetryConfig,
    pub signature: Option<SignatureConfig>,
    #[serde(default)]
    pub payload: PayloadConfig,
    #[serde(default)]
    pub revoke: RevokeConfig,
}

/// Ledger endpoint
///
/// # Fields
/// - `rpc_url`: JSON-RPC endpoint (e.g., "http://127.0.0.1:8545")
/// - `chain_id`: Chain id signed into every transaction
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    pub rpc_url: String,
    pub chain_id: u64,
}

/// Identity derivation
#[derive(Debug, Clone, Deserialize)]
pub struct IdentitiesConfig {
    pub mnemonic: String,
    #[serde(default = "default_identity_count")]
    pub count: usize,
}

/// Batch execution settings
///
/// # Fields
/// - `token_address`: Asset contract each identity authorizes
/// - `target_address`: Contract receiving the action
/// - `payload`: Hex-encoded action call
/// - `max_concurrency`: Tasks in flight at once
/// - `max_retries`: Submission attempts per operation
/// - `mode`: "pipelined" or "staged"
#[derive(Debug, Clone, Deserialize)]
pub struct BatchConfig {
    pub token_address: String,
    pub target_address: String,
    pub payload: String,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default)]
    pub mode: ExecutionMode,
}

/// Initial fee parameters
#[derive(Debug, Clone, Deserialize)]
pub struct GasSettings {
    /// Decimal gwei amount, e.g. "5" or "1.5"
    #[serde(default = "default_price_gwei")]
    pub price_gwei: String,
    #[serde(default = "default_gas_limit")]
    pub limit: u64,
}

impl Default for GasSettings {
    fn default() -> Self {
        Self {
            price_gwei: default_price_gwei(),
            limit: default_gas_limit(),
        }
    }
}

/// Retry and failure classification
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    pub attempt_timeout_ms: Option<u64>,
    /// JSON-RPC error codes treated as fee rejections
    #[serde(default)]
    pub fee_error_codes: Vec<i64>,
    #[serde(default = "FailurePolicy::default_fee_patterns")]
    pub fee_error_patterns: Vec<String>,
    #[serde(default = "FailurePolicy::default_sequence_patterns")]
    pub sequence_error_patterns: Vec<String>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            backoff_ms: default_backoff_ms(),
            attempt_timeout_ms: None,
            fee_error_codes: Vec::new(),
            fee_error_patterns: FailurePolicy::default_fee_patterns(),
            sequence_error_patterns: FailurePolicy::default_sequence_patterns(),
        }
    }
}

/// Signature provider selection
///
/// # Example TOML
/// ```toml
/// [signature]
/// kind = "http"
/// url = "https://signer.example/sign/{address}"
/// position = "append"
///
/// [signature.params]
/// campaign = "spring"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct SignatureConfig {
    #[serde(flatten)]
    pub kind: SignatureKind,
    #[serde(default)]
    pub position: SignaturePosition,
    #[serde(default)]
    pub params: SignatureParams,
}

/// Payload preparation applied once before the batch starts
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayloadConfig {
    /// Parameter word to set to zero
    pub zero_param_index: Option<usize>,
    /// Zero the last nonzero parameter when no index is given
    #[serde(default)]
    pub auto_zero_min_amount: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RevokeConfig {
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

impl Default for RevokeConfig {
    fn default() -> Self {
        Self {
            settle_ms: default_settle_ms(),
        }
    }
}

fn default_identity_count() -> usize {
    50
}

fn default_max_concurrency() -> usize {
    10
}

fn default_max_retries() -> u32 {
    3
}

fn default_price_gwei() -> String {
    "5".to_string()
}

fn default_gas_limit() -> u64 {
    300_000
}

fn default_backoff_ms() -> u64 {
    100
}

fn default_settle_ms() -> u64 {
    3_000
}

/// Invalid configuration value
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} is not a valid address: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("gas price '{0}' is not a valid gwei amount")]
    InvalidGasPrice(String),

    #[error("gas price '{0}' must be a positive gwei amount")]
    NonPositiveGasPrice(String),

    #[error("invalid payload: {0}")]
    Payload(#[from] CalldataError),
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the TOML configuration file
    ///
    /// # Returns
    /// * `Ok(Config)` if the file was read, parsed and validated
    /// * `Err` if the file couldn't be read, the TOML is invalid, or a value
    ///   is out of range
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config = Self::parse(&content)?;
        info!("Loaded configuration from {}", path);
        Ok(config)
    }

    /// Parses and validates TOML content
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every value that would otherwise fail mid-batch
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch.max_concurrency == 0 {
            return Err(ConfigError::Zero { field: "batch.max_concurrency" });
        }
        if self.batch.max_retries == 0 {
            return Err(ConfigError::Zero { field: "batch.max_retries" });
        }
        if self.gas.limit == 0 {
            return Err(ConfigError::Zero { field: "gas.limit" });
        }
        self.token_address()?;
        self.target_address()?;
        self.gas_config()?;
        self.action_payload()?;
        Ok(())
    }

    pub fn token_address(&self) -> Result<Address, ConfigError> {
        parse_address("batch.token_address", &self.batch.token_address)
    }

    pub fn target_address(&self) -> Result<Address, ConfigError> {
        parse_address("batch.target_address", &self.batch.target_address)
    }

    /// Initial fee parameters, price converted from gwei to wei
    pub fn gas_config(&self) -> Result<GasConfig, ConfigError> {
        let parsed = parse_units(self.gas.price_gwei.trim(), "gwei")
            .map_err(|_| ConfigError::InvalidGasPrice(self.gas.price_gwei.clone()))?;
        // Negative amounts come back as I256; zero would never escalate
        let price = match parsed {
            ParseUnits::U256(price) if !price.is_zero() => price,
            _ => return Err(ConfigError::NonPositiveGasPrice(self.gas.price_gwei.clone())),
        };
        Ok(GasConfig::new(price, self.gas.limit))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.batch.max_retries)
            .with_backoff_step(Duration::from_millis(self.retry.backoff_ms))
            .with_attempt_timeout(self.retry.attempt_timeout_ms.map(Duration::from_millis))
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::new(
            self.retry.fee_error_codes.clone(),
            self.retry.fee_error_patterns.clone(),
            self.retry.sequence_error_patterns.clone(),
        )
    }

    /// Decoded action payload with the `[payload]` patches applied
    pub fn action_payload(&self) -> Result<Bytes, ConfigError> {
        let payload = decode_payload(&self.batch.payload)?;

        let index = match self.payload.zero_param_index {
            Some(index) => Some(index),
            None if self.payload.auto_zero_min_amount => last_nonzero_parameter(&payload)?,
            None => None,
        };

        match index {
            Some(index) => Ok(patch_parameter(&payload, index, U256::zero())?),
            None => Ok(payload),
        }
    }

    /// Batch-wide executor inputs
    pub fn executor_config(&self) -> Result<ExecutorConfig, ConfigError> {
        let (signature_position, signature_params) = match &self.signature {
            Some(signature) => (signature.position, signature.params.clone()),
            None => (SignaturePosition::default(), SignatureParams::new()),
        };

        Ok(ExecutorConfig {
            token: self.token_address()?,
            target: self.target_address()?,
            payload: self.action_payload()?,
            gas: self.gas_config()?,
            max_concurrency: self.batch.max_concurrency,
            mode: self.batch.mode,
            signature_position,
            signature_params,
        })
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.revoke.settle_ms)
    }
}

fn parse_address(field: &'static str, value: &str) -> Result<Address, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidAddress {
        field,
        value: value.to_string(),
    })
}
