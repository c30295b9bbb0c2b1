//! Signature provider trait, static provider and the provider factory

use async_trait::async_trait;
use ethers::types::{Address, Bytes};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use super::custom::{CustomSignatureProvider, SignerRegistry};
use super::remote::{HttpMethod, RemoteSignatureProvider};
use crate::error::SignatureError;
use crate::limiter::ConcurrencyLimiter;

/// Extra parameters forwarded to a provider alongside the address
pub type SignatureParams = serde_json::Map<String, serde_json::Value>;

/// Pool size used by the default batch form
pub const BATCH_SIGNATURE_CONCURRENCY: usize = 10;

/// Source of per-identity signatures
#[async_trait]
pub trait SignatureProvider: Send + Sync {
    /// Returns the raw signature for one identity address
    async fn get_signature(&self, address: Address, params: &SignatureParams) -> Result<Bytes, SignatureError>;

    /// Fetches signatures for many addresses, results in input order
    ///
    /// The default runs `get_signature` over a small bounded pool;
    /// providers with a real batch endpoint should override it.
    async fn get_batch_signatures(
        &self,
        addresses: &[Address],
        params: &SignatureParams,
    ) -> Vec<Result<Bytes, SignatureError>> {
        let limiter = ConcurrencyLimiter::new(BATCH_SIGNATURE_CONCURRENCY);
        limiter
            .run_all(addresses.iter().map(|address| move || self.get_signature(*address, params)))
            .await
    }

    /// Short name used in logs
    fn name(&self) -> &'static str;
}

/// Always returns the same signature
#[derive(Debug, Clone)]
pub struct StaticSignatureProvider {
    signature: Bytes,
}

impl StaticSignatureProvider {
    pub fn new(signature: impl Into<Bytes>) -> Self {
        Self {
            signature: signature.into(),
        }
    }

    /// Builds the provider from a hex string, with or without `0x`
    pub fn from_hex(signature: &str) -> Result<Self, SignatureError> {
        Ok(Self::new(decode_signature(signature)?))
    }
}

#[async_trait]
impl SignatureProvider for StaticSignatureProvider {
    async fn get_signature(&self, _address: Address, _params: &SignatureParams) -> Result<Bytes, SignatureError> {
        Ok(self.signature.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Provider selection as it appears in configuration
///
/// # Example TOML
/// ```toml
/// [signature]
/// kind = "http"
/// url = "https://signer.example/sign/{address}"
/// method = "POST"
/// position = "append"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SignatureKind {
    Static {
        signature: String,
    },
    Http {
        /// Endpoint; `{address}` is replaced with the identity address
        url: String,
        #[serde(default)]
        method: HttpMethod,
        #[serde(default)]
        headers: HashMap<String, String>,
    },
    Custom {
        /// Name the signer function was registered under
        name: String,
    },
}

/// Creates the provider described by `kind`
///
/// Custom signers are looked up in `registry`; configuration can only name
/// a signer, never supply code.
pub fn create_provider(
    kind: &SignatureKind,
    registry: &SignerRegistry,
) -> Result<Arc<dyn SignatureProvider>, SignatureError> {
    match kind {
        SignatureKind::Static { signature } => Ok(Arc::new(StaticSignatureProvider::from_hex(signature)?)),
        SignatureKind::Http { url, method, headers } => {
            Ok(Arc::new(RemoteSignatureProvider::new(url.clone(), *method, headers)?))
        }
        SignatureKind::Custom { name } => {
            let signer = registry
                .get(name)
                .ok_or_else(|| SignatureError::UnknownSigner(name.clone()))?;
            Ok(Arc::new(CustomSignatureProvider::new(signer)))
        }
    }
}

/// Parses a hex signature, accepting an optional `0x` prefix
pub fn decode_signature(value: &str) -> Result<Bytes, SignatureError> {
    let trimmed = value.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    hex::decode(digits)
        .map(Bytes::from)
        .map_err(|_| SignatureError::InvalidHex(value.to_string()))
}
