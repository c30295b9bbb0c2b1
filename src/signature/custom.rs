use async_trait::async_trait;
use ethers::types::{Address, Bytes};
use std::collections::HashMap;
use std::sync::Arc;

use super::provider::{SignatureParams, SignatureProvider};
use crate::error::SignatureError;

/// Caller-supplied signing function
pub type SignerFn = Arc<dyn Fn(Address, &SignatureParams) -> Result<Bytes, SignatureError> + Send + Sync>;

/// Delegates to a registered signer function
#[derive(Clone)]
pub struct CustomSignatureProvider {
    signer: SignerFn,
}

impl CustomSignatureProvider {
    pub fn new(signer: SignerFn) -> Self {
        Self { signer }
    }

    pub fn from_fn<F>(signer: F) -> Self
    where
        F: Fn(Address, &SignatureParams) -> Result<Bytes, SignatureError> + Send + Sync + 'static,
    {
        Self::new(Arc::new(signer))
    }
}

#[async_trait]
impl SignatureProvider for CustomSignatureProvider {
    async fn get_signature(&self, address: Address, params: &SignatureParams) -> Result<Bytes, SignatureError> {
        (self.signer)(address, params)
    }

    fn name(&self) -> &'static str {
        "custom"
    }
}

/// Named signer functions that configuration may refer to
#[derive(Clone, Default)]
pub struct SignerRegistry {
    signers: HashMap<String, SignerFn>,
}

impl SignerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, signer: F) -> &mut Self
    where
        F: Fn(Address, &SignatureParams) -> Result<Bytes, SignatureError> + Send + Sync + 'static,
    {
        self.signers.insert(name.into(), Arc::new(signer));
        self
    }

    pub fn get(&self, name: &str) -> Option<SignerFn> {
        self.signers.get(name).cloned()
    }
}
