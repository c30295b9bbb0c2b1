//! Ledger Client Module
//!
//! Defines the `Ledger` trait and its JSON-RPC implementation on top of
//! `ethers` providers. Transactions are legacy (gas-price) transactions
//! signed with the identity's local wallet.

use async_trait::async_trait;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, MiddlewareError, Provider};
use ethers::signers::Signer;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionRequest, H256};
use tracing::debug;

use crate::error::LedgerError;
use crate::types::{GasConfig, Identity};

/// A transaction to submit on behalf of an identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    pub to: Address,
    pub data: Bytes,
    pub gas: GasConfig,
    /// Pre-assigned sequence number; the endpoint picks one when `None`
    pub nonce: Option<u64>,
}

/// Request/response surface of the remote ledger endpoint
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Signs and submits a transaction, returning its hash once accepted
    async fn submit_transaction(&self, identity: &Identity, request: TxRequest) -> Result<H256, LedgerError>;

    /// Executes a read-only call against a contract
    async fn call_view(&self, to: Address, data: Bytes) -> Result<Bytes, LedgerError>;

    /// Confirmed transaction count (next nonce) of an address
    async fn transaction_count(&self, address: Address) -> Result<u64, LedgerError>;

    /// Latest block height, used as the connectivity preflight
    async fn block_number(&self) -> Result<u64, LedgerError>;
}

/// `Ledger` backed by an HTTP JSON-RPC provider
#[derive(Debug, Clone)]
pub struct EthersLedger {
    provider: Provider<Http>,
    /// Chain id applied to every signed transaction
    chain_id: u64,
}

impl EthersLedger {
    /// Creates a client for the given RPC endpoint
    ///
    /// # Arguments
    /// * `rpc_url` - HTTP(S) JSON-RPC endpoint
    /// * `chain_id` - Chain id used for replay protection when signing
    pub fn connect(rpc_url: &str, chain_id: u64) -> Result<Self, LedgerError> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| LedgerError::Transport(format!("invalid rpc url {}: {}", rpc_url, e)))?;
        Ok(Self { provider, chain_id })
    }
}

#[async_trait]
impl Ledger for EthersLedger {
    async fn submit_transaction(&self, identity: &Identity, request: TxRequest) -> Result<H256, LedgerError> {
        let wallet = identity.signer().clone().with_chain_id(self.chain_id);
        let client = SignerMiddleware::new(self.provider.clone(), wallet);

        let mut tx = TransactionRequest::new()
            .from(identity.address)
            .to(request.to)
            .data(request.data)
            .gas(request.gas.limit)
            .gas_price(request.gas.price)
            .chain_id(self.chain_id);
        if let Some(nonce) = request.nonce {
            tx = tx.nonce(nonce);
        }

        let pending = client.send_transaction(tx, None).await.map_err(ledger_error)?;
        let hash = pending.tx_hash();
        debug!("Identity {} submitted {:?}", identity.index, hash);
        Ok(hash)
    }

    async fn call_view(&self, to: Address, data: Bytes) -> Result<Bytes, LedgerError> {
        let tx: TypedTransaction = TransactionRequest::new().to(to).data(data).into();
        self.provider.call(&tx, None).await.map_err(ledger_error)
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, LedgerError> {
        let count = self
            .provider
            .get_transaction_count(address, None)
            .await
            .map_err(ledger_error)?;
        Ok(count.low_u64())
    }

    async fn block_number(&self) -> Result<u64, LedgerError> {
        let number = self.provider.get_block_number().await.map_err(ledger_error)?;
        Ok(number.as_u64())
    }
}

/// Maps a provider or signer error onto `LedgerError`
///
/// JSON-RPC error responses keep their code so the failure policy can
/// classify on it; anything without a response body is a transport error.
fn ledger_error<E: MiddlewareError>(err: E) -> LedgerError {
    if let Some(response) = err.as_error_response() {
        return LedgerError::Rpc {
            code: response.code,
            message: response.message.clone(),
        };
    }
    if err.is_serde_error() {
        return LedgerError::Decode(err.to_string());
    }
    LedgerError::Transport(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_rejects_malformed_url() {
        let err = EthersLedger::connect("not a url", 56).unwrap_err();
        assert!(matches!(err, LedgerError::Transport(_)));
    }

    #[test]
    fn test_connect_accepts_http_url() {
        assert!(EthersLedger::connect("http://127.0.0.1:8545", 56).is_ok());
    }
}
