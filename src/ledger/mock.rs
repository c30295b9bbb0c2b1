//! In-memory `Ledger` for tests
//!
//! Scripts allowances, transaction counts and submission failures, and
//! records every call so tests can assert on what was sent.

use async_trait::async_trait;
use ethers::abi::{AbiDecode, AbiEncode};
use ethers::types::{Address, Bytes, H256, U256};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use super::client::{Ledger, TxRequest};
use super::erc20::{AllowanceCall, AllowanceReturn, ApproveCall};
use crate::error::LedgerError;
use crate::types::{GasConfig, Identity, OperationKind};

/// One recorded submission
#[derive(Debug, Clone)]
pub(crate) struct Submission {
    pub from: Address,
    pub to: Address,
    pub kind: OperationKind,
    pub data: Bytes,
    pub gas: GasConfig,
    pub nonce: Option<u64>,
    pub accepted: bool,
}

#[derive(Default)]
struct MockState {
    allowances: HashMap<Address, U256>,
    allowance_failures: HashSet<Address>,
    tx_counts: HashMap<Address, u64>,
    count_failures: HashSet<Address>,
    count_reads: HashMap<Address, usize>,
    scripted: HashMap<(Address, OperationKind), VecDeque<LedgerError>>,
    submissions: Vec<Submission>,
    unreachable: Option<LedgerError>,
    in_flight: usize,
    peak_in_flight: usize,
    next_hash: u64,
}

pub(crate) struct MockLedger {
    state: Mutex<MockState>,
    submit_delay: Duration,
    /// Whether accepted approve transactions update the stored allowance
    apply_approvals: bool,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            submit_delay: Duration::ZERO,
            apply_approvals: true,
        }
    }

    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = delay;
        self
    }

    pub fn ignoring_approvals(mut self) -> Self {
        self.apply_approvals = false;
        self
    }

    pub fn with_allowance(self, owner: Address, amount: U256) -> Self {
        self.state.lock().unwrap().allowances.insert(owner, amount);
        self
    }

    pub fn failing_allowance(self, owner: Address) -> Self {
        self.state.lock().unwrap().allowance_failures.insert(owner);
        self
    }

    pub fn with_tx_count(self, address: Address, count: u64) -> Self {
        self.state.lock().unwrap().tx_counts.insert(address, count);
        self
    }

    pub fn failing_tx_count(self, address: Address) -> Self {
        self.state.lock().unwrap().count_failures.insert(address);
        self
    }

    pub fn unreachable(self, err: LedgerError) -> Self {
        self.state.lock().unwrap().unreachable = Some(err);
        self
    }

    /// Queues errors returned by the next submissions of `kind` from `from`
    pub fn script_failures(self, from: Address, kind: OperationKind, errors: Vec<LedgerError>) -> Self {
        self.state
            .lock()
            .unwrap()
            .scripted
            .entry((from, kind))
            .or_default()
            .extend(errors);
        self
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.state.lock().unwrap().submissions.clone()
    }

    pub fn submissions_from(&self, from: Address) -> Vec<Submission> {
        self.submissions().into_iter().filter(|s| s.from == from).collect()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.state.lock().unwrap().peak_in_flight
    }

    pub fn count_reads(&self, address: Address) -> usize {
        self.state.lock().unwrap().count_reads.get(&address).copied().unwrap_or(0)
    }

    fn classify(data: &Bytes) -> (OperationKind, Option<ApproveCall>) {
        match ApproveCall::decode(data.as_ref()) {
            Ok(call) if call.amount.is_zero() => (OperationKind::Revocation, Some(call)),
            Ok(call) => (OperationKind::Authorization, Some(call)),
            Err(_) => (OperationKind::Action, None),
        }
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn submit_transaction(&self, identity: &Identity, request: TxRequest) -> Result<H256, LedgerError> {
        let (kind, approve) = Self::classify(&request.data);
        {
            let mut state = self.state.lock().unwrap();
            state.in_flight += 1;
            state.peak_in_flight = state.peak_in_flight.max(state.in_flight);
        }

        if !self.submit_delay.is_zero() {
            tokio::time::sleep(self.submit_delay).await;
        }

        let mut state = self.state.lock().unwrap();
        state.in_flight -= 1;
        let scripted = state
            .scripted
            .get_mut(&(identity.address, kind))
            .and_then(|queue| queue.pop_front());

        state.submissions.push(Submission {
            from: identity.address,
            to: request.to,
            kind,
            data: request.data.clone(),
            gas: request.gas,
            nonce: request.nonce,
            accepted: scripted.is_none(),
        });

        if let Some(err) = scripted {
            return Err(err);
        }

        if let (true, Some(call)) = (self.apply_approvals, approve) {
            state.allowances.insert(identity.address, call.amount);
        }
        state.next_hash += 1;
        Ok(H256::from_low_u64_be(state.next_hash))
    }

    async fn call_view(&self, _to: Address, data: Bytes) -> Result<Bytes, LedgerError> {
        let call = AllowanceCall::decode(data.as_ref()).map_err(|e| LedgerError::Decode(e.to_string()))?;
        let state = self.state.lock().unwrap();
        if state.allowance_failures.contains(&call.owner) {
            return Err(LedgerError::Transport("allowance read failed".into()));
        }
        let amount = state.allowances.get(&call.owner).copied().unwrap_or_default();
        Ok(AllowanceReturn(amount).encode().into())
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, LedgerError> {
        let mut state = self.state.lock().unwrap();
        *state.count_reads.entry(address).or_default() += 1;
        if state.count_failures.contains(&address) {
            return Err(LedgerError::Transport("nonce read failed".into()));
        }
        Ok(state.tx_counts.get(&address).copied().unwrap_or(0))
    }

    async fn block_number(&self) -> Result<u64, LedgerError> {
        match &self.state.lock().unwrap().unreachable {
            Some(err) => Err(err.clone()),
            None => Ok(1_000_000),
        }
    }
}

/// Deterministic identities backed by fixed private keys
pub(crate) fn test_identities(count: usize) -> Vec<Identity> {
    (0..count)
        .map(|i| {
            let wallet = format!("{:064x}", i + 1)
                .parse::<ethers::signers::LocalWallet>()
                .unwrap();
            Identity::new(i, wallet)
        })
        .collect()
}
