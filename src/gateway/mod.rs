//! Query surface over the remote ledger node.
//!
//! [`NodeGateway`] is the seam the engine talks through; [`RpcGateway`] is
//! the Soroban JSON-RPC implementation and [`crate::mock::MockGateway`] the
//! scripted one used in tests.

pub mod jsonrpc;
pub mod rpc;
pub mod types;

use crate::builder::{SignedEnvelope, UnsignedEnvelope};
use crate::codec::Address;
use crate::Result;
use async_trait::async_trait;

pub use rpc::RpcGateway;
pub use types::{
    AccountState, NetworkInfo, SimulationOutcome, SimulationSuccess, SubmissionResult,
    SubmitStatus, TransactionStatus,
};

/// Stateless operations against a ledger node. Every call is single-shot;
/// repetition and pacing belong to the caller.
#[async_trait]
pub trait NodeGateway: Send + Sync {
    /// Fails with `AccountNotFound` or `Network`.
    async fn fetch_account(&self, account: &Address) -> Result<AccountState>;

    /// Execute without submitting. Never mutates ledger state.
    async fn simulate(&self, envelope: &UnsignedEnvelope) -> Result<SimulationOutcome>;

    /// Hand a signed transaction to the node. Node-side rejection is reported
    /// through the returned status, transport failure as `Network`.
    async fn submit(&self, envelope: &SignedEnvelope) -> Result<SubmissionResult>;

    async fn poll_status(&self, hash: &str) -> Result<TransactionStatus>;
}
