use crate::codec::Address;
use serde::Serialize;
use std::fmt;
use stellar_xdr::curr::{ScVal, SorobanAuthorizationEntry, SorobanTransactionData};

/// An account's sequence state, fetched fresh for every invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountState {
    pub account_id: Address,
    pub sequence: i64,
}

/// Successful simulation: the return value plus the resources needed to
/// submit the same call for real.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationSuccess {
    pub return_value: Option<ScVal>,
    pub transaction_data: Option<SorobanTransactionData>,
    pub min_resource_fee: i64,
    pub auth: Vec<SorobanAuthorizationEntry>,
    pub latest_ledger: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulationOutcome {
    Success(SimulationSuccess),
    Failure { detail: String },
}

/// Status returned by the node when a transaction is handed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmitStatus {
    Pending,
    Duplicate,
    TryAgainLater,
    Error,
}

impl SubmitStatus {
    pub fn from_rpc(status: &str) -> Option<Self> {
        match status {
            "PENDING" => Some(SubmitStatus::Pending),
            "DUPLICATE" => Some(SubmitStatus::Duplicate),
            "TRY_AGAIN_LATER" => Some(SubmitStatus::TryAgainLater),
            "ERROR" => Some(SubmitStatus::Error),
            _ => None,
        }
    }
}

impl fmt::Display for SubmitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SubmitStatus::Pending => "PENDING",
            SubmitStatus::Duplicate => "DUPLICATE",
            SubmitStatus::TryAgainLater => "TRY_AGAIN_LATER",
            SubmitStatus::Error => "ERROR",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionResult {
    pub hash: String,
    pub status: SubmitStatus,
    /// Node-provided reason when the status is not `Pending`.
    pub error_detail: Option<String>,
}

/// Polled transaction status. `NotFound` and `Pending` are transient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    NotFound,
    Pending,
    Success { return_value: Option<ScVal> },
    Failed { detail: String },
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Success { .. } | TransactionStatus::Failed { .. }
        )
    }
}

/// Node identity as reported by `getNetwork`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkInfo {
    pub passphrase: String,
    pub protocol_version: u32,
    pub friendbot_url: Option<String>,
}
