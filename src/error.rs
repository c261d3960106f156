use crate::gateway::SubmitStatus;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// The invocation step a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    FetchAccount,
    Build,
    Simulate,
    Prepare,
    Sign,
    Submit,
    Poll,
    Decode,
    NodeInfo,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Step::FetchAccount => "fetch-account",
            Step::Build => "build",
            Step::Simulate => "simulate",
            Step::Prepare => "prepare",
            Step::Sign => "sign",
            Step::Submit => "submit",
            Step::Poll => "poll",
            Step::Decode => "decode",
            Step::NodeInfo => "node-info",
        };
        write!(f, "{}", s)
    }
}

/// Why polling stopped before the ledger reported a terminal status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbandonReason {
    Timeout(Duration),
    Cancelled,
}

impl fmt::Display for AbandonReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbandonReason::Timeout(after) => write!(f, "timed out after {:?}", after),
            AbandonReason::Cancelled => write!(f, "cancelled by caller"),
        }
    }
}

/// Errors surfaced by the invocation client.
///
/// Every variant is a discriminant callers can match on; nothing here is
/// meant to be classified by inspecting the message text.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("account {0} not found on ledger")]
    AccountNotFound(String),

    #[error("network error during {step}: {message}")]
    Network {
        step: Step,
        message: String,
        /// Set when the transaction had already been submitted.
        hash: Option<String>,
    },

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("signing declined: {0}")]
    SigningDeclined(String),

    #[error("signer unavailable: {0}")]
    SignerUnavailable(String),

    #[error("simulation failed during {step}: {detail}")]
    SimulationFailed { step: Step, detail: String },

    #[error("transaction {hash} rejected with status {status}{}", detail_suffix(.detail))]
    SubmissionRejected {
        hash: String,
        status: SubmitStatus,
        detail: Option<String>,
    },

    #[error("transaction {hash} failed: {detail}")]
    TransactionFailed { hash: String, detail: String },

    /// The transaction reached the node but a later response about it
    /// could not be read.
    #[error("transaction {hash} was submitted but its {step} response could not be decoded: {detail}")]
    Undecodable {
        hash: String,
        step: Step,
        detail: String,
    },

    #[error("outcome of transaction {hash} is unknown: {reason}")]
    UnknownOutcome { hash: String, reason: AbandonReason },

    #[error("invocation cancelled during {step}")]
    Cancelled { step: Step },

    #[error(transparent)]
    Bet(#[from] BetError),
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|d| format!(" ({})", d))
        .unwrap_or_default()
}

impl ClientError {
    pub(crate) fn network(step: Step, err: impl fmt::Display) -> Self {
        ClientError::Network {
            step,
            message: err.to_string(),
            hash: None,
        }
    }

    pub(crate) fn encoding(err: impl fmt::Display) -> Self {
        ClientError::Encoding(err.to_string())
    }

    pub(crate) fn decode(err: impl fmt::Display) -> Self {
        ClientError::Decode(err.to_string())
    }

    /// Re-attribute a failure that happened once `hash` was handed to the
    /// node, so the hash is never lost. Errors that already carry a hash pass
    /// through unchanged.
    pub(crate) fn after_submit(self, step: Step, hash: &str) -> Self {
        match self {
            ClientError::Network { message, .. } => ClientError::Network {
                step,
                message,
                hash: Some(hash.to_string()),
            },
            ClientError::Decode(detail) => ClientError::Undecodable {
                hash: hash.to_string(),
                step,
                detail,
            },
            other => other,
        }
    }

    /// Hash of a transaction that reached the node, when the error happened
    /// after submission. Such a transaction may still land on the ledger.
    pub fn submitted_hash(&self) -> Option<&str> {
        match self {
            ClientError::UnknownOutcome { hash, .. }
            | ClientError::TransactionFailed { hash, .. }
            | ClientError::Undecodable { hash, .. } => Some(hash),
            ClientError::Network { hash, .. } => hash.as_deref(),
            _ => None,
        }
    }

    /// Whether re-invoking from scratch may succeed without any change on
    /// the caller's side.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Network { hash, .. } => hash.is_none(),
            ClientError::AccountNotFound(_) => true,
            ClientError::SubmissionRejected { status, .. } => {
                matches!(status, SubmitStatus::TryAgainLater)
            }
            _ => false,
        }
    }
}

/// Bet-market preconditions checked against the decoded record before a
/// state-changing call is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BetError {
    #[error("bet {0} does not exist")]
    NotFound(u64),

    #[error("bet {0} is already resolved")]
    AlreadyResolved(u64),

    #[error("bet {0} has not been resolved yet")]
    NotResolved(u64),

    #[error("option {option} is out of range for bet {bet_id} ({options} options)")]
    InvalidOption {
        bet_id: u64,
        option: u32,
        options: usize,
    },

    #[error("{account} is not the oracle for bet {bet_id}")]
    NotOracle { bet_id: u64, account: String },

    #[error("{account} did not place a stake on bet {bet_id}")]
    NoStake { bet_id: u64, account: String },

    #[error("{account} already placed a stake on bet {bet_id}")]
    AlreadyStaked { bet_id: u64, account: String },

    #[error("question must not be empty")]
    EmptyQuestion,

    #[error("option {0} is empty")]
    EmptyOption(usize),

    #[error("a bet needs at least one option")]
    NoOptions,
}
