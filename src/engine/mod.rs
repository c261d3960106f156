//! The invocation lifecycle: build, simulate or prepare/sign/submit, poll,
//! decode.

pub mod invoker;
pub mod poll;

use crate::codec::{Address, Arg, NativeValue};
use std::fmt;

pub use invoker::InvocationEngine;
pub use poll::{poll_until_final, Backoff, CancelHandle, Cancellation, PollPolicy, PollResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationMode {
    /// Simulate only. Never signs, submits or polls.
    ReadOnly,
    /// Prepare, sign, submit and wait for a terminal status.
    StateChanging,
}

impl fmt::Display for InvocationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvocationMode::ReadOnly => write!(f, "read-only"),
            InvocationMode::StateChanging => write!(f, "state-changing"),
        }
    }
}

/// One logical contract call.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationRequest {
    pub method: String,
    pub args: Vec<Arg>,
    pub mode: InvocationMode,
    /// Source account of the transaction.
    pub caller: Address,
}

impl InvocationRequest {
    pub fn read_only(method: impl Into<String>, args: Vec<Arg>, caller: Address) -> Self {
        Self {
            method: method.into(),
            args,
            mode: InvocationMode::ReadOnly,
            caller,
        }
    }

    pub fn state_changing(method: impl Into<String>, args: Vec<Arg>, caller: Address) -> Self {
        Self {
            method: method.into(),
            args,
            mode: InvocationMode::StateChanging,
            caller,
        }
    }
}

/// Decoded outcome of a successful invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationResult {
    /// `None` when the contract returned void.
    pub value: Option<NativeValue>,
    /// Set for state-changing calls.
    pub hash: Option<String>,
    pub poll_attempts: u32,
}

impl InvocationResult {
    pub fn into_value(self) -> Option<NativeValue> {
        self.value
    }
}
