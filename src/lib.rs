//! Invocation client for the Soroban bet-market contract.
//!
//! The crate turns a logical "call method M with arguments A" into either a
//! simulated read or a built, signed, submitted and confirmed transaction,
//! and decodes the contract's return value back into native data.
//!
//! Sub-modules:
//! - [`codec`]: native values and `ScVal`, amounts, the [`codec::Bet`] projection
//! - [`gateway`]: node RPC surface (accounts, simulation, submission, status)
//! - [`signer`]: signing authority interface and a local keypair signer
//! - [`builder`]: envelope assembly and hashing
//! - [`engine`]: the invocation state machine and polling loop
//! - [`contract`]: typed bet-market operations on top of the engine
//! - [`mock`]: scripted gateway and signer for tests

pub mod builder;
pub mod cli;
pub mod codec;
pub mod config;
pub mod contract;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod mock;
pub mod signer;

pub use config::ClientConfig;
pub use contract::BetMarket;
pub use engine::{Cancellation, InvocationEngine, InvocationMode, InvocationRequest};
pub use error::{BetError, ClientError, Step};

pub type Result<T> = std::result::Result<T, ClientError>;
