//! Narrow interface to an external signing authority.

pub mod keypair;

use crate::builder::{SignedEnvelope, UnsignedEnvelope};
use crate::codec::Address;
use crate::Result;
use async_trait::async_trait;

pub use keypair::KeypairSigner;

/// A signing authority such as a wallet agent.
///
/// `sign` fails with `SigningDeclined` when the authority refuses and with
/// `SignerUnavailable` when none is reachable; the engine treats both as
/// terminal for the invocation.
#[async_trait]
pub trait SignerGateway: Send + Sync {
    async fn is_available(&self) -> bool;

    /// The account this authority signs for.
    async fn address(&self) -> Result<Address>;

    /// Ask the authority to grant this client access.
    async fn request_access(&self) -> Result<()>;

    async fn sign(
        &self,
        envelope: &UnsignedEnvelope,
        network_passphrase: &str,
    ) -> Result<SignedEnvelope>;
}
