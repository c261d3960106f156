//! Local ed25519 signer backed by a secret seed (`S…`).

use super::SignerGateway;
use crate::builder::{SignedEnvelope, UnsignedEnvelope};
use crate::codec::Address;
use crate::{ClientError, Result};
use async_trait::async_trait;
use ed25519_dalek::{Signer as _, SigningKey};
use stellar_strkey::{ed25519, Strkey};
use stellar_xdr::curr::{DecoratedSignature, Signature, SignatureHint};
use tracing::debug;

pub struct KeypairSigner {
    key: SigningKey,
}

impl KeypairSigner {
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            key: SigningKey::from_bytes(&seed),
        }
    }

    /// Parse a Stellar secret seed.
    pub fn from_secret(secret: &str) -> Result<Self> {
        match Strkey::from_string(secret.trim()) {
            Ok(Strkey::PrivateKeyEd25519(ed25519::PrivateKey(seed))) => Ok(Self::from_seed(seed)),
            Ok(_) => Err(ClientError::SignerUnavailable(
                "secret key is not an ed25519 seed".into(),
            )),
            Err(_) => Err(ClientError::SignerUnavailable(
                "secret key is not a valid strkey".into(),
            )),
        }
    }

    pub fn public_address(&self) -> Address {
        Address::Account(self.key.verifying_key().to_bytes())
    }

    fn decorated_signature(&self, hash: &[u8; 32]) -> Result<DecoratedSignature> {
        let public = self.key.verifying_key().to_bytes();
        let mut hint = [0u8; 4];
        hint.copy_from_slice(&public[28..]);
        let signature = self.key.sign(hash).to_bytes();
        Ok(DecoratedSignature {
            hint: SignatureHint(hint),
            signature: Signature(signature.to_vec().try_into().map_err(ClientError::encoding)?),
        })
    }
}

#[async_trait]
impl SignerGateway for KeypairSigner {
    async fn is_available(&self) -> bool {
        true
    }

    async fn address(&self) -> Result<Address> {
        Ok(self.public_address())
    }

    async fn request_access(&self) -> Result<()> {
        Ok(())
    }

    async fn sign(
        &self,
        envelope: &UnsignedEnvelope,
        network_passphrase: &str,
    ) -> Result<SignedEnvelope> {
        if envelope.network_passphrase() != network_passphrase {
            return Err(ClientError::SigningDeclined(format!(
                "envelope was built for '{}', asked to sign for '{}'",
                envelope.network_passphrase(),
                network_passphrase
            )));
        }
        let source = &envelope.transaction().source_account;
        let expected = self.public_address().to_muxed_account()?;
        if source != &expected {
            return Err(ClientError::SigningDeclined(
                "envelope source account does not match this key".into(),
            ));
        }

        let hash = envelope.hash()?;
        debug!(hash = %hex::encode(hash), "Signing envelope");
        let signature = self.decorated_signature(&hash)?;
        Ok(SignedEnvelope::new(envelope.clone(), vec![signature]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{ContractCall, FeePolicy, TransactionBuilder, ValidityPolicy};
    use crate::gateway::AccountState;
    use ed25519_dalek::{Signature as DalekSignature, Verifier, VerifyingKey};

    const PASSPHRASE: &str = "Test SDF Network ; September 2015";

    fn envelope_for(source: Address) -> UnsignedEnvelope {
        TransactionBuilder::new(PASSPHRASE, FeePolicy::default(), ValidityPolicy::Unbounded)
            .build(
                &AccountState {
                    account_id: source,
                    sequence: 1,
                },
                &ContractCall {
                    contract: Address::Contract([3; 32]),
                    function: "get_bets_count".into(),
                    args: vec![],
                },
            )
            .unwrap()
    }

    #[tokio::test]
    async fn signature_verifies_against_envelope_hash() {
        let signer = KeypairSigner::from_seed([5; 32]);
        let env = envelope_for(signer.public_address());
        let signed = signer.sign(&env, PASSPHRASE).await.unwrap();
        assert_eq!(signed.signatures().len(), 1);

        let decorated = &signed.signatures()[0];
        let bytes: [u8; 64] = decorated.signature.0.to_vec().try_into().unwrap();
        let verifying =
            VerifyingKey::from_bytes(&signer.public_address().account_key().unwrap()).unwrap();
        verifying
            .verify(&env.hash().unwrap(), &DalekSignature::from_bytes(&bytes))
            .unwrap();
    }

    #[tokio::test]
    async fn refuses_foreign_source_account() {
        let signer = KeypairSigner::from_seed([5; 32]);
        let env = envelope_for(Address::Account([9; 32]));
        assert!(matches!(
            signer.sign(&env, PASSPHRASE).await,
            Err(ClientError::SigningDeclined(_))
        ));
    }

    #[tokio::test]
    async fn refuses_network_mismatch() {
        let signer = KeypairSigner::from_seed([5; 32]);
        let env = envelope_for(signer.public_address());
        assert!(matches!(
            signer.sign(&env, "Public Global Stellar Network ; September 2015").await,
            Err(ClientError::SigningDeclined(_))
        ));
    }

    #[test]
    fn parses_secret_seed() {
        let seed = ed25519::PrivateKey([5; 32]).to_string();
        let signer = KeypairSigner::from_secret(&seed).unwrap();
        assert_eq!(signer.public_address(), KeypairSigner::from_seed([5; 32]).public_address());
        assert!(KeypairSigner::from_secret("GABC").is_err());
    }
}
