//! Account (`G…`) and contract (`C…`) identifiers.

use crate::{ClientError, Result};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use stellar_strkey::{ed25519, Contract, Strkey};
use stellar_xdr::curr::{AccountId, Hash, MuxedAccount, PublicKey, ScAddress, Uint256};

/// A ledger address: either an ed25519 account or a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Address {
    Account([u8; 32]),
    Contract([u8; 32]),
}

impl Address {
    pub fn is_account(&self) -> bool {
        matches!(self, Address::Account(_))
    }

    /// The raw ed25519 key of an account address.
    pub fn account_key(&self) -> Result<[u8; 32]> {
        match self {
            Address::Account(key) => Ok(*key),
            Address::Contract(_) => Err(ClientError::Encoding(format!(
                "{} is a contract, expected an account",
                self
            ))),
        }
    }

    pub fn to_sc_address(&self) -> ScAddress {
        match self {
            Address::Account(key) => ScAddress::Account(account_id(*key)),
            Address::Contract(id) => ScAddress::Contract(Hash(*id)),
        }
    }

    pub fn from_sc_address(address: &ScAddress) -> Self {
        match address {
            ScAddress::Account(AccountId(PublicKey::PublicKeyTypeEd25519(Uint256(key)))) => {
                Address::Account(*key)
            }
            ScAddress::Contract(Hash(id)) => Address::Contract(*id),
        }
    }

    pub(crate) fn to_muxed_account(&self) -> Result<MuxedAccount> {
        Ok(MuxedAccount::Ed25519(Uint256(self.account_key()?)))
    }

    pub(crate) fn to_account_id(&self) -> Result<AccountId> {
        Ok(account_id(self.account_key()?))
    }
}

fn account_id(key: [u8; 32]) -> AccountId {
    AccountId(PublicKey::PublicKeyTypeEd25519(Uint256(key)))
}

impl FromStr for Address {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match Strkey::from_string(s.trim()) {
            Ok(Strkey::PublicKeyEd25519(key)) => Ok(Address::Account(key.0)),
            Ok(Strkey::Contract(contract)) => Ok(Address::Contract(contract.0)),
            Ok(_) => Err(ClientError::Encoding(format!(
                "'{}' is not an account or contract address",
                s
            ))),
            Err(e) => Err(ClientError::Encoding(format!(
                "invalid address '{}': {:?}",
                s, e
            ))),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Account(key) => write!(f, "{}", ed25519::PublicKey(*key)),
            Address::Contract(id) => write!(f, "{}", Contract(*id)),
        }
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCOUNT: &str = "GAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAWHF";
    const CONTRACT: &str = "CAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAABSC4";

    #[test]
    fn parses_account_and_contract_strkeys() {
        let account: Address = ACCOUNT.parse().unwrap();
        assert_eq!(account, Address::Account([0; 32]));
        assert_eq!(account.to_string(), ACCOUNT);

        let contract: Address = CONTRACT.parse().unwrap();
        assert_eq!(contract, Address::Contract([0; 32]));
        assert_eq!(contract.to_string(), CONTRACT);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            "not-an-address".parse::<Address>(),
            Err(ClientError::Encoding(_))
        ));
    }

    #[test]
    fn contract_has_no_account_key() {
        assert!(Address::Contract([1; 32]).account_key().is_err());
        assert_eq!(Address::Account([1; 32]).account_key().unwrap(), [1; 32]);
    }

    #[test]
    fn sc_address_round_trip() {
        let addr = Address::Contract([7; 32]);
        assert_eq!(Address::from_sc_address(&addr.to_sc_address()), addr);
    }
}
