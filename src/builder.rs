//! Unsigned/signed transaction envelopes and the builder that assembles them.

use crate::codec::Address;
use crate::gateway::{AccountState, SimulationSuccess};
use crate::{ClientError, Result};
use sha2::{Digest, Sha256};
use stellar_xdr::curr::{
    DecoratedSignature, Hash, HostFunction, InvokeContractArgs, InvokeHostFunctionOp, Limits,
    Memo, Operation, OperationBody, Preconditions, ReadXdr, ScSymbol, ScVal, SequenceNumber,
    TimeBounds, TimePoint, Transaction, TransactionEnvelope, TransactionExt,
    TransactionSignaturePayload, TransactionSignaturePayloadTaggedTransaction,
    TransactionV1Envelope, VecM, WriteXdr,
};
use tracing::debug;

/// A single contract-call operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub contract: Address,
    pub function: String,
    pub args: Vec<ScVal>,
}

/// Inclusion fee per transaction, in stroops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeePolicy {
    pub base_fee: u32,
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self { base_fee: 1_000_000 }
    }
}

/// How long a built transaction stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidityPolicy {
    /// No upper time bound.
    #[default]
    Unbounded,
    /// Valid for this many seconds from build time.
    Seconds(u64),
}

impl ValidityPolicy {
    fn preconditions(&self) -> Preconditions {
        let max_time = match self {
            ValidityPolicy::Unbounded => 0,
            ValidityPolicy::Seconds(secs) => {
                let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default();
                now.saturating_add(*secs)
            }
        };
        Preconditions::Time(TimeBounds {
            min_time: TimePoint(0),
            max_time: TimePoint(max_time),
        })
    }
}

/// SHA-256 of the network passphrase.
pub fn network_id(network_passphrase: &str) -> [u8; 32] {
    Sha256::digest(network_passphrase.as_bytes()).into()
}

/// A transaction that has not been signed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedEnvelope {
    tx: Transaction,
    network_passphrase: String,
}

impl UnsignedEnvelope {
    pub fn transaction(&self) -> &Transaction {
        &self.tx
    }

    pub fn network_passphrase(&self) -> &str {
        &self.network_passphrase
    }

    pub fn sequence(&self) -> i64 {
        self.tx.seq_num.0
    }

    pub fn fee(&self) -> u32 {
        self.tx.fee
    }

    /// The invoke-contract arguments carried by the single operation.
    pub fn invocation(&self) -> Option<&InvokeContractArgs> {
        match &self.tx.operations.first()?.body {
            OperationBody::InvokeHostFunction(InvokeHostFunctionOp {
                host_function: HostFunction::InvokeContract(args),
                ..
            }) => Some(args),
            _ => None,
        }
    }

    /// Name of the contract function this envelope invokes.
    pub fn function_name(&self) -> Option<String> {
        self.invocation()
            .map(|args| String::from_utf8_lossy(&args.function_name.0.to_vec()).into_owned())
    }

    /// Hash that signers sign and the node reports back.
    pub fn hash(&self) -> Result<[u8; 32]> {
        let payload = TransactionSignaturePayload {
            network_id: Hash(network_id(&self.network_passphrase)),
            tagged_transaction: TransactionSignaturePayloadTaggedTransaction::Tx(self.tx.clone()),
        };
        let bytes = payload.to_xdr(Limits::none()).map_err(ClientError::encoding)?;
        Ok(Sha256::digest(bytes).into())
    }

    pub fn hash_hex(&self) -> Result<String> {
        Ok(hex::encode(self.hash()?))
    }

    pub fn to_xdr_base64(&self) -> Result<String> {
        TransactionEnvelope::Tx(TransactionV1Envelope {
            tx: self.tx.clone(),
            signatures: VecM::default(),
        })
        .to_xdr_base64(Limits::none())
        .map_err(ClientError::encoding)
    }
}

/// An unsigned envelope plus the signatures returned by the signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEnvelope {
    unsigned: UnsignedEnvelope,
    signatures: Vec<DecoratedSignature>,
}

impl SignedEnvelope {
    pub fn new(unsigned: UnsignedEnvelope, signatures: Vec<DecoratedSignature>) -> Self {
        Self {
            unsigned,
            signatures,
        }
    }

    /// Re-assemble a signed envelope returned as base64 XDR by an external
    /// signing authority.
    pub fn from_xdr_base64(xdr: &str, network_passphrase: &str) -> Result<Self> {
        let envelope = TransactionEnvelope::from_xdr_base64(xdr, Limits::none())
            .map_err(ClientError::decode)?;
        match envelope {
            TransactionEnvelope::Tx(TransactionV1Envelope { tx, signatures }) => Ok(Self {
                unsigned: UnsignedEnvelope {
                    tx,
                    network_passphrase: network_passphrase.to_string(),
                },
                signatures: signatures.into(),
            }),
            other => Err(ClientError::Decode(format!(
                "signer returned an unsupported envelope type {}",
                other.name()
            ))),
        }
    }

    pub fn unsigned(&self) -> &UnsignedEnvelope {
        &self.unsigned
    }

    pub fn signatures(&self) -> &[DecoratedSignature] {
        &self.signatures
    }

    pub fn hash_hex(&self) -> Result<String> {
        self.unsigned.hash_hex()
    }

    pub fn to_xdr_base64(&self) -> Result<String> {
        TransactionEnvelope::Tx(TransactionV1Envelope {
            tx: self.unsigned.tx.clone(),
            signatures: self
                .signatures
                .clone()
                .try_into()
                .map_err(ClientError::encoding)?,
        })
        .to_xdr_base64(Limits::none())
        .map_err(ClientError::encoding)
    }
}

/// Builds one unsigned envelope per (account snapshot, contract call).
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    network_passphrase: String,
    fee: FeePolicy,
    validity: ValidityPolicy,
}

impl TransactionBuilder {
    pub fn new(network_passphrase: impl Into<String>, fee: FeePolicy, validity: ValidityPolicy) -> Self {
        Self {
            network_passphrase: network_passphrase.into(),
            fee,
            validity,
        }
    }

    /// Build the envelope. The sequence number is exactly
    /// `account.sequence + 1`.
    pub fn build(&self, account: &AccountState, call: &ContractCall) -> Result<UnsignedEnvelope> {
        let seq_num = account.sequence.checked_add(1).ok_or_else(|| {
            ClientError::Encoding(format!(
                "sequence number of {} is exhausted",
                account.account_id
            ))
        })?;

        let function_name = ScSymbol(
            call.function
                .as_str()
                .try_into()
                .map_err(ClientError::encoding)?,
        );
        let args: VecM<ScVal> = call.args.clone().try_into().map_err(ClientError::encoding)?;

        let operation = Operation {
            source_account: None,
            body: OperationBody::InvokeHostFunction(InvokeHostFunctionOp {
                host_function: HostFunction::InvokeContract(InvokeContractArgs {
                    contract_address: call.contract.to_sc_address(),
                    function_name,
                    args,
                }),
                auth: VecM::default(),
            }),
        };

        let tx = Transaction {
            source_account: account.account_id.to_muxed_account()?,
            fee: self.fee.base_fee,
            seq_num: SequenceNumber(seq_num),
            cond: self.validity.preconditions(),
            memo: Memo::None,
            operations: vec![operation].try_into().map_err(ClientError::encoding)?,
            ext: TransactionExt::V0,
        };

        debug!(
            function = %call.function,
            sequence = seq_num,
            fee = self.fee.base_fee,
            "Built unsigned envelope"
        );

        Ok(UnsignedEnvelope {
            tx,
            network_passphrase: self.network_passphrase.clone(),
        })
    }

    /// Attach the footprint, resource fee and authorization entries returned
    /// by a preparation simulation.
    pub fn assemble(
        unsigned: &UnsignedEnvelope,
        simulation: &SimulationSuccess,
    ) -> Result<UnsignedEnvelope> {
        let mut tx = unsigned.tx.clone();

        let fee = i64::from(tx.fee)
            .checked_add(simulation.min_resource_fee)
            .and_then(|f| u32::try_from(f).ok())
            .ok_or_else(|| {
                ClientError::Encoding(format!(
                    "fee {} + resource fee {} does not fit a u32",
                    tx.fee, simulation.min_resource_fee
                ))
            })?;
        tx.fee = fee;

        if let Some(data) = &simulation.transaction_data {
            tx.ext = TransactionExt::V1(data.clone());
        }

        let mut operations: Vec<Operation> = tx.operations.into();
        for op in operations.iter_mut() {
            if let OperationBody::InvokeHostFunction(invoke) = &mut op.body {
                if invoke.auth.is_empty() && !simulation.auth.is_empty() {
                    invoke.auth = simulation
                        .auth
                        .clone()
                        .try_into()
                        .map_err(ClientError::encoding)?;
                }
            }
        }
        tx.operations = operations.try_into().map_err(ClientError::encoding)?;

        Ok(UnsignedEnvelope {
            tx,
            network_passphrase: unsigned.network_passphrase.clone(),
        })
    }
}
