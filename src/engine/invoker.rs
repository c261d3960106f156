//! Contract invocation against a remote node.
//!
//! A read-only call is built and simulated. A state-changing call is built,
//! prepared (simulated for its footprint, resource fee and auth), signed,
//! submitted and polled until the ledger reports a terminal status. Every
//! gateway and signer call is a suspension point that observes the caller's
//! [`Cancellation`].

use super::poll::{poll_until_final, Cancellation, PollResult};
use super::{InvocationMode, InvocationRequest, InvocationResult};
use crate::builder::{ContractCall, TransactionBuilder, UnsignedEnvelope};
use crate::codec::{decode, NativeValue};
use crate::config::ClientConfig;
use crate::error::AbandonReason;
use crate::gateway::{NodeGateway, SimulationOutcome, SimulationSuccess, SubmitStatus, TransactionStatus};
use crate::signer::SignerGateway;
use crate::{ClientError, Result, Step};
use std::future::Future;
use std::sync::Arc;
use stellar_xdr::curr::ScVal;
use tracing::{debug, info, warn};

/// Drives invocations. Cheap to clone; holds no per-call state, so clones
/// may run invocations concurrently.
#[derive(Clone)]
pub struct InvocationEngine {
    config: Arc<ClientConfig>,
    node: Arc<dyn NodeGateway>,
    signer: Arc<dyn SignerGateway>,
}

impl InvocationEngine {
    pub fn new(
        config: ClientConfig,
        node: Arc<dyn NodeGateway>,
        signer: Arc<dyn SignerGateway>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            node,
            signer,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn signer(&self) -> &Arc<dyn SignerGateway> {
        &self.signer
    }

    fn builder(&self) -> TransactionBuilder {
        TransactionBuilder::new(
            self.config.network_passphrase.clone(),
            self.config.fee,
            self.config.validity,
        )
    }

    /// Run `request` to completion.
    #[tracing::instrument(skip_all, fields(method = %request.method, mode = %request.mode))]
    pub async fn invoke(
        &self,
        request: &InvocationRequest,
        cancel: &Cancellation,
    ) -> Result<InvocationResult> {
        // Nothing below touches the network until the contract id resolves
        // and every argument encodes.
        let contract = self.config.contract()?;
        let args = request
            .args
            .iter()
            .map(|arg| arg.encode())
            .collect::<Result<Vec<ScVal>>>()?;
        let call = ContractCall {
            contract,
            function: request.method.clone(),
            args,
        };

        // ── Building ─────────────────────────────────────────────────────────
        let account = guard(cancel, Step::FetchAccount, self.node.fetch_account(&request.caller)).await?;
        let unsigned = self.builder().build(&account, &call)?;

        match request.mode {
            InvocationMode::ReadOnly => self.simulate_read(&unsigned, cancel).await,
            InvocationMode::StateChanging => self.submit_write(unsigned, cancel).await,
        }
    }

    async fn simulate_read(
        &self,
        unsigned: &UnsignedEnvelope,
        cancel: &Cancellation,
    ) -> Result<InvocationResult> {
        let sim = simulation_success(
            Step::Simulate,
            guard(cancel, Step::Simulate, self.node.simulate(unsigned)).await?,
        )?;
        let value = decode_return(sim.return_value.as_ref())?;
        debug!(has_value = value.is_some(), "Read-only simulation succeeded");
        Ok(InvocationResult {
            value,
            hash: None,
            poll_attempts: 0,
        })
    }

    async fn submit_write(
        &self,
        unsigned: UnsignedEnvelope,
        cancel: &Cancellation,
    ) -> Result<InvocationResult> {
        // ── Preparing ────────────────────────────────────────────────────────
        let sim = simulation_success(
            Step::Prepare,
            guard(cancel, Step::Prepare, self.node.simulate(&unsigned)).await?,
        )?;
        let prepared = TransactionBuilder::assemble(&unsigned, &sim)?;
        debug!(
            fee = prepared.fee(),
            resource_fee = sim.min_resource_fee,
            auth_entries = sim.auth.len(),
            "Prepared transaction"
        );

        // ── Signing ──────────────────────────────────────────────────────────
        if !guard(cancel, Step::Sign, async { Ok(self.signer.is_available().await) }).await? {
            return Err(ClientError::SignerUnavailable("no signing authority is reachable".into()));
        }
        let signed = guard(
            cancel,
            Step::Sign,
            self.signer.sign(&prepared, &self.config.network_passphrase),
        )
        .await?;
        if signed.unsigned().transaction() != prepared.transaction() {
            return Err(ClientError::SigningDeclined(
                "signer returned a different transaction than the one prepared".into(),
            ));
        }
        let hash = prepared.hash_hex()?;

        // ── Submitting ───────────────────────────────────────────────────────
        info!(hash = %hash, "Submitting transaction");
        let submission = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(ClientError::UnknownOutcome { hash, reason: AbandonReason::Cancelled });
            }
            res = self.node.submit(&signed) => res.map_err(|e| e.after_submit(Step::Submit, &hash))?,
        };

        if submission.hash != hash {
            warn!(local = %hash, node = %submission.hash, "Node reported a different transaction hash");
        }
        if submission.status != SubmitStatus::Pending {
            warn!(hash = %submission.hash, status = %submission.status, "Transaction rejected");
            return Err(ClientError::SubmissionRejected {
                hash: submission.hash,
                status: submission.status,
                detail: submission.error_detail,
            });
        }

        // ── Polling ──────────────────────────────────────────────────────────
        let polled =
            poll_until_final(self.node.as_ref(), &submission.hash, &self.config.poll, cancel).await?;
        finish(submission.hash, polled)
    }

    /// Resume polling a transaction submitted earlier, typically one that
    /// ended in `UnknownOutcome`.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn await_transaction(
        &self,
        hash: &str,
        cancel: &Cancellation,
    ) -> Result<InvocationResult> {
        let polled = poll_until_final(self.node.as_ref(), hash, &self.config.poll, cancel).await?;
        finish(hash.to_string(), polled)
    }
}

/// Run a gateway or signer future unless the caller cancels first.
async fn guard<T>(
    cancel: &Cancellation,
    step: Step,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!(%step, "Invocation cancelled");
            Err(ClientError::Cancelled { step })
        }
        res = fut => res,
    }
}

fn simulation_success(step: Step, outcome: SimulationOutcome) -> Result<SimulationSuccess> {
    match outcome {
        SimulationOutcome::Success(sim) => Ok(sim),
        SimulationOutcome::Failure { detail } => {
            warn!(%step, detail = %detail, "Simulation failed");
            Err(ClientError::SimulationFailed { step, detail })
        }
    }
}

fn decode_return(value: Option<&ScVal>) -> Result<Option<NativeValue>> {
    match value {
        None => Ok(None),
        Some(scval) => {
            let native = decode(scval)?;
            Ok((!native.is_void()).then_some(native))
        }
    }
}

fn finish(hash: String, polled: PollResult) -> Result<InvocationResult> {
    match polled.status {
        TransactionStatus::Success { return_value } => {
            info!(hash = %hash, attempts = polled.attempts, "Transaction succeeded");
            let value = decode_return(return_value.as_ref())
                .map_err(|e| e.after_submit(Step::Decode, &hash))?;
            Ok(InvocationResult {
                value,
                hash: Some(hash),
                poll_attempts: polled.attempts,
            })
        }
        TransactionStatus::Failed { detail } => {
            warn!(hash = %hash, detail = %detail, "Transaction failed");
            Err(ClientError::TransactionFailed { hash, detail })
        }
        other => Err(ClientError::Undecodable {
            hash,
            step: Step::Poll,
            detail: format!("polling stopped on non-terminal status {:?}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn void_return_decodes_to_none() {
        assert_eq!(decode_return(None).unwrap(), None);
        assert_eq!(decode_return(Some(&ScVal::Void)).unwrap(), None);
        assert_eq!(
            decode_return(Some(&ScVal::U64(7))).unwrap(),
            Some(NativeValue::U64(7))
        );
    }

    #[test]
    fn failed_status_keeps_hash_and_detail() {
        let err = finish(
            "aa".into(),
            PollResult {
                status: TransactionStatus::Failed {
                    detail: "TxFailed".into(),
                },
                attempts: 2,
            },
        )
        .unwrap_err();
        match err {
            ClientError::TransactionFailed { hash, detail } => {
                assert_eq!(hash, "aa");
                assert_eq!(detail, "TxFailed");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn undecodable_return_keeps_hash() {
        let err = finish(
            "aa".into(),
            PollResult {
                status: TransactionStatus::Success {
                    return_value: Some(ScVal::LedgerKeyContractInstance),
                },
                attempts: 1,
            },
        )
        .unwrap_err();
        assert!(matches!(err, ClientError::Undecodable { step: Step::Decode, .. }));
        assert_eq!(err.submitted_hash(), Some("aa"));
    }

    #[test]
    fn simulation_failure_names_step() {
        let err = simulation_success(
            Step::Prepare,
            SimulationOutcome::Failure {
                detail: "HostError".into(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, ClientError::SimulationFailed { step: Step::Prepare, .. }));
    }
}
