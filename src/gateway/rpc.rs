//! Soroban RPC implementation of [`NodeGateway`].
//!
//! Speaks the node's JSON-RPC methods `getLedgerEntries`,
//! `simulateTransaction`, `sendTransaction`, `getTransaction`, `getNetwork`
//! and `getHealth`. XDR payloads travel as base64 strings.

use super::jsonrpc::JsonRpcClient;
use super::types::{
    AccountState, NetworkInfo, SimulationOutcome, SimulationSuccess, SubmissionResult,
    SubmitStatus, TransactionStatus,
};
use super::NodeGateway;
use crate::builder::{SignedEnvelope, UnsignedEnvelope};
use crate::codec::Address;
use crate::{ClientError, Result, Step};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use std::time::Duration;
use stellar_xdr::curr::{
    LedgerEntryData, LedgerKey, LedgerKeyAccount, Limits, ReadXdr, ScVal,
    SorobanAuthorizationEntry, SorobanTransactionData, TransactionMeta, TransactionResult,
    WriteXdr,
};
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LedgerEntriesResponse {
    #[serde(default)]
    entries: Option<Vec<LedgerEntryResult>>,
}

#[derive(Debug, Deserialize)]
struct LedgerEntryResult {
    xdr: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    transaction_data: Option<String>,
    #[serde(default)]
    min_resource_fee: Option<JsonValue>,
    #[serde(default)]
    results: Option<Vec<SimulateHostFunctionResult>>,
    #[serde(default)]
    events: Option<Vec<String>>,
    #[serde(default)]
    latest_ledger: u32,
}

#[derive(Debug, Deserialize)]
struct SimulateHostFunctionResult {
    #[serde(default)]
    auth: Vec<String>,
    xdr: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendTransactionResponse {
    status: String,
    hash: String,
    #[serde(default)]
    error_result_xdr: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetTransactionResponse {
    status: String,
    #[serde(default)]
    result_xdr: Option<String>,
    #[serde(default)]
    result_meta_xdr: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetNetworkResponse {
    passphrase: String,
    protocol_version: u32,
    #[serde(default)]
    friendbot_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GetHealthResponse {
    status: String,
}

fn from_base64<T: ReadXdr>(what: &str, xdr: &str) -> Result<T> {
    T::from_xdr_base64(xdr, Limits::none())
        .map_err(|e| ClientError::Decode(format!("invalid {} XDR from node: {}", what, e)))
}

/// Numbers that the node may send either as JSON numbers or as strings.
fn json_i64(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Name of the result code in a `TransactionResult`, e.g. `TxFailed`.
fn result_code(result_xdr: Option<&str>) -> Option<String> {
    let xdr = result_xdr?;
    match TransactionResult::from_xdr_base64(xdr, Limits::none()) {
        Ok(result) => Some(result.result.name().to_string()),
        Err(e) => {
            warn!("Could not decode transaction result: {}", e);
            None
        }
    }
}

/// Contract return value recorded in transaction metadata.
fn meta_return_value(meta: &TransactionMeta) -> Option<ScVal> {
    match meta {
        TransactionMeta::V3(v3) => v3.soroban_meta.as_ref().map(|m| m.return_value.clone()),
        _ => None,
    }
}

pub struct RpcGateway {
    rpc: JsonRpcClient,
}

impl RpcGateway {
    pub fn new(url: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        Ok(Self {
            rpc: JsonRpcClient::new(url, request_timeout)?,
        })
    }

    pub fn url(&self) -> &str {
        self.rpc.url()
    }

    pub async fn get_network(&self) -> Result<NetworkInfo> {
        let resp: GetNetworkResponse = self
            .rpc
            .call(Step::NodeInfo, "getNetwork", json!({}))
            .await?;
        Ok(NetworkInfo {
            passphrase: resp.passphrase,
            protocol_version: resp.protocol_version,
            friendbot_url: resp.friendbot_url,
        })
    }

    pub async fn get_health(&self) -> Result<String> {
        let resp: GetHealthResponse = self
            .rpc
            .call(Step::NodeInfo, "getHealth", json!({}))
            .await?;
        Ok(resp.status)
    }

    /// Fail with a configuration error when the node serves a different
    /// network than the one transactions are built for.
    pub async fn check_network(&self, expected_passphrase: &str) -> Result<NetworkInfo> {
        let info = self.get_network().await?;
        if info.passphrase != expected_passphrase {
            return Err(ClientError::Configuration(format!(
                "node at {} serves network '{}', expected '{}'",
                self.url(),
                info.passphrase,
                expected_passphrase
            )));
        }
        Ok(info)
    }
}

#[async_trait]
impl NodeGateway for RpcGateway {
    async fn fetch_account(&self, account: &Address) -> Result<AccountState> {
        let key = LedgerKey::Account(LedgerKeyAccount {
            account_id: account.to_account_id()?,
        })
        .to_xdr_base64(Limits::none())
        .map_err(ClientError::encoding)?;

        let resp: LedgerEntriesResponse = self
            .rpc
            .call(Step::FetchAccount, "getLedgerEntries", json!({ "keys": [key] }))
            .await?;

        let entry = resp
            .entries
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::AccountNotFound(account.to_string()))?;

        match from_base64::<LedgerEntryData>("ledger entry", &entry.xdr)? {
            LedgerEntryData::Account(entry) => {
                debug!(account = %account, sequence = entry.seq_num.0, "Fetched account");
                Ok(AccountState {
                    account_id: *account,
                    sequence: entry.seq_num.0,
                })
            }
            other => Err(ClientError::Decode(format!(
                "expected an account entry, node returned {}",
                other.name()
            ))),
        }
    }

    async fn simulate(&self, envelope: &UnsignedEnvelope) -> Result<SimulationOutcome> {
        let resp: SimulateResponse = self
            .rpc
            .call(
                Step::Simulate,
                "simulateTransaction",
                json!({ "transaction": envelope.to_xdr_base64()? }),
            )
            .await?;

        if let Some(error) = resp.error {
            let detail = match resp.events.as_deref() {
                Some(events) if !events.is_empty() => {
                    format!("{} ({} diagnostic events)", error, events.len())
                }
                _ => error,
            };
            return Ok(SimulationOutcome::Failure { detail });
        }

        let first = resp.results.unwrap_or_default().into_iter().next();
        let (return_value, auth) = match first {
            Some(result) => {
                let value = from_base64::<ScVal>("return value", &result.xdr)?;
                let auth = result
                    .auth
                    .iter()
                    .map(|a| from_base64::<SorobanAuthorizationEntry>("authorization entry", a))
                    .collect::<Result<Vec<_>>>()?;
                (Some(value), auth)
            }
            None => (None, Vec::new()),
        };

        let transaction_data = resp
            .transaction_data
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| from_base64::<SorobanTransactionData>("transaction data", s))
            .transpose()?;

        let min_resource_fee = resp.min_resource_fee.as_ref().and_then(json_i64).unwrap_or(0);

        Ok(SimulationOutcome::Success(SimulationSuccess {
            return_value,
            transaction_data,
            min_resource_fee,
            auth,
            latest_ledger: resp.latest_ledger,
        }))
    }

    async fn submit(&self, envelope: &SignedEnvelope) -> Result<SubmissionResult> {
        let resp: SendTransactionResponse = self
            .rpc
            .call(
                Step::Submit,
                "sendTransaction",
                json!({ "transaction": envelope.to_xdr_base64()? }),
            )
            .await?;

        let status = SubmitStatus::from_rpc(&resp.status).ok_or_else(|| {
            ClientError::network(
                Step::Submit,
                format!("unexpected sendTransaction status '{}'", resp.status),
            )
        })?;

        Ok(SubmissionResult {
            hash: resp.hash,
            status,
            error_detail: result_code(resp.error_result_xdr.as_deref()),
        })
    }

    async fn poll_status(&self, hash: &str) -> Result<TransactionStatus> {
        let resp: GetTransactionResponse = self
            .rpc
            .call(Step::Poll, "getTransaction", json!({ "hash": hash }))
            .await?;

        match resp.status.as_str() {
            "NOT_FOUND" => Ok(TransactionStatus::NotFound),
            "PENDING" => Ok(TransactionStatus::Pending),
            "SUCCESS" => {
                let return_value = resp
                    .result_meta_xdr
                    .as_deref()
                    .map(|xdr| from_base64::<TransactionMeta>("transaction meta", xdr))
                    .transpose()?
                    .as_ref()
                    .and_then(meta_return_value);
                Ok(TransactionStatus::Success { return_value })
            }
            "FAILED" => Ok(TransactionStatus::Failed {
                detail: result_code(resp.result_xdr.as_deref())
                    .unwrap_or_else(|| "FAILED".to_string()),
            }),
            other => Err(ClientError::network(
                Step::Poll,
                format!("unexpected getTransaction status '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn node_info_failures_are_not_account_fetches() {
        // Nothing listens on port 1.
        let node = RpcGateway::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        for err in [
            node.get_health().await.unwrap_err(),
            node.get_network().await.unwrap_err(),
        ] {
            assert!(
                matches!(err, ClientError::Network { step: Step::NodeInfo, hash: None, .. }),
                "got {:?}",
                err
            );
        }
    }

    #[test]
    fn resource_fee_accepts_strings_and_numbers() {
        assert_eq!(json_i64(&json!("58595")), Some(58595));
        assert_eq!(json_i64(&json!(12)), Some(12));
        assert_eq!(json_i64(&json!(null)), None);
    }

    #[test]
    fn simulate_response_parses_error_shape() {
        let raw = json!({
            "error": "HostError: Error(Contract, #1)",
            "events": ["AAAA"],
            "latestLedger": 100
        });
        let resp: SimulateResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(resp.error.as_deref(), Some("HostError: Error(Contract, #1)"));
        assert_eq!(resp.latest_ledger, 100);
    }

    #[test]
    fn simulate_response_parses_success_shape() {
        let value = ScVal::U64(3).to_xdr_base64(Limits::none()).unwrap();
        let raw = json!({
            "transactionData": "",
            "minResourceFee": "90",
            "results": [{ "auth": [], "xdr": value }],
            "latestLedger": 7
        });
        let resp: SimulateResponse = serde_json::from_value(raw).unwrap();
        let results = resp.results.unwrap();
        assert_eq!(
            from_base64::<ScVal>("return value", &results[0].xdr).unwrap(),
            ScVal::U64(3)
        );
        assert_eq!(resp.min_resource_fee.as_ref().and_then(json_i64), Some(90));
    }

    #[test]
    fn missing_meta_means_no_return_value() {
        let resp: GetTransactionResponse =
            serde_json::from_value(json!({ "status": "SUCCESS" })).unwrap();
        assert!(resp.result_meta_xdr.is_none());
    }

    #[test]
    fn undecodable_result_code_is_none() {
        assert_eq!(result_code(Some("not-base64!")), None);
        assert_eq!(result_code(None), None);
    }
}
