//! Minimal JSON-RPC 2.0 client over HTTP.

use crate::{ClientError, Result, Step};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::trace;

#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<T> {
    pub jsonrpc: &'static str,
    pub method: String,
    pub params: T,
    pub id: u64,
}

impl<T> JsonRpcRequest<T> {
    pub fn new(method: impl Into<String>, params: T, id: u64) -> Self {
        Self {
            jsonrpc: "2.0",
            method: method.into(),
            params,
            id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse<T> {
    #[serde(default)]
    pub id: Option<u64>,
    pub result: Option<T>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RPC error {}: {}", self.code, self.message)
    }
}

pub struct JsonRpcClient {
    client: Client,
    url: String,
    request_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ClientError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
            request_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Call `method`, attributing any transport or protocol failure to `step`.
    pub async fn call<P: Serialize, R: DeserializeOwned>(
        &self,
        step: Step,
        method: &str,
        params: P,
    ) -> Result<R> {
        let request = JsonRpcRequest::new(method, params, self.next_id());
        trace!(method, id = request.id, "Sending RPC request");

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ClientError::network(step, format!("cannot connect to {}", self.url))
                } else if e.is_timeout() {
                    ClientError::network(step, format!("request to {} timed out", self.url))
                } else {
                    ClientError::network(step, e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::network(
                step,
                format!("{} returned HTTP {}", method, status),
            ));
        }

        let rpc_response: JsonRpcResponse<R> = response.json().await.map_err(|e| {
            ClientError::network(step, format!("malformed {} response: {}", method, e))
        })?;

        if let Some(error) = rpc_response.error {
            return Err(ClientError::network(step, error));
        }

        rpc_response.result.ok_or_else(|| {
            ClientError::network(step, format!("{} response has no result", method))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_as_jsonrpc_2() {
        let req = JsonRpcRequest::new("getHealth", serde_json::json!({}), 7);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["jsonrpc"], "2.0");
        assert_eq!(json["method"], "getHealth");
        assert_eq!(json["id"], 7);
    }

    #[test]
    fn error_response_deserializes() {
        let raw = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32602,"message":"invalid params"}}"#;
        let resp: JsonRpcResponse<serde_json::Value> = serde_json::from_str(raw).unwrap();
        assert!(resp.result.is_none());
        assert_eq!(resp.error.unwrap().to_string(), "RPC error -32602: invalid params");
    }
}
