use std::time::Duration;

use primitive_types::U256;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};

use crate::{
    encoding::{Address, balance_of_calldata, decode_word},
    error::{RpcError, SurgeonError},
};

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_SET_STORAGE_METHOD: &str = "anvil_setStorageAt";
const BLOCK_TAG: &str = "latest";

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u32,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize, Debug)]
struct JsonRpcResponse {
    // `"result": null` is a valid reply, only a missing key is not
    #[serde(default, deserialize_with = "present")]
    result: Option<Value>,
    error: Option<Value>,
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

/// A JSON-RPC endpoint. Requests are issued one at a time and awaited.
#[allow(async_fn_in_trait)]
pub trait JsonRpc {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError>;
}

/// JSON-RPC 2.0 over HTTP POST.
pub struct HttpClient {
    client: reqwest::Client,
    rpc_url: String,
}

impl HttpClient {
    pub fn new(rpc_url: impl Into<String>) -> Result<Self, RpcError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            rpc_url: rpc_url.into(),
        })
    }
}

impl JsonRpc for HttpClient {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let payload = JsonRpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };
        tracing::trace!(method, "sending rpc request");

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;

        let text = response.text().await?;
        let parsed: JsonRpcResponse = serde_json::from_str(&text)
            .map_err(|e| RpcError::InvalidResponse(format!("{e} | raw response: {text}")))?;

        if let Some(err) = parsed.error {
            return Err(RpcError::Protocol(err));
        }
        parsed
            .result
            .ok_or_else(|| RpcError::InvalidResponse("no result and no error".to_string()))
    }
}

fn expect_str(value: Value) -> Result<String, RpcError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(RpcError::InvalidResponse(format!(
            "expected hex string, got {other}"
        ))),
    }
}

pub async fn balance_of<R: JsonRpc>(
    rpc: &R,
    token: &Address,
    account: &Address,
) -> Result<U256, SurgeonError> {
    let call = json!({ "to": token.to_string(), "data": balance_of_calldata(account) });
    let raw = expect_str(rpc.request("eth_call", json!([call, BLOCK_TAG])).await?)?;
    Ok(decode_word(&raw)?)
}

/// Returns the raw word untouched so it can be written back as-is.
pub async fn get_storage_at<R: JsonRpc>(
    rpc: &R,
    address: &Address,
    key: &str,
) -> Result<String, SurgeonError> {
    let params = json!([address.to_string(), key, BLOCK_TAG]);
    Ok(expect_str(rpc.request("eth_getStorageAt", params).await?)?)
}

pub async fn set_storage_at<R: JsonRpc>(
    rpc: &R,
    method: &str,
    address: &Address,
    key: &str,
    word: &str,
) -> Result<(), SurgeonError> {
    rpc.request(method, json!([address.to_string(), key, word]))
        .await?;
    Ok(())
}
