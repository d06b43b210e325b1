use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

use crate::ChainError;

/// Minimal JSON-RPC 2.0 client over HTTP
#[derive(Clone, Debug)]
pub struct JsonRpcClient {
    client: reqwest::Client,
    url: String,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ChainError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, ChainError> {
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        tracing::debug!(method = %method, url = %self.url, "JSON-RPC request");

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ChainError::ConnectionFailed(format!("{method}: {e}")))?;

        if !response.status().is_success() {
            return Err(ChainError::ConnectionFailed(format!(
                "{method}: HTTP {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ChainError::InvalidResponse(format!("{method}: {e}")))?;

        parse_response(method, body)
    }
}

/// Split a JSON-RPC response body into its result or error object
pub fn parse_response<T: DeserializeOwned>(method: &str, mut body: Value) -> Result<T, ChainError> {
    if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
        let code = error.get("code").and_then(Value::as_i64).unwrap_or_default();
        let mut message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        // Revert reasons sometimes only show up in `data`
        if let Some(data) = error.get("data").and_then(Value::as_str) {
            if !message.contains(data) {
                message = format!("{message}: {data}");
            }
        }
        return Err(ChainError::Rpc { code, message });
    }

    let result = body
        .get_mut("result")
        .map(Value::take)
        .ok_or_else(|| ChainError::InvalidResponse(format!("{method}: missing result")))?;

    serde_json::from_value(result)
        .map_err(|e| ChainError::InvalidResponse(format!("{method}: {e}")))
}
