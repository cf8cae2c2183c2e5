use std::time::Duration;

use alloy::primitives::{hex, Address, U256};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::models::Token;
use crate::valuation::BalanceSource;

/// ERC-20 `balanceOf(address)` selector.
const BALANCE_OF_SELECTOR: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("unexpected RPC response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// Reads ERC-20 balances through JSON-RPC `eth_call` against a single
/// configured endpoint.
#[derive(Debug, Clone)]
pub struct RpcBalanceSource {
    http: Client,
    rpc_url: String,
}

impl RpcBalanceSource {
    pub fn new(rpc_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            rpc_url: rpc_url.into(),
        })
    }

    /// Smallest-unit balance of `holder` for the token contract at
    /// `token_address`.
    pub async fn fetch_raw_balance(
        &self,
        token_address: &str,
        holder: Address,
    ) -> Result<U256, RpcError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_call",
            "params": [
                { "to": token_address, "data": encode_balance_of(holder) },
                "latest",
            ],
        });

        let resp: RpcResponse = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = resp.error {
            return Err(RpcError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        let result = resp
            .result
            .ok_or_else(|| RpcError::InvalidResponse("missing result".into()))?;
        decode_u256(&result)
    }
}

impl BalanceSource for RpcBalanceSource {
    async fn raw_balance(&self, token: &Token, holder: Address) -> anyhow::Result<U256> {
        Ok(self.fetch_raw_balance(&token.address, holder).await?)
    }
}

/// ABI-encode a `balanceOf(address)` call: 4-byte selector plus the address
/// left-padded to 32 bytes.
fn encode_balance_of(holder: Address) -> String {
    let mut data = Vec::with_capacity(36);
    data.extend_from_slice(&BALANCE_OF_SELECTOR);
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(holder.as_slice());
    format!("0x{}", hex::encode(data))
}

fn decode_u256(result: &str) -> Result<U256, RpcError> {
    let digits = result.trim_start_matches("0x");
    // Nodes answer "0x" for calls into empty code.
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 16)
        .map_err(|_| RpcError::InvalidResponse(format!("bad uint256: {result}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_balance_of_layout() {
        let holder: Address = "0x1111111111111111111111111111111111111111"
            .parse()
            .unwrap();
        let data = encode_balance_of(holder);

        assert_eq!(data.len(), 2 + 2 * 36); // 0x + selector + padded address
        assert!(data.starts_with("0x70a08231"));
        assert!(data.ends_with(&"11".repeat(20)));
        assert!(data[10..34].chars().all(|c| c == '0')); // 12 padding bytes
    }

    #[test]
    fn test_decode_u256() {
        assert_eq!(decode_u256("0x0").unwrap(), U256::ZERO);
        assert_eq!(decode_u256("0x64").unwrap(), U256::from(100u64));
        assert_eq!(
            decode_u256("0x00000000000000000000000000000000000000000000000000000000000f4240")
                .unwrap(),
            U256::from(1_000_000u64)
        );
    }

    #[test]
    fn test_decode_empty_result_is_zero() {
        assert_eq!(decode_u256("0x").unwrap(), U256::ZERO);
    }

    #[test]
    fn test_decode_garbage_is_an_error() {
        assert!(matches!(
            decode_u256("0xzz"),
            Err(RpcError::InvalidResponse(_))
        ));
    }
}
