use std::time::Duration;

use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::valuation::PriceSource;

pub const CRYPTOCOMPARE_API_BASE: &str = "https://min-api.cryptocompare.com";

/// Wrapped assets trade at their underlying's price and the feed only quotes
/// the underlying symbol. Lookup-only — portfolio records keep the wrapped
/// symbol.
const PRICE_SYMBOL_MAP: &[(&str, &str)] = &[
    ("WMATIC", "MATIC"),
    ("WETH", "ETH"),
    ("WBTC", "BTC"),
];

/// Resolve the symbol to quote for a held token.
pub fn price_symbol(symbol: &str) -> &str {
    PRICE_SYMBOL_MAP
        .iter()
        .find(|(held, _)| *held == symbol)
        .map(|(_, quoted)| *quoted)
        .unwrap_or(symbol)
}

#[derive(Debug, Error)]
pub enum PriceFeedError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("price feed rejected {symbol}: {message}")]
    Feed { symbol: String, message: String },

    #[error("no USD quote for {0}")]
    MissingQuote(String),
}

/// CryptoCompare returns `{"USD": 1234.56}` on success and
/// `{"Response": "Error", "Message": "..."}` on failure, both with 200s.
#[derive(Debug, Deserialize)]
struct PriceResponse {
    #[serde(rename = "USD")]
    usd: Option<Decimal>,
    #[serde(rename = "Response")]
    response: Option<String>,
    #[serde(rename = "Message")]
    message: Option<String>,
}

/// USD spot prices from the CryptoCompare public API.
#[derive(Debug, Clone)]
pub struct CryptoComparePrices {
    http: Client,
    base_url: String,
}

impl CryptoComparePrices {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    /// Fetch the USD price for one symbol, applying the wrapped-asset
    /// remapping before the query.
    pub async fn fetch_usd_price(&self, symbol: &str) -> Result<Decimal, PriceFeedError> {
        let fsym = price_symbol(symbol);
        let url = format!("{}/data/price", self.base_url);

        let resp: PriceResponse = self
            .http
            .get(&url)
            .query(&[("fsym", fsym), ("tsyms", "USD")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(price) = resp.usd {
            return Ok(price);
        }

        if resp.response.as_deref() == Some("Error") {
            return Err(PriceFeedError::Feed {
                symbol: symbol.to_string(),
                message: resp.message.unwrap_or_default(),
            });
        }

        Err(PriceFeedError::MissingQuote(symbol.to_string()))
    }
}

impl PriceSource for CryptoComparePrices {
    async fn usd_price(&self, symbol: &str) -> anyhow::Result<Decimal> {
        Ok(self.fetch_usd_price(symbol).await?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapped_symbols_remap_to_underlying() {
        assert_eq!(price_symbol("WMATIC"), "MATIC");
        assert_eq!(price_symbol("WETH"), "ETH");
        assert_eq!(price_symbol("WBTC"), "BTC");
    }

    #[test]
    fn test_unwrapped_symbols_pass_through() {
        assert_eq!(price_symbol("USDC"), "USDC");
        assert_eq!(price_symbol("UNI"), "UNI");
    }

    #[test]
    fn test_error_payload_parses() {
        let raw = r#"{"Response":"Error","Message":"fsym param is invalid","USD":null}"#;
        let resp: PriceResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.response.as_deref(), Some("Error"));
        assert!(resp.usd.is_none());
        assert!(resp.message.unwrap().contains("fsym"));
    }

    #[test]
    fn test_price_payload_parses() {
        let raw = r#"{"USD":0.5234}"#;
        let resp: PriceResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.usd, Some(Decimal::new(5234, 4)));
    }
}
