use std::future::Future;

use alloy::primitives::{Address, U256};
use futures_util::future::try_join_all;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{CurrentBalance, Token};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Valuation is atomic: any lookup failure fails the whole pass, carrying the
/// offending symbol and the underlying cause. No partial snapshots.
#[derive(Debug, Error)]
pub enum ValuationError {
    #[error("balance lookup failed for {symbol}")]
    Balance {
        symbol: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("price lookup failed for {symbol}")]
    Price {
        symbol: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("raw balance {raw} for {symbol} exceeds the supported range")]
    BalanceOutOfRange { symbol: String, raw: String },

    #[error("{symbol} has unsupported decimals {decimals} (max 28)")]
    UnsupportedDecimals { symbol: String, decimals: u32 },
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Smallest-unit ERC-20 balance lookup for a holder address.
pub trait BalanceSource {
    fn raw_balance(
        &self,
        token: &Token,
        holder: Address,
    ) -> impl Future<Output = anyhow::Result<U256>> + Send;
}

/// USD-per-unit price lookup by token symbol. Implementations may remap
/// wrapped-asset symbols for the lookup; callers always pass the original.
pub trait PriceSource {
    fn usd_price(&self, symbol: &str) -> impl Future<Output = anyhow::Result<Decimal>> + Send;
}

// ---------------------------------------------------------------------------
// Valuation
// ---------------------------------------------------------------------------

/// Convert a smallest-unit balance to human units using the token's decimals.
fn from_smallest_units(raw: U256, token: &Token) -> Result<Decimal, ValuationError> {
    if token.decimals > 28 {
        return Err(ValuationError::UnsupportedDecimals {
            symbol: token.symbol.clone(),
            decimals: token.decimals,
        });
    }

    let units: i128 = raw.try_into().map_err(|_| ValuationError::BalanceOutOfRange {
        symbol: token.symbol.clone(),
        raw: raw.to_string(),
    })?;

    Decimal::try_from_i128_with_scale(units, token.decimals).map_err(|_| {
        ValuationError::BalanceOutOfRange {
            symbol: token.symbol.clone(),
            raw: raw.to_string(),
        }
    })
}

/// Value every token held by `holder`: query balance and USD price per token
/// concurrently, then assemble `balance * price` snapshots. Output order
/// always matches the input token order, whatever order the lookups complete
/// in. The first failure cancels the remaining lookups.
pub async fn value_portfolio<B, P>(
    tokens: &[Token],
    holder: Address,
    balances: &B,
    prices: &P,
) -> Result<Vec<CurrentBalance>, ValuationError>
where
    B: BalanceSource,
    P: PriceSource,
{
    let lookups = tokens.iter().map(|token| async move {
        let raw = balances
            .raw_balance(token, holder)
            .await
            .map_err(|source| ValuationError::Balance {
                symbol: token.symbol.clone(),
                source,
            })?;

        let balance = from_smallest_units(raw, token)?;

        let price = prices
            .usd_price(&token.symbol)
            .await
            .map_err(|source| ValuationError::Price {
                symbol: token.symbol.clone(),
                source,
            })?;

        Ok(CurrentBalance {
            token: token.clone(),
            balance,
            value: balance * price,
        })
    });

    try_join_all(lookups).await
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
