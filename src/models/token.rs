use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// Reference data identifying one fungible asset. Immutable for the lifetime
/// of an evaluation cycle; `symbol` must be unique within a portfolio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub chain_id: u64,
    pub address: String,
    pub symbol: String,
    pub name: String,
    pub decimals: u32,
}

// ---------------------------------------------------------------------------
// CurrentBalance — one valued holding
// ---------------------------------------------------------------------------

/// A held token with its human-unit balance and USD value. Computed fresh on
/// every valuation pass, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentBalance {
    pub token: Token,
    pub balance: Decimal,
    pub value: Decimal,
}

impl fmt::Display for CurrentBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{ symbol: \"{}\", balance: {}, value: {} }}",
            self.token.symbol, self.balance, self.value,
        )
    }
}

// ---------------------------------------------------------------------------
// StrategyEntry
// ---------------------------------------------------------------------------

/// Target allocation for one token, as a percentage of total portfolio value
/// in `[0, 100]`. A full strategy is expected, but not required, to sum to
/// 100 — see `planner::check_strategy_weights`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyEntry {
    pub token: String,
    pub percentage: Decimal,
}
