use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::token::Token;

/// Signed deviation of one strategy entry from its target, as a percentage
/// of total portfolio value. Negative means over-allocated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationDiff {
    pub token: String,
    pub percentage_diff: Decimal,
}

/// Absolute deviation magnitude for the sell-side token, rounded to two
/// decimal places. This is the number the guard compares against thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueDiff {
    pub token: String,
    pub percentage: Decimal,
}

// ---------------------------------------------------------------------------
// StrategyExecutionPlan — the planner's output
// ---------------------------------------------------------------------------

/// The computed sell/buy recommendation, independent of whether it is ever
/// executed. `token_to_sell` is the over-allocated asset, `token_to_buy` the
/// under-allocated one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyExecutionPlan {
    pub token_to_sell: Token,
    pub token_to_buy: Token,
    /// Magnitude of the trade as a fraction of the buy-side holding's value.
    pub percentage_to_sell: Decimal,
    /// Human-unit amount to sell, fixed to six decimal places.
    pub amount_to_sell: String,
    pub proposed_allocation: Vec<AllocationDiff>,
    pub value_diff: ValueDiff,
}

impl StrategyExecutionPlan {
    /// True when the portfolio already matches the target and the plan
    /// degenerates into trading a token against itself. The deviation is
    /// zero in that case, so the guard suppresses execution.
    pub fn is_self_referential(&self) -> bool {
        self.token_to_sell.symbol == self.token_to_buy.symbol
    }
}

impl fmt::Display for StrategyExecutionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sell {} {} for {} ({}% deviation)",
            self.amount_to_sell,
            self.token_to_sell.symbol,
            self.token_to_buy.symbol,
            self.value_diff.percentage,
        )
    }
}
