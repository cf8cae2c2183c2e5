use std::collections::HashMap;

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

use crate::models::{
    AllocationDiff, CurrentBalance, StrategyEntry, StrategyExecutionPlan, ValueDiff,
};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Malformed planner input. Every variant here corresponds to an input that
/// would otherwise flow through the arithmetic as NaN, infinity, or an
/// out-of-range index; they are surfaced immediately instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanningError {
    #[error("strategy is empty")]
    EmptyStrategy,

    #[error("portfolio has no value to allocate")]
    NoPortfolioValue,

    #[error("duplicate portfolio symbol {0}")]
    DuplicateSymbol(String),

    #[error("strategy references symbol {0} not present in portfolio")]
    UnknownSymbol(String),

    #[error("strategy entry {index} has no matching portfolio position ({portfolio_len} held)")]
    MisalignedStrategy { index: usize, portfolio_len: usize },

    #[error("buy-side holding {0} has zero value")]
    ZeroValueHolding(String),
}

// ---------------------------------------------------------------------------
// Strategy weight diagnostic
// ---------------------------------------------------------------------------

/// Suggested fix for a strategy whose percentages do not sum to 100: the
/// first non-zero entry and the percentage it would need to close the gap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightAdjustment {
    pub total: Decimal,
    pub token: Option<String>,
    pub suggested_percentage: Option<Decimal>,
}

/// Check whether the strategy percentages sum to 100. Returns `None` when
/// they do. This is a diagnostic only — whether to reject, warn, or ignore
/// is the caller's policy.
pub fn check_strategy_weights(strategy: &[StrategyEntry]) -> Option<WeightAdjustment> {
    let total: Decimal = strategy.iter().map(|s| s.percentage).sum();
    if total == Decimal::ONE_HUNDRED {
        return None;
    }

    let adjust = strategy.iter().find(|s| !s.percentage.is_zero());
    Some(WeightAdjustment {
        total,
        token: adjust.map(|s| s.token.clone()),
        suggested_percentage: adjust.map(|s| s.percentage + (Decimal::ONE_HUNDRED - total)),
    })
}

// ---------------------------------------------------------------------------
// Rebalance planning (pure function)
// ---------------------------------------------------------------------------

/// Compute the single trade that moves the portfolio toward the target
/// allocation: sell the most over-allocated token, buy the most
/// under-allocated one.
///
/// Pure function — no I/O, no randomness. Selection is deterministic: the
/// scan keeps the earliest index among tied diffs. When every diff is equal
/// (portfolio already at target) the plan degenerates to buying and selling
/// the same token with a zero amount; the guard's deviation threshold
/// suppresses execution of such plans.
///
/// The trade amount is sized against the holding at the buy entry's
/// *position* in the portfolio, while the sell/buy token records are
/// resolved by symbol. Strategies are therefore expected to list tokens in
/// portfolio order; an entry whose position has no counterpart is rejected.
pub fn plan_rebalance(
    portfolio: &[CurrentBalance],
    strategy: &[StrategyEntry],
) -> Result<StrategyExecutionPlan, PlanningError> {
    if strategy.is_empty() {
        return Err(PlanningError::EmptyStrategy);
    }

    let total_value: Decimal = portfolio.iter().map(|b| b.value).sum();
    if total_value <= Decimal::ZERO {
        return Err(PlanningError::NoPortfolioValue);
    }

    // Symbol → portfolio index. Duplicates would make the lookup ambiguous.
    let mut index_by_symbol: HashMap<&str, usize> = HashMap::with_capacity(portfolio.len());
    for (i, held) in portfolio.iter().enumerate() {
        if index_by_symbol.insert(&held.token.symbol, i).is_some() {
            return Err(PlanningError::DuplicateSymbol(held.token.symbol.clone()));
        }
    }

    // diff[i] = target value - current value; positive means under-allocated.
    let mut diffs: Vec<Decimal> = Vec::with_capacity(strategy.len());
    for entry in strategy {
        let &held_at = index_by_symbol
            .get(entry.token.as_str())
            .ok_or_else(|| PlanningError::UnknownSymbol(entry.token.clone()))?;
        let target = total_value * entry.percentage / Decimal::ONE_HUNDRED;
        diffs.push(target - portfolio[held_at].value);
    }

    // First index strictly exceeding the running max buys; the symmetric
    // scan sells. Ties keep the earliest index, starting from 0.
    let mut buy_index = 0;
    let mut sell_index = 0;
    for (i, diff) in diffs.iter().enumerate() {
        if *diff > diffs[buy_index] {
            buy_index = i;
        }
        if *diff < diffs[sell_index] {
            sell_index = i;
        }
    }

    // Sizing indexes the portfolio by the strategy position of the buy entry.
    let buy_holding = portfolio
        .get(buy_index)
        .ok_or(PlanningError::MisalignedStrategy {
            index: buy_index,
            portfolio_len: portfolio.len(),
        })?;
    if buy_holding.value.is_zero() {
        return Err(PlanningError::ZeroValueHolding(
            buy_holding.token.symbol.clone(),
        ));
    }

    let percentage_to_sell = diffs[buy_index] / buy_holding.value;
    let amount_to_sell = buy_holding.balance * percentage_to_sell;

    let proposed_allocation: Vec<AllocationDiff> = strategy
        .iter()
        .zip(&diffs)
        .map(|(entry, diff)| AllocationDiff {
            token: entry.token.clone(),
            percentage_diff: diff / total_value * Decimal::ONE_HUNDRED,
        })
        .collect();

    let token_to_sell = portfolio[index_by_symbol[strategy[sell_index].token.as_str()]]
        .token
        .clone();
    let token_to_buy = portfolio[index_by_symbol[strategy[buy_index].token.as_str()]]
        .token
        .clone();

    let value_diff = ValueDiff {
        token: token_to_sell.symbol.clone(),
        percentage: proposed_allocation[sell_index]
            .percentage_diff
            .abs()
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
    };

    Ok(StrategyExecutionPlan {
        token_to_sell,
        token_to_buy,
        percentage_to_sell: percentage_to_sell.abs(),
        amount_to_sell: format!("{amount_to_sell:.6}"),
        proposed_allocation,
        value_diff,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Token;

    fn token(symbol: &str) -> Token {
        Token {
            chain_id: 137,
            address: format!("0x{:0>40}", symbol.len()),
            symbol: symbol.into(),
            name: symbol.into(),
            decimals: 18,
        }
    }

    fn held(symbol: &str, balance: i64, value: i64) -> CurrentBalance {
        CurrentBalance {
            token: token(symbol),
            balance: Decimal::from(balance),
            value: Decimal::from(value),
        }
    }

    fn entry(symbol: &str, percentage: i64) -> StrategyEntry {
        StrategyEntry {
            token: symbol.into(),
            percentage: Decimal::from(percentage),
        }
    }

    // --- Planning tests ---

    #[test]
    fn test_round_trip_scenario() {
        // total 300, targets [150, 150], diffs [50, -50]
        let portfolio = vec![held("UNI", 100, 100), held("USDC", 200, 200)];
        let strategy = vec![entry("UNI", 50), entry("USDC", 50)];

        let plan = plan_rebalance(&portfolio, &strategy).unwrap();

        assert_eq!(plan.token_to_buy.symbol, "UNI");
        assert_eq!(plan.token_to_sell.symbol, "USDC");
        assert_eq!(plan.percentage_to_sell, Decimal::new(5, 1)); // 50/100 = 0.5
        assert_eq!(plan.amount_to_sell, "50.000000");
        assert_eq!(plan.value_diff.token, "USDC");
        // |-50/300 * 100| = 16.67 after rounding
        assert_eq!(plan.value_diff.percentage, Decimal::new(1667, 2));
        assert!(!plan.is_self_referential());
    }

    #[test]
    fn test_proposed_allocation_is_signed_per_entry() {
        let portfolio = vec![held("UNI", 100, 100), held("USDC", 200, 200)];
        let strategy = vec![entry("UNI", 50), entry("USDC", 50)];

        let plan = plan_rebalance(&portfolio, &strategy).unwrap();

        assert_eq!(plan.proposed_allocation.len(), 2);
        assert_eq!(plan.proposed_allocation[0].token, "UNI");
        assert!(plan.proposed_allocation[0].percentage_diff > Decimal::ZERO);
        assert_eq!(plan.proposed_allocation[1].token, "USDC");
        assert!(plan.proposed_allocation[1].percentage_diff < Decimal::ZERO);
    }

    #[test]
    fn test_conservation_when_weights_sum_to_100() {
        let portfolio = vec![
            held("A", 100, 100),
            held("B", 100, 100),
            held("C", 100, 100),
        ];
        let strategy = vec![entry("A", 50), entry("B", 30), entry("C", 20)];

        let plan = plan_rebalance(&portfolio, &strategy).unwrap();

        let sum: Decimal = plan
            .proposed_allocation
            .iter()
            .map(|a| a.percentage_diff)
            .sum();
        // Buys and sells balance; only division rounding in the last digits.
        assert!(sum.abs() < Decimal::new(1, 20));
    }

    #[test]
    fn test_tie_break_keeps_earliest_index() {
        // Both entries under-allocated by the same amount.
        let portfolio = vec![held("A", 10, 100), held("B", 10, 100)];
        let strategy = vec![entry("A", 60), entry("B", 60)];

        let plan = plan_rebalance(&portfolio, &strategy).unwrap();

        // diffs [20, 20] → buy 0; [20, 20] has no strict minimum → sell 0
        assert_eq!(plan.token_to_buy.symbol, "A");
        assert_eq!(plan.token_to_sell.symbol, "A");
    }

    #[test]
    fn test_balanced_portfolio_degenerates_to_self_referential_plan() {
        let portfolio = vec![held("UNI", 100, 150), held("USDC", 150, 150)];
        let strategy = vec![entry("UNI", 50), entry("USDC", 50)];

        let plan = plan_rebalance(&portfolio, &strategy).unwrap();

        assert!(plan.is_self_referential());
        assert_eq!(plan.token_to_buy.symbol, "UNI");
        assert_eq!(plan.amount_to_sell, "0.000000");
        assert_eq!(plan.value_diff.percentage, Decimal::ZERO);
    }

    #[test]
    fn test_unknown_symbol_is_an_error_not_nan() {
        let portfolio = vec![held("UNI", 100, 100)];
        let strategy = vec![entry("WBTC", 100)];

        let err = plan_rebalance(&portfolio, &strategy).unwrap_err();
        assert_eq!(err, PlanningError::UnknownSymbol("WBTC".into()));
    }

    #[test]
    fn test_duplicate_portfolio_symbol_rejected() {
        let portfolio = vec![held("UNI", 100, 100), held("UNI", 50, 50)];
        let strategy = vec![entry("UNI", 100)];

        let err = plan_rebalance(&portfolio, &strategy).unwrap_err();
        assert_eq!(err, PlanningError::DuplicateSymbol("UNI".into()));
    }

    #[test]
    fn test_empty_strategy_rejected() {
        let portfolio = vec![held("UNI", 100, 100)];
        let err = plan_rebalance(&portfolio, &[]).unwrap_err();
        assert_eq!(err, PlanningError::EmptyStrategy);
    }

    #[test]
    fn test_worthless_portfolio_rejected() {
        let portfolio = vec![held("UNI", 0, 0)];
        let strategy = vec![entry("UNI", 100)];

        let err = plan_rebalance(&portfolio, &strategy).unwrap_err();
        assert_eq!(err, PlanningError::NoPortfolioValue);
    }

    #[test]
    fn test_zero_value_buy_holding_rejected() {
        // A is the most under-allocated but holds nothing to size against.
        let portfolio = vec![held("A", 10, 0), held("B", 100, 100)];
        let strategy = vec![entry("A", 100), entry("B", 0)];

        let err = plan_rebalance(&portfolio, &strategy).unwrap_err();
        assert_eq!(err, PlanningError::ZeroValueHolding("A".into()));
    }

    #[test]
    fn test_strategy_position_without_holding_rejected() {
        // Both entries resolve the same symbol, so the buy entry's position
        // has no portfolio counterpart to size against.
        let portfolio = vec![held("A", 10, 100)];
        let strategy = vec![entry("A", 10), entry("A", 90)];

        let err = plan_rebalance(&portfolio, &strategy).unwrap_err();
        assert_eq!(
            err,
            PlanningError::MisalignedStrategy {
                index: 1,
                portfolio_len: 1,
            }
        );
    }

    // --- Weight diagnostic tests ---

    #[test]
    fn test_weights_summing_to_100_pass() {
        let strategy = vec![entry("A", 52), entry("B", 48)];
        assert_eq!(check_strategy_weights(&strategy), None);
    }

    #[test]
    fn test_weight_adjustment_suggested() {
        let strategy = vec![entry("A", 52), entry("B", 50)];
        let adjustment = check_strategy_weights(&strategy).unwrap();

        assert_eq!(adjustment.total, Decimal::from(102));
        assert_eq!(adjustment.token.as_deref(), Some("A"));
        // 52 + (100 - 102) = 50
        assert_eq!(adjustment.suggested_percentage, Some(Decimal::from(50)));
    }

    #[test]
    fn test_weight_adjustment_with_all_zero_entries() {
        let strategy = vec![entry("A", 0), entry("B", 0)];
        let adjustment = check_strategy_weights(&strategy).unwrap();

        assert_eq!(adjustment.total, Decimal::ZERO);
        assert_eq!(adjustment.token, None);
        assert_eq!(adjustment.suggested_percentage, None);
    }
}
