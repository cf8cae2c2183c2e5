use std::sync::Arc;
use std::time::Instant;

use alloy::primitives::Address;
use metrics::{counter, gauge};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::time::{interval, Duration};

use crate::config::RebalancerConfig;
use crate::execution::guard::{evaluate_guard, GuardDecision};
use crate::execution::swap::{ExecutionError, SwapExecutor, SwapReceipt};
use crate::models::{
    GasPrice, RebalanceConditions, StrategyEntry, StrategyExecutionPlan, Token,
};
use crate::planner::{self, PlanningError};
use crate::valuation::{value_portfolio, BalanceSource, PriceSource, ValuationError};

// ---------------------------------------------------------------------------
// Cycle results
// ---------------------------------------------------------------------------

/// Terminal state of one evaluation cycle. `Skipped` is the guard's
/// deliberate no-op — a cycle that decided not to trade, not a failure.
#[derive(Debug)]
pub enum CycleOutcome {
    Skipped {
        plan: StrategyExecutionPlan,
        deviation: Decimal,
        required: Decimal,
    },
    /// Plan and guard passed but `dry_run` stopped short of execution.
    DryRun {
        plan: StrategyExecutionPlan,
        gas_ceiling: GasPrice,
    },
    /// Guard passed but no executor is wired in.
    Planned {
        plan: StrategyExecutionPlan,
        gas_ceiling: GasPrice,
    },
    Executed {
        plan: StrategyExecutionPlan,
        receipt: SwapReceipt,
    },
}

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("strategy weights sum to {total}, not 100")]
    UnbalancedWeights { total: Decimal },

    #[error(transparent)]
    Valuation(#[from] ValuationError),

    #[error(transparent)]
    Planning(#[from] PlanningError),

    #[error("swap execution failed: {0}")]
    Execution(#[from] ExecutionError),
}

// ---------------------------------------------------------------------------
// Cycle evaluation
// ---------------------------------------------------------------------------

/// Value the portfolio, compute the execution plan, and run the guard.
/// Everything up to, but not including, the swap itself.
pub async fn evaluate_cycle<B, P>(
    tokens: &[Token],
    holder: Address,
    strategy: &[StrategyEntry],
    conditions: &RebalanceConditions,
    strict_weights: bool,
    balances: &B,
    prices: &P,
) -> Result<(StrategyExecutionPlan, GuardDecision), CycleError>
where
    B: BalanceSource,
    P: PriceSource,
{
    if let Some(adjustment) = planner::check_strategy_weights(strategy) {
        if strict_weights {
            return Err(CycleError::UnbalancedWeights {
                total: adjustment.total,
            });
        }
        tracing::warn!(
            total = %adjustment.total,
            token = adjustment.token.as_deref().unwrap_or("-"),
            suggested = ?adjustment.suggested_percentage,
            "Strategy weights do not sum to 100 — planning against unnormalized targets"
        );
    }

    let portfolio = value_portfolio(tokens, holder, balances, prices).await?;

    let total_value: Decimal = portfolio.iter().map(|b| b.value).sum();
    for holding in &portfolio {
        tracing::info!(holding = %holding, "Current balance");
    }
    tracing::info!(total_value = %total_value, "Portfolio valued");
    gauge!("portfolio_total_value_usd").set(total_value.to_f64().unwrap_or(0.0));

    let plan = planner::plan_rebalance(&portfolio, strategy)?;
    tracing::info!(
        sell = %plan.token_to_sell.symbol,
        buy = %plan.token_to_buy.symbol,
        amount = %plan.amount_to_sell,
        deviation_pct = %plan.value_diff.percentage,
        "Strategy execution plan computed"
    );

    let decision = evaluate_guard(plan.value_diff.percentage, conditions);
    Ok((plan, decision))
}

/// One full cycle: evaluate, then either skip, stop at dry-run, or hand the
/// plan to the executor under the guard's gas ceiling.
pub async fn run_cycle<B, P>(
    config: &RebalancerConfig,
    balances: &B,
    prices: &P,
    executor: Option<&dyn SwapExecutor>,
) -> Result<CycleOutcome, CycleError>
where
    B: BalanceSource,
    P: PriceSource,
{
    let (plan, decision) = evaluate_cycle(
        &config.tokens,
        config.holder,
        &config.strategy,
        &config.conditions,
        config.strict_weights,
        balances,
        prices,
    )
    .await?;

    let gas_ceiling = match decision {
        GuardDecision::Skip {
            deviation,
            required,
        } => {
            return Ok(CycleOutcome::Skipped {
                plan,
                deviation,
                required,
            });
        }
        GuardDecision::Proceed { gas_ceiling } => gas_ceiling,
    };

    if config.dry_run {
        return Ok(CycleOutcome::DryRun { plan, gas_ceiling });
    }

    let Some(executor) = executor else {
        return Ok(CycleOutcome::Planned { plan, gas_ceiling });
    };

    let receipt = executor.execute(&plan, &gas_ceiling).await?;
    Ok(CycleOutcome::Executed { plan, receipt })
}

// ---------------------------------------------------------------------------
// Runner loop
// ---------------------------------------------------------------------------

/// Run the rebalancer loop. Each tick values the portfolio, plans a trade,
/// and acts on the guard decision. A failed cycle is logged and counted;
/// retry is simply the next tick.
pub async fn run_rebalancer<B, P>(
    config: RebalancerConfig,
    balances: B,
    prices: P,
    executor: Option<Arc<dyn SwapExecutor>>,
) where
    B: BalanceSource,
    P: PriceSource,
{
    let mut ticker = interval(Duration::from_secs(config.interval_secs));

    tracing::info!(
        tokens = config.tokens.len(),
        interval_secs = config.interval_secs,
        dry_run = config.dry_run,
        "Rebalance runner started"
    );

    loop {
        ticker.tick().await;
        let started = Instant::now();
        counter!("rebalance_cycles_total").increment(1);

        match run_cycle(&config, &balances, &prices, executor.as_deref()).await {
            Ok(CycleOutcome::Skipped {
                plan,
                deviation,
                required,
            }) => {
                counter!("plans_skipped_total").increment(1);
                tracing::info!(
                    sell = %plan.token_to_sell.symbol,
                    buy = %plan.token_to_buy.symbol,
                    deviation_pct = %deviation,
                    required_pct = %required,
                    "No swap needed — deviation below threshold"
                );
            }
            Ok(CycleOutcome::DryRun { plan, gas_ceiling }) => {
                tracing::info!(
                    plan = %plan,
                    gas_ceiling = %gas_ceiling.value,
                    unit = %gas_ceiling.unit,
                    "[DRY-RUN] Would execute swap"
                );
            }
            Ok(CycleOutcome::Planned { plan, .. }) => {
                tracing::warn!(
                    plan = %plan,
                    "No swap executor configured — plan not executed"
                );
            }
            Ok(CycleOutcome::Executed { plan, receipt }) => {
                counter!("swaps_executed_total").increment(1);
                tracing::info!(
                    plan = %plan,
                    tx_hash = %receipt.tx_hash,
                    "Swap executed"
                );
            }
            Err(e) => {
                counter!("rebalance_cycles_failed").increment(1);
                tracing::error!(error = %e, "Rebalance cycle failed");
            }
        }

        tracing::debug!(
            elapsed_secs = started.elapsed().as_secs_f64(),
            "Cycle finished"
        );
    }
}
