use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{GasPrice, StrategyExecutionPlan};

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("gas price {current} {unit} above ceiling {ceiling} {unit}")]
    GasTooHigh {
        current: Decimal,
        ceiling: Decimal,
        unit: String,
    },

    #[error("signing failed: {0}")]
    Signing(#[source] anyhow::Error),

    #[error("broadcast failed: {0}")]
    Broadcast(#[source] anyhow::Error),
}

/// Confirmation of a mined swap.
#[derive(Debug, Clone)]
pub struct SwapReceipt {
    pub tx_hash: String,
    pub executed_at: DateTime<Utc>,
}

/// Remote signing capability. Implementations talk to whatever custody backs
/// the holder address; the planner never touches this.
pub trait Signer: Send + Sync {
    fn sign<'a>(&'a self, payload: &'a [u8]) -> BoxFuture<'a, Result<Vec<u8>, ExecutionError>>;
}

/// Turns a plan into an on-chain swap: allowance check, approval when the
/// allowance is short, router call, broadcast, confirmation. The executor is
/// the sole mutator of chain state and must abort without submitting when the
/// current gas price exceeds `gas_ceiling`.
///
/// Execution failures are reported per call; they never invalidate the plan
/// that produced them.
pub trait SwapExecutor: Send + Sync {
    fn execute<'a>(
        &'a self,
        plan: &'a StrategyExecutionPlan,
        gas_ceiling: &'a GasPrice,
    ) -> BoxFuture<'a, Result<SwapReceipt, ExecutionError>>;
}
