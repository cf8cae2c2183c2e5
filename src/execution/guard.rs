use rust_decimal::Decimal;

use crate::models::{GasPrice, RebalanceConditions};

/// Go/no-go outcome of the deviation guard. `Skip` is a deliberate no-op,
/// distinct from any error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Skip {
        deviation: Decimal,
        required: Decimal,
    },
    Proceed {
        gas_ceiling: GasPrice,
    },
}

/// Decide whether a plan's deviation justifies a swap, and at what gas
/// ceiling. A deviation past the spike threshold usually means a price moved
/// hard in the last moments; the ceiling is relaxed so the rebalance can
/// still go through.
///
/// Comparisons are strict: a deviation exactly at `min_exceed_percentage`
/// proceeds, and one exactly at `spike_percentage` keeps the normal ceiling.
pub fn evaluate_guard(deviation: Decimal, conditions: &RebalanceConditions) -> GuardDecision {
    if deviation < conditions.min_exceed_percentage {
        return GuardDecision::Skip {
            deviation,
            required: conditions.min_exceed_percentage,
        };
    }

    let gas_ceiling = if deviation > conditions.spike_override.spike_percentage {
        GasPrice {
            value: conditions.spike_override.adjust_gas_price,
            unit: conditions.max_gas_price.unit.clone(),
        }
    } else {
        conditions.max_gas_price.clone()
    };

    GuardDecision::Proceed { gas_ceiling }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
