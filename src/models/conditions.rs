use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A gas price together with its unit, e.g. `75 gwei`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasPrice {
    pub value: Decimal,
    pub unit: String,
}

/// Relaxes the gas ceiling when the deviation spikes past a threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpikeOverride {
    /// Deviation (percentage points) beyond which the override kicks in.
    pub spike_percentage: Decimal,
    /// Replacement gas ceiling, in the same unit as `max_gas_price`.
    pub adjust_gas_price: Decimal,
}

/// Guard configuration for a rebalance cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceConditions {
    pub max_gas_price: GasPrice,
    /// Minimum deviation (percentage points) required to justify a swap.
    pub min_exceed_percentage: Decimal,
    pub spike_override: SpikeOverride,
}

impl Default for RebalanceConditions {
    fn default() -> Self {
        Self {
            max_gas_price: GasPrice {
                value: Decimal::from(75),
                unit: "gwei".into(),
            },
            min_exceed_percentage: Decimal::ONE,
            spike_override: SpikeOverride {
                spike_percentage: Decimal::from(15),
                adjust_gas_price: Decimal::from(500),
            },
        }
    }
}
