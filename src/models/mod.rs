pub mod conditions;
pub mod plan;
pub mod token;

pub use conditions::{GasPrice, RebalanceConditions, SpikeOverride};
pub use plan::{AllocationDiff, StrategyExecutionPlan, ValueDiff};
pub use token::{CurrentBalance, StrategyEntry, Token};
