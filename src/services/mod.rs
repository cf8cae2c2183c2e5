pub mod rebalance_runner;

pub use rebalance_runner::{evaluate_cycle, run_cycle, run_rebalancer, CycleError, CycleOutcome};
