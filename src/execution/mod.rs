pub mod guard;
pub mod swap;

pub use guard::{evaluate_guard, GuardDecision};
pub use swap::{ExecutionError, Signer, SwapExecutor, SwapReceipt};
