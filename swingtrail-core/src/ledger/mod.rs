//! Position ledger with commission and slippage.

pub mod book;
pub mod cost;
pub mod summary;

pub use book::{ExecutionReason, ExecutionResult, Ledger, Rejection};
pub use cost::CostModel;
pub use summary::{LedgerSummary, ProfitFactor};
