//! swingtrail core: a deterministic single-instrument backtest simulator.
//!
//! - Ledger with commission and slippage, one position per instrument
//! - Exit signal engine: partial exits and stop trailing from HTF levels
//! - Swing-update policy for the anchor of an open position
//! - Bar-by-bar simulation loop with veto/attribution hook points
//! - Built-in evaluators, indicators and a no-lookahead level provider

pub mod domain;
pub mod engine;
pub mod error;
pub mod evaluators;
pub mod exit;
pub mod extension;
pub mod indicators;
pub mod ledger;
pub mod levels;
pub mod rng;

pub use error::ConfigError;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: run inputs and outputs can cross threads, so
    /// batches of independent simulations can run in parallel.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::Trade>();
        require_sync::<domain::Trade>();
        require_send::<domain::EquityPoint>();
        require_sync::<domain::EquityPoint>();
        require_send::<ledger::Ledger>();
        require_sync::<ledger::Ledger>();
        require_send::<exit::PositionExitState>();
        require_sync::<exit::PositionExitState>();
        require_send::<exit::SwingState>();
        require_sync::<exit::SwingState>();
        require_send::<engine::SimulationConfig>();
        require_sync::<engine::SimulationConfig>();
        require_send::<engine::RunResult>();
        require_sync::<engine::RunResult>();
        require_send::<engine::RunError>();
        require_sync::<engine::RunError>();
        require_send::<extension::VetoChain>();
        require_send::<extension::AttributionReport>();
        require_sync::<extension::AttributionReport>();
        require_send::<levels::FibLevelProvider>();
        require_sync::<levels::FibLevelProvider>();
        require_send::<rng::RngHierarchy>();
        require_sync::<rng::RngHierarchy>();
        require_send::<evaluators::MaCrossEvaluator>();
        require_sync::<evaluators::MaCrossEvaluator>();
        require_send::<evaluators::DonchianEvaluator>();
        require_sync::<evaluators::DonchianEvaluator>();
    }

    /// The evaluator contract has no ledger or exit-state parameter: a
    /// strategy cannot observe fills, only bars and its own carry state.
    #[test]
    fn evaluator_trait_has_no_ledger_parameter() {
        fn _check(
            evaluator: &dyn engine::StrategyEvaluator,
            ctx: &engine::EvalContext<'_>,
        ) -> Result<engine::Decision, engine::EvalError> {
            evaluator.evaluate(ctx, engine::CarryState::default())
        }
    }
}
