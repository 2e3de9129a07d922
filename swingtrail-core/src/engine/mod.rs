//! Simulation engine: configuration, evaluator contract, hook points and the
//! bar-by-bar loop.

pub mod config;
pub mod evaluator;
pub mod hooks;
pub mod loop_runner;
pub mod state;

pub use config::SimulationConfig;
pub use evaluator::{CarryState, Decision, EvalContext, EvalError, NullEvaluator, StrategyEvaluator};
pub use hooks::{DecisionContext, ExecutionEvent, ExecutionKind, HookVerdict, SimulationHook};
pub use loop_runner::{stop_fill, Simulator};
pub use state::{RunError, RunMetadata, RunPhase, RunResult};
