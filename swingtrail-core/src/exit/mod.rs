//! Exit subsystem: per-position state machine, swing-update policy, config.

pub mod config;
pub mod engine;
pub mod state;
pub mod swing;

pub use config::ExitConfig;
pub use engine::{
    favorable_targets, ExitAction, ExitCode, ExitInput, ExitSignal, ExitSignalEngine, SizeBasis,
};
pub use state::{ExitPhase, PositionExitState};
pub use swing::{
    improvement_pct, should_update, SwingAnchor, SwingDecision, SwingState, SwingUpdateConfig,
    SwingUpdateReason, SwingUpdateStrategy, TrailThreshold,
};
