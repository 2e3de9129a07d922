//! Bar-by-bar simulation loop.
//!
//! Per bar, after warmup:
//! 1. Evaluate the strategy on `bars[..=t]`, threading the carry state.
//! 2. Let the hook veto the decision.
//! 3. Resolve exits for the open position: stop check, swing update, exit
//!    engine, volatility trail. Any exit on this bar suppresses the strategy
//!    action.
//! 4. Execute the remaining action against the ledger.
//! 5. Notify the hook of every confirmed execution.
//! 6. Append one equity point.

use log::{debug, warn};

use super::config::SimulationConfig;
use super::evaluator::{CarryState, EvalContext, StrategyEvaluator};
use super::hooks::{DecisionContext, ExecutionEvent, ExecutionKind, HookVerdict, SimulationHook};
use super::state::{RunError, RunMetadata, RunPhase, RunResult};
use crate::domain::{Action, Bar, ExitReason, PositionSide, StopSource};
use crate::exit::{ExitAction, ExitInput, ExitSignalEngine, PositionExitState, SwingState};
use crate::indicators::{Atr, Indicator};
use crate::ledger::{ExecutionReason, ExecutionResult, Ledger};
use crate::levels::LevelProvider;

/// One simulation run over a single instrument.
///
/// Collaborators are borrowed trait objects; the simulator owns every piece
/// of mutable run state (ledger, exit state, swing state, carry state), so
/// independent simulators never share anything.
pub struct Simulator<'a> {
    config: SimulationConfig,
    evaluator: &'a dyn StrategyEvaluator,
    levels: &'a dyn LevelProvider,
    hook: Option<&'a mut dyn SimulationHook>,
    phase: RunPhase,
}

impl<'a> Simulator<'a> {
    pub fn new(
        config: SimulationConfig,
        evaluator: &'a dyn StrategyEvaluator,
        levels: &'a dyn LevelProvider,
    ) -> Self {
        Self {
            config,
            evaluator,
            levels,
            hook: None,
            phase: RunPhase::Init,
        }
    }

    pub fn with_hook(mut self, hook: &'a mut dyn SimulationHook) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    fn enter(&mut self, phase: RunPhase) {
        debug!(
            "{} {}: {:?} -> {:?}",
            self.config.symbol, self.config.timeframe, self.phase, phase
        );
        self.phase = phase;
    }

    fn notify(&mut self, event: ExecutionEvent) {
        debug_assert!(event.result.executed);
        if let Some(hook) = self.hook.as_deref_mut() {
            hook.on_execution(&event);
        }
    }

    /// Run to completion. Configuration is validated before the first bar.
    pub fn run(mut self, bars: &[Bar]) -> Result<RunResult, RunError> {
        self.config.validate()?;
        if bars.is_empty() {
            return Err(RunError::EmptySeries {
                symbol: self.config.symbol.clone(),
                timeframe: self.config.timeframe.clone(),
            });
        }

        let atr = Atr::new(self.config.atr_period).compute(bars);
        let warmup = self.config.warmup_bars.max(self.evaluator.warmup_bars());
        let exit_engine = ExitSignalEngine::new(self.config.exit.clone());
        let mut ledger = Ledger::new(
            self.config.symbol.clone(),
            self.config.initial_capital,
            self.config.costs,
        );
        let mut exit_state = PositionExitState::new();
        let mut swing: Option<SwingState> = None;
        let mut carry = CarryState::default();
        let mut last_valid_close: Option<f64> = None;

        let mut void_bars = 0;
        let mut vetoed = 0;
        let mut swing_updates = 0u32;
        let mut stop_exits = 0;

        self.enter(RunPhase::Warmup);
        let last = bars.len() - 1;

        for (t, bar) in bars.iter().enumerate() {
            if t == warmup {
                self.enter(RunPhase::Running);
            }
            let ts = bar.timestamp;

            if bar.is_void() {
                void_bars += 1;
                if t == last && self.config.liquidate_at_end {
                    if let Some(price) = last_valid_close {
                        self.liquidate(&mut ledger, t, bar, price);
                        swing = None;
                    }
                }
                ledger.update_equity(f64::NAN, ts);
                continue;
            }
            let close = bar.close;
            last_valid_close = Some(close);

            // ── 1. Strategy decision ──
            let ctx = EvalContext {
                window: &bars[..=t],
                bar_index: t,
                symbol: &self.config.symbol,
                timeframe: &self.config.timeframe,
                config: &self.config,
            };
            let version = carry.version;
            let mut decision = self
                .evaluator
                .evaluate(&ctx, std::mem::take(&mut carry))
                .map_err(|e| RunError::Evaluator {
                    bar_index: t,
                    symbol: self.config.symbol.clone(),
                    timeframe: self.config.timeframe.clone(),
                    message: e.to_string(),
                })?;
            carry = std::mem::take(&mut decision.carry);
            carry.version = version + 1;

            if t < warmup {
                ledger.update_equity(close, ts);
                continue;
            }

            let snapshot = self.levels.snapshot(t);

            // ── 2. Hook veto ──
            let mut action = decision.action;
            let mut size = decision.size;
            if let Some(hook) = self.hook.as_deref_mut() {
                let open_side = ledger.position().map(|p| p.side);
                let verdict = hook.on_decision(&DecisionContext {
                    bar_index: t,
                    timestamp: ts,
                    symbol: &self.config.symbol,
                    timeframe: &self.config.timeframe,
                    price: close,
                    decision: &decision,
                    open_side,
                    level_data_age: snapshot.as_ref().map(|s| s.data_age),
                });
                if let HookVerdict::Veto { component, reason } = verdict {
                    debug!("bar {t}: {action} vetoed by {component}: {reason}");
                    vetoed += 1;
                    // A vetoed reversal keeps its closing half.
                    if open_side.is_some() && action.side() != open_side {
                        size = 0.0;
                    } else {
                        action = Action::None;
                    }
                }
            }

            // ── 3. Exits for the open position ──
            let mut exited = false;

            if let Some((side, stop, source)) = ledger
                .position()
                .and_then(|p| p.stop.map(|s| (p.side, s, p.stop_source)))
            {
                if let Some(fill) = stop_fill(side, stop, bar) {
                    let reason = match source {
                        Some(StopSource::Structure) => ExitReason::StructureTrail,
                        _ => ExitReason::StopHit,
                    };
                    let result = ledger.close(fill, ts, reason);
                    if result.executed {
                        stop_exits += 1;
                        exited = true;
                        swing = None;
                        self.notify(exit_event(t, bar, side, fill, result, reason));
                    }
                }
            }

            if let Some(position) = ledger.position().cloned() {
                let side = position.side;
                if let Some(snap) = snapshot.as_ref() {
                    match swing.as_mut() {
                        Some(state) => {
                            let outcome =
                                state.consider(&snap.anchor, side, &self.config.exit.swing);
                            if outcome.update {
                                swing_updates += 1;
                                debug!("bar {t}: swing anchor replaced ({})", outcome.reason);
                            }
                        }
                        // Opened before levels existed: adopt the first ones.
                        None => {
                            debug!("bar {t}: adopting first swing anchor for open position");
                            swing = Some(SwingState::new(snap.anchor.clone()));
                        }
                    }
                }

                let signal = exit_engine.evaluate(
                    &mut exit_state,
                    swing.as_mut(),
                    &ExitInput {
                        price: close,
                        atr: atr[t],
                        position: &position,
                    },
                );
                match signal.action {
                    ExitAction::PartialExit | ExitAction::FullExit => {
                        let reason = signal
                            .code
                            .exit_reason()
                            .unwrap_or(ExitReason::StructureTrail);
                        let result = if signal.action == ExitAction::PartialExit {
                            ledger.reduce(signal.quantity(&position), close, ts, reason)
                        } else {
                            ledger.close(close, ts, reason)
                        };
                        if result.executed {
                            exited = true;
                            if result.reason == ExecutionReason::Closed {
                                swing = None;
                            }
                            self.notify(exit_event(t, bar, side, close, result, reason));
                        }
                    }
                    ExitAction::UpdateStop => {
                        if let Some(stop) = signal.new_stop {
                            if ledger.tighten_stop(stop, StopSource::Structure) {
                                debug!("bar {t}: stop -> {stop:.4} ({})", signal.code);
                            }
                        }
                    }
                    ExitAction::Hold => {}
                }

                if ledger.has_position() {
                    if let Some(stop) = self.volatility_stop(side, close, atr[t]) {
                        ledger.tighten_stop(stop, StopSource::Volatility);
                    }
                }
            }

            if exited {
                action = Action::None;
            }

            // ── 4. Strategy execution ──
            if action.is_sided() {
                let held = ledger.position().map(|p| p.side);
                let result = ledger.execute(action, size, close, ts);
                if result.executed {
                    // Reversal: report the closed leg before the new entry.
                    if let (Some(side), ExecutionReason::Opened) = (held, result.reason) {
                        self.notify(exit_event(
                            t,
                            bar,
                            side,
                            close,
                            ExecutionResult::closed(),
                            ExitReason::SignalClose,
                        ));
                    }
                    let opened = ledger
                        .position()
                        .filter(|_| result.reason == ExecutionReason::Opened)
                        .map(|p| (p.id, p.side, p.entry_price));
                    match opened {
                        Some((id, side, entry)) => {
                            exit_state.reset(id);
                            swing = snapshot.map(|s| SwingState::new(s.anchor));
                            if let Some(stop) = self.volatility_stop(side, entry, atr[t]) {
                                ledger.tighten_stop(stop, StopSource::Volatility);
                            }
                        }
                        None => swing = None,
                    }
                    let kind = if result.reason == ExecutionReason::Opened {
                        ExecutionKind::Entry
                    } else {
                        ExecutionKind::Exit
                    };
                    self.notify(ExecutionEvent {
                        bar_index: t,
                        timestamp: ts,
                        kind,
                        action,
                        price: close,
                        result,
                        exit_reason: (kind == ExecutionKind::Exit)
                            .then_some(ExitReason::SignalClose),
                    });
                } else {
                    debug!("bar {t}: {action} not executed ({:?})", result.reason);
                }
            }

            if t == last && self.config.liquidate_at_end {
                self.liquidate(&mut ledger, t, bar, close);
                swing = None;
            }

            // ── 6. Equity ──
            ledger.update_equity(close, ts);
        }

        if ledger.is_insolvent() {
            warn!(
                "{} {}: run finished with negative capital {:.2}",
                self.config.symbol,
                self.config.timeframe,
                ledger.capital()
            );
        }
        if void_bars > 0 {
            warn!(
                "{} {}: {void_bars} of {} bars were void",
                self.config.symbol,
                self.config.timeframe,
                bars.len()
            );
        }

        self.enter(RunPhase::Finalized);
        let summary = ledger.summary();
        let (trades, equity_curve) = ledger.into_history();
        Ok(RunResult {
            metadata: RunMetadata {
                symbol: self.config.symbol.clone(),
                timeframe: self.config.timeframe.clone(),
                evaluator: self.evaluator.name().to_string(),
                bars: bars.len(),
                warmup_bars: warmup,
                void_bars,
                vetoed_decisions: vetoed,
                swing_updates,
                stop_exits,
            },
            summary,
            trades,
            equity_curve,
            phase: self.phase,
        })
    }

    fn liquidate(&mut self, ledger: &mut Ledger, t: usize, bar: &Bar, price: f64) {
        let Some(side) = ledger.position().map(|p| p.side) else {
            return;
        };
        let result = ledger.close_all(price, bar.timestamp);
        if result.executed {
            self.notify(exit_event(t, bar, side, price, result, ExitReason::ForcedLiquidation));
        }
    }

    /// `reference ∓ multiplier × ATR`, when trailing is on and ATR is usable.
    fn volatility_stop(&self, side: PositionSide, reference: f64, atr: f64) -> Option<f64> {
        let exit = &self.config.exit;
        let mult = exit.trailing_atr_multiplier;
        if !exit.enable_trailing || mult <= 0.0 || !atr.is_finite() || atr <= 0.0 {
            return None;
        }
        Some(reference - side.sign() * mult * atr)
    }
}

/// Fill price if `bar` touches `stop`: the stop itself, or the open when
/// the bar gaps through it.
pub fn stop_fill(side: PositionSide, stop: f64, bar: &Bar) -> Option<f64> {
    match side {
        PositionSide::Long if bar.low <= stop => Some(bar.open.min(stop)),
        PositionSide::Short if bar.high >= stop => Some(bar.open.max(stop)),
        _ => None,
    }
}

fn exit_event(
    t: usize,
    bar: &Bar,
    side: PositionSide,
    price: f64,
    result: ExecutionResult,
    reason: ExitReason,
) -> ExecutionEvent {
    ExecutionEvent {
        bar_index: t,
        timestamp: bar.timestamp,
        kind: ExecutionKind::Exit,
        action: Action::from(side.opposite()),
        price,
        result,
        exit_reason: Some(reason),
    }
}
