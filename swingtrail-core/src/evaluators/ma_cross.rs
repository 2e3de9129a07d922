//! Moving-average crossover evaluator.
//!
//! Long on a golden cross (fast SMA crosses above slow SMA), short on a death
//! cross. The previous spread sign lives in the carry state, so the evaluator
//! itself holds no mutable state.

use crate::domain::Action;
use crate::engine::{CarryState, Decision, EvalContext, EvalError, StrategyEvaluator};
use crate::indicators::trailing_mean;

const SIGN_KEY: &str = "ma_cross.spread_sign";

#[derive(Debug, Clone)]
pub struct MaCrossEvaluator {
    pub fast_period: usize,
    pub slow_period: usize,
    pub size: f64,
    /// When false a death cross only closes an open long (size 0).
    pub allow_short: bool,
}

impl MaCrossEvaluator {
    pub fn new(fast_period: usize, slow_period: usize, size: f64, allow_short: bool) -> Self {
        Self {
            fast_period,
            slow_period,
            size,
            allow_short,
        }
    }
}

impl StrategyEvaluator for MaCrossEvaluator {
    fn name(&self) -> &str {
        "ma_cross"
    }

    fn warmup_bars(&self) -> usize {
        self.slow_period
    }

    fn evaluate(
        &self,
        ctx: &EvalContext<'_>,
        mut carry: CarryState,
    ) -> Result<Decision, EvalError> {
        let (Some(fast), Some(slow)) = (
            trailing_mean(ctx.window, self.fast_period),
            trailing_mean(ctx.window, self.slow_period),
        ) else {
            return Ok(Decision::hold(carry).with_reason("moving averages not ready"));
        };

        let spread = fast - slow;
        let sign = if spread > 0.0 {
            1.0
        } else if spread < 0.0 {
            -1.0
        } else {
            0.0
        };
        let previous = carry.get(SIGN_KEY);
        carry.set(SIGN_KEY, sign);

        let mut decision = Decision::hold(carry);
        decision.features.insert("fast_ma".into(), fast);
        decision.features.insert("slow_ma".into(), slow);
        decision.features.insert("spread".into(), spread);
        decision.regime = Some(if sign >= 0.0 { "bull" } else { "bear" }.to_string());
        decision.confidence = if slow > 0.0 {
            (spread.abs() / slow / 0.01).min(1.0)
        } else {
            0.0
        };

        match previous {
            Some(p) if p <= 0.0 && sign > 0.0 => {
                decision.action = Action::Long;
                decision.size = self.size;
                decision.reasons.push(format!("golden cross: fast {fast:.4} > slow {slow:.4}"));
            }
            Some(p) if p >= 0.0 && sign < 0.0 => {
                decision.action = Action::Short;
                decision.size = if self.allow_short { self.size } else { 0.0 };
                decision.reasons.push(format!("death cross: fast {fast:.4} < slow {slow:.4}"));
            }
            _ => {}
        }
        Ok(decision)
    }
}
