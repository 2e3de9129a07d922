//! Donchian channel breakout evaluator.
//!
//! The channel is built from the bars before the current one, so a close
//! beyond it is a genuine breakout.

use crate::domain::Action;
use crate::engine::{CarryState, Decision, EvalContext, EvalError, StrategyEvaluator};
use crate::indicators::channel;

#[derive(Debug, Clone)]
pub struct DonchianEvaluator {
    pub lookback: usize,
    pub size: f64,
    pub allow_short: bool,
}

impl DonchianEvaluator {
    pub fn new(lookback: usize, size: f64, allow_short: bool) -> Self {
        Self {
            lookback,
            size,
            allow_short,
        }
    }
}

impl StrategyEvaluator for DonchianEvaluator {
    fn name(&self) -> &str {
        "donchian"
    }

    fn warmup_bars(&self) -> usize {
        self.lookback
    }

    fn evaluate(&self, ctx: &EvalContext<'_>, carry: CarryState) -> Result<Decision, EvalError> {
        let Some((current, prior)) = ctx.window.split_last() else {
            return Err(EvalError::new("empty window"));
        };
        let Some(ch) = channel(prior, self.lookback) else {
            return Ok(Decision::hold(carry).with_reason("channel not ready"));
        };

        let mut decision = Decision::hold(carry);
        let width = ch.upper - ch.lower;
        decision.features.insert("upper".into(), ch.upper);
        decision.features.insert("lower".into(), ch.lower);
        let close = current.close;

        let strength = |distance: f64| {
            if width > 0.0 {
                (distance / width).clamp(0.0, 1.0)
            } else {
                1.0
            }
        };
        if close > ch.upper {
            decision.action = Action::Long;
            decision.size = self.size;
            decision.confidence = strength(close - ch.upper);
            decision.regime = Some("breakout_up".into());
            decision.reasons.push(format!(
                "close {close:.4} above {}-bar high {:.4}",
                self.lookback, ch.upper
            ));
        } else if close < ch.lower {
            decision.action = Action::Short;
            decision.size = if self.allow_short { self.size } else { 0.0 };
            decision.confidence = strength(ch.lower - close);
            decision.regime = Some("breakout_down".into());
            decision.reasons.push(format!(
                "close {close:.4} below {}-bar low {:.4}",
                self.lookback, ch.lower
            ));
        }
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SimulationConfig;
    use crate::indicators::make_bars;

    fn decide(eval: &DonchianEvaluator, closes: &[f64]) -> Decision {
        let bars = make_bars(closes);
        let config = SimulationConfig::default();
        let ctx = EvalContext {
            window: &bars,
            bar_index: bars.len() - 1,
            symbol: "TEST",
            timeframe: "1h",
            config: &config,
        };
        eval.evaluate(&ctx, CarryState::default()).unwrap()
    }

    #[test]
    fn breakout_above_prior_channel() {
        let eval = DonchianEvaluator::new(3, 2.0, true);
        // prior channel high = 101 + 1 = 102
        let d = decide(&eval, &[100.0, 101.0, 100.0, 105.0]);
        assert_eq!(d.action, Action::Long);
        assert_eq!(d.size, 2.0);
        assert!(d.confidence > 0.0);
    }

    #[test]
    fn inside_channel_holds() {
        let eval = DonchianEvaluator::new(3, 1.0, true);
        assert_eq!(decide(&eval, &[100.0, 101.0, 100.0, 100.5]).action, Action::None);
    }

    #[test]
    fn too_short_window_holds() {
        let eval = DonchianEvaluator::new(10, 1.0, true);
        let d = decide(&eval, &[100.0, 120.0]);
        assert_eq!(d.action, Action::None);
        assert_eq!(d.reasons, vec!["channel not ready".to_string()]);
    }
}
