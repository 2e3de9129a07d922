//! Swing-update policy: when does a new higher-timeframe swing replace the
//! one anchoring the trailing logic of an open position?

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::PositionSide;
use crate::error::{require_non_negative, ConfigError};

/// A higher-timeframe swing (high/low pair) and the levels derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwingAnchor {
    pub high: f64,
    pub low: f64,
    /// LTF bar index at which the HTF bar holding the latest extreme closed.
    pub formed_at: usize,
    /// HTF bars elapsed since the extreme formed.
    pub age_bars: usize,
    pub valid: bool,
    /// Retracement levels between `low` and `high`.
    pub levels: Vec<f64>,
}

impl SwingAnchor {
    /// Same swing, ignoring age.
    pub fn same_swing(&self, other: &SwingAnchor) -> bool {
        self.formed_at == other.formed_at && self.high == other.high && self.low == other.low
    }

    /// The extreme whose breach invalidates the trade: low for longs, high for shorts.
    pub fn protective_extreme(&self, side: PositionSide) -> f64 {
        match side {
            PositionSide::Long => self.low,
            PositionSide::Short => self.high,
        }
    }

    /// The extreme that measures progress: high for longs, low for shorts.
    pub fn favorable_extreme(&self, side: PositionSide) -> f64 {
        match side {
            PositionSide::Long => self.high,
            PositionSide::Short => self.low,
        }
    }
}

/// Swing-update strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwingUpdateStrategy {
    /// Keep the entry swing for the life of the position.
    #[default]
    Fixed,
    /// Take every valid new swing.
    Dynamic,
    /// Take a new swing only if it is fresh and a significant improvement.
    Hybrid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwingUpdateConfig {
    pub strategy: SwingUpdateStrategy,
    /// Hybrid: maximum candidate age in HTF bars.
    pub max_swing_age_bars: usize,
    /// Hybrid: minimum favorable change of the relevant extreme, in percent.
    pub min_improvement_pct: f64,
    /// Hybrid: accept candidates that move the extreme against the position.
    pub allow_regression: bool,
}

impl Default for SwingUpdateConfig {
    fn default() -> Self {
        Self {
            strategy: SwingUpdateStrategy::Fixed,
            max_swing_age_bars: 10,
            min_improvement_pct: 0.5,
            allow_regression: false,
        }
    }
}

impl SwingUpdateConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_negative("exit.swing.min_improvement_pct", self.min_improvement_pct)
    }
}

/// Loggable reason for an update decision. One variant per branch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SwingUpdateReason {
    FixedStrategy,
    Unchanged,
    DynamicValidSwing,
    InvalidSwing,
    SwingTooOld { age: usize, max: usize },
    NoSignificantImprovement { pct: f64 },
    RegressionRejected { pct: f64 },
    RegressionAllowed { pct: f64 },
    SwingImproved { pct: f64 },
}

impl fmt::Display for SwingUpdateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwingUpdateReason::FixedStrategy => write!(f, "FIXED_STRATEGY"),
            SwingUpdateReason::Unchanged => write!(f, "SWING_UNCHANGED"),
            SwingUpdateReason::DynamicValidSwing => write!(f, "DYNAMIC_VALID_SWING"),
            SwingUpdateReason::InvalidSwing => write!(f, "INVALID_SWING"),
            SwingUpdateReason::SwingTooOld { .. } => write!(f, "SWING_TOO_OLD"),
            SwingUpdateReason::NoSignificantImprovement { .. } => {
                write!(f, "NO_SIGNIFICANT_IMPROVEMENT")
            }
            SwingUpdateReason::RegressionRejected { .. } => write!(f, "SWING_REGRESSION_REJECTED"),
            SwingUpdateReason::RegressionAllowed { pct } => {
                write!(f, "SWING_REGRESSION_ALLOWED_{pct:.2}")
            }
            SwingUpdateReason::SwingImproved { pct } => write!(f, "SWING_IMPROVED_{pct:.2}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingDecision {
    pub update: bool,
    pub reason: SwingUpdateReason,
}

impl SwingDecision {
    fn accept(reason: SwingUpdateReason) -> Self {
        Self {
            update: true,
            reason,
        }
    }

    fn reject(reason: SwingUpdateReason) -> Self {
        Self {
            update: false,
            reason,
        }
    }
}

/// Percentage change of the relevant extreme in the position's favor.
///
/// Long: higher high is positive. Short: lower low is positive.
pub fn improvement_pct(current: &SwingAnchor, candidate: &SwingAnchor, side: PositionSide) -> f64 {
    let cur = current.favorable_extreme(side);
    let cand = candidate.favorable_extreme(side);
    if !cur.is_finite() || !cand.is_finite() || cur == 0.0 {
        return f64::NAN;
    }
    side.sign() * (cand - cur) / cur.abs() * 100.0
}

/// Decide whether `candidate` replaces `current` as the anchored swing.
pub fn should_update(
    current: &SwingAnchor,
    candidate: &SwingAnchor,
    side: PositionSide,
    config: &SwingUpdateConfig,
) -> SwingDecision {
    match config.strategy {
        SwingUpdateStrategy::Fixed => SwingDecision::reject(SwingUpdateReason::FixedStrategy),
        SwingUpdateStrategy::Dynamic => {
            if candidate.valid {
                SwingDecision::accept(SwingUpdateReason::DynamicValidSwing)
            } else {
                SwingDecision::reject(SwingUpdateReason::InvalidSwing)
            }
        }
        SwingUpdateStrategy::Hybrid => {
            if !candidate.valid {
                return SwingDecision::reject(SwingUpdateReason::InvalidSwing);
            }
            if candidate.age_bars > config.max_swing_age_bars {
                return SwingDecision::reject(SwingUpdateReason::SwingTooOld {
                    age: candidate.age_bars,
                    max: config.max_swing_age_bars,
                });
            }
            let pct = improvement_pct(current, candidate, side);
            if !pct.is_finite() {
                return SwingDecision::reject(SwingUpdateReason::InvalidSwing);
            }
            if pct < 0.0 {
                return if config.allow_regression {
                    SwingDecision::accept(SwingUpdateReason::RegressionAllowed { pct })
                } else {
                    SwingDecision::reject(SwingUpdateReason::RegressionRejected { pct })
                };
            }
            if pct < config.min_improvement_pct {
                return SwingDecision::reject(SwingUpdateReason::NoSignificantImprovement { pct });
            }
            SwingDecision::accept(SwingUpdateReason::SwingImproved { pct })
        }
    }
}

/// Stop-trail thresholds that can fire once per anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TrailThreshold {
    Breakeven,
    Target1,
}

/// Per-position swing anchoring state.
///
/// Created when a position opens, dropped when it closes. The triggered set
/// belongs to the anchor: it is cleared whenever the anchor changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwingState {
    pub anchor: SwingAnchor,
    pub update_count: u32,
    pub triggered: BTreeSet<TrailThreshold>,
}

impl SwingState {
    pub fn new(anchor: SwingAnchor) -> Self {
        Self {
            anchor,
            update_count: 0,
            triggered: BTreeSet::new(),
        }
    }

    /// Run the policy against `candidate` and adopt it if accepted.
    pub fn consider(
        &mut self,
        candidate: &SwingAnchor,
        side: PositionSide,
        config: &SwingUpdateConfig,
    ) -> SwingDecision {
        if self.anchor.same_swing(candidate) {
            self.anchor.age_bars = candidate.age_bars;
            return SwingDecision::reject(SwingUpdateReason::Unchanged);
        }
        let decision = should_update(&self.anchor, candidate, side, config);
        if decision.update {
            self.anchor = candidate.clone();
            self.update_count += 1;
            self.triggered.clear();
        }
        decision
    }
}
