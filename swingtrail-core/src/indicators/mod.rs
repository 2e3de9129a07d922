//! Indicators used by the simulation loop and the built-in evaluators.
//!
//! Series indicators implement [`Indicator`] and are precomputed once before
//! the bar loop. Window helpers (`trailing_mean`, `channel`) work on the
//! as-of window handed to an evaluator and only ever read bars up to its end.

pub mod atr;
pub mod donchian;
pub mod sma;

pub use atr::{true_range, wilder_smooth, Atr};
pub use donchian::{channel, Channel};
pub use sma::trailing_mean;

use crate::domain::Bar;

/// Bar series in, numeric series of the same length out.
///
/// No value at bar t may depend on bars after t.
pub trait Indicator: Send + Sync {
    fn name(&self) -> &str;

    /// Bars needed before the output becomes valid.
    fn lookback(&self) -> usize;

    /// The first `lookback()` values are `f64::NAN`.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Default tolerance for floating-point indicator comparisons in tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "expected {expected}, got {actual} (epsilon {epsilon})"
    );
}

/// Synthetic bars from closes: open = previous close, high/low = body ± 1.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: base + chrono::Duration::hours(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Truncating the series must not change any already-computed value.
    #[test]
    fn indicators_do_not_look_ahead() {
        let closes: Vec<f64> = (0..60)
            .map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0 + i as f64 * 0.1)
            .collect();
        let full = make_bars(&closes);
        let indicators: Vec<Box<dyn Indicator>> =
            vec![Box::new(Atr::new(1)), Box::new(Atr::new(14))];
        for ind in &indicators {
            let full_series = ind.compute(&full);
            for cut in [20, 35, 59] {
                let truncated = ind.compute(&full[..cut]);
                for t in 0..cut {
                    let (a, b) = (full_series[t], truncated[t]);
                    assert!(
                        (a.is_nan() && b.is_nan()) || a == b,
                        "{} differs at {t} after truncating to {cut}",
                        ind.name()
                    );
                }
            }
        }
    }
}
