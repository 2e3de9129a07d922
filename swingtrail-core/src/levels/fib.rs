//! Fibonacci retracement levels from HTF bars aggregated out of the LTF series.
//!
//! HTF bar `k` is built from LTF bars `[k*f, (k+1)*f)` and closes at LTF index
//! `(k+1)*f - 1`. At LTF bar `t` only HTF bars closed at or before `t` count.

use log::warn;

use super::{LevelConfig, LevelProvider, LevelSnapshot};
use crate::domain::Bar;
use crate::exit::SwingAnchor;

#[derive(Debug, Clone, Copy)]
struct HtfBar {
    high: f64,
    low: f64,
    /// LTF index of the last constituent bar.
    closed_at: usize,
}

/// Precomputed HTF series plus the settings to read swings from it.
#[derive(Debug, Clone)]
pub struct FibLevelProvider {
    htf: Vec<HtfBar>,
    config: LevelConfig,
}

impl FibLevelProvider {
    pub fn new(bars: &[Bar], config: LevelConfig) -> Self {
        let factor = config.htf_factor.max(1);
        let htf: Vec<HtfBar> = bars
            .chunks_exact(factor)
            .enumerate()
            .map(|(k, chunk)| HtfBar {
                high: chunk.iter().map(|b| b.high).fold(f64::NEG_INFINITY, nan_max),
                low: chunk.iter().map(|b| b.low).fold(f64::INFINITY, nan_min),
                closed_at: (k + 1) * factor - 1,
            })
            .collect();
        let void = htf.iter().filter(|b| !(b.high.is_finite() && b.low.is_finite())).count();
        if void > 0 {
            warn!("{void} HTF bars contain non-finite prices; swings touching them are invalid");
        }
        Self { htf, config }
    }

    pub fn htf_len(&self) -> usize {
        self.htf.len()
    }
}

/// max/min that propagate NaN instead of skipping it.
fn nan_max(acc: f64, v: f64) -> f64 {
    if acc.is_nan() || v.is_nan() {
        f64::NAN
    } else {
        acc.max(v)
    }
}

fn nan_min(acc: f64, v: f64) -> f64 {
    if acc.is_nan() || v.is_nan() {
        f64::NAN
    } else {
        acc.min(v)
    }
}

impl LevelProvider for FibLevelProvider {
    fn snapshot(&self, bar_index: usize) -> Option<LevelSnapshot> {
        let factor = self.config.htf_factor.max(1);
        let closed = ((bar_index + 1) / factor).min(self.htf.len());
        let lookback = self.config.swing_lookback;
        if lookback == 0 || closed < lookback {
            return None;
        }
        let window = &self.htf[closed - lookback..closed];

        let mut high = (f64::NEG_INFINITY, 0usize);
        let mut low = (f64::INFINITY, 0usize);
        let mut finite = true;
        for (i, bar) in window.iter().enumerate() {
            if !(bar.high.is_finite() && bar.low.is_finite()) {
                finite = false;
                continue;
            }
            if bar.high >= high.0 {
                high = (bar.high, i);
            }
            if bar.low <= low.0 {
                low = (bar.low, i);
            }
        }

        let latest = high.1.max(low.1);
        let valid = finite && high.0 > low.0;
        let range = high.0 - low.0;
        let levels = if valid {
            self.config.ratios.iter().map(|r| low.0 + r * range).collect()
        } else {
            vec![f64::NAN; self.config.ratios.len()]
        };

        let last_closed = window[lookback - 1].closed_at;
        Some(LevelSnapshot {
            anchor: SwingAnchor {
                high: high.0,
                low: low.0,
                formed_at: window[latest].closed_at,
                age_bars: lookback - 1 - latest,
                valid,
                levels,
            },
            data_age: bar_index - last_closed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    fn config(factor: usize, lookback: usize) -> LevelConfig {
        LevelConfig {
            htf_factor: factor,
            swing_lookback: lookback,
            ratios: vec![0.5],
        }
    }

    #[test]
    fn no_snapshot_until_enough_htf_bars_closed() {
        let bars = make_bars(&[100.0; 12]);
        let provider = FibLevelProvider::new(&bars, config(3, 2));
        assert_eq!(provider.htf_len(), 4);
        assert!(provider.snapshot(4).is_none());
        let snap = provider.snapshot(5).unwrap();
        assert_eq!(snap.data_age, 0);
        assert_eq!(provider.snapshot(7).unwrap().data_age, 2);
    }

    #[test]
    fn levels_are_retracements_of_the_swing() {
        let closes: Vec<f64> = (0..8).map(|i| 100.0 + i as f64 * 2.0).collect();
        let bars = make_bars(&closes);
        let provider = FibLevelProvider::new(&bars, config(2, 2));
        let snap = provider.snapshot(3).unwrap();
        // HTF0 = bars 0..2: low 99, HTF1 = bars 2..4: high 107
        assert_eq!(snap.anchor.low, 99.0);
        assert_eq!(snap.anchor.high, 107.0);
        assert_eq!(snap.levels(), &[103.0]);
        assert!(snap.anchor.valid);
        assert_eq!(snap.anchor.formed_at, 3);
        assert_eq!(snap.anchor.age_bars, 0);
    }

    /// Mutating bars after t must not change the snapshot at t.
    #[test]
    fn snapshot_never_sees_future_bars() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64 * 0.9).sin() * 8.0).collect();
        let bars = make_bars(&closes);
        let full = FibLevelProvider::new(&bars, config(4, 3));
        for t in 0..bars.len() {
            let mut tampered = bars.clone();
            for bar in tampered.iter_mut().skip(t + 1) {
                bar.high += 50.0;
                bar.low -= 50.0;
            }
            let cut = FibLevelProvider::new(&tampered, config(4, 3));
            assert_eq!(full.snapshot(t), cut.snapshot(t), "lookahead at bar {t}");
        }
    }

    #[test]
    fn non_finite_prices_invalidate_swing() {
        let mut bars = make_bars(&[100.0, 101.0, 102.0, 103.0]);
        bars[1].high = f64::NAN;
        let provider = FibLevelProvider::new(&bars, config(2, 2));
        let snap = provider.snapshot(3).unwrap();
        assert!(!snap.anchor.valid);
        assert!(snap.levels().iter().all(|l| l.is_nan()));
    }
}
