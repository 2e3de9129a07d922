//! Donchian channel: highest high / lowest low over a lookback window.

/// Channel bounds over a bar window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Channel {
    pub upper: f64,
    pub lower: f64,
}

/// Channel over the last `period` bars of `bars`. `None` if too short or if
/// any high/low in the window is non-finite.
pub fn channel(bars: &[crate::domain::Bar], period: usize) -> Option<Channel> {
    if period == 0 || bars.len() < period {
        return None;
    }
    let mut upper = f64::NEG_INFINITY;
    let mut lower = f64::INFINITY;
    for bar in &bars[bars.len() - period..] {
        if !(bar.high.is_finite() && bar.low.is_finite()) {
            return None;
        }
        upper = upper.max(bar.high);
        lower = lower.min(bar.low);
    }
    Some(Channel { upper, lower })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn channel_over_tail() {
        let bars = make_bars(&[10.0, 12.0, 11.0, 15.0]);
        let ch = channel(&bars, 2).unwrap();
        // last two bars: (12->11): high 13, low 10; (11->15): high 16, low 10
        assert_eq!(ch.upper, 16.0);
        assert_eq!(ch.lower, 10.0);
        assert!(channel(&bars, 5).is_none());
    }
}
