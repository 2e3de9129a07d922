//! Simple moving average of closes over an as-of window.

use crate::domain::Bar;

/// Mean close of the last `period` bars of `window`.
///
/// `None` when the window is too short or any close in it is non-finite.
pub fn trailing_mean(window: &[Bar], period: usize) -> Option<f64> {
    if period == 0 || window.len() < period {
        return None;
    }
    let tail = &window[window.len() - period..];
    if tail.iter().any(|b| !b.close.is_finite()) {
        return None;
    }
    Some(tail.iter().map(|b| b.close).sum::<f64>() / period as f64)
}
