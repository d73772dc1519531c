//! Relative Strength Index (RSI) over simple trailing means.
//!
//! For each bar `i >= 1`: gain = max(0, Δclose), loss = max(0, -Δclose).
//! At `i >= period`, avg gain/loss are plain means over the trailing
//! `period` changes, RS = avg_gain / avg_loss and
//! RSI = 100 - 100 / (1 + RS). A zero average loss saturates RSI at 100.
//! Lookback: `period` (the first `period` indices are NaN).

use crate::domain::Bar;

/// Compute the RSI of closes over `period`, NaN-padded for warmup indices.
pub fn rsi(bars: &[Bar], period: usize) -> Vec<f64> {
    assert!(period >= 1, "RSI period must be >= 1");

    let n = bars.len();
    let mut result = vec![f64::NAN; n];
    if n < period + 1 {
        return result;
    }

    let mut gains = vec![0.0; n];
    let mut losses = vec![0.0; n];
    for i in 1..n {
        let change = bars[i].close - bars[i - 1].close;
        if change > 0.0 {
            gains[i] = change;
        } else {
            losses[i] = -change;
        }
    }

    for i in period..n {
        let window = (i + 1 - period)..=i;
        let avg_gain: f64 = gains[window.clone()].iter().sum::<f64>() / period as f64;
        let avg_loss: f64 = losses[window].iter().sum::<f64>() / period as f64;

        result[i] = if avg_loss == 0.0 {
            // RS -> infinity, including the flat-market case.
            100.0
        } else {
            100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
        };
    }

    result
}
