//! Mean periodic consumption (CMM).

use rust_decimal::Decimal;

/// Arithmetic mean of the `lookback` most recent window exits.
///
/// `series` is ordered oldest first. Returns zero when fewer than `lookback`
/// windows of history are available: the figure is advisory and never blocks
/// reconciliation.
pub fn mean_consumption(series: &[i64], lookback: usize) -> Decimal {
    if lookback == 0 || series.len() < lookback {
        return Decimal::ZERO;
    }

    let recent = &series[series.len() - lookback..];
    let total = recent.iter().fold(0i64, |acc, q| acc.saturating_add(*q));
    let mean = Decimal::from(total) / Decimal::from(lookback as u64);
    mean.max(Decimal::ZERO)
}
