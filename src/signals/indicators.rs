//! Small numeric helpers shared by the scorers

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Largest value in the slice, `None` for an empty slice
pub fn window_max(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

/// Relative Strength Index over the last `period` price changes
///
/// Uses plain sums of gains and losses across the window (no smoothing).
/// Needs at least `period + 1` prices. A window with no losses reads 100,
/// a completely flat window reads 50.
pub fn relative_strength_index(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period + 1 {
        return None;
    }

    let window = &prices[prices.len() - (period + 1)..];
    let (gains, losses) = window
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .fold((0.0, 0.0), |(gains, losses), delta| {
            if delta > 0.0 {
                (gains + delta, losses)
            } else {
                (gains, losses - delta)
            }
        });

    if losses == 0.0 {
        return Some(if gains == 0.0 { 50.0 } else { 100.0 });
    }

    let rs = gains / losses;
    Some(100.0 - 100.0 / (1.0 + rs))
}
