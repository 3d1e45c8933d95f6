// Summary statistics over a column of simulated scores.

/// Arithmetic mean. Returns 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Percentile `q` (0..=100) of an ascending-sorted slice, interpolating
/// linearly between the two nearest ranks at `q / 100 * (n - 1)`.
///
/// Returns 0.0 for an empty slice.
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n == 1 {
        return sorted[0];
    }

    let rank = (q.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Fraction of values strictly greater than `threshold`.
pub fn fraction_above(values: &[f64], threshold: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let above = values.iter().filter(|&&v| v > threshold).count();
    above as f64 / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_interpolates_between_ranks() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&sorted, 0.0), 1.0);
        assert_eq!(percentile(&sorted, 50.0), 3.0);
        assert_eq!(percentile(&sorted, 100.0), 5.0);
        // rank 0.95 * 4 = 3.8
        assert!((percentile(&sorted, 95.0) - 4.8).abs() < 1e-12);
        // rank 0.05 * 4 = 0.2
        assert!((percentile(&sorted, 5.0) - 1.2).abs() < 1e-12);
    }

    #[test]
    fn percentile_of_tiny_inputs() {
        assert_eq!(percentile(&[], 95.0), 0.0);
        assert_eq!(percentile(&[7.5], 5.0), 7.5);
        assert_eq!(percentile(&[7.5], 95.0), 7.5);
    }

    #[test]
    fn mean_and_fraction_above() {
        let values = [100.0, 150.0, 151.0, 200.0];
        assert!((mean(&values) - 150.25).abs() < 1e-12);
        // 150.0 itself does not count
        assert_eq!(fraction_above(&values, 150.0), 0.5);
        assert_eq!(fraction_above(&[], 150.0), 0.0);
        assert_eq!(mean(&[]), 0.0);
    }
}
