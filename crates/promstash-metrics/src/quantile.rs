//! Quantile estimation over a sorted sample window

/// Quantile `q` of `sorted` by linear interpolation between closest ranks
///
/// `sorted` must be in ascending order. `q` is clamped to `[0, 1]`.
/// Returns NaN for an empty window.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }

    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_of_odd_window() {
        assert_eq!(quantile(&[1.0, 2.0, 3.0, 4.0, 5.0], 0.5), 3.0);
    }

    #[test]
    fn test_interpolates() {
        assert_eq!(quantile(&[1.0, 2.0, 3.0, 4.0], 0.5), 2.5);
        let q90 = quantile(&[1.0, 2.0, 3.0, 4.0, 5.0], 0.9);
        assert!((q90 - 4.6).abs() < 1e-9);
    }

    #[test]
    fn test_edges() {
        let window = [2.0, 4.0, 8.0];
        assert_eq!(quantile(&window, 0.0), 2.0);
        assert_eq!(quantile(&window, 1.0), 8.0);
        assert_eq!(quantile(&window, 1.5), 8.0);
        assert_eq!(quantile(&[7.0], 0.99), 7.0);
        assert!(quantile(&[], 0.5).is_nan());
    }
}
