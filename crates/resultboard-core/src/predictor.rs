//! Next-SGPA projection by ordinary least squares.

use std::fmt;

use serde::{Serialize, Serializer};

/// Lower bound of the SGPA scale.
pub const SGPA_MIN: f64 = 0.0;
/// Upper bound of the SGPA scale.
pub const SGPA_MAX: f64 = 10.0;

/// A projected SGPA; displays with two decimals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction(f64);

impl Prediction {
    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Serialize for Prediction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Project the value one step past the end of `series` (oldest first).
///
/// Fewer than two points: the single value (or 0) is returned as-is.
/// Otherwise the regression line over `(index, value)` is evaluated at
/// `x = n` and clamped to `[0, 10]`.
pub fn predict(series: &[f64]) -> Prediction {
    if series.len() < 2 {
        return Prediction(series.first().copied().unwrap_or(0.0));
    }

    let n = series.len() as f64;
    let (mut sx, mut sy, mut sxy, mut sxx) = (0.0, 0.0, 0.0, 0.0);
    for (i, &y) in series.iter().enumerate() {
        let x = i as f64;
        sx += x;
        sy += y;
        sxy += x * y;
        sxx += x * x;
    }
    // n >= 2 with x = 0..n-1 keeps the denominator positive
    let slope = (n * sxy - sx * sy) / (n * sxx - sx * sx);
    let intercept = (sy - slope * sx) / n;

    Prediction((slope * n + intercept).clamp(SGPA_MIN, SGPA_MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rising_series_clamps_at_ten() {
        let p = predict(&[7.0, 8.0, 9.0]);
        assert_eq!(p.value(), 10.0);
        assert_eq!(p.to_string(), "10.00");
    }

    #[test]
    fn test_short_series() {
        assert_eq!(predict(&[9.5]).to_string(), "9.50");
        assert_eq!(predict(&[]).to_string(), "0.00");
    }

    #[test]
    fn test_falling_series_clamps_at_zero() {
        assert_eq!(predict(&[4.0, 2.0, 0.5]).to_string(), "0.00");
    }

    #[test]
    fn test_flat_series_predicts_same_value() {
        assert_eq!(predict(&[7.25, 7.25, 7.25, 7.25]).to_string(), "7.25");
    }

    #[test]
    fn test_two_points_extrapolate_linearly() {
        // slope 0.5, intercept 7.0 -> x=2 gives 8.0
        assert_eq!(predict(&[7.0, 7.5]).to_string(), "8.00");
    }

    #[test]
    fn test_serializes_as_display_text() {
        let json = serde_json::to_string(&predict(&[8.123])).unwrap();
        assert_eq!(json, "\"8.12\"");
    }
}
