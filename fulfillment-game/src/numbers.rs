//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Floor a f64 and clamp it to the i32 range, returning 0 for NaN values.
#[must_use]
pub fn floor_f64_to_i32(value: f64) -> i32 {
    if value.is_nan() {
        return 0;
    }
    let min = cast::<i32, f64>(i32::MIN).unwrap_or(f64::MIN);
    let max = cast::<i32, f64>(i32::MAX).unwrap_or(f64::MAX);
    let clamped = value.clamp(min, max).floor();
    cast::<f64, i32>(clamped).unwrap_or(0)
}

/// Convert a count to i32, saturating at `i32::MAX`.
#[must_use]
pub fn usize_to_i32(value: usize) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Narrow an i64 to i32, saturating at either bound.
#[must_use]
pub fn i64_to_i32(value: i64) -> i32 {
    cast::<i64, i32>(value).unwrap_or(if value < 0 { i32::MIN } else { i32::MAX })
}

/// Convert a non-negative i32 to usize, mapping negatives to 0.
#[must_use]
pub fn i32_to_usize(value: i32) -> usize {
    usize::try_from(value.max(0)).unwrap_or(0)
}

/// Convert a count to f64 while allowing precision loss in a single location.
#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_handles_nan_and_bounds() {
        assert_eq!(floor_f64_to_i32(2.9), 2);
        assert_eq!(floor_f64_to_i32(-0.5), -1);
        assert_eq!(floor_f64_to_i32(f64::NAN), 0);
        assert_eq!(floor_f64_to_i32(f64::from(i32::MAX) * 2.0), i32::MAX);
    }

    #[test]
    fn count_conversions_saturate() {
        assert_eq!(usize_to_i32(usize::MAX), i32::MAX);
        assert_eq!(i32_to_usize(-4), 0);
        assert_eq!(i32_to_usize(7), 7);
        assert!((usize_to_f64(3) - 3.0).abs() < f64::EPSILON);
        assert_eq!(i64_to_i32(-120), -120);
        assert_eq!(i64_to_i32(i64::MIN), i32::MIN);
        assert_eq!(i64_to_i32(i64::MAX), i32::MAX);
    }
}
