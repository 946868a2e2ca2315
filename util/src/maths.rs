//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Clamp a value into the range `[min, max]`.
pub fn clamp<T>(value: &T, min: &T, max: &T) -> T
where
    T: Float + std::ops::Mul + std::ops::Add + std::ops::AddAssign
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

/// Square a value while keeping its sign, so that small inputs are attenuated
/// without losing direction.
///
/// Zero maps to zero.
pub fn signed_square<T>(value: T) -> T
where
    T: Float
{
    value * value.abs()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(&1.5f64, &-1f64, &1f64), 1f64);
        assert_eq!(clamp(&-1.5f64, &-1f64, &1f64), -1f64);
        assert_eq!(clamp(&0.25f64, &-1f64, &1f64), 0.25f64);
    }

    #[test]
    fn test_signed_square() {
        assert_eq!(signed_square(0.5f64), 0.25f64);
        assert_eq!(signed_square(-0.5f64), -0.25f64);
        assert_eq!(signed_square(0f64), 0f64);
        assert_eq!(signed_square(-1f64), -1f64);
    }
}
