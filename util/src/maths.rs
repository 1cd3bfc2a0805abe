//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float,
{
    target_range.0
        + ((value - source_range.0) * (target_range.1 - target_range.0)
            / (source_range.1 - source_range.0))
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float,
{
    let r = lhs % rhs;
    if r < T::from(0.0).unwrap() {
        r + rhs.abs()
    } else {
        r
    }
}

/// Wrap an angle in radians into the range (-pi, pi].
///
/// All angular differences in the workspace (heading errors, gate checks)
/// use this convention, so that -pi itself maps onto +pi and a comparison
/// against a symmetric threshold behaves the same on both sides.
pub fn wrap_to_pi<T>(angle: T) -> T
where
    T: Float,
{
    let pi = T::from(std::f64::consts::PI).unwrap();
    let tau = T::from(std::f64::consts::TAU).unwrap();

    pi - rem_euclid(pi - angle, tau)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const PI: f64 = std::f64::consts::PI;
    const TAU: f64 = std::f64::consts::TAU;

    #[test]
    fn test_lin_map() {
        assert_eq!(lin_map((0f64, 1f64), (0f64, 10f64), 0.5f64), 5f64);
        assert_eq!(lin_map((-1f64, 1f64), (0f64, 1f64), 0f64), 0.5f64);
        assert_eq!(lin_map((0f64, 10f64), (1f64, 0f64), 10f64), 0f64);
    }

    #[test]
    fn test_wrap_to_pi() {
        assert!((wrap_to_pi(0f64)).abs() < 1e-12);
        assert!((wrap_to_pi(PI) - PI).abs() < 1e-12);
        assert!((wrap_to_pi(-PI) - PI).abs() < 1e-12);
        assert!((wrap_to_pi(PI + 0.1) - (-PI + 0.1)).abs() < 1e-12);
        assert!((wrap_to_pi(-PI - 0.1) - (PI - 0.1)).abs() < 1e-12);
        assert!((wrap_to_pi(TAU)).abs() < 1e-12);
        assert!((wrap_to_pi(3.0 * TAU + 0.25) - 0.25).abs() < 1e-12);
        assert!((wrap_to_pi(-3.0 * TAU - 0.25) + 0.25).abs() < 1e-12);
    }
}
