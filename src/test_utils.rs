// src/test_utils.rs

//! Tolerance helpers shared by the unit tests.

/// Tolerance within which floating-point values are considered equal.
pub const TEST_TOLERANCE: f32 = 1e-5;

/// Checks if two floating point numbers are close enough to be considered
/// equal.
///
/// # Arguments
/// * `target` - The target value.
/// * `value` - The value to compare against the target.
///
/// # Returns
/// `true` if the absolute difference between `target` and `value` is less than
/// `TEST_TOLERANCE`, otherwise `false`.
pub fn value_close(target: f32, value: f32) -> bool {
    (target - value).abs() < TEST_TOLERANCE
}

/// Checks if two floating point numbers differ by at least the tolerance.
pub fn value_not_close(target: f32, value: f32) -> bool {
    TEST_TOLERANCE <= (target - value).abs()
}

/// Checks if each component of a (roll, pitch, yaw) triple is close to the
/// target.
pub fn vector_close(target: (f32, f32, f32), value: (f32, f32, f32)) -> bool {
    value_close(target.0, value.0)
        && value_close(target.1, value.1)
        && value_close(target.2, value.2)
}

/// Checks if any component of a (roll, pitch, yaw) triple differs from the
/// target.
pub fn vector_not_close(target: (f32, f32, f32), value: (f32, f32, f32)) -> bool {
    !vector_close(target, value)
}

/// Checks if all four motor levels are close to the target levels.
///
/// # Arguments
/// * `target` - Expected levels in mixer order.
/// * `value` - Levels produced by the mixer.
pub fn levels_close(target: [f32; 4], value: [f32; 4]) -> bool {
    target
        .iter()
        .zip(value.iter())
        .all(|(t, v)| value_close(*t, *v))
}

/// Checks if `value` lies in `[low, high]`.
pub fn within(value: f32, low: f32, high: f32) -> bool {
    low <= value && value <= high
}
