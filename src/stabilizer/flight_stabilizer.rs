// src/stabilizer/flight_stabilizer.rs

//! A module specifying the shared numeric bounds and the interface for
//! PID-based attitude stabilizers.
//!
//! Control code is generic over [`Number`], which only asks for what
//! `piddiy` asks for, so the PID and mixing stages also run on fixed-point
//! types. Stages that need trigonometry or pulse-width conversion are bound
//! by [`Real`] instead.

use core::fmt::Debug;

use num_traits::{Float, NumCast};
use piddiy::Number as PiddiyNumber;

/// Custom trait to encapsulate base number requirements.
pub trait Number: PiddiyNumber {
    /// Clamps generic PartialOrd values within a given range.
    fn clamp(self, min: Self, max: Self) -> Self {
        if self < min {
            min
        } else if max < self {
            max
        } else {
            self
        }
    }

    /// Absolute value that only relies on ordering and negation.
    fn magnitude(self) -> Self {
        if self < Self::zero() {
            -self
        } else {
            self
        }
    }

    /// The larger of two values.
    fn at_least(self, floor: Self) -> Self {
        if self < floor {
            floor
        } else {
            self
        }
    }
}

impl<T: PiddiyNumber> Number for T {}

/// Floating-point numbers usable by the estimator, the setpoint mapper and
/// the tick pipeline.
pub trait Real: Number + Float + Debug + Default {
    /// Converts a tuning literal into `Self`.
    fn lit(value: f32) -> Self {
        <Self as NumCast>::from(value).unwrap_or_else(Self::zero)
    }

    /// Converts a pulse width (or any unsigned 16-bit count) into `Self`.
    fn from_pulse(value: u16) -> Self {
        <Self as NumCast>::from(value).unwrap_or_else(Self::zero)
    }

    /// Converts a signed raw sensor count into `Self`.
    fn from_count(value: i32) -> Self {
        <Self as NumCast>::from(value).unwrap_or_else(Self::zero)
    }
}

impl<T: Number + Float + Debug + Default> Real for T {}

/// A trait for PID-based attitude stabilizers that turn setpoints and
/// attitude measurements into roll, pitch and yaw torque commands.
pub trait FlightStabilizer<T: Number> {
    /// Takes desired setpoints, current IMU attitude, and gyro rates, then computes the control outputs.
    ///
    /// - `set_point`: A tuple of (roll angle, pitch angle, yaw rate) setpoints.
    /// - `imu_attitude`: A tuple of (roll, pitch) estimated angles.
    /// - `gyro_rate`: A tuple of (roll rate, pitch rate, yaw rate) from the gyroscope.
    /// - `dt`: Time delta since the last update.
    ///
    /// Returns a tuple of (roll torque, pitch torque, yaw torque).
    fn control(
        &mut self,
        set_point: (T, T, T),
        imu_attitude: (T, T),
        gyro_rate: (T, T, T),
        dt: T,
    ) -> (T, T, T);

    /// Clears every integrator and derivative history.
    fn reset(&mut self);
}
