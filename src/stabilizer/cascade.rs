// src/stabilizer/cascade.rs

//! # Cascaded Angle/Rate Stabilizer
//!
//! Roll and pitch run two PID stages in series. The outer angle stage turns
//! the angle error into a desired rotation rate, and that rate becomes the
//! setpoint of the inner rate stage, whose output is the torque command.
//! Yaw has no absolute reference and runs a single rate stage.
//!
//! Roll and pitch integrators (both stages) are gated on the estimated angle
//! of their axis. Yaw integrates whenever its own gate allows it.

use crate::pid::{PidAxis, PidAxisConfig, PidAxisId};
use crate::{FlightStabilizer, Number};

/// Gains for the five PID axes of the cascade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CascadeGains<T> {
    /// Outer roll loop, degrees in, degrees per second out.
    pub roll_angle: PidAxisConfig<T>,
    /// Outer pitch loop, degrees in, degrees per second out.
    pub pitch_angle: PidAxisConfig<T>,
    /// Yaw rate loop, degrees per second in, torque out.
    pub yaw_rate: PidAxisConfig<T>,
    /// Inner roll loop, degrees per second in, torque out.
    pub roll_rate: PidAxisConfig<T>,
    /// Inner pitch loop, degrees per second in, torque out.
    pub pitch_rate: PidAxisConfig<T>,
}

impl<T: Copy> CascadeGains<T> {
    /// Looks up the configuration of one axis.
    pub fn axis(&self, id: PidAxisId) -> &PidAxisConfig<T> {
        match id {
            PidAxisId::RollAngle => &self.roll_angle,
            PidAxisId::PitchAngle => &self.pitch_angle,
            PidAxisId::YawRate => &self.yaw_rate,
            PidAxisId::RollRate => &self.roll_rate,
            PidAxisId::PitchRate => &self.pitch_rate,
        }
    }
}

/// Per-axis values of the last evaluation, kept for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CascadeTerms<T> {
    /// Desired roll rate produced by the outer roll loop.
    pub roll_rate_set_point: T,
    /// Desired pitch rate produced by the outer pitch loop.
    pub pitch_rate_set_point: T,
    /// Roll torque command.
    pub roll: T,
    /// Pitch torque command.
    pub pitch: T,
    /// Yaw torque command.
    pub yaw: T,
}

/// Struct representing the cascaded PID attitude stabilizer.
pub struct CascadeStabilizer<T: Number> {
    roll_angle: PidAxis<T>,
    pitch_angle: PidAxis<T>,
    yaw_rate: PidAxis<T>,
    roll_rate: PidAxis<T>,
    pitch_rate: PidAxis<T>,
    terms: CascadeTerms<T>,
}

impl<T: Number> CascadeStabilizer<T> {
    /// Creates a new stabilizer using the provided gains.
    pub fn with_config(gains: &CascadeGains<T>) -> Self {
        CascadeStabilizer {
            roll_angle: PidAxis::with_config(PidAxisId::RollAngle, &gains.roll_angle),
            pitch_angle: PidAxis::with_config(PidAxisId::PitchAngle, &gains.pitch_angle),
            yaw_rate: PidAxis::with_config(PidAxisId::YawRate, &gains.yaw_rate),
            roll_rate: PidAxis::with_config(PidAxisId::RollRate, &gains.roll_rate),
            pitch_rate: PidAxis::with_config(PidAxisId::PitchRate, &gains.pitch_rate),
            terms: CascadeTerms {
                roll_rate_set_point: T::zero(),
                pitch_rate_set_point: T::zero(),
                roll: T::zero(),
                pitch: T::zero(),
                yaw: T::zero(),
            },
        }
    }

    /// Borrows one axis.
    pub fn axis(&self, id: PidAxisId) -> &PidAxis<T> {
        match id {
            PidAxisId::RollAngle => &self.roll_angle,
            PidAxisId::PitchAngle => &self.pitch_angle,
            PidAxisId::YawRate => &self.yaw_rate,
            PidAxisId::RollRate => &self.roll_rate,
            PidAxisId::PitchRate => &self.pitch_rate,
        }
    }

    /// Values of the last evaluation.
    pub fn terms(&self) -> CascadeTerms<T> {
        self.terms
    }
}

impl<T: Number> FlightStabilizer<T> for CascadeStabilizer<T> {
    fn control(
        &mut self,
        set_point: (T, T, T),
        imu_attitude: (T, T),
        gyro_rate: (T, T, T),
        dt: T,
    ) -> (T, T, T) {
        let (set_point_roll, set_point_pitch, set_point_yaw) = set_point;
        let (imu_roll, imu_pitch) = imu_attitude;
        let (gyro_roll, gyro_pitch, gyro_yaw) = gyro_rate;

        // Outer loops: angle error to desired rate
        let roll_rate_set_point = self
            .roll_angle
            .update(set_point_roll, imu_roll, imu_roll, dt);
        let pitch_rate_set_point = self
            .pitch_angle
            .update(set_point_pitch, imu_pitch, imu_pitch, dt);

        // Inner loops: rate error to torque
        let roll_output = self
            .roll_rate
            .update(roll_rate_set_point, gyro_roll, imu_roll, dt);
        let pitch_output = self
            .pitch_rate
            .update(pitch_rate_set_point, gyro_pitch, imu_pitch, dt);

        // Yaw, stabilize on rate only
        let yaw_output = self.yaw_rate.update(set_point_yaw, gyro_yaw, gyro_yaw, dt);

        self.terms = CascadeTerms {
            roll_rate_set_point,
            pitch_rate_set_point,
            roll: roll_output,
            pitch: pitch_output,
            yaw: yaw_output,
        };

        (roll_output, pitch_output, yaw_output)
    }

    fn reset(&mut self) {
        self.roll_angle.reset();
        self.pitch_angle.reset();
        self.yaw_rate.reset();
        self.roll_rate.reset();
        self.pitch_rate.reset();
        self.terms = CascadeTerms {
            roll_rate_set_point: T::zero(),
            pitch_rate_set_point: T::zero(),
            roll: T::zero(),
            pitch: T::zero(),
            yaw: T::zero(),
        };
    }
}
