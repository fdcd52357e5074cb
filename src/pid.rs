// src/pid.rs

//! # PID Control Module
//!
//! This module provides the compute callback and the per-axis wrapper used
//! by every PID stage of the attitude controller.

use core::fmt;

pub mod axis;
pub use axis::*;

/// Identifies one PID axis of the cascaded controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PidAxisId {
    /// Outer roll loop: angle error in, desired roll rate out.
    RollAngle,
    /// Outer pitch loop: angle error in, desired pitch rate out.
    PitchAngle,
    /// Yaw loop: rate error in, yaw torque out.
    YawRate,
    /// Inner roll loop: rate error in, roll torque out.
    RollRate,
    /// Inner pitch loop: rate error in, pitch torque out.
    PitchRate,
}

impl PidAxisId {
    /// Every axis, outer loops first.
    pub const ALL: [PidAxisId; 5] = [
        PidAxisId::RollAngle,
        PidAxisId::PitchAngle,
        PidAxisId::YawRate,
        PidAxisId::RollRate,
        PidAxisId::PitchRate,
    ];

    /// Short lowercase name used in logs and error messages.
    pub fn name(self) -> &'static str {
        match self {
            PidAxisId::RollAngle => "roll_angle",
            PidAxisId::PitchAngle => "pitch_angle",
            PidAxisId::YawRate => "yaw_rate",
            PidAxisId::RollRate => "roll_rate",
            PidAxisId::PitchRate => "pitch_rate",
        }
    }
}

impl fmt::Display for PidAxisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
