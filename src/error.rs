// src/error.rs

//! Configuration errors. Runtime paths clamp or hold instead of failing, so
//! validation is the only fallible operation in the crate.

use thiserror::Error;

use crate::pid::PidAxisId;
use crate::receiver::Channel;

/// Reasons a [`FlightConfig`](crate::config::FlightConfig) is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The raw pulse range is empty or inverted.
    #[error("{channel}: raw range {r_min}..{r_max} us is empty")]
    InvalidRawRange {
        /// Offending channel.
        channel: Channel,
        /// Configured lower pulse bound.
        r_min: u16,
        /// Configured upper pulse bound.
        r_max: u16,
    },
    /// The dead-zone is not strictly inside the raw pulse range.
    #[error("{channel}: dead-zone {min}..{max} us is not inside the raw range")]
    DeadZoneOutsideRange {
        /// Offending channel.
        channel: Channel,
        /// Configured dead-zone lower edge.
        min: u16,
        /// Configured dead-zone upper edge.
        max: u16,
    },
    /// The mapped range is empty or inverted.
    #[error("{channel}: mapped range is empty")]
    InvalidMappedRange {
        /// Offending channel.
        channel: Channel,
    },
    /// A PID axis has `min >= max`.
    #[error("{axis}: output limits are empty")]
    InvalidPidLimits {
        /// Offending axis.
        axis: PidAxisId,
    },
    /// Motor levels are not ordered `zero <= arm <= idle <= max`.
    #[error("motor levels must satisfy zero <= arm <= idle <= max")]
    MotorLevelOrder,
    /// The complementary filter gyro weight is outside `[0, 1]`.
    #[error("gyro weight must lie in [0, 1]")]
    InvalidGyroWeight,
    /// A sensor scale factor is zero or negative.
    #[error("sensor scale factors must be positive")]
    InvalidSensorScale,
    /// The control period is zero.
    #[error("control period must be nonzero")]
    ZeroControlPeriod,
    /// The receiver frame period is zero.
    #[error("receiver frame period must be nonzero")]
    ZeroFramePeriod,
    /// The glitch window does not cover a channel's raw range.
    #[error("{channel}: raw range is not inside the glitch window")]
    GlitchWindowTooNarrow {
        /// Offending channel.
        channel: Channel,
    },
}
