// src/arming.rs

//! Arm state and the aux switch that drives it.
//!
//! The state only changes on explicit commands: a call to
//! [`FlightController::command`](crate::controller::FlightController::command)
//! or a transition of the aux switch. Sensor data never arms or disarms.

use core::fmt;

use crate::config::ArmingConfig;
use crate::receiver::{Channel, DecodedChannels};

/// Whether the motors may spin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArmState {
    /// All motor outputs forced to zero.
    #[default]
    Disarmed,
    /// Motor outputs follow the mixer.
    Armed,
}

impl ArmState {
    /// State after applying `command`.
    pub fn apply(self, command: ArmCommand) -> ArmState {
        match command {
            ArmCommand::Arm => ArmState::Armed,
            ArmCommand::Disarm => ArmState::Disarmed,
        }
    }

    /// Shorthand for `self == ArmState::Armed`.
    pub fn is_armed(self) -> bool {
        self == ArmState::Armed
    }
}

impl fmt::Display for ArmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArmState::Disarmed => f.pad("disarmed"),
            ArmState::Armed => f.pad("armed"),
        }
    }
}

/// An explicit arm state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmCommand {
    /// Allow the motors to spin.
    Arm,
    /// Stop the motors.
    Disarm,
}

/// Edge-triggered aux switch.
///
/// Moving the switch above the threshold arms, but only with the throttle
/// at its low stop. Moving it below the threshold disarms. The first fresh
/// reading only records the switch position, so powering up with the switch
/// already on does not arm. A stale aux channel issues nothing.
#[derive(Debug, Clone, Copy)]
pub struct ArmSwitch {
    config: ArmingConfig,
    high: Option<bool>,
}

impl ArmSwitch {
    /// Creates a switch with no known position.
    pub fn new(config: &ArmingConfig) -> Self {
        ArmSwitch {
            config: *config,
            high: None,
        }
    }

    /// Looks at this tick's channels and returns the command the switch
    /// issues, if any.
    pub fn evaluate(&mut self, decoded: &DecodedChannels) -> Option<ArmCommand> {
        if decoded.is_stale(Channel::Aux1) {
            return None;
        }

        let high = decoded.pulse(Channel::Aux1) > self.config.aux_threshold_us;
        let previous = self.high.replace(high);

        match (previous, high) {
            (Some(false), true) => {
                if decoded.pulse(Channel::Throttle) <= self.config.throttle_low_us {
                    Some(ArmCommand::Arm)
                } else {
                    log::warn!("arm switch ignored, throttle not at low stop");
                    None
                }
            }
            (Some(true), false) => Some(ArmCommand::Disarm),
            _ => None,
        }
    }
}
