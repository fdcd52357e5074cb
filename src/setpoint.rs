// src/setpoint.rs

//! # Setpoint Mapper
//!
//! Linear interpolation of decoded pulse widths into physical setpoints:
//! degrees for roll and pitch, degrees per second for yaw, ESC units for
//! throttle and percent for the aux switch. Stick pulses inside the
//! dead-zone map to exactly zero. The throttle floor depends on the arm
//! state so that no lift is commanded before arming.

use crate::arming::ArmState;
use crate::config::{ChannelRange, FlightConfig};
use crate::receiver::{Channel, DecodedChannels, CHANNEL_COUNT};
use crate::{Number, Real};

/// Physical setpoints of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Setpoints<T> {
    /// Collective throttle, ESC units.
    pub throttle: T,
    /// Desired roll angle, degrees.
    pub roll: T,
    /// Desired pitch angle, degrees.
    pub pitch: T,
    /// Desired yaw rate, degrees per second.
    pub yaw: T,
    /// Aux switch position, percent.
    pub aux1: T,
}

/// Maps decoded channels into [`Setpoints`].
#[derive(Debug, Clone, Copy)]
pub struct SetpointMapper<T> {
    ranges: [ChannelRange<T>; CHANNEL_COUNT],
    motor_zero: T,
}

impl<T: Real> SetpointMapper<T> {
    /// Creates a mapper for the configured channel ranges.
    pub fn new(config: &FlightConfig<T>) -> Self {
        SetpointMapper {
            ranges: config.channels(),
            motor_zero: config.motor.zero,
        }
    }

    /// Mapped range of `channel` for the given arm state.
    pub fn output_range(&self, channel: Channel, arm: ArmState) -> (T, T) {
        let range = &self.ranges[channel.index()];
        match (channel, arm) {
            (Channel::Throttle, ArmState::Disarmed) => (self.motor_zero, range.w_max),
            _ => (range.w_min, range.w_max),
        }
    }

    /// Maps one raw pulse. Pulses outside the raw range are clamped first,
    /// so the result never leaves the mapped range.
    pub fn map(&self, raw: u16, channel: Channel, arm: ArmState) -> T {
        let range = &self.ranges[channel.index()];
        let raw = range.clamp_pulse(raw);

        if channel.is_stick() && range.dead_zone.is_some_and(|zone| zone.contains(raw)) {
            return T::zero();
        }

        let (w_min, w_max) = self.output_range(channel, arm);
        let span = T::from_pulse(range.r_max - range.r_min);
        let offset = T::from_pulse(raw - range.r_min);
        let value = w_min + offset * (w_max - w_min) / span;

        Number::clamp(value, w_min, w_max)
    }

    /// Maps every decoded channel.
    pub fn map_all(&self, decoded: &DecodedChannels, arm: ArmState) -> Setpoints<T> {
        let map = |channel| self.map(decoded.pulse(channel), channel, arm);
        Setpoints {
            throttle: map(Channel::Throttle),
            roll: map(Channel::Roll),
            pitch: map(Channel::Pitch),
            yaw: map(Channel::Yaw),
            aux1: map(Channel::Aux1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    fn mapper() -> SetpointMapper<f32> {
        SetpointMapper::new(&FlightConfig::new())
    }

    #[test]
    fn test_setpoint_dead_zone_maps_to_zero() {
        let mapper = mapper();
        for channel in [Channel::Roll, Channel::Pitch, Channel::Yaw] {
            for raw in 1470..=1520 {
                assert_eq!(
                    0.0,
                    mapper.map(raw, channel, ArmState::Armed),
                    "{} at {} us should be neutral.",
                    channel,
                    raw
                );
            }
        }
    }

    #[test]
    fn test_setpoint_roll_interpolation() {
        let mapper = mapper();
        assert!(value_close(-20.0, mapper.map(1000, Channel::Roll, ArmState::Armed)));
        assert!(value_close(20.0, mapper.map(1950, Channel::Roll, ArmState::Armed)));
        // a quarter of the way through 1100..1880
        assert!(value_close(-10.0, mapper.map(1295, Channel::Pitch, ArmState::Armed)));
        assert!(value_close(90.0, mapper.map(1950, Channel::Yaw, ArmState::Disarmed)));
        assert!(value_close(50.0, mapper.map(1500, Channel::Aux1, ArmState::Disarmed)));
    }

    #[test]
    fn test_setpoint_never_leaves_mapped_range() {
        let mapper = mapper();
        for channel in Channel::ALL {
            for arm in [ArmState::Armed, ArmState::Disarmed] {
                let (w_min, w_max) = mapper.output_range(channel, arm);
                for raw in (0..=3000).step_by(7) {
                    let value = mapper.map(raw, channel, arm);
                    assert!(
                        w_min <= value && value <= w_max,
                        "{} at {} us mapped to {}.",
                        channel,
                        raw,
                        value
                    );
                }
            }
        }
    }

    #[test]
    fn test_setpoint_out_of_range_is_clamped() {
        let mapper = mapper();
        assert!(value_close(-20.0, mapper.map(900, Channel::Pitch, ArmState::Armed)));
        assert!(value_close(20.0, mapper.map(2100, Channel::Pitch, ArmState::Armed)));
        assert!(value_close(179.0, mapper.map(u16::MAX, Channel::Throttle, ArmState::Armed)));
    }

    #[test]
    fn test_setpoint_throttle_floor_follows_arm_state() {
        let mapper = mapper();
        assert!(value_close(100.0, mapper.map(1000, Channel::Throttle, ArmState::Armed)));
        assert!(value_close(0.0, mapper.map(1000, Channel::Throttle, ArmState::Disarmed)));
        assert!(value_close(179.0, mapper.map(1950, Channel::Throttle, ArmState::Armed)));
        assert!(value_close(179.0, mapper.map(1950, Channel::Throttle, ArmState::Disarmed)));
    }

    #[test]
    fn test_setpoint_map_all() {
        let mapper = mapper();
        let decoded = DecodedChannels {
            pulses_us: [1950, 1475, 1880, 998, 2000],
            stale: [false; CHANNEL_COUNT],
        };
        let setpoints = mapper.map_all(&decoded, ArmState::Armed);

        assert!(value_close(179.0, setpoints.throttle));
        assert!(value_close(0.0, setpoints.roll));
        assert!(value_close(20.0, setpoints.pitch));
        assert!(value_close(-90.0, setpoints.yaw));
        assert!(value_close(100.0, setpoints.aux1));
    }
}
