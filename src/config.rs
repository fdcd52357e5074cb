// src/config.rs

//! # Flight Configuration
//!
//! Everything the control core needs to know about the airframe, the radio
//! and the tuning, gathered in one immutable [`FlightConfig`] that is built
//! once, validated and passed by reference. [`FlightConfig::new`] reproduces
//! the reference tuning table.

use crate::diagnostics::DiagnosticTopics;
use crate::error::ConfigError;
use crate::pid::{IntegralGate, PidAxisConfig, PidAxisId};
use crate::receiver::{Channel, CHANNEL_COUNT};
use crate::stabilizer::CascadeGains;
use crate::Real;

/// Stick band, in microseconds, that maps to exactly zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadZone {
    /// Lower edge, inclusive.
    pub min: u16,
    /// Upper edge, inclusive.
    pub max: u16,
}

impl DeadZone {
    /// Whether `pulse` lies in the band.
    pub fn contains(&self, pulse: u16) -> bool {
        (self.min..=self.max).contains(&pulse)
    }

    /// Center of the band.
    pub fn center(&self) -> u16 {
        self.min + (self.max - self.min) / 2
    }
}

/// Raw and mapped range of one receiver channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelRange<T> {
    /// Shortest accepted pulse, in microseconds.
    pub r_min: u16,
    /// Longest accepted pulse, in microseconds.
    pub r_max: u16,
    /// Band mapped to zero. Only honored on stick channels.
    pub dead_zone: Option<DeadZone>,
    /// Setpoint at `r_min`.
    pub w_min: T,
    /// Setpoint at `r_max`.
    pub w_max: T,
}

impl<T> ChannelRange<T> {
    /// Pulse assumed before the first good reading: the stick center for
    /// centered sticks, the low stop otherwise.
    pub fn failsafe_pulse(&self, centered: bool) -> u16 {
        if !centered {
            return self.r_min;
        }
        match self.dead_zone {
            Some(dead_zone) => dead_zone.center(),
            None => self.r_min + (self.r_max - self.r_min) / 2,
        }
    }

    /// Clamps a pulse into the raw range.
    pub fn clamp_pulse(&self, pulse: u16) -> u16 {
        pulse.clamp(self.r_min, self.r_max)
    }
}

/// Motor output levels in ESC units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorLevels<T> {
    /// Motors stopped.
    pub zero: T,
    /// Lowest level while armed.
    pub arm: T,
    /// Lowest level while armed with throttle above idle.
    pub idle: T,
    /// Highest level.
    pub max: T,
}

/// Raw per-axis calibration offsets subtracted from every sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SensorOffsets {
    /// Accelerometer x, y, z offsets in counts.
    pub accel: [i16; 3],
    /// Gyroscope x, y, z offsets in counts.
    pub gyro: [i16; 3],
}

/// Sensitivity of the inertial sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorScale<T> {
    /// Gyroscope counts per degree per second.
    pub gyro_counts_per_dps: T,
    /// Accelerometer counts per g.
    pub accel_counts_per_g: T,
}

/// Complementary filter tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatorConfig<T> {
    /// Weight of the gyro-integrated angle, in `[0, 1]`.
    pub gyro_weight: T,
    /// Largest deviation of `|a|` from 1 g, in g, for which the
    /// accelerometer still corrects the angles.
    pub accel_trust_band: T,
    /// Samples averaged to find the gyro bias. Zero disables
    /// self-calibration.
    pub settle_samples: u32,
}

/// Receiver timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiverConfig {
    /// A channel silent for longer than this is stale.
    pub frame_period_us: u32,
    /// Shortest plausible pulse. Anything shorter is a glitch.
    pub glitch_min_us: u16,
    /// Longest plausible pulse. Anything longer is a glitch.
    pub glitch_max_us: u16,
}

/// Aux switch arming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmingConfig {
    /// Aux pulses above this arm, pulses below it disarm.
    pub aux_threshold_us: u16,
    /// Arming also requires the throttle pulse at or below this.
    pub throttle_low_us: u16,
}

/// Control loop timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Tick period in microseconds.
    pub period_us: u32,
}

/// Board wiring, carried for the glue code that sets up interrupts and
/// PWM outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinAssignments {
    /// Roll receiver pin (pin-change interrupt).
    pub rx_roll: u8,
    /// Pitch receiver pin (pin-change interrupt).
    pub rx_pitch: u8,
    /// Yaw receiver pin (pin-change interrupt).
    pub rx_yaw: u8,
    /// External interrupt number of the throttle receiver input.
    pub rx_throttle_interrupt: u8,
    /// External interrupt number of the aux1 receiver input.
    pub rx_aux1_interrupt: u8,
    /// Motor output pins in mixer order.
    pub motors: [u8; 4],
    /// Status LED pin.
    pub led: u8,
}

/// The full configuration of the control core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlightConfig<T> {
    /// Throttle channel. `w_min` is the armed floor.
    pub throttle: ChannelRange<T>,
    /// Roll stick, degrees.
    pub roll: ChannelRange<T>,
    /// Pitch stick, degrees.
    pub pitch: ChannelRange<T>,
    /// Yaw stick, degrees per second.
    pub yaw: ChannelRange<T>,
    /// Aux switch, percent.
    pub aux1: ChannelRange<T>,
    /// PID tuning of the cascade.
    pub gains: CascadeGains<T>,
    /// ESC output levels.
    pub motor: MotorLevels<T>,
    /// Raw sensor calibration offsets.
    pub offsets: SensorOffsets,
    /// Sensor sensitivity.
    pub scale: SensorScale<T>,
    /// Attitude estimator tuning.
    pub estimator: EstimatorConfig<T>,
    /// Receiver timing.
    pub receiver: ReceiverConfig,
    /// Aux switch arming.
    pub arming: ArmingConfig,
    /// Control loop timing.
    pub scheduler: SchedulerConfig,
    /// Board wiring.
    pub pins: PinAssignments,
    /// Enabled diagnostics trace topics.
    pub diagnostics: DiagnosticTopics,
}

impl<T: Real> FlightConfig<T> {
    /// The reference tuning table.
    pub fn new() -> Self {
        let lit = T::lit;
        let dead_zone = Some(DeadZone {
            min: 1470,
            max: 1520,
        });
        let gate = IntegralGate::AngleBelow(lit(15.0));
        let motor = MotorLevels {
            zero: lit(0.0),
            arm: lit(50.0),
            idle: lit(100.0),
            max: lit(179.0),
        };

        FlightConfig {
            throttle: ChannelRange {
                r_min: 1000,
                r_max: 1950,
                dead_zone: None,
                w_min: motor.idle,
                w_max: motor.max,
            },
            roll: ChannelRange {
                r_min: 1000,
                r_max: 1950,
                dead_zone,
                w_min: lit(-20.0),
                w_max: lit(20.0),
            },
            pitch: ChannelRange {
                r_min: 1100,
                r_max: 1880,
                dead_zone,
                w_min: lit(-20.0),
                w_max: lit(20.0),
            },
            yaw: ChannelRange {
                r_min: 998,
                r_max: 1950,
                dead_zone,
                w_min: lit(-90.0),
                w_max: lit(90.0),
            },
            aux1: ChannelRange {
                r_min: 1000,
                r_max: 2000,
                dead_zone: None,
                w_min: lit(0.0),
                w_max: lit(100.0),
            },
            gains: CascadeGains {
                roll_angle: PidAxisConfig {
                    kp: lit(0.12),
                    ki: lit(0.23),
                    kd: lit(0.014),
                    min: lit(-70.0),
                    max: lit(70.0),
                    gate,
                },
                pitch_angle: PidAxisConfig {
                    kp: lit(0.11),
                    ki: lit(0.23),
                    kd: lit(0.012),
                    min: lit(-70.0),
                    max: lit(70.0),
                    gate,
                },
                yaw_rate: PidAxisConfig {
                    kp: lit(0.6),
                    ki: lit(0.0),
                    kd: lit(-0.01),
                    min: lit(-35.0),
                    max: lit(35.0),
                    gate: IntegralGate::Always,
                },
                roll_rate: PidAxisConfig {
                    kp: lit(1.1),
                    ki: lit(0.09),
                    kd: lit(0.0),
                    min: lit(-100.0),
                    max: lit(100.0),
                    gate,
                },
                pitch_rate: PidAxisConfig {
                    kp: lit(1.1),
                    ki: lit(0.09),
                    kd: lit(0.0),
                    min: lit(-100.0),
                    max: lit(100.0),
                    gate,
                },
            },
            motor,
            offsets: SensorOffsets {
                accel: [-2293, -1334, 1828],
                gyro: [45, 0, -45],
            },
            scale: SensorScale {
                gyro_counts_per_dps: lit(131.0),
                accel_counts_per_g: lit(16384.0),
            },
            estimator: EstimatorConfig {
                gyro_weight: lit(0.98),
                accel_trust_band: lit(0.15),
                // 20 s at 250 Hz
                settle_samples: 5000,
            },
            receiver: ReceiverConfig {
                frame_period_us: 20_000,
                glitch_min_us: 800,
                glitch_max_us: 2200,
            },
            arming: ArmingConfig {
                aux_threshold_us: 1500,
                throttle_low_us: 1050,
            },
            scheduler: SchedulerConfig { period_us: 4000 },
            pins: PinAssignments {
                rx_roll: 51,
                rx_pitch: 50,
                rx_yaw: 52,
                rx_throttle_interrupt: 4,
                rx_aux1_interrupt: 5,
                motors: [7, 6, 5, 4],
                led: 37,
            },
            diagnostics: DiagnosticTopics::empty(),
        }
    }

    /// Checks every range, ordering and timing invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for channel in Channel::ALL {
            let range = self.channel(channel);
            if range.r_min >= range.r_max {
                return Err(ConfigError::InvalidRawRange {
                    channel,
                    r_min: range.r_min,
                    r_max: range.r_max,
                });
            }
            if let Some(dead_zone) = range.dead_zone {
                if dead_zone.min > dead_zone.max
                    || dead_zone.min <= range.r_min
                    || dead_zone.max >= range.r_max
                {
                    return Err(ConfigError::DeadZoneOutsideRange {
                        channel,
                        min: dead_zone.min,
                        max: dead_zone.max,
                    });
                }
            }
            if range.w_min >= range.w_max {
                return Err(ConfigError::InvalidMappedRange { channel });
            }
            if range.r_min < self.receiver.glitch_min_us || range.r_max > self.receiver.glitch_max_us
            {
                return Err(ConfigError::GlitchWindowTooNarrow { channel });
            }
        }

        for axis in PidAxisId::ALL {
            let gains = self.gains.axis(axis);
            if gains.min >= gains.max {
                return Err(ConfigError::InvalidPidLimits { axis });
            }
        }

        let motor = &self.motor;
        if !(motor.zero <= motor.arm && motor.arm <= motor.idle && motor.idle <= motor.max) {
            return Err(ConfigError::MotorLevelOrder);
        }

        let weight = self.estimator.gyro_weight;
        if !(T::zero() <= weight && weight <= T::one()) {
            return Err(ConfigError::InvalidGyroWeight);
        }
        if !(T::zero() < self.scale.gyro_counts_per_dps && T::zero() < self.scale.accel_counts_per_g)
        {
            return Err(ConfigError::InvalidSensorScale);
        }
        if self.scheduler.period_us == 0 {
            return Err(ConfigError::ZeroControlPeriod);
        }
        if self.receiver.frame_period_us == 0 {
            return Err(ConfigError::ZeroFramePeriod);
        }

        Ok(())
    }
}

impl<T: Real> Default for FlightConfig<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy> FlightConfig<T> {
    /// Range of one channel.
    pub fn channel(&self, channel: Channel) -> &ChannelRange<T> {
        match channel {
            Channel::Throttle => &self.throttle,
            Channel::Roll => &self.roll,
            Channel::Pitch => &self.pitch,
            Channel::Yaw => &self.yaw,
            Channel::Aux1 => &self.aux1,
        }
    }

    /// Every channel range in storage order.
    pub fn channels(&self) -> [ChannelRange<T>; CHANNEL_COUNT] {
        [self.throttle, self.roll, self.pitch, self.yaw, self.aux1]
    }
}
