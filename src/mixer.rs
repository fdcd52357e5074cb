// src/mixer.rs

//! # Motor Mixer
//!
//! Throttle plus roll, pitch and yaw torque into four motor levels. The
//! airframe geometry is a static sign table, one row per motor.
//!
//! Disarmed output is all zero no matter what the inputs are. This is the
//! one place that enforces it.

use crate::arming::ArmState;
use crate::config::MotorLevels;
use crate::Number;

/// Number of motors.
pub const MOTOR_COUNT: usize = 4;

/// Direction in which a torque command moves one motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    /// Adds the torque.
    Plus,
    /// Subtracts the torque.
    Minus,
    /// Ignores the torque.
    Zero,
}

impl Sign {
    /// Applies the sign to `value`.
    pub fn apply<T: Number>(self, value: T) -> T {
        match self {
            Sign::Plus => value,
            Sign::Minus => -value,
            Sign::Zero => T::zero(),
        }
    }
}

/// Signs of one motor's row of the mixing matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorMix {
    /// Roll torque sign.
    pub roll: Sign,
    /// Pitch torque sign.
    pub pitch: Sign,
    /// Yaw torque sign.
    pub yaw: Sign,
}

const fn row(roll: Sign, pitch: Sign, yaw: Sign) -> MotorMix {
    MotorMix { roll, pitch, yaw }
}

/// Quadrotor in X configuration, motors in the order front left, front
/// right, rear right, rear left. Front left and rear right spin clockwise.
///
/// Positive roll raises the left side, positive pitch raises the nose and
/// positive yaw speeds up the clockwise pair.
pub const QUAD_X: [MotorMix; MOTOR_COUNT] = [
    row(Sign::Plus, Sign::Plus, Sign::Plus),
    row(Sign::Minus, Sign::Plus, Sign::Minus),
    row(Sign::Minus, Sign::Minus, Sign::Plus),
    row(Sign::Plus, Sign::Minus, Sign::Minus),
];

/// Levels for the four motors, in mixer order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotorCommand<T> {
    /// One level per motor.
    pub levels: [T; MOTOR_COUNT],
}

/// Sink for motor commands, implemented by the PWM/ESC driver.
pub trait MotorOutput<T> {
    /// Writes one command to the motors.
    fn write(&mut self, command: &MotorCommand<T>);
}

/// Turns throttle and torque into clamped motor levels.
#[derive(Debug, Clone, Copy)]
pub struct Mixer<T> {
    levels: MotorLevels<T>,
    table: [MotorMix; MOTOR_COUNT],
}

impl<T: Number> Mixer<T> {
    /// Creates a mixer for the given output levels and sign table.
    pub fn new(levels: &MotorLevels<T>, table: &[MotorMix; MOTOR_COUNT]) -> Self {
        Mixer {
            levels: *levels,
            table: *table,
        }
    }

    /// Mixes one tick.
    ///
    /// `torque` is (roll, pitch, yaw). While armed, levels are clamped to
    /// `[zero, max]` and then floored at the arm level, or at the idle level
    /// when throttle is above idle.
    pub fn mix(&self, throttle: T, torque: (T, T, T), arm: ArmState) -> MotorCommand<T> {
        let levels = &self.levels;
        if !arm.is_armed() {
            return MotorCommand {
                levels: [levels.zero; MOTOR_COUNT],
            };
        }

        let (roll, pitch, yaw) = torque;
        let floor = if levels.idle < throttle {
            levels.idle
        } else {
            levels.arm
        };

        let mut command = MotorCommand {
            levels: [levels.zero; MOTOR_COUNT],
        };
        for (level, mix) in command.levels.iter_mut().zip(self.table.iter()) {
            let raw = throttle + mix.roll.apply(roll) + mix.pitch.apply(pitch) + mix.yaw.apply(yaw);
            *level = raw.clamp(levels.zero, levels.max).at_least(floor);
        }
        command
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use fixed::types::I16F16;

    fn levels() -> MotorLevels<f32> {
        MotorLevels {
            zero: 0.0,
            arm: 50.0,
            idle: 100.0,
            max: 179.0,
        }
    }

    fn mixer() -> Mixer<f32> {
        Mixer::new(&levels(), &QUAD_X)
    }

    #[test]
    fn test_mixer_disarmed_is_zero() {
        let mixer = mixer();
        for throttle in [0.0, 100.0, 179.0, 1.0e6] {
            for torque in [(0.0, 0.0, 0.0), (50.0, -50.0, 35.0), (-1.0e6, 1.0e6, 0.0)] {
                let command = mixer.mix(throttle, torque, ArmState::Disarmed);
                assert_eq!([0.0; MOTOR_COUNT], command.levels);
            }
        }
    }

    #[test]
    fn test_mixer_pure_throttle() {
        let command = mixer().mix(179.0, (0.0, 0.0, 0.0), ArmState::Armed);
        assert_eq!([179.0; MOTOR_COUNT], command.levels);

        let command = mixer().mix(140.0, (0.0, 0.0, 0.0), ArmState::Armed);
        assert_eq!([140.0; MOTOR_COUNT], command.levels);
    }

    #[test]
    fn test_mixer_sign_table() {
        let mixer = mixer();

        let roll = mixer.mix(140.0, (10.0, 0.0, 0.0), ArmState::Armed);
        assert_eq!([150.0, 130.0, 130.0, 150.0], roll.levels);

        let pitch = mixer.mix(140.0, (0.0, 10.0, 0.0), ArmState::Armed);
        assert_eq!([150.0, 150.0, 130.0, 130.0], pitch.levels);

        let yaw = mixer.mix(140.0, (0.0, 0.0, 10.0), ArmState::Armed);
        assert_eq!([150.0, 130.0, 150.0, 130.0], yaw.levels);
    }

    #[test]
    fn test_mixer_torques_cancel_in_sum() {
        let command = mixer().mix(140.0, (7.0, -3.0, 5.0), ArmState::Armed);
        let total: f32 = command.levels.iter().sum();
        assert!(value_close(4.0 * 140.0, total));
    }

    #[test]
    fn test_mixer_clamps_and_floors() {
        let mixer = mixer();

        // above idle: floor at idle, cap at max
        let command = mixer.mix(150.0, (60.0, 0.0, 0.0), ArmState::Armed);
        assert!(levels_close([179.0, 100.0, 100.0, 179.0], command.levels));

        // at idle: floor at the arm level
        let command = mixer.mix(100.0, (80.0, 0.0, 0.0), ArmState::Armed);
        assert!(levels_close([179.0, 50.0, 50.0, 179.0], command.levels));

        // armed with zero throttle still spins at the arm level
        let command = mixer.mix(0.0, (0.0, 0.0, 0.0), ArmState::Armed);
        assert_eq!([50.0; MOTOR_COUNT], command.levels);
    }

    #[test]
    fn test_mixer_levels_stay_in_bounds() {
        let mixer = mixer();
        for throttle in [0.0, 60.0, 100.0, 120.0, 179.0, 500.0] {
            for torque in [(-200.0, 30.0, 35.0), (200.0, -200.0, -35.0), (5.0, 5.0, 5.0)] {
                for level in mixer.mix(throttle, torque, ArmState::Armed).levels {
                    assert!(within(level, 50.0, 179.0));
                }
            }
        }
    }

    #[test]
    fn test_mixer_fixed_point() {
        let levels = MotorLevels {
            zero: I16F16::from_num(0),
            arm: I16F16::from_num(50),
            idle: I16F16::from_num(100),
            max: I16F16::from_num(179),
        };
        let mixer = Mixer::new(&levels, &QUAD_X);
        let command = mixer.mix(
            I16F16::from_num(140),
            (I16F16::from_num(10), I16F16::from_num(0), I16F16::from_num(0)),
            ArmState::Armed,
        );
        assert_eq!(I16F16::from_num(150), command.levels[0]);
        assert_eq!(I16F16::from_num(130), command.levels[1]);
    }
}
