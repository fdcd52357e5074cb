// src/diagnostics.rs

//! Read-only view of one tick's intermediate values, plus topic-gated
//! `trace` records for bench tuning.

use bitflags::bitflags;

use crate::arming::ArmState;
use crate::estimator::{AttitudeEstimate, SensorReading};
use crate::mixer::MotorCommand;
use crate::receiver::CHANNEL_COUNT;
use crate::setpoint::Setpoints;
use crate::stabilizer::CascadeTerms;
use crate::Real;

bitflags! {
    /// Topics emitted as `trace` records at the end of every tick.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DiagnosticTopics: u8 {
        /// Estimated roll and pitch angles.
        const ANGLES = 1 << 0;
        /// Calibrated accelerometer.
        const ACCEL = 1 << 1;
        /// Calibrated gyroscope.
        const GYRO = 1 << 2;
        /// Motor levels.
        const MOTORS = 1 << 3;
        /// Cascade setpoints and torque outputs.
        const PID = 1 << 4;
        /// Receiver pulses and stale flags.
        const RECEIVER = 1 << 5;
    }
}

/// Snapshot of the last tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Diagnostics<T> {
    /// Ticks run since start.
    pub ticks: u32,
    /// Ticks that started a full period or more late.
    pub overruns: u32,
    /// Decoded pulse per channel.
    pub pulses_us: [u16; CHANNEL_COUNT],
    /// Stale flag per channel.
    pub stale: [bool; CHANNEL_COUNT],
    /// No new sensor sample arrived for this tick.
    pub sensor_stale: bool,
    /// Arm state the tick ran with.
    pub arm_state: ArmState,
    /// Calibrated sensor values.
    pub reading: SensorReading<T>,
    /// Attitude estimate.
    pub estimate: AttitudeEstimate<T>,
    /// Mapped setpoints.
    pub setpoints: Setpoints<T>,
    /// Cascade intermediate values and torque outputs.
    pub terms: CascadeTerms<T>,
    /// Motor levels written.
    pub motors: MotorCommand<T>,
}

impl<T: Real> Diagnostics<T> {
    /// Emits one `trace` record per enabled topic.
    pub fn trace(&self, topics: DiagnosticTopics) {
        if topics.contains(DiagnosticTopics::RECEIVER) {
            log::trace!("rx {:?} stale {:?}", self.pulses_us, self.stale);
        }
        if topics.contains(DiagnosticTopics::ACCEL) {
            log::trace!("accel {:?}", self.reading.accel_g);
        }
        if topics.contains(DiagnosticTopics::GYRO) {
            log::trace!("gyro {:?}", self.reading.gyro_dps);
        }
        if topics.contains(DiagnosticTopics::ANGLES) {
            log::trace!(
                "angles roll {:?} pitch {:?} provisional {}",
                self.estimate.roll,
                self.estimate.pitch,
                self.estimate.provisional
            );
        }
        if topics.contains(DiagnosticTopics::PID) {
            log::trace!(
                "pid set {:?} rate set ({:?}, {:?}) out ({:?}, {:?}, {:?})",
                (self.setpoints.roll, self.setpoints.pitch, self.setpoints.yaw),
                self.terms.roll_rate_set_point,
                self.terms.pitch_rate_set_point,
                self.terms.roll,
                self.terms.pitch,
                self.terms.yaw
            );
        }
        if topics.contains(DiagnosticTopics::MOTORS) {
            log::trace!("motors {:?} {}", self.motors.levels, self.arm_state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_topics() {
        let topics = DiagnosticTopics::ANGLES | DiagnosticTopics::MOTORS;
        assert!(topics.contains(DiagnosticTopics::ANGLES));
        assert!(!topics.contains(DiagnosticTopics::GYRO));
        assert_eq!(6, DiagnosticTopics::all().iter().count());
    }

    #[test]
    fn test_diagnostics_default_and_trace() {
        let diagnostics = Diagnostics::<f32>::default();
        assert_eq!(0, diagnostics.ticks);
        assert_eq!(ArmState::Disarmed, diagnostics.arm_state);
        // no logger installed, must not panic
        diagnostics.trace(DiagnosticTopics::all());
    }
}
