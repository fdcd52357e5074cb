// src/controller.rs

//! # Flight Controller
//!
//! One control tick, start to finish:
//!
//! 1. decode the receiver snapshot,
//! 2. let the aux switch issue arm commands,
//! 3. fold the new sensor sample into the attitude estimate,
//! 4. map the sticks into setpoints,
//! 5. run the cascade (armed only),
//! 6. mix.
//!
//! Every input is a snapshot taken before the tick starts, so the tick
//! itself never touches shared state. Nothing in a tick can fail: stale
//! inputs are held and out-of-range inputs are clamped.

use crate::arming::{ArmCommand, ArmState, ArmSwitch};
use crate::config::FlightConfig;
use crate::diagnostics::{DiagnosticTopics, Diagnostics};
use crate::error::ConfigError;
use crate::estimator::{AttitudeEstimate, AttitudeEstimator, SensorSample};
use crate::mixer::{Mixer, MotorCommand, QUAD_X};
use crate::receiver::{ChannelDecoder, PulseSnapshot};
use crate::setpoint::SetpointMapper;
use crate::snapshot::Stamped;
use crate::stabilizer::{CascadeStabilizer, CascadeTerms, FlightStabilizer};
use crate::Real;

/// Inputs captured at the start of one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickInputs {
    /// Latest pulse per channel.
    pub pulses: PulseSnapshot,
    /// Latest sensor sample.
    pub sensor: Option<Stamped<SensorSample>>,
    /// Tick start on the wrapping microsecond clock.
    pub now_us: u32,
}

/// The attitude-stabilization core.
pub struct FlightController<T: Real> {
    decoder: ChannelDecoder,
    mapper: SetpointMapper<T>,
    estimator: AttitudeEstimator<T>,
    stabilizer: CascadeStabilizer<T>,
    mixer: Mixer<T>,
    arm_switch: ArmSwitch,
    arm_state: ArmState,
    last_sample_at: Option<u32>,
    topics: DiagnosticTopics,
    diagnostics: Diagnostics<T>,
}

impl<T: Real> FlightController<T> {
    /// Validates `config` and builds a disarmed controller.
    pub fn new(config: &FlightConfig<T>) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(FlightController {
            decoder: ChannelDecoder::new(&config.channels(), &config.receiver),
            mapper: SetpointMapper::new(config),
            estimator: AttitudeEstimator::new(config),
            stabilizer: CascadeStabilizer::with_config(&config.gains),
            mixer: Mixer::new(&config.motor, &QUAD_X),
            arm_switch: ArmSwitch::new(&config.arming),
            arm_state: ArmState::Disarmed,
            last_sample_at: None,
            topics: config.diagnostics,
            diagnostics: Diagnostics::default(),
        })
    }

    /// Applies an arm command. Disarming clears every integrator at once.
    ///
    /// Arming is refused while the estimate is provisional.
    pub fn command(&mut self, command: ArmCommand) {
        let next = self.arm_state.apply(command);
        if next == self.arm_state {
            return;
        }
        if next.is_armed() && self.estimator.estimate().provisional {
            log::warn!("arm refused, gyro bias still settling");
            return;
        }

        log::info!("{} -> {}", self.arm_state, next);
        if next == ArmState::Disarmed {
            self.stabilizer.reset();
        }
        self.arm_state = next;
    }

    /// Runs one tick and returns the motor command. `dt` is in seconds.
    pub fn tick(&mut self, inputs: &TickInputs, dt: T) -> MotorCommand<T> {
        let decoded = self.decoder.decode(&inputs.pulses, inputs.now_us);
        if let Some(command) = self.arm_switch.evaluate(&decoded) {
            self.command(command);
        }

        let fresh = inputs
            .sensor
            .filter(|sample| self.last_sample_at != Some(sample.at_us));
        let estimate = match fresh {
            Some(sample) => {
                self.last_sample_at = Some(sample.at_us);
                self.estimator.update(&sample.value, dt)
            }
            None => self.estimator.estimate(),
        };

        let setpoints = self.mapper.map_all(&decoded, self.arm_state);

        let torque = if self.arm_state.is_armed() {
            self.stabilizer.control(
                (setpoints.roll, setpoints.pitch, setpoints.yaw),
                (estimate.roll, estimate.pitch),
                (estimate.roll_rate, estimate.pitch_rate, estimate.yaw_rate),
                dt,
            )
        } else {
            (T::zero(), T::zero(), T::zero())
        };

        let motors = self.mixer.mix(setpoints.throttle, torque, self.arm_state);

        self.diagnostics = Diagnostics {
            ticks: self.diagnostics.ticks.wrapping_add(1),
            overruns: self.diagnostics.overruns,
            pulses_us: decoded.pulses_us,
            stale: decoded.stale,
            sensor_stale: fresh.is_none(),
            arm_state: self.arm_state,
            reading: self.estimator.reading(),
            estimate,
            setpoints,
            terms: if self.arm_state.is_armed() {
                self.stabilizer.terms()
            } else {
                CascadeTerms::default()
            },
            motors,
        };
        if !self.topics.is_empty() {
            self.diagnostics.trace(self.topics);
        }

        motors
    }

    /// Current arm state.
    pub fn arm_state(&self) -> ArmState {
        self.arm_state
    }

    /// Current attitude estimate.
    pub fn estimate(&self) -> AttitudeEstimate<T> {
        self.estimator.estimate()
    }

    /// Borrows the cascade, for inspecting integrators.
    pub fn stabilizer(&self) -> &CascadeStabilizer<T> {
        &self.stabilizer
    }

    /// Values of the last tick.
    pub fn diagnostics(&self) -> Diagnostics<T> {
        self.diagnostics
    }

    /// Records the scheduler overrun count for diagnostics.
    pub fn set_overruns(&mut self, overruns: u32) {
        self.diagnostics.overruns = overruns;
    }
}
