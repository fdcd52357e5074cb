// src/pid/axis.rs

//! # Single-Axis PID Module
//!
//! This module provides a compute function and control data structure
//! for one PID axis, plus [`PidAxis`], which owns the `piddiy` controller
//! together with its output limits, its integral enable condition and its
//! derivative history.
//!
//! The derivative is taken on the measurement, so a step in the setpoint
//! produces no derivative kick. Its sign is chosen so that with a constant
//! setpoint it equals the derivative of the error.

use crate::pid::PidAxisId;
use crate::Number;
use piddiy::PidController;

/// Condition under which an axis is allowed to accumulate its integral.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IntegralGate<T> {
    /// The integral always accumulates.
    Always,
    /// The integral accumulates only while `|gate input| < limit`.
    /// Used with the estimated angle of the axis.
    AngleBelow(T),
}

impl<T: Number> IntegralGate<T> {
    /// Whether the integrator may accumulate for the given gate input.
    pub fn allows(&self, input: T) -> bool {
        match *self {
            IntegralGate::Always => true,
            IntegralGate::AngleBelow(limit) => input.magnitude() < limit,
        }
    }
}

/// Tuning for one PID axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidAxisConfig<T> {
    /// Proportional gain.
    pub kp: T,
    /// Integral gain.
    pub ki: T,
    /// Derivative gain.
    pub kd: T,
    /// Lower output limit. Also bounds the integral contribution.
    pub min: T,
    /// Upper output limit. Also bounds the integral contribution.
    pub max: T,
    /// When the integral may accumulate.
    pub gate: IntegralGate<T>,
}

/// Control data for the single-axis compute callback.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisControlData<T> {
    /// The current measurement (angle or rate).
    pub measurement: T,
    /// The measurement seen on the previous evaluation.
    pub previous_measurement: T,
    /// The time delta since the last computation.
    pub dt: T,
    /// Bounds of the accumulated error so that `ki * integral` stays in the
    /// output limits.
    pub integral_bounds: (T, T),
    /// Whether the integral may accumulate on this evaluation. When false
    /// the integral is held at its current value.
    pub integrate: bool,
}

/// Single-axis PID compute callback.
pub fn compute_axis<T: Number>(
    pid: &mut PidController<T, AxisControlData<T>>,
    data: AxisControlData<T>,
) -> (T, T, T) {
    let error = pid.set_point - data.measurement;
    let integral = if data.integrate {
        let (low, high) = data.integral_bounds;
        (pid.integral + error * data.dt).clamp(low, high)
    } else {
        pid.integral
    };
    let derivative = if T::zero() < data.dt {
        (data.previous_measurement - data.measurement) / data.dt
    } else {
        T::zero()
    };

    (error, integral, derivative)
}

/// Bounds on the raw error integral that keep `ki * integral` inside
/// `[min, max]`. A zero gain leaves the output limits as bounds.
fn integral_bounds<T: Number>(ki: T, min: T, max: T) -> (T, T) {
    if T::zero() < ki {
        (min / ki, max / ki)
    } else if ki < T::zero() {
        (max / ki, min / ki)
    } else {
        (min, max)
    }
}

/// One PID axis: gains, limits, integrator and derivative history.
pub struct PidAxis<T: Number> {
    id: PidAxisId,
    pid: PidController<T, AxisControlData<T>>,
    min: T,
    max: T,
    integral_bounds: (T, T),
    gate: IntegralGate<T>,
    previous_measurement: Option<T>,
}

impl<T: Number> PidAxis<T> {
    /// Creates a new axis using the provided configuration.
    pub fn with_config(id: PidAxisId, config: &PidAxisConfig<T>) -> Self {
        let mut pid = PidController::new();
        pid.compute_fn(compute_axis)
            .set_point(T::zero())
            .kp(config.kp)
            .ki(config.ki)
            .kd(config.kd);

        PidAxis {
            id,
            pid,
            min: config.min,
            max: config.max,
            integral_bounds: integral_bounds(config.ki, config.min, config.max),
            gate: config.gate,
            previous_measurement: None,
        }
    }

    /// Evaluates the axis once and returns the clamped output.
    ///
    /// `gate_input` is the value checked by the integral enable condition,
    /// typically the estimated angle of the axis.
    pub fn update(&mut self, set_point: T, measurement: T, gate_input: T, dt: T) -> T {
        self.pid.set_point(set_point);
        let data = AxisControlData {
            measurement,
            previous_measurement: self.previous_measurement.unwrap_or(measurement),
            dt,
            integral_bounds: self.integral_bounds,
            integrate: self.gate.allows(gate_input),
        };
        let output = self.pid.compute(data);
        self.previous_measurement = Some(measurement);

        output.clamp(self.min, self.max)
    }

    /// Zeroes the integrator and forgets the derivative history.
    pub fn reset(&mut self) {
        self.pid.integral = T::zero();
        self.pid.error = T::zero();
        self.previous_measurement = None;
    }

    /// The accumulated error integral.
    pub fn integral(&self) -> T {
        self.pid.integral
    }

    /// The error seen on the last evaluation.
    pub fn last_error(&self) -> T {
        self.pid.error
    }

    /// Which axis this is.
    pub fn id(&self) -> PidAxisId {
        self.id
    }

    /// The `(min, max)` output limits.
    pub fn limits(&self) -> (T, T) {
        (self.min, self.max)
    }
}
