// src/lib.rs

//! # Cascaded Flight Stabilization Core
//!
//! A `no_std`, no-alloc attitude-stabilization core for quadrotors. Raw
//! receiver pulses and raw inertial samples go in, four motor levels come
//! out, once per control tick:
//!
//! - [`receiver`] decodes pulse widths, rejecting glitches and flagging
//!   silent channels,
//! - [`estimator`] fuses accelerometer and gyroscope into roll and pitch,
//! - [`setpoint`] maps sticks into angle, rate and throttle setpoints,
//! - [`stabilizer`] runs the cascaded angle/rate PID loops built on
//!   [`pid`],
//! - [`mixer`] turns throttle and torques into motor levels, gated by
//!   [`arming`],
//! - [`scheduler`] runs all of it at a fixed period.
//!
//! Configuration lives in one validated [`FlightConfig`]. The PID and
//! mixing stages are generic over [`Number`] and also run on fixed-point
//! types.

#![cfg_attr(not(test), no_std)]
#![deny(missing_docs)]

pub mod arming;
pub mod config;
pub mod controller;
pub mod diagnostics;
pub mod error;
pub mod estimator;
pub mod mixer;
pub mod pid;
pub mod receiver;
pub mod scheduler;
pub mod setpoint;
pub mod snapshot;
pub mod stabilizer;

#[doc(inline)]
pub use stabilizer::*;

pub use arming::{ArmCommand, ArmState};
pub use config::FlightConfig;
pub use controller::FlightController;
pub use diagnostics::{DiagnosticTopics, Diagnostics};
pub use error::ConfigError;
pub use mixer::{MotorCommand, MotorOutput};
pub use scheduler::ControlLoop;

#[cfg(test)]
mod test_utils;
