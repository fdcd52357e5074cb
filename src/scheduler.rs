// src/scheduler.rs

//! # Control Scheduler
//!
//! [`TickScheduler`] decides when a tick is due on a free-running, wrapping
//! microsecond clock. [`ControlLoop`] ties it to the shared inputs, the
//! [`FlightController`] and the motor driver, so board glue only has to call
//! [`ControlLoop::poll`] from its main loop.
//!
//! A tick that starts a full period or more late is an overrun: it is
//! counted, the missed ticks are dropped and the schedule restarts from now.

use crate::arming::ArmCommand;
use crate::config::FlightConfig;
use crate::controller::{FlightController, TickInputs};
use crate::diagnostics::Diagnostics;
use crate::error::ConfigError;
use crate::estimator::SensorInput;
use crate::mixer::{MotorCommand, MotorOutput};
use crate::receiver::ReceiverInputs;
use crate::snapshot::elapsed_us;
use crate::Real;

/// Timing of one due tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickTiming {
    /// Measured interval since the previous tick, clamped to
    /// `[period / 2, 2 * period]`.
    pub dt_us: u32,
    /// How far past its deadline the tick started.
    pub late_us: u32,
    /// Whether this tick was an overrun.
    pub overrun: bool,
}

impl TickTiming {
    /// `dt_us` in seconds.
    pub fn dt<T: Real>(&self) -> T {
        T::from_count(self.dt_us as i32) / T::lit(1.0e6)
    }
}

/// Fixed-period deadline tracker.
#[derive(Debug, Clone, Copy)]
pub struct TickScheduler {
    period_us: u32,
    next_deadline: Option<u32>,
    last_tick: u32,
    overruns: u32,
}

impl TickScheduler {
    /// Creates a scheduler whose first poll is always due.
    pub fn new(period_us: u32) -> Self {
        TickScheduler {
            period_us,
            next_deadline: None,
            last_tick: 0,
            overruns: 0,
        }
    }

    /// Returns the tick timing when a tick is due at `now_us`.
    pub fn poll(&mut self, now_us: u32) -> Option<TickTiming> {
        let period = self.period_us;

        let Some(deadline) = self.next_deadline else {
            self.next_deadline = Some(now_us.wrapping_add(period));
            self.last_tick = now_us;
            return Some(TickTiming {
                dt_us: period,
                late_us: 0,
                overrun: false,
            });
        };

        let late_us = elapsed_us(now_us, deadline);
        if late_us > u32::MAX / 2 {
            // deadline still ahead
            return None;
        }

        let overrun = late_us >= period;
        if overrun {
            self.overruns = self.overruns.wrapping_add(1);
            log::warn!("control tick {} us late, skipping missed ticks", late_us);
            self.next_deadline = Some(now_us.wrapping_add(period));
        } else {
            self.next_deadline = Some(deadline.wrapping_add(period));
        }

        let interval = elapsed_us(now_us, self.last_tick);
        self.last_tick = now_us;

        Some(TickTiming {
            dt_us: interval.clamp(period / 2, period.saturating_mul(2)),
            late_us,
            overrun,
        })
    }

    /// Overruns counted so far.
    pub fn overruns(&self) -> u32 {
        self.overruns
    }

    /// The tick period.
    pub fn period_us(&self) -> u32 {
        self.period_us
    }
}

/// The complete control loop: scheduler, controller, shared inputs and the
/// motor driver.
pub struct ControlLoop<'a, T: Real, M: MotorOutput<T>> {
    scheduler: TickScheduler,
    controller: FlightController<T>,
    receiver: &'a ReceiverInputs,
    sensor: &'a SensorInput,
    output: M,
}

impl<'a, T: Real, M: MotorOutput<T>> ControlLoop<'a, T, M> {
    /// Validates `config` and assembles a disarmed loop.
    pub fn new(
        config: &FlightConfig<T>,
        receiver: &'a ReceiverInputs,
        sensor: &'a SensorInput,
        output: M,
    ) -> Result<Self, ConfigError> {
        Ok(ControlLoop {
            scheduler: TickScheduler::new(config.scheduler.period_us),
            controller: FlightController::new(config)?,
            receiver,
            sensor,
            output,
        })
    }

    /// Runs one tick if one is due, writes the motors and returns what was
    /// written.
    pub fn poll(&mut self, now_us: u32) -> Option<MotorCommand<T>> {
        let timing = self.scheduler.poll(now_us)?;

        let inputs = TickInputs {
            pulses: self.receiver.snapshot(),
            sensor: self.sensor.snapshot(),
            now_us,
        };
        let command = self.controller.tick(&inputs, timing.dt());
        self.controller.set_overruns(self.scheduler.overruns());
        self.output.write(&command);

        Some(command)
    }

    /// Forwards an arm command to the controller.
    pub fn command(&mut self, command: ArmCommand) {
        self.controller.command(command);
    }

    /// Values of the last tick.
    pub fn diagnostics(&self) -> Diagnostics<T> {
        self.controller.diagnostics()
    }

    /// Borrows the controller.
    pub fn controller(&self) -> &FlightController<T> {
        &self.controller
    }

    /// Borrows the motor driver.
    pub fn output(&self) -> &M {
        &self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arming::ArmState;
    use crate::estimator::SensorSample;
    use crate::receiver::Channel;
    use crate::test_utils::*;

    #[test]
    fn test_scheduler_fixed_period() {
        let mut scheduler = TickScheduler::new(4000);
        assert!(scheduler.poll(100).is_some());
        assert_eq!(None, scheduler.poll(2000));
        assert_eq!(None, scheduler.poll(4099));

        let timing = scheduler.poll(4100);
        assert_eq!(
            Some(TickTiming {
                dt_us: 4000,
                late_us: 0,
                overrun: false
            }),
            timing
        );

        // a little late: next deadline stays on the grid
        let timing = scheduler.poll(8600);
        assert_eq!(Some(500), timing.map(|t| t.late_us));
        assert_eq!(None, scheduler.poll(12_000));
        assert!(scheduler.poll(12_100).is_some());
        assert_eq!(0, scheduler.overruns());
    }

    #[test]
    fn test_scheduler_overrun_drops_missed_ticks() {
        let mut scheduler = TickScheduler::new(4000);
        let _ = scheduler.poll(0);

        let timing = scheduler.poll(20_000);
        assert_eq!(
            Some(TickTiming {
                dt_us: 8000,
                late_us: 16_000,
                overrun: true
            }),
            timing
        );
        assert_eq!(1, scheduler.overruns());

        // no catch-up burst
        assert_eq!(None, scheduler.poll(20_001));
        assert_eq!(None, scheduler.poll(23_999));
        let timing = scheduler.poll(24_000);
        assert_eq!(Some(false), timing.map(|t| t.overrun));
    }

    #[test]
    fn test_scheduler_dt_clamped() {
        let mut scheduler = TickScheduler::new(4000);
        let _ = scheduler.poll(0);
        let timing = scheduler.poll(4000);
        assert_eq!(Some(4000), timing.map(|t| t.dt_us));
        assert!(value_close(0.004, timing.map(|t| t.dt::<f32>()).unwrap_or(0.0)));
    }

    #[test]
    fn test_scheduler_clock_wrap() {
        let start = u32::MAX - 1000;
        let mut scheduler = TickScheduler::new(4000);
        let _ = scheduler.poll(start);
        assert_eq!(None, scheduler.poll(start.wrapping_add(3999)));
        let timing = scheduler.poll(start.wrapping_add(4000));
        assert_eq!(Some(4000), timing.map(|t| t.dt_us));
        assert_eq!(0, scheduler.overruns());
    }

    #[derive(Default)]
    struct Recorder {
        writes: usize,
        last: MotorCommand<f32>,
    }

    impl MotorOutput<f32> for Recorder {
        fn write(&mut self, command: &MotorCommand<f32>) {
            self.writes += 1;
            self.last = *command;
        }
    }

    #[test]
    fn test_control_loop_runs_ticks_from_shared_inputs() {
        let receiver = ReceiverInputs::new();
        let sensor = SensorInput::new();
        let mut config = FlightConfig::<f32>::new();
        config.offsets = Default::default();
        config.estimator.settle_samples = 0;
        let mut control = ControlLoop::new(&config, &receiver, &sensor, Recorder::default())
            .expect("valid config");

        let level = SensorSample {
            accel: [0, 0, 16384],
            gyro: [0, 0, 0],
        };
        let mut armed_once = false;
        for step in 0..100_u32 {
            let now = step * 1000;
            sensor.publish(level, now);
            for channel in Channel::ALL {
                let width = match channel {
                    Channel::Throttle => 1950,
                    Channel::Aux1 => 1000,
                    _ => 1495,
                };
                receiver.publish_pulse(channel, width, now);
            }
            if step == 10 && !armed_once {
                control.command(ArmCommand::Arm);
                armed_once = true;
            }
            let _ = control.poll(now);
        }

        // one tick every 4 ms over 100 ms
        assert_eq!(25, control.output().writes);
        assert_eq!(ArmState::Armed, control.controller().arm_state());
        assert_eq!([179.0; 4], control.output().last.levels);
        assert_eq!(0, control.diagnostics().overruns);
    }

    #[test]
    fn test_control_loop_counts_overruns() {
        let receiver = ReceiverInputs::new();
        let sensor = SensorInput::new();
        let config = FlightConfig::<f32>::new();
        let mut control = ControlLoop::new(&config, &receiver, &sensor, Recorder::default())
            .expect("valid config");

        assert!(control.poll(0).is_some());
        assert!(control.poll(50_000).is_some());
        assert_eq!(1, control.diagnostics().overruns);
        assert_eq!([0.0; 4], control.output().last.levels);
    }
}
