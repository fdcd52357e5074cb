// demos/hover.rs

//! Closes the loop around a toy rigid-body plant: arms with the aux switch,
//! spools up, holds a 10 degree roll command for a second and releases it.

use cascade_flight_core::estimator::{SensorInput, SensorSample};
use cascade_flight_core::receiver::{Channel, ReceiverInputs};
use cascade_flight_core::{ControlLoop, FlightConfig, MotorCommand, MotorOutput};

/// Roll and pitch angular acceleration per unit of differential level,
/// in deg/s^2.
const TORQUE_GAIN: f32 = 40.0;
/// Rate damping of the airframe, 1/s.
const DRAG: f32 = 2.0;

static RECEIVER: ReceiverInputs = ReceiverInputs::new();
static SENSOR: SensorInput = SensorInput::new();

#[derive(Default)]
struct Plant {
    roll: f32,
    pitch: f32,
    roll_rate: f32,
    pitch_rate: f32,
    motors: MotorCommand<f32>,
}

impl Plant {
    fn step(&mut self, dt: f32) {
        let [fl, fr, rr, rl] = self.motors.levels;
        let roll_torque = ((fl + rl) - (fr + rr)) / 4.0;
        let pitch_torque = ((fl + fr) - (rr + rl)) / 4.0;

        self.roll_rate += (TORQUE_GAIN * roll_torque - DRAG * self.roll_rate) * dt;
        self.pitch_rate += (TORQUE_GAIN * pitch_torque - DRAG * self.pitch_rate) * dt;
        self.roll += self.roll_rate * dt;
        self.pitch += self.pitch_rate * dt;
    }

    /// What the IMU would report, with the reference offsets added back.
    fn sample(&self) -> SensorSample {
        let (roll, pitch) = (self.roll.to_radians(), self.pitch.to_radians());
        let g = 16384.0;
        let ax = pitch.sin() * g;
        let ay = pitch.cos() * roll.sin() * g;
        let az = pitch.cos() * roll.cos() * g;
        SensorSample {
            accel: [
                (ax - 2293.0) as i16,
                (ay - 1334.0) as i16,
                (az + 1828.0) as i16,
            ],
            gyro: [
                (self.roll_rate * 131.0 + 45.0) as i16,
                (-self.pitch_rate * 131.0) as i16,
                -45,
            ],
        }
    }
}

struct PlantMotors<'a>(&'a std::cell::RefCell<Plant>);

impl MotorOutput<f32> for PlantMotors<'_> {
    fn write(&mut self, command: &MotorCommand<f32>) {
        self.0.borrow_mut().motors = *command;
    }
}

fn pilot(t_ms: u32) -> [(Channel, u16); 5] {
    let aux = if t_ms < 100 { 1000 } else { 2000 };
    let throttle = if t_ms < 200 { 1000 } else { 1500 };
    let roll = if (1000..2000).contains(&t_ms) { 1712 } else { 1495 };
    [
        (Channel::Throttle, throttle),
        (Channel::Roll, roll),
        (Channel::Pitch, 1495),
        (Channel::Yaw, 1495),
        (Channel::Aux1, aux),
    ]
}

fn main() {
    let mut config = FlightConfig::<f32>::new();
    // the toy plant is perfectly still at power-up, skip most of the settling
    config.estimator.settle_samples = 20;

    let plant = std::cell::RefCell::new(Plant::default());
    let mut control = match ControlLoop::new(&config, &RECEIVER, &SENSOR, PlantMotors(&plant)) {
        Ok(control) => control,
        Err(error) => {
            eprintln!("invalid configuration: {}", error);
            return;
        }
    };

    println!("    t,     roll,    pitch,  armed,  motors");
    for t_ms in 0..3000_u32 {
        let now_us = t_ms * 1000;
        for (channel, width) in pilot(t_ms) {
            RECEIVER.publish_pulse(channel, width, now_us);
        }
        SENSOR.publish(plant.borrow().sample(), now_us);

        let ticked = control.poll(now_us).is_some();
        plant.borrow_mut().step(0.001);

        if ticked && t_ms % 100 == 0 {
            let diagnostics = control.diagnostics();
            println!(
                "{:5.2}, {:8.3}, {:8.3}, {:>6}, {:?}",
                t_ms as f32 / 1000.0,
                diagnostics.estimate.roll,
                diagnostics.estimate.pitch,
                diagnostics.arm_state,
                diagnostics.motors.levels
            );
        }
    }
}
