// src/estimator.rs

//! # Attitude Estimator
//!
//! Complementary filter over one 3-axis accelerometer and one 3-axis
//! gyroscope. Roll and pitch come from the gyro-integrated angle weighted by
//! `gyro_weight`, corrected towards the accelerometer tilt with the rest of
//! the weight. Yaw is a rate only.
//!
//! Axis convention: x forward, y left, z up, with the accelerometer reading
//! specific force (+1 g on z when level). Positive roll raises the left side
//! and equals gyro x. Positive pitch raises the nose, which is a negative
//! rotation about y, so the pitch rate is gyro y negated.
//!
//! The gyro bias is found by averaging the first `settle_samples` samples,
//! which assumes the airframe sits still after power-up. Estimates are
//! flagged provisional until then.

use num_traits::Float;

use crate::config::{EstimatorConfig, FlightConfig, SensorOffsets, SensorScale};
use crate::snapshot::{SnapshotCell, Stamped};
use crate::Real;

/// One raw inertial sample in sensor counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SensorSample {
    /// Accelerometer x, y, z.
    pub accel: [i16; 3],
    /// Gyroscope x, y, z.
    pub gyro: [i16; 3],
}

/// Calibrated sample in physical units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorReading<T> {
    /// Specific force in g.
    pub accel_g: [T; 3],
    /// Rotation rate in degrees per second, bias removed.
    pub gyro_dps: [T; 3],
}

/// Filtered attitude.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AttitudeEstimate<T> {
    /// Roll angle in degrees.
    pub roll: T,
    /// Pitch angle in degrees.
    pub pitch: T,
    /// Roll rate in degrees per second.
    pub roll_rate: T,
    /// Pitch rate in degrees per second.
    pub pitch_rate: T,
    /// Yaw rate in degrees per second.
    pub yaw_rate: T,
    /// True while the gyro bias is still being measured.
    pub provisional: bool,
}

/// Latest sensor sample shared between the sensor-ready interrupt and the
/// tick.
pub struct SensorInput {
    cell: SnapshotCell<Option<Stamped<SensorSample>>>,
}

impl SensorInput {
    /// Creates an empty input.
    pub const fn new() -> Self {
        SensorInput {
            cell: SnapshotCell::new(None),
        }
    }

    /// Publishes a sample read at `at_us`.
    pub fn publish(&self, sample: SensorSample, at_us: u32) {
        self.cell.publish(Some(Stamped {
            value: sample,
            at_us,
        }));
    }

    /// The latest sample, if any has been published.
    pub fn snapshot(&self) -> Option<Stamped<SensorSample>> {
        self.cell.snapshot()
    }
}

impl Default for SensorInput {
    fn default() -> Self {
        Self::new()
    }
}

/// Complementary filter state.
pub struct AttitudeEstimator<T> {
    offsets: SensorOffsets,
    scale: SensorScale<T>,
    config: EstimatorConfig<T>,
    bias: [T; 3],
    bias_sum: [T; 3],
    bias_samples: u32,
    reading: SensorReading<T>,
    estimate: AttitudeEstimate<T>,
    seeded: bool,
}

impl<T: Real> AttitudeEstimator<T> {
    /// Creates an estimator with no history.
    pub fn new(config: &FlightConfig<T>) -> Self {
        AttitudeEstimator {
            offsets: config.offsets,
            scale: config.scale,
            config: config.estimator,
            bias: [T::zero(); 3],
            bias_sum: [T::zero(); 3],
            bias_samples: 0,
            reading: SensorReading {
                accel_g: [T::zero(); 3],
                gyro_dps: [T::zero(); 3],
            },
            estimate: AttitudeEstimate {
                roll: T::zero(),
                pitch: T::zero(),
                roll_rate: T::zero(),
                pitch_rate: T::zero(),
                yaw_rate: T::zero(),
                provisional: config.estimator.settle_samples > 0,
            },
            seeded: false,
        }
    }

    /// Removes offsets and scales a raw sample. Gyro bias is not removed.
    pub fn calibrate(&self, sample: &SensorSample) -> SensorReading<T> {
        let mut reading = SensorReading {
            accel_g: [T::zero(); 3],
            gyro_dps: [T::zero(); 3],
        };
        for axis in 0..3 {
            let accel = i32::from(sample.accel[axis]) - i32::from(self.offsets.accel[axis]);
            let gyro = i32::from(sample.gyro[axis]) - i32::from(self.offsets.gyro[axis]);
            reading.accel_g[axis] = T::from_count(accel) / self.scale.accel_counts_per_g;
            reading.gyro_dps[axis] = T::from_count(gyro) / self.scale.gyro_counts_per_dps;
        }
        reading
    }

    /// Folds one sample into the estimate. `dt` is in seconds.
    pub fn update(&mut self, sample: &SensorSample, dt: T) -> AttitudeEstimate<T> {
        let mut reading = self.calibrate(sample);
        self.settle_bias(&reading.gyro_dps);
        for (rate, bias) in reading.gyro_dps.iter_mut().zip(self.bias) {
            *rate = *rate - bias;
        }

        let [ax, ay, az] = reading.accel_g;
        let [gx, gy, gz] = reading.gyro_dps;
        let pitch_rate = -gy;
        let accel_roll = ay.atan2(az).to_degrees();
        let accel_pitch = ax.atan2((ay * ay + az * az).sqrt()).to_degrees();

        let (roll, pitch) = if self.seeded {
            let gyro_roll = self.estimate.roll + gx * dt;
            let gyro_pitch = self.estimate.pitch + pitch_rate * dt;
            if self.accel_trusted(&reading.accel_g) {
                let weight = self.config.gyro_weight;
                let rest = T::one() - weight;
                (
                    weight * gyro_roll + rest * accel_roll,
                    weight * gyro_pitch + rest * accel_pitch,
                )
            } else {
                (gyro_roll, gyro_pitch)
            }
        } else {
            self.seeded = true;
            (accel_roll, accel_pitch)
        };

        self.reading = reading;
        self.estimate = AttitudeEstimate {
            roll,
            pitch,
            roll_rate: gx,
            pitch_rate,
            yaw_rate: gz,
            provisional: self.bias_samples < self.config.settle_samples,
        };
        self.estimate
    }

    /// The last estimate.
    pub fn estimate(&self) -> AttitudeEstimate<T> {
        self.estimate
    }

    /// The last calibrated sample, bias removed.
    pub fn reading(&self) -> SensorReading<T> {
        self.reading
    }

    /// The gyro bias in degrees per second, zero until settled.
    pub fn gyro_bias(&self) -> [T; 3] {
        self.bias
    }

    fn accel_trusted(&self, accel_g: &[T; 3]) -> bool {
        let [ax, ay, az] = *accel_g;
        let norm = (ax * ax + ay * ay + az * az).sqrt();
        Float::abs(norm - T::one()) <= self.config.accel_trust_band
    }

    fn settle_bias(&mut self, gyro_dps: &[T; 3]) {
        if self.bias_samples >= self.config.settle_samples {
            return;
        }
        for (sum, rate) in self.bias_sum.iter_mut().zip(gyro_dps) {
            *sum = *sum + *rate;
        }
        self.bias_samples += 1;

        if self.bias_samples == self.config.settle_samples {
            let count = T::from_count(self.bias_samples as i32);
            for (bias, sum) in self.bias.iter_mut().zip(self.bias_sum) {
                *bias = sum / count;
            }
            log::debug!(
                "gyro bias settled after {} samples: {:?}",
                self.bias_samples,
                self.bias
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    const ONE_G: i16 = 16384;

    fn config(settle_samples: u32) -> FlightConfig<f32> {
        let mut config = FlightConfig::new();
        config.offsets = SensorOffsets::default();
        config.estimator.settle_samples = settle_samples;
        config
    }

    fn level() -> SensorSample {
        SensorSample {
            accel: [0, 0, ONE_G],
            gyro: [0, 0, 0],
        }
    }

    #[test]
    fn test_estimator_calibration_subtracts_offsets() {
        let estimator = AttitudeEstimator::new(&FlightConfig::<f32>::new());
        let sample = SensorSample {
            accel: [-2293, -1334, 1828 + ONE_G],
            gyro: [45 + 131, 0, -45 - 262],
        };
        let reading = estimator.calibrate(&sample);

        assert!(vector_close(
            (0.0, 0.0, 1.0),
            (reading.accel_g[0], reading.accel_g[1], reading.accel_g[2])
        ));
        assert!(vector_close(
            (1.0, 0.0, -2.0),
            (reading.gyro_dps[0], reading.gyro_dps[1], reading.gyro_dps[2])
        ));
    }

    #[test]
    fn test_estimator_calibration_does_not_overflow() {
        let mut config = config(0);
        config.offsets.accel = [i16::MIN, 0, 0];
        let estimator = AttitudeEstimator::new(&config);
        let sample = SensorSample {
            accel: [i16::MAX, 0, 0],
            gyro: [0, 0, 0],
        };
        let reading = estimator.calibrate(&sample);
        assert!(value_close(65535.0 / 16384.0, reading.accel_g[0]));
    }

    #[test]
    fn test_estimator_first_sample_seeds_from_accel() {
        let mut estimator = AttitudeEstimator::new(&config(0));
        // 30 degrees of roll: ay = sin 30, az = cos 30
        let sample = SensorSample {
            accel: [0, 8192, 14189],
            gyro: [0, 0, 0],
        };
        let estimate = estimator.update(&sample, 0.004);
        assert!((30.0 - estimate.roll).abs() < 0.01);
        assert!(value_close(0.0, estimate.pitch));
        assert!(!estimate.provisional);
    }

    #[test]
    fn test_estimator_pitch_geometry() {
        let mut estimator = AttitudeEstimator::new(&config(0));
        // nose up: specific force leans onto +x
        let sample = SensorSample {
            accel: [8192, 0, 14189],
            gyro: [0, 0, 0],
        };
        let estimate = estimator.update(&sample, 0.004);
        assert!((30.0 - estimate.pitch).abs() < 0.01);
        assert!(value_close(0.0, estimate.roll));

        // nose coming up is a negative rate about y
        let sample = SensorSample {
            accel: [8192, 0, 14189],
            gyro: [0, -131, 0],
        };
        let estimate = estimator.update(&sample, 0.004);
        assert!(value_close(1.0, estimate.pitch_rate));
    }

    #[test]
    fn test_estimator_level_and_still() {
        let mut estimator = AttitudeEstimator::new(&config(0));
        for _ in 0..100 {
            let estimate = estimator.update(&level(), 0.004);
            assert!(vector_close((0.0, 0.0, 0.0), (estimate.roll, estimate.pitch, estimate.yaw_rate)));
        }
    }

    #[test]
    fn test_estimator_complementary_blend() {
        let mut estimator = AttitudeEstimator::new(&config(0));
        let _ = estimator.update(&level(), 0.004);

        // 131 counts = 1 deg/s of roll for one second, accel still level
        let sample = SensorSample {
            accel: [0, 0, ONE_G],
            gyro: [131, 0, 262],
        };
        let estimate = estimator.update(&sample, 1.0);
        assert!(value_close(0.98, estimate.roll));
        assert!(value_close(1.0, estimate.roll_rate));
        assert!(value_close(2.0, estimate.yaw_rate));
    }

    #[test]
    fn test_estimator_converges_to_accel_tilt() {
        let mut estimator = AttitudeEstimator::new(&config(0));
        let _ = estimator.update(&level(), 0.004);
        let tilted = SensorSample {
            accel: [0, 8192, 14189],
            gyro: [0, 0, 0],
        };
        let mut estimate = estimator.estimate();
        for _ in 0..2000 {
            estimate = estimator.update(&tilted, 0.004);
        }
        assert!((30.0 - estimate.roll).abs() < 0.05);
    }

    #[test]
    fn test_estimator_skips_accel_under_acceleration() {
        let mut estimator = AttitudeEstimator::new(&config(0));
        let _ = estimator.update(&level(), 0.004);

        // 1.5 g pulling sideways: outside the trust band
        let sample = SensorSample {
            accel: [0, 16384, 16384],
            gyro: [0, 0, 0],
        };
        for _ in 0..100 {
            let estimate = estimator.update(&sample, 0.004);
            assert!(value_close(0.0, estimate.roll), "Accel correction should be skipped.");
        }
    }

    #[test]
    fn test_estimator_gyro_bias_settles() {
        let mut estimator = AttitudeEstimator::new(&config(10));
        let drifting = SensorSample {
            accel: [0, 0, ONE_G],
            gyro: [262, 0, -131],
        };
        for _ in 0..9 {
            let estimate = estimator.update(&drifting, 0.004);
            assert!(estimate.provisional);
        }
        let estimate = estimator.update(&drifting, 0.004);
        assert!(!estimate.provisional);
        assert!(vector_close(
            (2.0, 0.0, -1.0),
            (estimator.gyro_bias()[0], estimator.gyro_bias()[1], estimator.gyro_bias()[2])
        ));
        assert!(vector_close(
            (0.0, 0.0, 0.0),
            (estimate.roll_rate, estimate.pitch_rate, estimate.yaw_rate)
        ));

        let estimate = estimator.update(&drifting, 0.004);
        assert!(value_close(0.0, estimate.yaw_rate));
    }

    #[test]
    fn test_sensor_input_snapshot() {
        let input = SensorInput::new();
        assert_eq!(None, input.snapshot());
        input.publish(level(), 4000);
        assert_eq!(
            Some(Stamped {
                value: level(),
                at_us: 4000
            }),
            input.snapshot()
        );
    }
}
