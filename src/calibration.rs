//! Contact-aware zero-offset calibration.
//!
//! The sensors drift, so the driver keeps an online estimate of the no-load
//! baseline and subtracts it from every decoded reading. The estimator must
//! not chase a real applied load: a cheap contact heuristic (cumulative
//! sensed magnitude over a small threshold, outside the device's early
//! warm-up regime) freezes accumulation while a load is present, and the
//! baseline re-zeroes from quiescent samples only.
//!
//! The per-cycle ordering is deliberate: the correction returned for a cycle
//! always uses the offset as it stood *before* that cycle's update, so a
//! freshly committed baseline never applies to the samples that produced it.

use crate::frame::{SensorReading, AXES};

/// Cumulative sensed force/torque magnitude above which a mechanical load is
/// assumed present.
pub const CONTACT_THRESHOLD: f64 = 0.1;

/// Frames arriving faster than this are treated as the device's early
/// warm-up regime and always accumulated.
pub const WARMUP_INTERVAL_US: u32 = 5000;

/// A new offset is committed once the sample counter exceeds this.
pub const SAMPLES_PER_COMMIT: u32 = 300;

/// Rolling zero-offset state for one controller instance.
///
/// Shape invariant: the sum and offset matrices are always
/// `n_sensors x 6`. Created zeroed at controller construction and mutated
/// once per measurement cycle for the controller's lifetime.
#[derive(Debug, Clone)]
pub struct ZeroOffset {
    sums: Vec<[f64; AXES]>,
    offset: Vec<[f64; AXES]>,
    n_samples: u32,
    contact: bool,
}

impl ZeroOffset {
    /// Zeroed calibration state for `n_sensors` sensors.
    pub fn new(n_sensors: usize) -> Self {
        Self {
            sums: vec![[0.0; AXES]; n_sensors],
            offset: vec![[0.0; AXES]; n_sensors],
            n_samples: 0,
            contact: false,
        }
    }

    /// Run one calibration cycle and return the corrected readings.
    ///
    /// `interval_us` is the time since the previous frame as reported by the
    /// device; the engine never times itself. The returned values are
    /// `raw - offset` using the offset from before this cycle's update.
    pub fn apply(&mut self, raw: &[SensorReading], interval_us: u32) -> Vec<SensorReading> {
        debug_assert_eq!(raw.len(), self.offset.len());

        // Step 1: sense against the pre-update offset. This is also the
        // corrected output for the cycle.
        let mut sensed_total = 0.0;
        let corrected: Vec<SensorReading> = raw
            .iter()
            .zip(&self.offset)
            .map(|(reading, offset)| {
                let mut axes = reading.as_array();
                for (value, off) in axes.iter_mut().zip(offset) {
                    *value -= off;
                    sensed_total += *value;
                }
                SensorReading::from_array(axes)
            })
            .collect();

        // Step 2: contact is recomputed fresh every cycle, never sticky.
        self.contact = sensed_total.abs() > CONTACT_THRESHOLD && interval_us > WARMUP_INTERVAL_US;

        // Steps 3/4: accumulate quiescent samples; freeze under load.
        if interval_us <= WARMUP_INTERVAL_US || !self.contact {
            for (sums, reading) in self.sums.iter_mut().zip(raw) {
                for (sum, value) in sums.iter_mut().zip(reading.as_array()) {
                    *sum += value;
                }
            }
            self.n_samples += 1;

            if self.n_samples > SAMPLES_PER_COMMIT {
                let count = f64::from(self.n_samples);
                for (offset, sums) in self.offset.iter_mut().zip(self.sums.iter_mut()) {
                    for (off, sum) in offset.iter_mut().zip(sums.iter_mut()) {
                        *off = *sum / count;
                        *sum = 0.0;
                    }
                }
                self.n_samples = 0;
            }
        }

        corrected
    }

    /// The current committed offset matrix, one row per sensor.
    pub fn offset(&self) -> &[[f64; AXES]] {
        &self.offset
    }

    /// Whether the last cycle's contact heuristic fired.
    pub fn contact(&self) -> bool {
        self.contact
    }

    #[cfg(test)]
    fn n_samples(&self) -> u32 {
        self.n_samples
    }

    #[cfg(test)]
    fn sums(&self) -> &[[f64; AXES]] {
        &self.sums
    }
}
