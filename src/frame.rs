//! Measurement-frame decoder.
//!
//! A Data (or Boot) response is exactly 100 bytes:
//!
//! ```text
//! +-------+-------+-------+-------+----------------------------------+
//! | 0..2  | 2..4  | 4..6  | 6..10 | 10..100                          |
//! | resp  | meas  | update| intvl | 6 axes x 3 bytes per sensor,     |
//! | status| status| count | (us)  | big-endian, 24-bit two's compl.  |
//! +-------+-------+-------+-------+----------------------------------+
//! ```
//!
//! Forces arrive in milli-newtons, torques in micro-newton-meters; the
//! decoder converts both to SI (N, N·m). The fixed 100-byte budget holds at
//! most five sensors (`5 * 18 + 10 == 100`); configurations asking for more
//! are rejected up front rather than silently truncated.

use crate::error::{Error, Result};

/// Exact length of a Data response.
pub const DATA_FRAME_LEN: usize = 100;

/// Most sensors a single Data frame can carry.
pub const MAX_SENSORS: usize = 5;

/// Axes per sensor: Fx, Fy, Fz, Tx, Ty, Tz.
pub const AXES: usize = 6;

const HEADER_LEN: usize = 10;
const BYTES_PER_AXIS: usize = 3;
const BYTES_PER_SENSOR: usize = AXES * BYTES_PER_AXIS;

/// Raw force counts are milli-newtons.
const FORCE_SCALE: f64 = 1000.0;
/// Raw torque counts are micro-newton-meters.
const TORQUE_SCALE: f64 = 100_000.0;

/// One 6-axis reading: forces in newtons, torques in newton-meters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorReading {
    pub fx: f64,
    pub fy: f64,
    pub fz: f64,
    pub tx: f64,
    pub ty: f64,
    pub tz: f64,
}

impl SensorReading {
    /// Axis values in wire order (Fx, Fy, Fz, Tx, Ty, Tz).
    pub fn as_array(&self) -> [f64; AXES] {
        [self.fx, self.fy, self.fz, self.tx, self.ty, self.tz]
    }

    /// Build a reading from axis values in wire order.
    pub fn from_array(axes: [f64; AXES]) -> Self {
        Self {
            fx: axes[0],
            fy: axes[1],
            fz: axes[2],
            tx: axes[3],
            ty: axes[4],
            tz: axes[5],
        }
    }
}

/// A decoded Data response: header metadata plus one reading per configured
/// sensor, in fixed 0-based sensor-index order.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementFrame {
    /// Measurement status word (bytes 2..4, big-endian).
    pub status: u16,
    /// Update counter (bytes 4..6, big-endian).
    pub counter: u16,
    /// Microseconds since the previous frame (bytes 6..10, big-endian).
    pub interval_us: u32,
    /// Decoded readings, one per configured sensor.
    pub readings: Vec<SensorReading>,
}

impl MeasurementFrame {
    /// Decode a 100-byte Data response into per-sensor readings.
    ///
    /// Callers must have rejected short or garbled responses already; the
    /// leading response-status pair (bytes 0..2) is the codec's concern.
    ///
    /// # Errors
    ///
    /// [`Error::Argument`] if `raw` is not exactly 100 bytes or `n_sensors`
    /// exceeds what the frame layout supports.
    pub fn decode(raw: &[u8], n_sensors: usize) -> Result<Self> {
        if raw.len() != DATA_FRAME_LEN {
            return Err(Error::Argument(format!(
                "data frame must be {DATA_FRAME_LEN} bytes, got {}",
                raw.len()
            )));
        }
        if n_sensors == 0 || n_sensors > MAX_SENSORS {
            return Err(Error::Argument(format!(
                "sensor count {n_sensors} outside 1..={MAX_SENSORS}"
            )));
        }

        let status = u16::from_be_bytes([raw[2], raw[3]]);
        let counter = u16::from_be_bytes([raw[4], raw[5]]);
        let interval_us = u32::from_be_bytes([raw[6], raw[7], raw[8], raw[9]]);

        let mut readings = Vec::with_capacity(n_sensors);
        for sensor in 0..n_sensors {
            let mut axes = [0.0; AXES];
            for (axis, value) in axes.iter_mut().enumerate() {
                let at = sensor * BYTES_PER_SENSOR + axis * BYTES_PER_AXIS + HEADER_LEN;
                let counts = read_s24(&raw[at..at + BYTES_PER_AXIS]);
                let scale = if axis < 3 { FORCE_SCALE } else { TORQUE_SCALE };
                *value = f64::from(counts) / scale;
            }
            readings.push(SensorReading::from_array(axes));
        }

        Ok(Self {
            status,
            counter,
            interval_us,
            readings,
        })
    }
}

/// Read a big-endian 24-bit two's-complement value.
///
/// Values at or above `0x800000` are reduced by `0x1000000`, mapping the
/// raw field onto `[-2^23, 2^23 - 1]`.
fn read_s24(bytes: &[u8]) -> i32 {
    let unsigned = (u32::from(bytes[0]) << 16) | (u32::from(bytes[1]) << 8) | u32::from(bytes[2]);
    if unsigned >= 0x80_0000 {
        unsigned as i32 - 0x100_0000
    } else {
        unsigned as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn write_s24(frame: &mut [u8], sensor: usize, axis: usize, value: i32) {
        let at = sensor * BYTES_PER_SENSOR + axis * BYTES_PER_AXIS + HEADER_LEN;
        let unsigned = (value as u32) & 0xFF_FFFF;
        frame[at] = (unsigned >> 16) as u8;
        frame[at + 1] = (unsigned >> 8) as u8;
        frame[at + 2] = unsigned as u8;
    }

    #[test]
    fn boundary_sign_extension() {
        assert_eq!(read_s24(&[0x80, 0x00, 0x00]), -8_388_608);
        assert_eq!(read_s24(&[0x7F, 0xFF, 0xFF]), 8_388_607);
        assert_eq!(read_s24(&[0x00, 0x00, 0x00]), 0);
        assert_eq!(read_s24(&[0xFF, 0xFF, 0xFF]), -1);
    }

    #[test]
    fn force_axis_scales_millinewtons() {
        let mut raw = [0u8; DATA_FRAME_LEN];
        write_s24(&mut raw, 0, 0, 1000);
        let frame = MeasurementFrame::decode(&raw, 1).unwrap();
        assert_relative_eq!(frame.readings[0].fx, 1.0);
    }

    #[test]
    fn torque_axis_scales_micronewtonmeters() {
        let mut raw = [0u8; DATA_FRAME_LEN];
        write_s24(&mut raw, 0, 5, 100_000);
        let frame = MeasurementFrame::decode(&raw, 1).unwrap();
        assert_relative_eq!(frame.readings[0].tz, 1.0);
    }

    #[test]
    fn header_fields_are_big_endian() {
        let mut raw = [0u8; DATA_FRAME_LEN];
        raw[2] = 0x01;
        raw[3] = 0x02;
        raw[4] = 0x03;
        raw[5] = 0x04;
        raw[6..10].copy_from_slice(&6000u32.to_be_bytes());
        let frame = MeasurementFrame::decode(&raw, 2).unwrap();
        assert_eq!(frame.status, 0x0102);
        assert_eq!(frame.counter, 0x0304);
        assert_eq!(frame.interval_us, 6000);
        assert_eq!(frame.readings.len(), 2);
    }

    #[test]
    fn sensor_layout_offsets() {
        let mut raw = [0u8; DATA_FRAME_LEN];
        // Sensor 3, axis 4 (Ty) lives at 3*18 + 4*3 + 10 = 76.
        write_s24(&mut raw, 3, 4, -200_000);
        let frame = MeasurementFrame::decode(&raw, 5).unwrap();
        assert_relative_eq!(frame.readings[3].ty, -2.0);
        assert_relative_eq!(frame.readings[2].ty, 0.0);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(MeasurementFrame::decode(&[0u8; 99], 1).is_err());
        assert!(MeasurementFrame::decode(&[0u8; 101], 1).is_err());
        assert!(MeasurementFrame::decode(&[], 1).is_err());
    }

    #[test]
    fn rejects_oversubscribed_sensor_count() {
        let raw = [0u8; DATA_FRAME_LEN];
        assert!(MeasurementFrame::decode(&raw, 6).is_err());
        assert!(MeasurementFrame::decode(&raw, 0).is_err());
        assert!(MeasurementFrame::decode(&raw, 5).is_ok());
    }

    proptest! {
        #[test]
        fn sign_extension_round_trips(value in -8_388_608i32..=8_388_607) {
            let unsigned = (value as u32) & 0xFF_FFFF;
            let bytes = [
                (unsigned >> 16) as u8,
                (unsigned >> 8) as u8,
                unsigned as u8,
            ];
            prop_assert_eq!(read_s24(&bytes), value);
        }
    }
}
