use nix::time::{clock_gettime, ClockId};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

/// Handle the accelerometer reports under
pub const SENSOR_ID_ACCEL: i32 = 0;

// Sensor type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorType {
    Accelerometer,
}

/// One completed accelerometer sample
///
/// `data` holds x, y, z after the driver's axis remap and scaling. The
/// translator keeps a single pending instance and hands out copies, so a
/// reading already returned to the caller never changes under it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub version: i32,
    pub sensor: i32,
    pub sensor_type: SensorType,
    pub data: [f32; 3],
    /// Nanoseconds
    pub timestamp: i64,
}

impl SensorReading {
    pub fn accelerometer() -> Self {
        Self {
            version: std::mem::size_of::<Self>() as i32,
            sensor: SENSOR_ID_ACCEL,
            sensor_type: SensorType::Accelerometer,
            data: [0.0; 3],
            timestamp: 0,
        }
    }

    pub fn x(&self) -> f32 {
        self.data[0]
    }

    pub fn y(&self) -> f32 {
        self.data[1]
    }

    pub fn z(&self) -> f32 {
        self.data[2]
    }
}

impl Default for SensorReading {
    fn default() -> Self {
        Self::accelerometer()
    }
}

/// Per-axis conversion from raw device counts to physical units
///
/// Keyed by the kernel axis the value came from, not by output slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisScale {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl AxisScale {
    pub const fn unity() -> Self {
        Self {
            x: 1.0,
            y: 1.0,
            z: 1.0,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Default for AxisScale {
    fn default() -> Self {
        Self::unity()
    }
}

/// Current CLOCK_MONOTONIC time in nanoseconds
pub fn monotonic_now_ns() -> i64 {
    match clock_gettime(ClockId::CLOCK_MONOTONIC) {
        Ok(ts) => ts.tv_sec() as i64 * 1_000_000_000 + ts.tv_nsec() as i64,
        Err(e) => {
            warn!("clock_gettime(CLOCK_MONOTONIC) failed: {}", e);
            0
        }
    }
}

/// Event time as nanoseconds on whatever clock the kernel stamped it with
///
/// evdev reports record times as an offset from `UNIX_EPOCH`, so this
/// recovers the raw `timeval` regardless of the node's clock id.
pub fn system_time_to_ns(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(since) => i64::try_from(since.as_nanos()).unwrap_or(i64::MAX),
        Err(e) => i64::try_from(e.duration().as_nanos()).map_or(i64::MIN, |ns| -ns),
    }
}
