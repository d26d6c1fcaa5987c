//! Initial reading from the device's current absolute-axis state
//!
//! Streamed frames only arrive after the next poll period, so on enable the
//! last known values are queried directly from the event node to give the
//! caller something sane right away.

use evdev::{AbsoluteAxisCode, Device};
use std::fmt;
use std::io;
use tracing::debug;

use super::reading::{AxisScale, SensorReading};

/// Direct query of an axis's last absolute value
pub trait AbsQuery: Send + fmt::Debug {
    fn abs_value(&mut self, axis: AbsoluteAxisCode) -> io::Result<i32>;
}

/// Absolute-axis state read from the event node
pub struct EvdevAbsQuery {
    device: Device,
}

impl EvdevAbsQuery {
    pub fn new(device: Device) -> Self {
        Self { device }
    }
}

impl fmt::Debug for EvdevAbsQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvdevAbsQuery")
            .field("name", &self.device.name())
            .finish()
    }
}

impl AbsQuery for EvdevAbsQuery {
    fn abs_value(&mut self, axis: AbsoluteAxisCode) -> io::Result<i32> {
        let supported = self
            .device
            .supported_absolute_axes()
            .is_some_and(|axes| axes.contains(axis));
        if !supported {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("device does not report {:?}", axis),
            ));
        }

        let state = self.device.get_abs_state()?;
        state
            .get(axis.0 as usize)
            .map(|info| info.value)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("absolute axis {} out of range", axis.0),
                )
            })
    }
}

/// Fill `pending` from the three axis queries.
///
/// Returns `true` when all three succeeded and the reading was updated. A
/// partial failure leaves `pending` untouched; seeding never fails the
/// enable that triggered it.
pub fn seed_initial_state(
    query: &mut dyn AbsQuery,
    scale: &AxisScale,
    pending: &mut SensorReading,
) -> bool {
    let values = query
        .abs_value(AbsoluteAxisCode::ABS_X)
        .and_then(|x| query.abs_value(AbsoluteAxisCode::ABS_Y).map(|y| (x, y)))
        .and_then(|(x, y)| query.abs_value(AbsoluteAxisCode::ABS_Z).map(|z| (x, y, z)));

    match values {
        Ok((x, y, z)) => {
            // Historical remap: Y source lands in slot 0 with the X constant,
            // X source in slot 1 with the Y constant, and no negation.
            pending.data[0] = y as f32 * scale.x;
            pending.data[1] = x as f32 * scale.y;
            pending.data[2] = z as f32 * scale.z;
            debug!("Seeded initial accelerometer state: {:?}", pending.data);
            true
        }
        Err(e) => {
            debug!("Skipping initial state, absolute-axis query failed: {}", e);
            false
        }
    }
}
