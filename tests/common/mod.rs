//! Shared test utilities


pub use mock_device::{create_mock_sensor, MockDevice, Operation};

use evdev::AbsoluteAxisCode;
use lis3_accel::sensor::RawInputEvent;

pub fn abs_x(value: i32) -> RawInputEvent {
    RawInputEvent::AxisUpdate {
        code: AbsoluteAxisCode::ABS_X,
        value,
    }
}

pub fn abs_y(value: i32) -> RawInputEvent {
    RawInputEvent::AxisUpdate {
        code: AbsoluteAxisCode::ABS_Y,
        value,
    }
}

pub fn abs_z(value: i32) -> RawInputEvent {
    RawInputEvent::AxisUpdate {
        code: AbsoluteAxisCode::ABS_Z,
        value,
    }
}

pub fn sync(time_ns: i64) -> RawInputEvent {
    RawInputEvent::Sync { time_ns }
}

/// One complete frame: X, Y, Z updates closed by a marker.
pub fn frame(x: i32, y: i32, z: i32, time_ns: i64) -> Vec<RawInputEvent> {
    vec![abs_x(x), abs_y(y), abs_z(z), sync(time_ns)]
}
