//! Accelerometer sensor for a lis3lv02d-style evdev device
//!
//! The sensor is split the same way the device is driven:
//!
//! 1. [`control`] - enable/disable and poll period through sysfs
//! 2. [`seed`] - initial reading from the absolute-axis state on enable
//! 3. [`input`] - buffered evdev records
//! 4. [`accel`] - frame assembly and the polling read path
//!
//! # Architecture
//!
//! ```text
//!              enable / set_delay
//! Caller ───────────────────────────► DeviceControl ──► <sysfs>/poll
//!    │                                     │ (on enable)
//!    │ read_events                         ▼
//!    └──────► AccelSensor ◄── seed ── absolute-axis state
//!                  ▲
//!                  └── InputReader ◄── /dev/input/eventN
//! ```

pub mod accel;
pub mod control;
pub mod error;
pub mod input;
pub mod reading;
pub mod seed;

pub use accel::{require_accel_axes, AccelSensor, Probing, Ready, SensorState};
pub use control::{DeviceControl, PollAttribute, SysfsPollAttribute, DEFAULT_POLL_INTERVAL_MS};
pub use error::SensorError;
pub use input::{EventDevice, EventSource, InputReader, RawInputEvent};
pub use reading::{AxisScale, SensorReading, SensorType, SENSOR_ID_ACCEL};
pub use seed::{AbsQuery, EvdevAbsQuery};
