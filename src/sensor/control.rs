//! Enable/disable and sampling-rate control through the sysfs `poll` attribute
//!
//! The lis3lv02d is an input polled device: it streams as soon as anyone holds
//! the event node open, so there is no real enable line. Writing `0` to `poll`
//! stops reporting and any positive value restarts it at that period in
//! milliseconds. [`DeviceControl`] keeps the last real period so a re-enable
//! restores the previous cadence.

use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::error::SensorError;

/// Name of the rate/enable attribute under the device's sysfs directory
pub const POLL_ATTRIBUTE: &str = "poll";

/// Period written on enable when no delay was ever requested
pub const DEFAULT_POLL_INTERVAL_MS: i32 = 50;

/// Something the poll period can be written to
///
/// Every state change opens a fresh handle and drops it before returning,
/// so nothing stays open between calls.
pub trait PollAttribute: Send + fmt::Debug {
    fn open(&mut self) -> io::Result<Box<dyn Write + Send + '_>>;

    fn describe(&self) -> String;
}

/// The real attribute at `<sysfs_dir>/poll`
#[derive(Debug, Clone)]
pub struct SysfsPollAttribute {
    path: PathBuf,
}

impl SysfsPollAttribute {
    pub fn new(sysfs_dir: impl AsRef<Path>) -> Self {
        Self {
            path: sysfs_dir.as_ref().join(POLL_ATTRIBUTE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PollAttribute for SysfsPollAttribute {
    fn open(&mut self) -> io::Result<Box<dyn Write + Send + '_>> {
        let file = OpenOptions::new().read(true).write(true).open(&self.path)?;
        Ok(Box::new(file))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

// Sysfs expects the decimal period; the trailing NUL matches what the
// HAL has always written.
fn write_period(handle: &mut dyn Write, period_ms: i32) -> io::Result<()> {
    let mut buf = period_ms.to_string().into_bytes();
    buf.push(0);
    handle.write_all(&buf)?;
    handle.flush()
}

/// Convert a requested delay to whole milliseconds, truncating.
pub fn delay_ns_to_ms(delay_ns: i64) -> i32 {
    let ms = delay_ns / 1_000_000;
    ms.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Owner of the logical enabled flag and the remembered poll period
#[derive(Debug)]
pub struct DeviceControl {
    attribute: Box<dyn PollAttribute>,
    enabled: bool,
    remembered_delay_ms: i32,
    default_delay_ms: i32,
}

impl DeviceControl {
    pub fn new(attribute: Box<dyn PollAttribute>, default_delay_ms: i32) -> Self {
        let default_delay_ms = if default_delay_ms > 0 {
            default_delay_ms
        } else {
            DEFAULT_POLL_INTERVAL_MS
        };
        Self {
            attribute,
            enabled: false,
            remembered_delay_ms: 0,
            default_delay_ms,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn remembered_delay_ms(&self) -> i32 {
        self.remembered_delay_ms
    }

    /// Switch reporting on or off.
    ///
    /// `on_enable` runs after the attribute was opened and before the period
    /// is written; the sensor uses it to seed the pending reading.
    pub fn enable<F: FnOnce()>(&mut self, on: bool, on_enable: F) -> Result<(), SensorError> {
        if on == self.enabled {
            debug!("Accelerometer already {}", if on { "enabled" } else { "disabled" });
            return Ok(());
        }

        let target = self.attribute.describe();
        let mut handle = self
            .attribute
            .open()
            .map_err(|e| SensorError::io(format!("opening {}", target), e))?;

        let period_ms = if on {
            if self.remembered_delay_ms <= 0 {
                self.remembered_delay_ms = self.default_delay_ms;
            }
            on_enable();
            self.remembered_delay_ms
        } else {
            0
        };

        if let Err(e) = write_period(&mut *handle, period_ms) {
            warn!("Failed to write poll period {} to {}: {}", period_ms, target, e);
        }
        drop(handle);

        self.enabled = on;
        info!(
            "Accelerometer {} (poll period {} ms)",
            if on { "enabled" } else { "disabled" },
            period_ms
        );
        Ok(())
    }

    /// Request a new sampling period.
    ///
    /// While disabled the value is only remembered; the device is quiet and
    /// the period is applied on the next enable.
    pub fn set_delay(&mut self, delay_ns: i64) -> Result<(), SensorError> {
        let delay_ms = delay_ns_to_ms(delay_ns);

        if !self.enabled {
            debug!("Remembering poll period {} ms while disabled", delay_ms);
            self.remembered_delay_ms = delay_ms;
            return Ok(());
        }

        let target = self.attribute.describe();
        let mut handle = self
            .attribute
            .open()
            .map_err(|e| SensorError::io(format!("opening {}", target), e))?;
        if let Err(e) = write_period(&mut *handle, delay_ms) {
            warn!("Failed to write poll period {} to {}: {}", delay_ms, target, e);
        }
        drop(handle);

        self.remembered_delay_ms = delay_ms;
        debug!("Poll period set to {} ms", delay_ms);
        Ok(())
    }

    /// Write `0` regardless of the logical flag.
    ///
    /// Used once at start-up: the device streams from the moment its node is
    /// opened, so it is silenced to match `enabled == false`.
    pub fn quiesce(&mut self) -> Result<(), SensorError> {
        let target = self.attribute.describe();
        let mut handle = self
            .attribute
            .open()
            .map_err(|e| SensorError::io(format!("opening {}", target), e))?;
        write_period(&mut *handle, 0)
            .map_err(|e| SensorError::io(format!("writing {}", target), e))?;
        Ok(())
    }
}

impl Drop for DeviceControl {
    fn drop(&mut self) {
        if self.enabled {
            if let Err(e) = self.enable(false, || {}) {
                warn!("Failed to disable accelerometer on teardown: {}", e);
            }
        }
    }
}
