use evdev::{AbsoluteAxisCode, AttributeSetRef, Device};
use statum::{machine, state};
use std::io;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use super::control::{DeviceControl, SysfsPollAttribute};
use super::error::SensorError;
use super::input::{set_nonblocking, EventSource, InputReader, RawInputEvent};
use super::reading::{monotonic_now_ns, AxisScale, SensorReading};
use super::seed::{seed_initial_state, AbsQuery, EvdevAbsQuery};
use crate::config::SensorConfig;

// Sensor lifecycle states
#[state]
#[derive(Debug, Clone)]
pub enum SensorState {
    Probing,
    Ready,
}

#[machine]
#[derive(Debug)]
pub struct AccelSensor<S: SensorState> {
    // Enabled flag and remembered poll period behind the sysfs attribute
    control: DeviceControl,

    // Absolute-axis state access for seeding
    query: Box<dyn AbsQuery>,

    // Buffered raw events from the event node
    source: Box<dyn EventSource>,

    scale: AxisScale,

    // Accumulator for the next frame; emitted by copy
    pending: SensorReading,

    // Set by a successful seed, cleared by the next read
    has_pending_event: bool,
}

const ACCEL_AXES: [AbsoluteAxisCode; 3] = [
    AbsoluteAxisCode::ABS_X,
    AbsoluteAxisCode::ABS_Y,
    AbsoluteAxisCode::ABS_Z,
];

/// Reject event nodes that are not a three-axis accelerometer.
pub fn require_accel_axes(
    path: &Path,
    supported: Option<&AttributeSetRef<AbsoluteAxisCode>>,
) -> Result<(), SensorError> {
    let missing: Vec<AbsoluteAxisCode> = ACCEL_AXES
        .into_iter()
        .filter(|axis| !supported.is_some_and(|axes| axes.contains(*axis)))
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    Err(SensorError::Initialization(format!(
        "{} does not report {:?}",
        path.display(),
        missing
    )))
}

// Available in every state
impl<S: SensorState> AccelSensor<S> {
    pub fn is_enabled(&self) -> bool {
        self.control.is_enabled()
    }
}

impl AccelSensor<Probing> {
    pub fn create(
        control: DeviceControl,
        query: Box<dyn AbsQuery>,
        source: Box<dyn EventSource>,
        scale: AxisScale,
    ) -> Self {
        debug!("Creating accelerometer sensor with scale {:?}", scale);
        Self::new(
            control,
            query,
            source,
            scale,
            SensorReading::accelerometer(),
            false,
        )
    }

    /// Open the event node and sysfs attribute named in `config`.
    ///
    /// The node is switched to non-blocking reads so a fetch with nothing
    /// ready reports `WouldBlock` instead of stalling the caller.
    pub fn open(config: &SensorConfig) -> Result<Self, SensorError> {
        let path = &config.device_path;
        info!("Opening accelerometer at {}", path.display());
        let device = Device::open(path)
            .map_err(|e| SensorError::io(format!("opening {}", path.display()), e))?;
        debug!(
            "Event node {} is {:?}",
            path.display(),
            device.name().unwrap_or("unnamed")
        );
        require_accel_axes(path, device.supported_absolute_axes())?;
        set_nonblocking(&device)
            .map_err(|e| SensorError::io("switching event node to non-blocking", e))?;

        // Second handle for absolute-state queries; the first one streams.
        let query_device = Device::open(path)
            .map_err(|e| SensorError::io(format!("reopening {}", path.display()), e))?;

        let attribute = SysfsPollAttribute::new(&config.sysfs_dir);
        debug!("Poll attribute at {}", attribute.path().display());

        Ok(Self::create(
            DeviceControl::new(Box::new(attribute), config.default_delay_ms),
            Box::new(EvdevAbsQuery::new(query_device)),
            Box::new(InputReader::new(device, config.reader_capacity)),
            config.scale,
        ))
    }

    /// Silence the always-streaming device and move to `Ready`.
    pub fn initialize(mut self) -> AccelSensor<Ready> {
        if let Err(e) = self.control.quiesce() {
            warn!("Could not quiesce accelerometer on start-up: {}", e);
        }
        info!("Accelerometer initialized, transitioning to Ready state");
        self.transition()
    }
}

impl AccelSensor<Ready> {
    /// Turn reporting on or off; enabling also seeds the pending reading.
    pub fn enable(&mut self, on: bool) -> Result<(), SensorError> {
        let query = &mut self.query;
        let scale = &self.scale;
        let pending = &mut self.pending;
        let has_pending_event = &mut self.has_pending_event;

        self.control.enable(on, || {
            if seed_initial_state(query.as_mut(), scale, pending) {
                *has_pending_event = true;
            }
        })
    }

    pub fn set_delay(&mut self, delay_ns: i64) -> Result<(), SensorError> {
        self.control.set_delay(delay_ns)
    }

    pub fn has_pending_event(&self) -> bool {
        self.has_pending_event
    }

    pub fn remembered_delay_ms(&self) -> i32 {
        self.control.remembered_delay_ms()
    }

    /// Current accumulator contents, including updates not yet emitted.
    pub fn pending(&self) -> &SensorReading {
        &self.pending
    }

    /// Block until the event node has data or `timeout` expires.
    pub fn wait_readable(&mut self, timeout: Duration) -> Result<bool, SensorError> {
        self.source
            .wait_readable(timeout)
            .map_err(|e| SensorError::io("polling event descriptor", e))
    }

    /// Return up to `capacity` completed readings.
    ///
    /// A seeded reading goes out first on its own. Otherwise one batch is
    /// fetched and drained; if it held no complete frame and the sensor is
    /// enabled, one more batch is fetched so a wake-up that landed mid-frame
    /// does not come back empty.
    pub fn read_events(&mut self, capacity: usize) -> Result<Vec<SensorReading>, SensorError> {
        if capacity < 1 {
            return Err(SensorError::InvalidArgument(format!(
                "read capacity must be at least 1, got {}",
                capacity
            )));
        }

        if self.has_pending_event {
            self.has_pending_event = false;
            self.pending.timestamp = monotonic_now_ns();
            return Ok(if self.control.is_enabled() {
                vec![self.pending]
            } else {
                Vec::new()
            });
        }

        self.fill()?;

        let mut readings = Vec::with_capacity(capacity);
        let mut remaining = capacity;
        self.drain(&mut remaining, &mut readings);

        if readings.is_empty() && self.control.is_enabled() {
            match self.fill()? {
                0 => trace!("No further input after partial frame"),
                n => {
                    trace!("Partial frame, retrying with {} more records", n);
                    self.drain(&mut remaining, &mut readings);
                }
            }
        }

        Ok(readings)
    }

    // Buffer more records; a drained non-blocking node just adds none.
    fn fill(&mut self) -> Result<usize, SensorError> {
        match self.source.fill() {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(e) => Err(SensorError::io("reading input events", e)),
        }
    }

    fn drain(&mut self, remaining: &mut usize, readings: &mut Vec<SensorReading>) {
        while *remaining > 0 {
            let Some(event) = self.source.peek() else {
                break;
            };

            match event {
                RawInputEvent::AxisUpdate { code, value } => {
                    let value = value as f32;
                    match code {
                        AbsoluteAxisCode::ABS_Y => self.pending.data[0] = value * self.scale.y,
                        AbsoluteAxisCode::ABS_X => {
                            self.pending.data[1] = -(value * self.scale.x)
                        }
                        AbsoluteAxisCode::ABS_Z => self.pending.data[2] = value * self.scale.z,
                        other => trace!("Ignoring absolute axis {:?}", other),
                    }
                }
                RawInputEvent::Sync { time_ns } => {
                    self.pending.timestamp = time_ns;
                    if self.control.is_enabled() {
                        readings.push(self.pending);
                        *remaining -= 1;
                    }
                }
                RawInputEvent::Other { kind, code } => {
                    warn!("Unknown accelerometer event (type={}, code={})", kind, code);
                }
            }

            self.source.advance();
        }
    }
}
