//! Buffered reader for evdev records
//!
//! [`InputReader`] keeps a small fixed-capacity queue of decoded
//! [`RawInputEvent`]s. [`EventSource::fill`] tops the queue up and the
//! translator consumes it with `peek`/`advance`. Records fetched from the
//! device beyond the free room wait in a backlog for the next fill.

use evdev::{AbsoluteAxisCode, Device, EventType, InputEvent};
use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use nix::poll::{poll, PollFd, PollFlags};
use std::collections::VecDeque;
use std::fmt;
use std::io;
use std::os::fd::{AsFd, AsRawFd};
use std::time::Duration;
use tracing::{debug, trace};

use super::reading::system_time_to_ns;

/// Default number of records buffered between fills
pub const DEFAULT_READER_CAPACITY: usize = 4;

// Input record, reduced to what the accelerometer cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawInputEvent {
    /// EV_ABS update for one axis
    AxisUpdate { code: AbsoluteAxisCode, value: i32 },
    /// EV_SYN marker closing a frame, time in nanoseconds
    Sync { time_ns: i64 },
    /// Anything else the device emits
    Other { kind: u16, code: u16 },
}

impl From<InputEvent> for RawInputEvent {
    fn from(event: InputEvent) -> Self {
        match event.event_type() {
            EventType::ABSOLUTE => RawInputEvent::AxisUpdate {
                code: AbsoluteAxisCode(event.code()),
                value: event.value(),
            },
            EventType::SYNCHRONIZATION => RawInputEvent::Sync {
                time_ns: system_time_to_ns(event.timestamp()),
            },
            kind => RawInputEvent::Other {
                kind: kind.0,
                code: event.code(),
            },
        }
    }
}

/// Source of buffered raw events consumed by the translator
pub trait EventSource: Send + fmt::Debug {
    /// Buffer as many new records as there is room for; returns how many.
    fn fill(&mut self) -> io::Result<usize>;

    /// Oldest buffered record, if any.
    fn peek(&self) -> Option<RawInputEvent>;

    /// Drop the record returned by `peek`.
    fn advance(&mut self);

    /// Block until the descriptor has data or `timeout` expires.
    fn wait_readable(&mut self, _timeout: Duration) -> io::Result<bool> {
        Ok(true)
    }
}

/// Descriptor the reader fetches records from
pub trait EventDevice: Send {
    /// Append every record the device has ready to `out`.
    ///
    /// A non-blocking device with nothing ready returns `WouldBlock`.
    fn fetch(&mut self, out: &mut VecDeque<RawInputEvent>) -> io::Result<()>;

    /// Wait for the device to become readable.
    fn wait_readable(&self, timeout: Duration) -> io::Result<bool>;
}

impl EventDevice for Device {
    fn fetch(&mut self, out: &mut VecDeque<RawInputEvent>) -> io::Result<()> {
        loop {
            match self.fetch_events() {
                Ok(events) => {
                    out.extend(events.map(RawInputEvent::from));
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    fn wait_readable(&self, timeout: Duration) -> io::Result<bool> {
        let mut fds = [PollFd::new(self.as_fd(), PollFlags::POLLIN)];
        let timeout_ms = u16::try_from(timeout.as_millis()).unwrap_or(u16::MAX);
        match poll(&mut fds, timeout_ms) {
            Ok(0) => Ok(false),
            Ok(_) => Ok(fds[0]
                .revents()
                .is_some_and(|revents| revents.contains(PollFlags::POLLIN))),
            Err(Errno::EINTR) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Switch the event node to non-blocking reads.
pub fn set_nonblocking(device: &Device) -> io::Result<()> {
    let fd = device.as_raw_fd();
    let flags = OFlag::from_bits_truncate(fcntl(fd, FcntlArg::F_GETFL)?);
    fcntl(fd, FcntlArg::F_SETFL(flags | OFlag::O_NONBLOCK))?;
    Ok(())
}

/// Fixed-capacity reader over an event device
pub struct InputReader<D> {
    device: D,
    capacity: usize,
    queue: VecDeque<RawInputEvent>,
    // Fetched but not yet admitted to the queue
    backlog: VecDeque<RawInputEvent>,
}

impl<D: EventDevice> InputReader<D> {
    pub fn new(device: D, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            device,
            capacity,
            queue: VecDeque::with_capacity(capacity),
            backlog: VecDeque::new(),
        }
    }

    pub fn buffered(&self) -> usize {
        self.queue.len()
    }
}

impl<D> fmt::Debug for InputReader<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputReader")
            .field("capacity", &self.capacity)
            .field("queued", &self.queue.len())
            .field("backlog", &self.backlog.len())
            .finish_non_exhaustive()
    }
}

impl<D: EventDevice> EventSource for InputReader<D> {
    fn fill(&mut self) -> io::Result<usize> {
        let free = self.capacity - self.queue.len();
        if free == 0 {
            trace!("Input buffer full, skipping read");
            return Ok(0);
        }

        if self.backlog.is_empty() {
            self.device.fetch(&mut self.backlog)?;
        }

        let records = free.min(self.backlog.len());
        self.queue.extend(self.backlog.drain(..records));
        debug!(
            "Buffered {} input records ({} pending, {} in backlog)",
            records,
            self.queue.len(),
            self.backlog.len()
        );
        Ok(records)
    }

    fn peek(&self) -> Option<RawInputEvent> {
        self.queue.front().copied()
    }

    fn advance(&mut self) {
        self.queue.pop_front();
    }

    fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool> {
        if !self.queue.is_empty() || !self.backlog.is_empty() {
            return Ok(true);
        }
        self.device.wait_readable(timeout)
    }
}
