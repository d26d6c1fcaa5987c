//! End-to-end run over a scripted event device and a scratch sysfs directory
//!
//! The real [`InputReader`] and [`SysfsPollAttribute`] are used; only the
//! kernel side of the event node is scripted, including the `WouldBlock` a
//! drained non-blocking node reports.

use crate::common::mock_device::MockAbsQuery;
use evdev::AbsoluteAxisCode;
use lis3_accel::config::SensorConfig;
use lis3_accel::sensor::control::POLL_ATTRIBUTE;
use lis3_accel::sensor::{
    AccelSensor, AxisScale, DeviceControl, EventDevice, InputReader, Probing, RawInputEvent,
    SensorError, SysfsPollAttribute,
};
use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("lis3-accel-it-{}-{}", tag, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// Kernel side of the node: each fetch hands out the next queued batch
#[derive(Clone, Default)]
struct ScriptedNode {
    batches: Arc<Mutex<VecDeque<Vec<RawInputEvent>>>>,
}

impl ScriptedNode {
    fn push(&self, batch: Vec<RawInputEvent>) {
        self.batches.lock().unwrap().push_back(batch);
    }
}

impl EventDevice for ScriptedNode {
    fn fetch(&mut self, out: &mut VecDeque<RawInputEvent>) -> io::Result<()> {
        match self.batches.lock().unwrap().pop_front() {
            Some(batch) => {
                out.extend(batch);
                Ok(())
            }
            None => Err(io::Error::from_raw_os_error(libc::EAGAIN)),
        }
    }

    fn wait_readable(&self, _timeout: Duration) -> io::Result<bool> {
        Ok(!self.batches.lock().unwrap().is_empty())
    }
}

fn frame(x: i32, y: i32, z: i32, time_ns: i64) -> Vec<RawInputEvent> {
    let axis = |code, value| RawInputEvent::AxisUpdate { code, value };
    vec![
        axis(AbsoluteAxisCode::ABS_X, x),
        axis(AbsoluteAxisCode::ABS_Y, y),
        axis(AbsoluteAxisCode::ABS_Z, z),
        RawInputEvent::Sync { time_ns },
    ]
}

#[test]
fn test_full_cycle_over_scratch_sysfs() {
    let dir = scratch_dir("cycle");
    let poll = dir.join(POLL_ATTRIBUTE);
    fs::write(&poll, b"").unwrap();

    let node = ScriptedNode::default();
    let query = MockAbsQuery::default();
    query.fail_axis(Some(AbsoluteAxisCode::ABS_X));

    let mut sensor = AccelSensor::<Probing>::create(
        DeviceControl::new(Box::new(SysfsPollAttribute::new(&dir)), 50),
        Box::new(query),
        Box::new(InputReader::new(node.clone(), 4)),
        AxisScale::unity(),
    )
    .initialize();
    assert_eq!(fs::read(&poll).unwrap(), b"0\0");

    sensor.set_delay(40_000_000).unwrap();
    sensor.enable(true).unwrap();
    assert_eq!(fs::read(&poll).unwrap(), b"40\0");
    assert!(!sensor.has_pending_event(), "failed axis query means no seed");

    assert!(!sensor.wait_readable(Duration::from_millis(10)).unwrap());
    assert!(sensor.read_events(8).unwrap().is_empty(), "drained node reads empty");

    let mut batch = frame(100, 200, 300, 1_000_500_000);
    batch.extend(frame(-10, 20, -30, 2_000_000_000));
    node.push(batch);
    assert!(sensor.wait_readable(Duration::from_millis(10)).unwrap());

    // Reader holds four records: one frame per fill.
    let first = sensor.read_events(8).unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].data, [200.0, -100.0, 300.0]);
    assert_eq!(first[0].timestamp, 1_000_500_000);

    let second = sensor.read_events(8).unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].data, [20.0, 10.0, -30.0]);
    assert_eq!(second[0].timestamp, 2_000_000_000);

    assert!(sensor.read_events(8).unwrap().is_empty());

    drop(sensor);
    assert_eq!(&fs::read(&poll).unwrap()[..2], b"0\0");

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_partial_frame_then_idle_node_returns_empty() {
    let dir = scratch_dir("idle");
    fs::write(dir.join(POLL_ATTRIBUTE), b"").unwrap();

    let node = ScriptedNode::default();
    let mut sensor = AccelSensor::<Probing>::create(
        DeviceControl::new(Box::new(SysfsPollAttribute::new(&dir)), 50),
        Box::new(MockAbsQuery::default()),
        Box::new(InputReader::new(node.clone(), 4)),
        AxisScale::unity(),
    )
    .initialize();
    sensor.enable(true).unwrap();
    assert_eq!(sensor.read_events(1).unwrap().len(), 1, "seeded reading");

    let mut partial = frame(1, 2, 3, 10);
    partial.pop();
    node.push(partial);

    // The retry meets an empty node and the call returns instead of blocking.
    assert!(sensor.read_events(4).unwrap().is_empty());

    node.push(vec![RawInputEvent::Sync { time_ns: 10 }]);
    let readings = sensor.read_events(4).unwrap();
    assert_eq!(readings.len(), 1);
    assert_eq!(readings[0].data, [2.0, -1.0, 3.0]);

    drop(sensor);
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_open_fails_for_missing_event_node() {
    let dir = scratch_dir("missing");
    let config = SensorConfig {
        device_path: dir.join("event-missing"),
        sysfs_dir: dir.clone(),
        ..SensorConfig::default()
    };

    let err = AccelSensor::<Probing>::open(&config).unwrap_err();
    assert!(matches!(err, SensorError::Io { .. }));
    assert_eq!(err.status(), -libc::ENOENT);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_open_rejects_a_node_that_is_not_an_input_device() {
    let dir = scratch_dir("regular");
    let not_a_node = dir.join("event0");
    fs::write(&not_a_node, b"not an evdev node").unwrap();
    fs::write(dir.join(POLL_ATTRIBUTE), b"").unwrap();
    let config = SensorConfig {
        device_path: not_a_node,
        sysfs_dir: dir.clone(),
        ..SensorConfig::default()
    };

    let err = AccelSensor::<Probing>::open(&config).unwrap_err();
    assert!(err.status() < 0);
    assert_eq!(
        fs::read(dir.join(POLL_ATTRIBUTE)).unwrap(),
        b"",
        "nothing is written when the node cannot be opened"
    );

    fs::remove_dir_all(&dir).unwrap();
}
