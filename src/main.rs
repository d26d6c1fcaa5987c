use chrono::Local;
use color_eyre::{eyre::eyre, Result};
use lis3_accel::config::SensorConfig;
use lis3_accel::sensor::{AccelSensor, Probing, Ready, SensorReading};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

const WAIT_TIMEOUT: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config = setup_config().await?;
    info!(
        "Starting accelerometer on {} (sysfs {})",
        config.device_path.display(),
        config.sysfs_dir.display()
    );

    let mut sensor = AccelSensor::<Probing>::open(&config)
        .map_err(|e| eyre!("Failed to open accelerometer: {}", e))?
        .initialize();

    sensor
        .set_delay(config.initial_delay_ns)
        .map_err(|e| eyre!("Failed to set initial delay: {}", e))?;
    sensor
        .enable(true)
        .map_err(|e| eyre!("Failed to enable accelerometer: {}", e))?;

    let (reading_tx, reading_rx) = mpsc::channel::<SensorReading>(1000);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let batch = config.read_batch;
    let poller = tokio::task::spawn_blocking(move || {
        run_poll_loop(sensor, batch, reading_tx, shutdown_rx)
    });

    let printer = tokio::spawn(print_readings(reading_rx));

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| eyre!("Failed to listen for Ctrl-C: {}", e))?;
    info!("Shutting down accelerometer");
    let _ = shutdown_tx.send(true);

    poller
        .await
        .map_err(|e| eyre!("Poll task panicked: {}", e))?;

    // The poller dropped its sender, so this drains what is queued and ends.
    let printed = printer
        .await
        .map_err(|e| eyre!("Printer task panicked: {}", e))?;
    info!("Printed {} readings", printed);
    Ok(())
}

async fn print_readings(mut receiver: mpsc::Receiver<SensorReading>) -> u64 {
    let mut printed = 0u64;
    while let Some(reading) = receiver.recv().await {
        info!(
            "accel x={:.4} y={:.4} z={:.4} t={}",
            reading.x(),
            reading.y(),
            reading.z(),
            reading.timestamp
        );
        printed += 1;
    }
    debug!("Reading channel closed");
    printed
}

// Blocking read loop; the sensor is dropped (and thereby disabled) on exit.
fn run_poll_loop(
    mut sensor: AccelSensor<Ready>,
    batch: usize,
    sender: mpsc::Sender<SensorReading>,
    shutdown: watch::Receiver<bool>,
) {
    info!("Starting accelerometer poll loop");

    let mut reading_count = 0u64;
    let mut last_log_time = Local::now();
    let log_interval = chrono::Duration::seconds(10);

    while !*shutdown.borrow() {
        match sensor.wait_readable(WAIT_TIMEOUT) {
            Ok(false) if !sensor.has_pending_event() => continue,
            Ok(_) => {}
            Err(e) => {
                error!("Failed to poll accelerometer: {} (status {})", e, e.status());
                break;
            }
        }

        match sensor.read_events(batch) {
            Ok(readings) => {
                reading_count += readings.len() as u64;
                for reading in readings {
                    if let Err(e) = sender.blocking_send(reading) {
                        warn!("Reading consumer gone: {}", e);
                        return;
                    }
                }
            }
            Err(e) => {
                error!("Failed to read accelerometer: {} (status {})", e, e.status());
                break;
            }
        }

        let now = Local::now();
        if now - last_log_time > log_interval {
            info!(
                "Accelerometer stats: {} readings in last {} seconds (avg {:.2}/sec)",
                reading_count,
                log_interval.num_seconds(),
                reading_count as f64 / log_interval.num_seconds() as f64
            );
            reading_count = 0;
            last_log_time = now;
        }
    }

    info!("Accelerometer poll loop finished");
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}

async fn setup_config() -> Result<SensorConfig> {
    let path = match std::env::args_os().nth(1) {
        Some(arg) => PathBuf::from(arg),
        None => {
            let path = SensorConfig::default_path();
            SensorConfig::ensure_default_config(&path).await?;
            path
        }
    };
    SensorConfig::load(&path).await
}
