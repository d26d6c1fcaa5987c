pub mod config;
pub mod sensor;

pub use config::SensorConfig;
pub use sensor::{AccelSensor, SensorError, SensorReading};
