//! Error definitions for the sensor module

use std::io;
use thiserror::Error;

/// Errors reported by the accelerometer sensor
#[derive(Debug, Error)]
pub enum SensorError {
    /// The caller passed an argument the sensor cannot honor
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Control-file or input-descriptor I/O failed
    #[error("I/O error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// The sensor could not be brought up
    #[error("Initialization error: {0}")]
    Initialization(String),
}

impl SensorError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Negative errno for callers that speak the HAL status convention.
    pub fn status(&self) -> i32 {
        match self {
            Self::InvalidArgument(_) => -libc::EINVAL,
            Self::Io { source, .. } => -source.raw_os_error().unwrap_or(libc::EIO),
            Self::Initialization(_) => -libc::ENODEV,
        }
    }
}
