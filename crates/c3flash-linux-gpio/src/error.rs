//! Error types for the Linux GPIO transport

use thiserror::Error;

/// Linux GPIO transport errors
#[derive(Debug, Error)]
pub enum LinuxGpioError {
    /// Failed to request GPIO lines
    #[error("Failed to request GPIO lines on '{path}': {source}")]
    LineRequestFailed {
        path: String,
        #[source]
        source: gpiocdev::Error,
    },

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Missing required parameter
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    /// GPIO chip or device not specified
    #[error("No GPIO chip specified. Use dev=/dev/gpiochipN or gpiochip=N")]
    NoDevice,

    /// Both `dev` and `gpiochip` given
    #[error("Only one of 'dev' or 'gpiochip' can be specified")]
    ConflictingDevice,

    /// Two functions mapped to the same GPIO line
    #[error("GPIO line {0} is assigned more than once")]
    DuplicateLine(u32),
}

/// Result type for Linux GPIO transport operations
pub type Result<T> = std::result::Result<T, LinuxGpioError>;
