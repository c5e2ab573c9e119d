use std::io;

use thiserror::Error;
use tracing_subscriber::util::TryInitError;

/// Ошибки инициализации журнала.
#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid logging config: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Global subscriber already set: {0}")]
    Init(#[from] TryInitError),
}
