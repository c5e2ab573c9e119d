use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, SetupError, StatusCode, TransportError};

/// Общая ошибка ролей ретранслятора.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Задача роли аварийно завершилась (panic).
    #[error("{role} task panicked: {reason}")]
    TaskPanicked { role: String, reason: String },
}

impl ErrorExt for RelayError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Setup(e) => e.status_code(),
            Self::Transport(e) => e.status_code(),
            Self::TaskPanicked { .. } => StatusCode::TaskPanicked,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    /// Тест проверяет, что статус делегируется вложенной ошибке.
    #[test]
    fn test_status_is_delegated() {
        let err: RelayError = TransportError::Closed.into();
        assert_eq!(err.status_code(), StatusCode::ConnectionClosed);
        assert!(!err.is_fatal());

        let err: RelayError = SetupError::Connect {
            role: "subscriber",
            address: "127.0.0.1:3328".into(),
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::ConnectionFailed);
        assert!(err.is_fatal());
    }

    /// Тест проверяет, что transparent-обёртка не меняет текст ошибки.
    #[test]
    fn test_transparent_display() {
        let err: RelayError = TransportError::Timeout.into();
        assert_eq!(err.to_string(), "receive timed out");
    }

    #[test]
    fn test_task_panicked() {
        let err = RelayError::TaskPanicked {
            role: "publisher".into(),
            reason: "boom".into(),
        };
        assert!(err.is_fatal());
        assert!(err.to_string().contains("publisher"));
    }
}
