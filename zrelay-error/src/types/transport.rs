use std::{any::Any, io};

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Ошибки передачи отдельных фреймов.
///
/// `Closed` и `Timeout` означают штатное завершение потока. `Accept`
/// означает отказ слушателя и фатален для форвардера. Остальные варианты
/// операционные: их логируют и переходят к следующей итерации.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Поток закрыт удалённой стороной.
    #[error("connection closed")]
    Closed,

    /// За отведённое время не пришло ни одного фрейма.
    #[error("receive timed out")]
    Timeout,

    /// Фрейм превышает допустимый размер и был пропущен.
    #[error("frame of {len} bytes exceeds limit of {max} bytes")]
    FrameTooLarge { len: usize, max: usize },

    /// Не удалось выделить буфер под фрейм.
    #[error("failed to allocate {requested} bytes for a frame")]
    Allocation { requested: usize },

    /// Не удалось отправить фрейм.
    #[error("send error: {0}")]
    Send(#[source] io::Error),

    /// Не удалось принять фрейм.
    #[error("recv error: {0}")]
    Recv(#[source] io::Error),

    /// Слушатель больше не принимает соединения.
    #[error("{role} listener failed: {source}")]
    Accept {
        role: &'static str,
        #[source]
        source: io::Error,
    },
}

impl TransportError {
    /// Классифицирует ошибку чтения: обрыв соединения считается концом
    /// потока, остальное — ошибкой приёма.
    pub fn from_read(err: io::Error) -> Self {
        if is_disconnect(&err) {
            Self::Closed
        } else {
            Self::Recv(err)
        }
    }

    /// Штатное завершение потока (конец или таймаут).
    pub fn is_end_of_stream(&self) -> bool {
        self.status_code().is_end_of_stream()
    }
}

/// Ошибки, означающие, что удалённая сторона ушла.
pub fn is_disconnect(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
    )
}

impl ErrorExt for TransportError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Closed => StatusCode::ConnectionClosed,
            Self::Timeout => StatusCode::Timeout,
            Self::FrameTooLarge { .. } => StatusCode::FrameTooLarge,
            Self::Allocation { .. } => StatusCode::AllocationFailed,
            Self::Send(_) => StatusCode::SendFailed,
            Self::Recv(_) => StatusCode::RecvFailed,
            Self::Accept { .. } => StatusCode::AcceptFailed,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Тест проверяет, что обрыв соединения при чтении трактуется как конец
    /// потока.
    #[test]
    fn test_from_read_disconnect_is_closed() {
        for kind in [
            io::ErrorKind::UnexpectedEof,
            io::ErrorKind::ConnectionReset,
            io::ErrorKind::ConnectionAborted,
            io::ErrorKind::BrokenPipe,
        ] {
            let err = TransportError::from_read(io::Error::from(kind));
            assert!(matches!(err, TransportError::Closed), "{kind:?}");
            assert!(err.is_end_of_stream());
        }
    }

    /// Тест проверяет, что прочие ошибки чтения операционные.
    #[test]
    fn test_from_read_other_is_recv() {
        let err = TransportError::from_read(io::Error::from(io::ErrorKind::InvalidData));
        assert!(matches!(err, TransportError::Recv(_)));
        assert!(!err.is_end_of_stream());
        assert!(!err.is_fatal());
        assert_eq!(err.status_code(), StatusCode::RecvFailed);
    }

    #[test]
    fn test_accept_failure_is_fatal() {
        let err = TransportError::Accept {
            role: "ingress",
            source: io::Error::from(io::ErrorKind::Other),
        };
        assert!(err.is_fatal());
    }

    #[test]
    fn test_frame_too_large_display() {
        let err = TransportError::FrameTooLarge { len: 10, max: 4 };
        assert_eq!(err.to_string(), "frame of 10 bytes exceeds limit of 4 bytes");
        assert!(!err.is_fatal());
    }
}
