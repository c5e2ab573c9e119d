use std::{any::Any, io};

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Фатальные ошибки этапа настройки.
///
/// Любая из них означает, что роль не может существовать: процесс пишет одну
/// строку ошибки и завершается с ненулевым кодом.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Не удалось открыть прослушивающий адрес.
    #[error("failed to bind {role} address {address}: {source}")]
    Bind {
        role: &'static str,
        address: String,
        #[source]
        source: io::Error,
    },

    /// Не удалось подключиться к адресу рандеву.
    #[error("unable to connect {role} to {address}: {source}")]
    Connect {
        role: &'static str,
        address: String,
        #[source]
        source: io::Error,
    },

    /// Подписка не может быть зарегистрирована.
    #[error("unable to subscribe: {reason}")]
    Subscribe { reason: String },

    /// Некорректная конфигурация.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Задача форвардера завершилась, не сообщив о готовности.
    #[error("{role} exited before signalling readiness")]
    ReadinessLost { role: &'static str },
}

impl SetupError {
    /// Адрес уже занят другим процессом или сокетом.
    pub fn is_address_in_use(&self) -> bool {
        matches!(self, Self::Bind { source, .. } if source.kind() == io::ErrorKind::AddrInUse)
    }
}

impl ErrorExt for SetupError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Bind { .. } if self.is_address_in_use() => StatusCode::AddressConflict,
            Self::Bind { .. } => StatusCode::BindFailed,
            Self::Connect { .. } => StatusCode::ConnectionFailed,
            Self::Subscribe { .. } => StatusCode::EmptySubscription,
            Self::InvalidConfig(_) => StatusCode::InvalidConfig,
            Self::ReadinessLost { .. } => StatusCode::ReadinessLost,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
