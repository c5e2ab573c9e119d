use std::fmt;

#[cfg(feature = "strum")]
use strum_macros::{AsRefStr, EnumIter};

/// Коды статуса для категоризации ошибок ретранслятора.
///
/// # Диапазоны:
/// - 1xxx: Общие ошибки
/// - 2xxx: Конфигурация
/// - 6xxx: Сеть / IO
/// - 8xxx: Фрейминг / протокол
#[cfg_attr(feature = "strum", derive(AsRefStr, EnumIter))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
#[non_exhaustive]
pub enum StatusCode {
    // === 1xxx: Общие ошибки ===
    Internal = 1003,
    TaskPanicked = 1006,

    // === 2xxx: Конфигурация ===
    InvalidConfig = 2000,
    AddressConflict = 2001,
    EmptySubscription = 2002,

    // === 6xxx: Сеть/IO ===
    BindFailed = 6000,
    ConnectionFailed = 6001,
    ConnectionClosed = 6002,
    Timeout = 6003,
    SendFailed = 6004,
    RecvFailed = 6005,
    AcceptFailed = 6006,
    ReadinessLost = 6007,

    // === 8xxx: Фрейминг ===
    FrameTooLarge = 8000,
    AllocationFailed = 8001,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl StatusCode {
    /// Числовое представление кода статуса.
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Ошибки этапа настройки: роль не может продолжить работу и процесс
    /// должен завершиться.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Internal
                | Self::TaskPanicked
                | Self::InvalidConfig
                | Self::AddressConflict
                | Self::EmptySubscription
                | Self::BindFailed
                | Self::ConnectionFailed
                | Self::AcceptFailed
                | Self::ReadinessLost
        )
    }

    /// Штатное завершение потока сообщений (конец потока или таймаут).
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::ConnectionClosed | Self::Timeout)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для StatusCode
////////////////////////////////////////////////////////////////////////////////

impl From<StatusCode> for u32 {
    fn from(c: StatusCode) -> Self {
        c.code()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        #[cfg(feature = "strum")]
        {
            write!(f, "{} ({})", self.as_ref(), self.code())
        }
        #[cfg(not(feature = "strum"))]
        {
            write!(f, "{:?} ({})", self, self.code())
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
