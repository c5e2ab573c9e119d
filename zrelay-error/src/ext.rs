use std::{any::Any, error::Error};

use crate::StatusCode;

/// Расширение для ошибок ретранслятора (object-safe).
///
/// Даёт единый способ узнать статус-код ошибки и её уровень в двухуровневой
/// таксономии: фатальные ошибки настройки против операционных ошибок
/// отдельного сообщения.
pub trait ErrorExt: Error + Send + Sync + 'static {
    /// Статус ошибки. По умолчанию [`StatusCode::Internal`].
    fn status_code(&self) -> StatusCode {
        StatusCode::Internal
    }

    /// Возвращает ошибку как [`Any`](std::any::Any) для downcast.
    fn as_any(&self) -> &dyn Any;

    /// Ошибка требует остановки роли (и процесса).
    fn is_fatal(&self) -> bool {
        self.status_code().is_fatal()
    }
}

#[cfg(test)]
mod tests {
    use std::fmt;

    use super::*;

    #[derive(Debug)]
    struct DefaultError;

    impl fmt::Display for DefaultError {
        fn fmt(
            &self,
            f: &mut fmt::Formatter<'_>,
        ) -> fmt::Result {
            write!(f, "default")
        }
    }

    impl Error for DefaultError {}

    impl ErrorExt for DefaultError {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    /// Тест проверяет, что по умолчанию ошибка внутренняя и фатальная.
    #[test]
    fn test_default_status_is_internal_and_fatal() {
        let e = DefaultError;
        assert_eq!(e.status_code(), StatusCode::Internal);
        assert!(e.is_fatal());
    }

    #[test]
    fn test_as_any_downcast() {
        let e = DefaultError;
        assert!(e.as_any().downcast_ref::<DefaultError>().is_some());
    }
}
