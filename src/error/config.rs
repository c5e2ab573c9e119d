use std::any::Any;

use thiserror::Error;
use zrelay_error::{ErrorExt, RelayError, SetupError, StatusCode};

/// Ошибки загрузки и проверки настроек.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load settings: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid settings: {0}")]
    Invalid(String),
}

impl ErrorExt for ConfigError {
    fn status_code(&self) -> StatusCode {
        StatusCode::InvalidConfig
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl From<ConfigError> for SetupError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Invalid(reason) => SetupError::InvalidConfig(reason),
            other => SetupError::InvalidConfig(other.to_string()),
        }
    }
}

impl From<ConfigError> for RelayError {
    fn from(err: ConfigError) -> Self {
        RelayError::Setup(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Тест проверяет, что ошибка настроек становится фатальной ошибкой
    /// настройки с тем же текстом.
    #[test]
    fn test_into_setup_error() {
        let err: SetupError = ConfigError::Invalid("addresses must differ".into()).into();
        assert!(matches!(err, SetupError::InvalidConfig(ref r) if r == "addresses must differ"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_status_code() {
        assert_eq!(
            ConfigError::Invalid("x".into()).status_code(),
            StatusCode::InvalidConfig
        );
    }
}
