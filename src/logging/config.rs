use std::path::PathBuf;

use serde::Deserialize;

use super::format::DEFAULT_TAG_WIDTH;
use crate::error::LoggingError;

/// Параметры диагностического журнала.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Директива фильтра (`info`, `zrelay=debug`, ...). `RUST_LOG` важнее.
    pub level: String,
    /// Цвет в консоли. `None` — только если stdout это терминал.
    pub ansi: Option<bool>,
    /// Ширина поля тега.
    pub tag_width: usize,
    /// Писать ли в stdout.
    pub console: bool,
    /// Каталог для файла журнала. `None` — файла нет.
    pub file_dir: Option<PathBuf>,
    /// Имя файла (к нему добавляется дата ротации).
    pub file_prefix: String,
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<(), LoggingError> {
        if self.level.trim().is_empty() {
            return Err(LoggingError::Invalid("log level must not be empty".into()));
        }
        if self.tag_width == 0 {
            return Err(LoggingError::Invalid("tag width must be positive".into()));
        }
        if self.file_dir.is_some() && self.file_prefix.trim().is_empty() {
            return Err(LoggingError::Invalid(
                "log file prefix must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Итоговое решение о цвете в консоли.
    pub fn console_ansi(&self) -> bool {
        self.ansi.unwrap_or_else(|| atty::is(atty::Stream::Stdout))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            ansi: None,
            tag_width: DEFAULT_TAG_WIDTH,
            console: true,
            file_dir: None,
            file_prefix: "zrelay.log".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(LoggingConfig::default().validate().is_ok());
    }

    /// Тест проверяет отклонение некорректных значений.
    #[test]
    fn test_invalid_values() {
        let cfg = LoggingConfig {
            tag_width: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = LoggingConfig {
            level: "  ".into(),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = LoggingConfig {
            file_dir: Some(PathBuf::from("logs")),
            file_prefix: String::new(),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_explicit_ansi_wins() {
        let cfg = LoggingConfig {
            ansi: Some(false),
            ..Default::default()
        };
        assert!(!cfg.console_ansi());
    }
}
