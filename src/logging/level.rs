use owo_colors::Style;
use tracing::Level;

/// Уровень диагностического сообщения.
///
/// Порядок вариантов соответствует важности: `Verbose` наименее важен,
/// `Assert` наиболее.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Verbose,
    Debug,
    Info,
    Warn,
    Error,
    /// Нарушение инварианта. В `tracing` это `error!` с полем `assert = true`.
    Assert,
}

impl LogLevel {
    /// Буква уровня в начале строки.
    pub fn letter(self) -> char {
        match self {
            Self::Assert => 'A',
            Self::Error => 'E',
            Self::Warn => 'W',
            Self::Info => 'I',
            Self::Debug => 'D',
            Self::Verbose => 'V',
        }
    }

    /// Цвет строки.
    pub fn style(self) -> Style {
        match self {
            Self::Assert => Style::new().magenta(),
            Self::Error => Style::new().red(),
            Self::Warn => Style::new().yellow(),
            Self::Info => Style::new().cyan(),
            Self::Debug => Style::new().green(),
            Self::Verbose => Style::new().blue(),
        }
    }

    /// Уровень `tracing` → уровень строки.
    pub fn from_tracing(
        level: &Level,
        assert: bool,
    ) -> Self {
        match *level {
            Level::ERROR if assert => Self::Assert,
            Level::ERROR => Self::Error,
            Level::WARN => Self::Warn,
            Level::INFO => Self::Info,
            Level::DEBUG => Self::Debug,
            Level::TRACE => Self::Verbose,
        }
    }
}
