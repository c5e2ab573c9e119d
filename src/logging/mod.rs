//! Диагностический журнал.
//!
//! Компоненты пишут через макросы `tracing`; здесь собирается подписчик,
//! печатающий события в формате `L/tag[время] (func:line)сообщение`.

pub mod config;
mod filters;
pub mod format;
pub mod handle;
pub mod layer;
pub mod level;

use std::{fs, io};

pub use config::LoggingConfig;
pub use handle::LoggingHandle;
pub use layer::DiagnosticLayer;
pub use level::LogLevel;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::LoggingError;

/// Инициализация глобального журнала.
///
/// Консоль и файл (если задан каталог) получают один и тот же формат; в файл
/// цвет не пишется. Возвращённый handle нужно закрыть через `shutdown()`.
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingHandle, LoggingError> {
    config.validate()?;

    let filter = filters::build_filter(config);

    let console = config
        .console
        .then(|| build_layer(config, io::stdout()).with_ansi(config.console_ansi()));

    let (file, file_guard) = match &config.file_dir {
        Some(dir) => {
            fs::create_dir_all(dir).map_err(LoggingError::Io)?;
            let appender = tracing_appender::rolling::daily(dir, &config.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(build_layer(config, writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()?;

    tracing::debug!(
        level = %config.level,
        file = file_guard.is_some(),
        "logging initialized"
    );

    Ok(LoggingHandle::new(file_guard))
}

/// Слой журнала поверх произвольного писателя, без цвета.
///
/// Используется `init_logging` и тестами вместе с
/// `tracing::subscriber::with_default`.
pub fn build_layer<W>(
    config: &LoggingConfig,
    writer: W,
) -> DiagnosticLayer<W>
where
    W: io::Write + Send + 'static,
{
    DiagnosticLayer::new(writer).with_tag_width(config.tag_width)
}
