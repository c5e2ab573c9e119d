//! Формат строки диагностического журнала.
//!
//! ```text
//! <цвет><L>/<tag, выровненный по ширине>[yyyy-mm-dd hh:mm:ss.uuuuuu] (func:line)<сообщение><сброс>
//! ```

use chrono::{DateTime, TimeZone};
use owo_colors::OwoColorize;

use super::level::LogLevel;

/// Формат метки времени: дата, время и микросекунды.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
/// Ширина поля тега по умолчанию.
pub const DEFAULT_TAG_WIDTH: usize = 16;

/// Одна запись журнала до форматирования.
#[derive(Debug, Clone, Copy)]
pub struct LogRecord<'a> {
    pub level: LogLevel,
    pub tag: &'a str,
    pub func: &'a str,
    pub line: u32,
    pub message: &'a str,
}

/// Собирает строку журнала вместе с завершающим переводом строки.
pub fn format_line<Tz>(
    record: &LogRecord<'_>,
    timestamp: &DateTime<Tz>,
    tag_width: usize,
    ansi: bool,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let body = format!(
        "{}/{:<width$}[{}] ({}:{}){}",
        record.level.letter(),
        record.tag,
        timestamp.format(TIMESTAMP_FORMAT),
        record.func,
        record.line,
        record.message,
        width = tag_width,
    );

    if ansi {
        format!("{}\n", body.style(record.level.style()))
    } else {
        body + "\n"
    }
}
