use std::{
    fmt::{self, Write as _},
    io::Write,
    sync::Arc,
};

use chrono::Local;
use parking_lot::Mutex;
use tracing::{
    field::{Field, Visit},
    Event, Subscriber,
};
use tracing_subscriber::{
    layer::{Context, Layer},
    registry::LookupSpan,
};

use super::{
    format::{format_line, LogRecord, DEFAULT_TAG_WIDTH},
    level::LogLevel,
};

/// Слой `tracing`, печатающий события в формате диагностического журнала.
///
/// Один мьютекс удерживается на всё время «метка времени + запись + flush»,
/// поэтому строки из разных задач никогда не перемешиваются.
pub struct DiagnosticLayer<W> {
    writer: Arc<Mutex<W>>,
    tag_width: usize,
    ansi: bool,
}

/// Поля события, собранные посетителем.
#[derive(Default)]
struct EventFields {
    message: String,
    tag: Option<String>,
    assert: bool,
    extra: String,
}

impl<W: Write + Send + 'static> DiagnosticLayer<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Arc::new(Mutex::new(writer)),
            tag_width: DEFAULT_TAG_WIDTH,
            ansi: false,
        }
    }

    pub fn with_tag_width(
        mut self,
        tag_width: usize,
    ) -> Self {
        self.tag_width = tag_width;
        self
    }

    pub fn with_ansi(
        mut self,
        ansi: bool,
    ) -> Self {
        self.ansi = ansi;
        self
    }
}

impl<S, W> Layer<S> for DiagnosticLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: Write + Send + 'static,
{
    fn on_event(
        &self,
        event: &Event<'_>,
        ctx: Context<'_, S>,
    ) {
        let meta = event.metadata();

        let mut fields = EventFields::default();
        event.record(&mut fields);
        let mut message = fields.message;
        message.push_str(&fields.extra);

        let tag = fields
            .tag
            .unwrap_or_else(|| default_tag(meta.target()).to_string());
        let func = ctx
            .event_span(event)
            .map(|span| span.name())
            .unwrap_or("-");

        let level = LogLevel::from_tracing(meta.level(), fields.assert);

        let mut writer = self.writer.lock();
        let line = format_line(
            &LogRecord {
                level,
                tag: &tag,
                func,
                line: meta.line().unwrap_or(0),
                message: &message,
            },
            &Local::now(),
            self.tag_width,
            self.ansi,
        );
        // Сбой вывода журнала не должен ронять роли.
        let _ = writer.write_all(line.as_bytes());
        let _ = writer.flush();
    }
}

/// Последний сегмент `target`: `zrelay::pubsub::subscriber` → `subscriber`.
fn default_tag(target: &str) -> &str {
    target.rsplit("::").next().unwrap_or(target)
}

impl Visit for EventFields {
    fn record_str(
        &mut self,
        field: &Field,
        value: &str,
    ) {
        match field.name() {
            "message" => self.message.push_str(value),
            "tag" => self.tag = Some(value.to_string()),
            name => {
                let _ = write!(self.extra, " {name}={value}");
            }
        }
    }

    fn record_bool(
        &mut self,
        field: &Field,
        value: bool,
    ) {
        if field.name() == "assert" {
            self.assert = value;
        } else {
            let _ = write!(self.extra, " {}={value}", field.name());
        }
    }

    fn record_debug(
        &mut self,
        field: &Field,
        value: &dyn fmt::Debug,
    ) {
        match field.name() {
            "message" => {
                let _ = write!(self.message, "{value:?}");
            }
            "tag" => self.tag = Some(format!("{value:?}")),
            name => {
                let _ = write!(self.extra, " {name}={value:?}");
            }
        }
    }
}
