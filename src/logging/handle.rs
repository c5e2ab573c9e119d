use tracing_appender::non_blocking::WorkerGuard;

/// Handle для управления жизненным циклом журнала.
///
/// Держит guard файлового писателя: пока handle жив, фоновый поток
/// дописывает строки в файл. `shutdown()` сбрасывает остаток явно.
#[derive(Default)]
pub struct LoggingHandle {
    file_guard: Option<WorkerGuard>,
}

impl LoggingHandle {
    pub fn new(file_guard: Option<WorkerGuard>) -> Self {
        Self { file_guard }
    }

    pub fn has_file_sink(&self) -> bool {
        self.file_guard.is_some()
    }

    /// Сбрасывает буферы и закрывает файловый писатель.
    pub fn shutdown(mut self) {
        if let Some(guard) = self.file_guard.take() {
            tracing::debug!("flushing log file");
            drop(guard);
        }
    }
}
