use tracing_subscriber::EnvFilter;

use crate::logging::config::LoggingConfig;

/// Фильтр событий: `RUST_LOG`, если задан, иначе уровень из конфигурации.
///
/// Некорректная директива из конфигурации заменяется на `info`.
pub fn build_filter(config: &LoggingConfig) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    match EnvFilter::try_new(&config.level) {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!(
                "Invalid log filter directive '{}': {e}; falling back to 'info'",
                config.level
            );
            EnvFilter::new("info")
        }
    }
}
