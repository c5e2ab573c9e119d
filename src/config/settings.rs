use std::{path::PathBuf, time::Duration};

use ::config::{Config, Environment};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{
    error::ConfigError,
    logging::LoggingConfig,
    network::DEFAULT_MAX_FRAME_LEN,
    proxy::ProxyConfig,
    pubsub::{PublishSchedule, SubscriberOptions, TopicFilter},
};

pub const DEFAULT_PUBLISH_ADDR: &str = "127.0.0.1:3327";
pub const DEFAULT_SUBSCRIBE_ADDR: &str = "127.0.0.1:3328";

/// Один подписчик и его префиксы.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberSettings {
    pub name: String,
    pub prefixes: Vec<String>,
}

/// Настройки процесса.
///
/// Значения по умолчанию повторяют демонстрационную конфигурацию: один
/// издатель шлёт `topic:hello world` раз в две секунды, один подписчик
/// слушает `topic:`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub publish_addr: String,
    pub subscribe_addr: String,
    pub topic: String,
    pub payload: String,
    pub publish_interval_ms: u64,
    pub subscribers: Vec<SubscriberSettings>,
    /// Короткая форма для окружения: `ZRELAY_SUBSCRIPTIONS=topic:,other:`
    /// заменяет список подписчиков одним подписчиком с этими префиксами.
    pub subscriptions: Option<Vec<String>>,
    pub ingress_capacity: usize,
    pub egress_capacity: usize,
    pub max_frame_len: usize,
    pub recv_timeout_ms: Option<u64>,
    pub error_backoff_ms: u64,
    pub log_level: String,
    pub log_ansi: Option<bool>,
    pub log_tag_width: usize,
    pub log_file_dir: Option<PathBuf>,
}

impl Settings {
    /// Значения по умолчанию, поверх них переменные окружения `ZRELAY_*`.
    pub fn load() -> Result<Self, ConfigError> {
        let cfg = Config::builder()
            // Значения по умолчанию для адресов рандеву
            .set_default("publish_addr", DEFAULT_PUBLISH_ADDR)?
            .set_default("subscribe_addr", DEFAULT_SUBSCRIBE_ADDR)?
            // Переменные окружения с префиксом ZRELAY_
            .add_source(
                Environment::with_prefix("ZRELAY")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("subscriptions")
                    .try_parsing(true),
            )
            .build()?;

        let mut settings: Settings = cfg.try_deserialize()?;
        settings.apply_subscriptions();
        settings.validate()?;
        Ok(settings)
    }

    fn apply_subscriptions(&mut self) {
        if let Some(prefixes) = self.subscriptions.take() {
            self.subscribers = vec![SubscriberSettings {
                name: "subscriber".into(),
                prefixes,
            }];
        }
    }

    /// Проверяет согласованность настроек.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.publish_addr.trim().is_empty() || self.subscribe_addr.trim().is_empty() {
            return Err(ConfigError::Invalid("addresses must not be empty".into()));
        }
        if self.publish_addr == self.subscribe_addr && !is_ephemeral(&self.publish_addr) {
            return Err(ConfigError::Invalid(format!(
                "publish and subscribe addresses must differ (both {})",
                self.publish_addr
            )));
        }
        if self.publish_interval_ms == 0 {
            return Err(ConfigError::Invalid("publish interval must be positive".into()));
        }
        if self.ingress_capacity == 0 || self.egress_capacity == 0 {
            return Err(ConfigError::Invalid("queue capacities must be positive".into()));
        }
        if self.max_frame_len == 0 {
            return Err(ConfigError::Invalid("max frame length must be positive".into()));
        }
        if let Some(sub) = self.subscribers.iter().find(|s| s.prefixes.is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "subscriber {} has no topic prefixes",
                sub.name
            )));
        }
        self.logging()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }

    pub fn proxy_config(&self) -> ProxyConfig {
        ProxyConfig {
            publish_addr: self.publish_addr.clone(),
            subscribe_addr: self.subscribe_addr.clone(),
            ingress_capacity: self.ingress_capacity,
            egress_capacity: self.egress_capacity,
            max_frame_len: self.max_frame_len,
        }
    }

    pub fn publish_schedule(&self) -> PublishSchedule {
        PublishSchedule {
            topic: Bytes::from(self.topic.clone()),
            payload: Bytes::from(self.payload.clone()),
            interval: Duration::from_millis(self.publish_interval_ms),
        }
    }

    pub fn subscriber_options(&self) -> SubscriberOptions {
        SubscriberOptions {
            max_frame_len: self.max_frame_len,
            recv_timeout: self.recv_timeout_ms.map(Duration::from_millis),
            error_backoff: Duration::from_millis(self.error_backoff_ms),
        }
    }

    /// Подписчики с готовыми фильтрами.
    pub fn subscriber_filters(&self) -> Vec<(String, TopicFilter)> {
        self.subscribers
            .iter()
            .map(|s| (s.name.clone(), TopicFilter::with_prefixes(&s.prefixes)))
            .collect()
    }

    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.log_level.clone(),
            ansi: self.log_ansi,
            tag_width: self.log_tag_width,
            file_dir: self.log_file_dir.clone(),
            ..LoggingConfig::default()
        }
    }
}

/// Порт 0 — разные адреса будут выделены при открытии.
fn is_ephemeral(addr: &str) -> bool {
    addr.rsplit(':').next() == Some("0")
}

impl Default for Settings {
    fn default() -> Self {
        let logging = LoggingConfig::default();
        Self {
            publish_addr: DEFAULT_PUBLISH_ADDR.into(),
            subscribe_addr: DEFAULT_SUBSCRIBE_ADDR.into(),
            topic: "topic:".into(),
            payload: "hello world".into(),
            publish_interval_ms: 2000,
            subscribers: vec![SubscriberSettings {
                name: "subscriber".into(),
                prefixes: vec!["topic:".into()],
            }],
            subscriptions: None,
            ingress_capacity: 1024,
            egress_capacity: 1024,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            recv_timeout_ms: None,
            error_backoff_ms: 10,
            log_level: logging.level,
            log_ansi: logging.ansi,
            log_tag_width: logging.tag_width,
            log_file_dir: logging.file_dir,
        }
    }
}
