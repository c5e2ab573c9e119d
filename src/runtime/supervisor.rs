//! Запуск и надзор за ролями ретранслятора.
//!
//! ```text
//!   Supervisor::start
//!     ├─ forwarder: bind ──ready(BoundAddrs)──┐   relay ...
//!     │                                       ▼
//!     ├─ publisher:   connect(addrs.publish)   run ...
//!     └─ subscriber*: connect(addrs.subscribe) run ...
//! ```
//!
//! Издатель и подписчики стартуют только после сигнала готовности
//! форвардера, поэтому им не нужна пауза «на всякий случай». Фатальная
//! ошибка любой роли отменяет все остальные.

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, Instrument};
use zrelay_error::{ErrorExt, RelayError, SetupError};

use super::roles::{RoleExit, RoleResult, RoleSet};
use crate::{
    config::Settings,
    proxy::{BoundAddrs, ForwarderHandle, ProxyForwarder},
    pubsub::{
        Frame, PublishSchedule, PublishSummary, PublisherEndpoint, SubscribeSummary,
        SubscriberEndpoint, SubscriberOptions, TopicFilter,
    },
};

/// Фрейм, доставленный подписчику с именем `subscriber`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub subscriber: String,
    pub frame: Frame,
}

/// Итог штатной работы всех ролей.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayReport {
    pub publisher: Option<PublishSummary>,
    pub subscribers: Vec<(String, SubscribeSummary)>,
}

/// Собирает роли из настроек и запускает их.
pub struct Supervisor {
    settings: Settings,
    delivery: Option<mpsc::UnboundedSender<Delivery>>,
}

/// Запущенные роли.
pub struct RunningRelay {
    addrs: BoundAddrs,
    forwarder: ForwarderHandle,
    roles: RoleSet,
    token: CancellationToken,
}

impl Supervisor {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            delivery: None,
        }
    }

    /// Дублирует каждый принятый подписчиками фрейм в канал.
    pub fn with_delivery(
        mut self,
        tx: mpsc::UnboundedSender<Delivery>,
    ) -> Self {
        self.delivery = Some(tx);
        self
    }

    /// Запускает форвардер, ждёт его готовности, затем запускает издателя и
    /// подписчиков на реально открытых адресах.
    pub async fn start(
        self,
        shutdown: &CancellationToken,
    ) -> Result<RunningRelay, RelayError> {
        if let Err(e) = self.settings.validate() {
            let e = SetupError::from(e);
            error!(error = %e, code = e.status_code().code(), "invalid settings");
            return Err(e.into());
        }

        let token = shutdown.child_token();
        let mut roles = RoleSet::new();

        let forwarder = ProxyForwarder::new(self.settings.proxy_config());
        let handle = forwarder.handle();
        let (ready_tx, ready_rx) = oneshot::channel();
        roles.spawn(
            "forwarder",
            forwarder_role(forwarder, token.child_token(), ready_tx)
                .instrument(info_span!("forwarder")),
        );

        let addrs = match ready_rx.await {
            Ok(addrs) => addrs,
            Err(_) => {
                // Форвардер не открыл адреса; его собственная ошибка уже в
                // журнале и придёт из задачи.
                token.cancel();
                return Err(match roles.join_next().await {
                    Some((_, Err(e))) => e,
                    _ => SetupError::ReadinessLost { role: "forwarder" }.into(),
                });
            }
        };

        roles.spawn(
            "publisher",
            publisher_role(
                addrs.publish.to_string(),
                self.settings.publish_schedule(),
                token.child_token(),
            )
            .instrument(info_span!("publisher")),
        );

        let options = self.settings.subscriber_options();
        for (name, filter) in self.settings.subscriber_filters() {
            roles.spawn(
                name.clone(),
                subscriber_role(
                    name.clone(),
                    addrs.subscribe.to_string(),
                    filter,
                    options.clone(),
                    token.child_token(),
                    self.delivery.clone(),
                )
                .instrument(info_span!("subscriber", %name)),
            );
        }

        Ok(RunningRelay {
            addrs,
            forwarder: handle,
            roles,
            token,
        })
    }

    /// `start` и `wait` вместе.
    pub async fn run(
        self,
        shutdown: &CancellationToken,
    ) -> Result<RelayReport, RelayError> {
        self.start(shutdown).await?.wait().await
    }
}

impl RunningRelay {
    pub fn addrs(&self) -> BoundAddrs {
        self.addrs
    }

    pub fn forwarder(&self) -> &ForwarderHandle {
        &self.forwarder
    }

    /// Останавливает все роли и ждёт их завершения.
    pub async fn shutdown(self) -> Result<RelayReport, RelayError> {
        self.token.cancel();
        self.wait().await
    }

    /// Ждёт завершения всех ролей.
    ///
    /// Первая фатальная ошибка отменяет остальные роли и возвращается после
    /// того, как они завершатся. Штатное завершение роли (например, конец
    /// потока у подписчика) остальных не останавливает.
    pub async fn wait(mut self) -> Result<RelayReport, RelayError> {
        let mut report = RelayReport::default();
        let mut failure: Option<RelayError> = None;

        while let Some((role, res)) = self.roles.join_next().await {
            match res {
                Ok(RoleExit::Publisher(summary)) => report.publisher = Some(summary),
                Ok(RoleExit::Subscriber(summary)) => report.subscribers.push((role, summary)),
                Ok(RoleExit::Forwarder | RoleExit::Aborted) => {}
                Err(e) => {
                    if failure.is_none() {
                        self.token.cancel();
                        failure = Some(e);
                    }
                }
            }
        }

        match failure {
            Some(e) => Err(e),
            None => {
                info!("all roles stopped");
                Ok(report)
            }
        }
    }
}

impl Drop for RunningRelay {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn forwarder_role(
    forwarder: ProxyForwarder,
    token: CancellationToken,
    ready: oneshot::Sender<BoundAddrs>,
) -> RoleResult {
    // Ошибка bind уже записана форвардером; `ready` закрывается без значения.
    let bound = forwarder.bind(token).await?;
    let _ = ready.send(bound.local_addrs());
    bound.relay().await?;
    Ok(RoleExit::Forwarder)
}

async fn publisher_role(
    address: String,
    schedule: PublishSchedule,
    token: CancellationToken,
) -> RoleResult {
    let publisher = match PublisherEndpoint::connect(address).await {
        Ok(publisher) => publisher,
        Err(e) => {
            error!(error = %e, code = e.status_code().code(), "unable to create publisher");
            return Err(e.into());
        }
    };
    Ok(RoleExit::Publisher(publisher.run(schedule, token).await))
}

async fn subscriber_role(
    name: String,
    address: String,
    filter: TopicFilter,
    options: SubscriberOptions,
    token: CancellationToken,
    delivery: Option<mpsc::UnboundedSender<Delivery>>,
) -> RoleResult {
    let subscriber = match SubscriberEndpoint::connect(name.clone(), &address, filter, options).await
    {
        Ok(subscriber) => subscriber,
        Err(e) => {
            error!(error = %e, code = e.status_code().code(), "unable to create subscriber");
            return Err(e.into());
        }
    };

    let summary = subscriber
        .run(token, |frame| {
            if let Some(tx) = &delivery {
                let _ = tx.send(Delivery {
                    subscriber: name.clone(),
                    frame,
                });
            }
        })
        .await;
    Ok(RoleExit::Subscriber(summary))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::{net::TcpListener, time::timeout};

    use super::*;
    use crate::{config::SubscriberSettings, proxy::ForwarderState};

    fn local_settings() -> Settings {
        Settings {
            publish_addr: "127.0.0.1:0".into(),
            subscribe_addr: "127.0.0.1:0".into(),
            publish_interval_ms: 20,
            ..Settings::default()
        }
    }

    /// Тест проверяет, что некорректные настройки отклоняются до запуска
    /// ролей.
    #[tokio::test]
    async fn test_invalid_settings_are_fatal() {
        let settings = Settings {
            subscribers: vec![SubscriberSettings {
                name: "empty".into(),
                prefixes: vec![],
            }],
            ..local_settings()
        };
        let err = Supervisor::new(settings)
            .start(&CancellationToken::new())
            .await
            .err()
            .unwrap();
        assert!(err.is_fatal());
    }

    /// Тест проверяет, что ошибка bind форвардера возвращается из `start`, а
    /// издатель и подписчик не запускаются.
    #[tokio::test]
    async fn test_bind_failure_is_returned() {
        let held = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let settings = Settings {
            subscribe_addr: held.local_addr().unwrap().to_string(),
            ..local_settings()
        };

        let err = Supervisor::new(settings)
            .start(&CancellationToken::new())
            .await
            .err()
            .unwrap();
        match err {
            RelayError::Setup(e) => assert!(e.is_address_in_use(), "{e}"),
            other => panic!("unexpected: {other}"),
        }
    }

    /// Тест проверяет полный цикл: фреймы доходят до подписчика, отмена
    /// останавливает все роли.
    #[tokio::test]
    async fn test_start_deliver_and_shutdown() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let relay = Supervisor::new(local_settings())
            .with_delivery(tx)
            .start(&shutdown)
            .await
            .unwrap();
        let mut handle = relay.forwarder().clone();
        assert_eq!(
            handle.wait_for(|s| s == ForwarderState::Relaying).await,
            Some(ForwarderState::Relaying)
        );

        let delivery = timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(delivery.subscriber, "subscriber");
        assert_eq!(delivery.frame.as_bytes(), b"topic:hello world");

        shutdown.cancel();
        let report = timeout(Duration::from_secs(5), relay.wait())
            .await
            .unwrap()
            .unwrap();
        assert!(report.publisher.unwrap().sent >= 1);
        assert_eq!(report.subscribers.len(), 1);
    }
}
