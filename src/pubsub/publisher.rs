use std::time::Duration;

use bytes::Bytes;
use tokio::{
    net::TcpStream,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use zrelay_error::{SetupError, TransportError};

use super::Frame;
use crate::network::{listener::dial, FrameWriter};

const ROLE: &str = "publisher";

/// Что и как часто публиковать.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishSchedule {
    /// Префикс темы; фрейм = `topic ++ payload`.
    pub topic: Bytes,
    pub payload: Bytes,
    /// Период между публикациями. Первая публикация через один период.
    pub interval: Duration,
}

/// Итог работы издателя.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishSummary {
    pub sent: u64,
    pub failed: u64,
}

/// Издатель: подключается к входному адресу прокси и отправляет фреймы.
pub struct PublisherEndpoint {
    address: String,
    writer: Option<FrameWriter<TcpStream>>,
    summary: PublishSummary,
}

impl PublisherEndpoint {
    /// Подключается к входному адресу прокси.
    ///
    /// Ошибка подключения фатальна: без соединения издатель не существует.
    pub async fn connect(address: impl Into<String>) -> Result<Self, SetupError> {
        let address = address.into();
        let stream = dial(&address).await.map_err(|source| SetupError::Connect {
            role: ROLE,
            address: address.clone(),
            source,
        })?;
        debug!(%address, "publisher connected");

        Ok(Self {
            address,
            writer: Some(FrameWriter::new(stream)),
            summary: PublishSummary::default(),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_connected(&self) -> bool {
        self.writer.is_some()
    }

    pub fn summary(&self) -> PublishSummary {
        self.summary
    }

    /// Отправляет один фрейм.
    ///
    /// Ошибка операционная. После ошибки отправки соединение сбрасывается, и
    /// следующий вызов переподключается.
    pub async fn publish(
        &mut self,
        frame: &Frame,
    ) -> Result<(), TransportError> {
        let res = self.try_publish(frame).await;
        match res {
            Ok(()) => self.summary.sent += 1,
            Err(_) => self.summary.failed += 1,
        }
        res
    }

    async fn try_publish(
        &mut self,
        frame: &Frame,
    ) -> Result<(), TransportError> {
        let mut writer = match self.writer.take() {
            Some(writer) => writer,
            None => {
                let stream = dial(&self.address).await.map_err(TransportError::Send)?;
                debug!(address = %self.address, "publisher reconnected");
                FrameWriter::new(stream)
            }
        };

        // Сломанное соединение не возвращается на место.
        writer.write_frame(frame).await?;
        self.writer = Some(writer);
        Ok(())
    }

    /// Публикует `topic ++ payload` каждый период до отмены.
    ///
    /// Ошибки сборки и отправки фрейма логируются, цикл переходит к
    /// следующему периоду: тот же фрейм повторно не отправляется.
    pub async fn run(
        mut self,
        schedule: PublishSchedule,
        shutdown: CancellationToken,
    ) -> PublishSummary {
        let mut ticker = interval_at(Instant::now() + schedule.interval, schedule.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let frame = match Frame::compose(&schedule.topic, &schedule.payload) {
                Ok(frame) => frame,
                Err(e) => {
                    self.summary.failed += 1;
                    error!(error = %e, "unable to allocate msg");
                    continue;
                }
            };

            let res = tokio::select! {
                _ = shutdown.cancelled() => break,
                res = self.publish(&frame) => res,
            };
            match res {
                Ok(()) => debug!(len = frame.len(), "send msg"),
                Err(e) => error!(error = %e, "unable to send msg"),
            }
        }

        info!(sent = self.summary.sent, failed = self.summary.failed, "publisher stopped");
        self.summary
    }
}

#[cfg(test)]
mod tests {
    use std::io::ErrorKind;

    use tokio::{net::TcpListener, time::timeout};

    use super::*;
    use crate::network::{FrameReader, DEFAULT_MAX_FRAME_LEN};

    /// Тест проверяет, что недоступный адрес — фатальная ошибка подключения.
    #[tokio::test]
    async fn test_connect_refused_is_setup_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = PublisherEndpoint::connect(addr.to_string())
            .await
            .err()
            .unwrap();
        match err {
            SetupError::Connect { role, source, .. } => {
                assert_eq!(role, "publisher");
                assert_eq!(source.kind(), ErrorKind::ConnectionRefused);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    /// Тест проверяет, что `run` публикует фрейм `topic ++ payload` каждый
    /// период.
    #[tokio::test]
    async fn test_run_publishes_composed_frames() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let publisher = PublisherEndpoint::connect(addr.to_string()).await.unwrap();
        let (stream, _) = listener.accept().await.unwrap();
        let mut reader = FrameReader::new(stream, DEFAULT_MAX_FRAME_LEN);

        let token = CancellationToken::new();
        let schedule = PublishSchedule {
            topic: Bytes::from_static(b"topic:"),
            payload: Bytes::from_static(b"hello world"),
            interval: Duration::from_millis(10),
        };
        let task = tokio::spawn(publisher.run(schedule, token.clone()));

        for _ in 0..3 {
            let frame = timeout(Duration::from_secs(5), reader.read_frame())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(frame.as_bytes(), b"topic:hello world");
        }

        token.cancel();
        let summary = task.await.unwrap();
        assert!(summary.sent >= 3);
    }

    /// Тест проверяет, что после обрыва издатель переподключается на
    /// следующей отправке.
    #[tokio::test]
    async fn test_publish_reconnects_after_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut publisher = PublisherEndpoint::connect(addr.to_string()).await.unwrap();
        let (first, _) = listener.accept().await.unwrap();
        drop(first);

        // Запись в закрытое соединение рано или поздно завершится ошибкой.
        let mut failed = false;
        for _ in 0..100 {
            if publisher.publish(&Frame::from("topic:x")).await.is_err() {
                failed = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(failed);
        assert!(!publisher.is_connected());

        let accept = tokio::spawn(async move { listener.accept().await.unwrap().0 });
        publisher.publish(&Frame::from("topic:y")).await.unwrap();
        let second = accept.await.unwrap();

        let mut reader = FrameReader::new(second, DEFAULT_MAX_FRAME_LEN);
        assert_eq!(reader.read_frame().await.unwrap().as_bytes(), b"topic:y");
        assert!(publisher.summary().failed >= 1);
    }

    /// Тест проверяет, что цикл `run` переживает ошибку отправки: следующие
    /// периоды приходят по новому соединению, ошибка учтена в итогах.
    #[tokio::test]
    async fn test_run_survives_send_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let publisher = PublisherEndpoint::connect(addr.to_string()).await.unwrap();
        let (first, _) = listener.accept().await.unwrap();
        drop(first);

        let token = CancellationToken::new();
        let schedule = PublishSchedule {
            topic: Bytes::from_static(b"topic:"),
            payload: Bytes::from_static(b"again"),
            interval: Duration::from_millis(10),
        };
        let task = tokio::spawn(publisher.run(schedule, token.clone()));

        let (second, _) = timeout(Duration::from_secs(5), listener.accept())
            .await
            .unwrap()
            .unwrap();
        let mut reader = FrameReader::new(second, DEFAULT_MAX_FRAME_LEN);
        let frame = timeout(Duration::from_secs(5), reader.read_frame())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(frame.as_bytes(), b"topic:again");

        token.cancel();
        let summary = task.await.unwrap();
        assert!(summary.failed >= 1, "{summary:?}");
        assert!(summary.sent >= 1, "{summary:?}");
    }
}
