use std::time::Duration;

use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};
use zrelay_error::{ErrorExt, SetupError, TransportError};

use super::{Frame, TopicFilter};
use crate::network::{listener::dial, FrameReader, DEFAULT_MAX_FRAME_LEN};

const ROLE: &str = "subscriber";

/// Параметры приёма.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberOptions {
    pub max_frame_len: usize,
    /// Сколько ждать следующего фрейма. `None` — ждать бесконечно.
    pub recv_timeout: Option<Duration>,
    /// Пауза после операционной ошибки приёма. Ноль — повторять сразу.
    pub error_backoff: Duration,
}

/// Почему цикл приёма завершился.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Cancelled,
    EndOfStream,
    Timeout,
}

/// Итог работы подписчика.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscribeSummary {
    pub received: u64,
    pub discarded: u64,
    pub errors: u64,
    pub exit: ExitReason,
}

/// Подписчик: подключается к выходному адресу прокси и получает фреймы,
/// прошедшие его фильтр тем.
///
/// Прокси отдаёт все фреймы; фильтр применяется здесь, несовпавшие фреймы
/// молча отбрасываются.
pub struct SubscriberEndpoint {
    name: String,
    filter: TopicFilter,
    reader: FrameReader<TcpStream>,
    options: SubscriberOptions,
    received: u64,
    discarded: u64,
}

impl SubscriberEndpoint {
    /// Регистрирует подписку и подключается к выходному адресу.
    ///
    /// Обе ошибки фатальны: пустой фильтр (`Subscribe`) и недоступный адрес
    /// (`Connect`).
    pub async fn connect(
        name: impl Into<String>,
        address: &str,
        filter: TopicFilter,
        options: SubscriberOptions,
    ) -> Result<Self, SetupError> {
        let name = name.into();
        if filter.is_empty() {
            return Err(SetupError::Subscribe {
                reason: format!("subscriber {name} has no topic prefixes"),
            });
        }

        let stream = dial(address).await.map_err(|source| SetupError::Connect {
            role: ROLE,
            address: address.to_string(),
            source,
        })?;
        debug!(%name, %address, prefixes = filter.len(), "subscriber connected");

        Ok(Self {
            name,
            reader: FrameReader::new(stream, options.max_frame_len),
            filter,
            options,
            received: 0,
            discarded: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn filter(&self) -> &TopicFilter {
        &self.filter
    }

    /// Следующий фрейм, прошедший фильтр.
    ///
    /// # Возвращает
    /// - `Ok(Frame)` — фрейм, начинающийся с одного из префиксов
    /// - `Err(Closed)` / `Err(Timeout)` — поток закончился
    /// - прочие ошибки операционные, приём можно продолжать
    ///
    /// После `Timeout` посреди фрейма поток может быть рассинхронизирован,
    /// поэтому `run` на нём завершается.
    pub async fn recv(&mut self) -> Result<Frame, TransportError> {
        loop {
            let frame = match self.options.recv_timeout {
                Some(limit) => tokio::time::timeout(limit, self.reader.read_frame())
                    .await
                    .map_err(|_| TransportError::Timeout)??,
                None => self.reader.read_frame().await?,
            };

            if self.filter.matches(frame.as_bytes()) {
                self.received += 1;
                return Ok(frame);
            }
            self.discarded += 1;
            trace!(len = frame.len(), "frame filtered out");
        }
    }

    /// Цикл приёма до отмены или конца потока.
    ///
    /// Каждый принятый фрейм отдаётся в `on_frame`. Операционные ошибки
    /// логируются, затем (если задана) выдерживается пауза `error_backoff`,
    /// и приём продолжается.
    pub async fn run<F>(
        mut self,
        shutdown: CancellationToken,
        mut on_frame: F,
    ) -> SubscribeSummary
    where
        F: FnMut(Frame),
    {
        let mut errors = 0u64;

        let exit = loop {
            let res = tokio::select! {
                _ = shutdown.cancelled() => break ExitReason::Cancelled,
                res = self.recv() => res,
            };

            match res {
                Ok(frame) => {
                    debug!(len = frame.len(), msg = %frame.to_string_lossy(), "recv msg");
                    on_frame(frame);
                }
                Err(TransportError::Timeout) => {
                    info!(name = %self.name, "no messages within timeout");
                    break ExitReason::Timeout;
                }
                Err(TransportError::Closed) => {
                    info!(name = %self.name, "connection closed");
                    break ExitReason::EndOfStream;
                }
                Err(e) => {
                    errors += 1;
                    error!(error = %e, code = e.status_code().code(), "unable to recv msg");
                    if !self.options.error_backoff.is_zero() {
                        tokio::select! {
                            _ = shutdown.cancelled() => break ExitReason::Cancelled,
                            _ = tokio::time::sleep(self.options.error_backoff) => {}
                        }
                    }
                }
            }
        };

        SubscribeSummary {
            received: self.received,
            discarded: self.discarded,
            errors,
            exit,
        }
    }
}

impl Default for SubscriberOptions {
    fn default() -> Self {
        Self {
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            recv_timeout: None,
            error_backoff: Duration::from_millis(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::{net::TcpListener, time::timeout};

    use super::*;
    use crate::network::FrameWriter;

    async fn pair(
        filter: TopicFilter,
        options: SubscriberOptions,
    ) -> (SubscriberEndpoint, FrameWriter<TcpStream>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let sub = SubscriberEndpoint::connect("test", &addr, filter, options)
            .await
            .unwrap();
        let (stream, _) = listener.accept().await.unwrap();
        (sub, FrameWriter::new(stream))
    }

    /// Тест проверяет, что подписка без префиксов отклоняется до подключения.
    #[tokio::test]
    async fn test_empty_filter_is_rejected() {
        let err = SubscriberEndpoint::connect(
            "empty",
            "127.0.0.1:1",
            TopicFilter::new(),
            SubscriberOptions::default(),
        )
        .await
        .err()
        .unwrap();
        assert!(matches!(err, SetupError::Subscribe { .. }));
    }

    /// Тест проверяет, что несовпавшие фреймы пропускаются молча.
    #[tokio::test]
    async fn test_recv_skips_non_matching() {
        let filter = TopicFilter::with_prefixes(["topic:"]);
        let (mut sub, mut writer) = pair(filter, SubscriberOptions::default()).await;

        writer.write_frame(&Frame::from("other:1")).await.unwrap();
        writer.write_frame(&Frame::from("topi")).await.unwrap();
        writer.write_frame(&Frame::from("topic:hello")).await.unwrap();

        let frame = timeout(Duration::from_secs(5), sub.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(frame.as_bytes(), b"topic:hello");
        assert_eq!(sub.discarded, 2);
    }

    /// Тест проверяет, что тишина дольше `recv_timeout` завершает цикл как
    /// штатный конец потока.
    #[tokio::test]
    async fn test_run_exits_on_timeout() {
        let options = SubscriberOptions {
            recv_timeout: Some(Duration::from_millis(50)),
            ..SubscriberOptions::default()
        };
        let (sub, _writer) = pair(TopicFilter::wildcard(), options).await;

        let summary = timeout(
            Duration::from_secs(5),
            sub.run(CancellationToken::new(), |_| {}),
        )
        .await
        .unwrap();
        assert_eq!(summary.exit, ExitReason::Timeout);
        assert_eq!(summary.errors, 0);
    }

    /// Тест проверяет, что закрытие соединения — штатный конец потока, а
    /// принятые до этого фреймы переданы в обработчик.
    #[tokio::test]
    async fn test_run_exits_on_close() {
        let (sub, mut writer) =
            pair(TopicFilter::with_prefixes(["a"]), SubscriberOptions::default()).await;
        writer.write_frame(&Frame::from("a1")).await.unwrap();
        writer.write_frame(&Frame::from("b1")).await.unwrap();
        writer.write_frame(&Frame::from("a2")).await.unwrap();
        drop(writer);

        let mut got = Vec::new();
        let summary = timeout(
            Duration::from_secs(5),
            sub.run(CancellationToken::new(), |f| got.push(f)),
        )
        .await
        .unwrap();

        assert_eq!(summary.exit, ExitReason::EndOfStream);
        assert_eq!(summary.received, 2);
        assert_eq!(summary.discarded, 1);
        assert_eq!(got, vec![Frame::from("a1"), Frame::from("a2")]);
    }

    /// Тест проверяет, что слишком большой фрейм считается операционной
    /// ошибкой и приём продолжается.
    #[tokio::test]
    async fn test_run_continues_after_oversized_frame() {
        let options = SubscriberOptions {
            max_frame_len: 8,
            error_backoff: Duration::ZERO,
            ..SubscriberOptions::default()
        };
        let (sub, mut writer) = pair(TopicFilter::wildcard(), options).await;
        writer
            .write_frame(&Frame::from("much too long frame"))
            .await
            .unwrap();
        writer.write_frame(&Frame::from("ok")).await.unwrap();
        drop(writer);

        let mut got = Vec::new();
        let summary = sub.run(CancellationToken::new(), |f| got.push(f)).await;
        assert_eq!(summary.errors, 1);
        assert_eq!(got, vec![Frame::from("ok")]);
        assert_eq!(summary.exit, ExitReason::EndOfStream);
    }

    /// Тест проверяет, что отмена прерывает ожидание фрейма.
    #[tokio::test]
    async fn test_run_cancelled() {
        let (sub, _writer) = pair(TopicFilter::wildcard(), SubscriberOptions::default()).await;
        let token = CancellationToken::new();
        token.cancel();
        let summary = sub.run(token, |_| {}).await;
        assert_eq!(summary.exit, ExitReason::Cancelled);
    }
}
