//! Выходная сторона прокси (адрес для подписчиков).
//!
//! Каждый ретранслируемый фрейм рассылается всем подключённым подписчикам
//! через `broadcast`-канал, по одной пишущей задаче на подписчика. Прокси
//! не ждёт медленного получателя: отставший подписчик теряет переполнение.

use std::{io, net::SocketAddr, sync::Arc};

use tokio::{
    io::AsyncReadExt,
    net::{TcpListener, TcpStream},
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};
use zrelay_error::{SetupError, TransportError};

use super::{
    framing::FrameWriter,
    listener::{accept_next, bind_listener},
    peers::{PeerInfo, PeerRegistry, PeerRole},
};
use crate::pubsub::Frame;

const ROLE: &str = "egress";

/// Слушатель выходной стороны.
pub struct Egress {
    local_addr: SocketAddr,
    tx: broadcast::Sender<Frame>,
    acceptor: JoinHandle<Result<(), TransportError>>,
    acceptor_done: bool,
}

impl Egress {
    /// Открывает адрес и запускает цикл приёма подписчиков.
    pub async fn bind(
        address: &str,
        capacity: usize,
        peers: Arc<PeerRegistry>,
        token: CancellationToken,
    ) -> Result<Self, SetupError> {
        let (listener, local_addr) = bind_listener(ROLE, address).await?;
        let (tx, _) = broadcast::channel(capacity);

        let acceptor =
            tokio::spawn(accept_subscribers(listener, tx.clone(), peers, token).in_current_span());

        Ok(Self {
            local_addr,
            tx,
            acceptor,
            acceptor_done: false,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Отдаёт фрейм всем подписчикам. Возвращает число получателей.
    ///
    /// Ноль подписчиков не ошибка: фрейм просто никому не достаётся.
    pub fn publish(
        &self,
        frame: Frame,
    ) -> usize {
        self.tx.send(frame).unwrap_or(0)
    }

    /// Завершается, когда слушатель перестал принимать соединения.
    pub async fn failed(&mut self) -> TransportError {
        if self.acceptor_done {
            return std::future::pending().await;
        }

        let res = (&mut self.acceptor).await;
        self.acceptor_done = true;
        match res {
            Ok(Ok(())) => TransportError::Closed,
            Ok(Err(e)) => e,
            Err(join) => TransportError::Accept {
                role: ROLE,
                source: io::Error::other(join.to_string()),
            },
        }
    }
}

impl Drop for Egress {
    fn drop(&mut self) {
        self.acceptor.abort();
    }
}

async fn accept_subscribers(
    listener: TcpListener,
    tx: broadcast::Sender<Frame>,
    peers: Arc<PeerRegistry>,
    token: CancellationToken,
) -> Result<(), TransportError> {
    loop {
        let (stream, addr) = tokio::select! {
            _ = token.cancelled() => return Ok(()),
            res = accept_next(ROLE, &listener) => res?,
        };

        // Подписка оформляется до регистрации: зарегистрированный пир уже
        // получает все последующие фреймы.
        let rx = tx.subscribe();
        let peer = peers.register(addr, PeerRole::Subscriber);
        info!(peer_id = peer.id, %addr, "subscriber connected");

        tokio::spawn(
            write_subscriber(stream, peer, rx, peers.clone(), token.clone()).in_current_span(),
        );
    }
}

/// Пересылает фреймы одному подписчику.
async fn write_subscriber(
    stream: TcpStream,
    peer: Arc<PeerInfo>,
    mut rx: broadcast::Receiver<Frame>,
    peers: Arc<PeerRegistry>,
    token: CancellationToken,
) {
    let (mut read_half, write_half) = stream.into_split();
    let mut writer = FrameWriter::new(write_half);
    let mut probe = [0u8; 64];

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            msg = rx.recv() => match msg {
                Ok(frame) => {
                    let written = tokio::select! {
                        _ = token.cancelled() => break,
                        res = writer.write_frame(&frame) => res,
                    };
                    if let Err(e) = written {
                        debug!(peer_id = peer.id, error = %e, "subscriber write failed");
                        break;
                    }
                    peer.record_frame(frame.len());
                }
                Err(RecvError::Lagged(dropped)) => {
                    warn!(peer_id = peer.id, dropped, "slow subscriber, frames dropped");
                }
                Err(RecvError::Closed) => break,
            },
            // Подписчик ничего не отправляет. Чтение нужно только чтобы
            // заметить закрытие соединения.
            n = read_half.read(&mut probe) => match n {
                Ok(0) | Err(_) => {
                    debug!(peer_id = peer.id, "subscriber disconnected");
                    break;
                }
                Ok(_) => {}
            },
        }
    }

    let _ = writer.shutdown().await;
    if let Some(snap) = peers.unregister(peer.id) {
        info!(
            peer_id = snap.id,
            addr = %snap.addr,
            frames = snap.frames,
            bytes = snap.bytes,
            uptime_secs = snap.uptime_secs,
            "subscriber session closed"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::{sleep, timeout};

    use super::*;
    use crate::network::framing::{FrameReader, DEFAULT_MAX_FRAME_LEN};

    async fn wait_for_subscribers(
        peers: &PeerRegistry,
        n: usize,
    ) {
        timeout(Duration::from_secs(5), async {
            while peers.count(PeerRole::Subscriber) < n {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    /// Тест проверяет, что каждый подписчик получает каждый фрейм.
    #[tokio::test]
    async fn test_fan_out_to_all_subscribers() {
        let peers = Arc::new(PeerRegistry::new());
        let token = CancellationToken::new();
        let egress = Egress::bind("127.0.0.1:0", 16, peers.clone(), token.clone())
            .await
            .unwrap();

        let mut readers = Vec::new();
        for _ in 0..3 {
            let stream = TcpStream::connect(egress.local_addr()).await.unwrap();
            readers.push(FrameReader::new(stream, DEFAULT_MAX_FRAME_LEN));
        }
        wait_for_subscribers(&peers, 3).await;

        assert_eq!(egress.publish(Frame::from("topic:a")), 3);
        assert_eq!(egress.publish(Frame::from("other:b")), 3);

        for reader in &mut readers {
            let first = reader.read_frame().await.unwrap();
            let second = reader.read_frame().await.unwrap();
            assert_eq!(first.as_bytes(), b"topic:a");
            assert_eq!(second.as_bytes(), b"other:b");
        }

        token.cancel();
    }

    /// Тест проверяет, что публикация без подписчиков не является ошибкой.
    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let peers = Arc::new(PeerRegistry::new());
        let token = CancellationToken::new();
        let egress = Egress::bind("127.0.0.1:0", 4, peers, token.clone())
            .await
            .unwrap();
        assert_eq!(egress.publish(Frame::from("topic:nobody")), 0);
        token.cancel();
    }

    /// Тест проверяет, что закрытие соединения подписчиком убирает его из
    /// реестра.
    #[tokio::test]
    async fn test_subscriber_disconnect_unregisters() {
        let peers = Arc::new(PeerRegistry::new());
        let token = CancellationToken::new();
        let egress = Egress::bind("127.0.0.1:0", 4, peers.clone(), token.clone())
            .await
            .unwrap();

        let stream = TcpStream::connect(egress.local_addr()).await.unwrap();
        wait_for_subscribers(&peers, 1).await;
        drop(stream);

        timeout(Duration::from_secs(5), async {
            while peers.count(PeerRole::Subscriber) > 0 {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        token.cancel();
    }

    /// Тест проверяет, что отмена завершает цикл приёма без ошибки слушателя.
    #[tokio::test]
    async fn test_failed_after_cancel_is_closed() {
        let peers = Arc::new(PeerRegistry::new());
        let token = CancellationToken::new();
        let mut egress = Egress::bind("127.0.0.1:0", 4, peers, token.clone())
            .await
            .unwrap();
        token.cancel();

        let err = timeout(Duration::from_secs(5), egress.failed()).await.unwrap();
        assert!(matches!(err, TransportError::Closed));
    }
}
