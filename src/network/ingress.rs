//! Входная сторона прокси (адрес для издателей).
//!
//! Каждое соединение издателя читается своей задачей, все задачи пишут в
//! одну ограниченную очередь. Эта очередь и есть точка сериализации: фреймы
//! уходят дальше в порядке получения.

use std::{io, net::SocketAddr, sync::Arc};

use tokio::{
    net::{TcpListener, TcpStream},
    sync::mpsc,
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};
use zrelay_error::{SetupError, TransportError};

use super::{
    framing::FrameReader,
    listener::{accept_next, bind_listener},
    peers::{PeerInfo, PeerRegistry, PeerRole},
};
use crate::pubsub::Frame;

const ROLE: &str = "ingress";

/// Слушатель входной стороны.
pub struct Ingress {
    local_addr: SocketAddr,
    frames: mpsc::Receiver<Frame>,
    acceptor: JoinHandle<Result<(), TransportError>>,
    acceptor_done: bool,
}

impl Ingress {
    /// Открывает адрес и запускает цикл приёма издателей.
    pub async fn bind(
        address: &str,
        capacity: usize,
        max_frame_len: usize,
        peers: Arc<PeerRegistry>,
        token: CancellationToken,
    ) -> Result<Self, SetupError> {
        let (listener, local_addr) = bind_listener(ROLE, address).await?;
        let (tx, frames) = mpsc::channel(capacity);

        let acceptor = tokio::spawn(accept_publishers(
            listener,
            tx,
            peers,
            max_frame_len,
            token,
        )
        .in_current_span());

        Ok(Self {
            local_addr,
            frames,
            acceptor,
            acceptor_done: false,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Ждёт следующий фрейм от любого издателя.
    ///
    /// Отсутствие издателей не ошибка: метод просто ждёт. Ошибка
    /// возвращается, только если слушатель перестал принимать соединения.
    pub async fn recv(&mut self) -> Result<Frame, TransportError> {
        tokio::select! {
            biased;

            Some(frame) = self.frames.recv() => Ok(frame),
            res = &mut self.acceptor, if !self.acceptor_done => {
                self.acceptor_done = true;
                match res {
                    Ok(Ok(())) => Err(TransportError::Closed),
                    Ok(Err(e)) => Err(e),
                    Err(join) => Err(TransportError::Accept {
                        role: ROLE,
                        source: io::Error::other(join.to_string()),
                    }),
                }
            }
            else => Err(TransportError::Closed),
        }
    }
}

impl Drop for Ingress {
    fn drop(&mut self) {
        self.acceptor.abort();
    }
}

async fn accept_publishers(
    listener: TcpListener,
    tx: mpsc::Sender<Frame>,
    peers: Arc<PeerRegistry>,
    max_frame_len: usize,
    token: CancellationToken,
) -> Result<(), TransportError> {
    loop {
        let (stream, addr) = tokio::select! {
            _ = token.cancelled() => return Ok(()),
            res = accept_next(ROLE, &listener) => res?,
        };

        let peer = peers.register(addr, PeerRole::Publisher);
        info!(peer_id = peer.id, %addr, "publisher connected");

        tokio::spawn(read_publisher(
            stream,
            peer,
            tx.clone(),
            peers.clone(),
            max_frame_len,
            token.clone(),
        )
        .in_current_span());
    }
}

/// Читает фреймы одного издателя и передаёт их в общую очередь.
async fn read_publisher(
    stream: TcpStream,
    peer: Arc<PeerInfo>,
    tx: mpsc::Sender<Frame>,
    peers: Arc<PeerRegistry>,
    max_frame_len: usize,
    token: CancellationToken,
) {
    let mut reader = FrameReader::new(stream, max_frame_len);

    loop {
        let res = tokio::select! {
            _ = token.cancelled() => break,
            res = reader.read_frame() => res,
        };

        match res {
            Ok(frame) => {
                peer.record_frame(frame.len());
                tokio::select! {
                    _ = token.cancelled() => break,
                    sent = tx.send(frame) => {
                        if sent.is_err() {
                            break;
                        }
                    }
                }
            }
            Err(e @ (TransportError::FrameTooLarge { .. } | TransportError::Allocation { .. })) => {
                warn!(peer_id = peer.id, error = %e, "frame dropped");
            }
            Err(TransportError::Closed) => {
                debug!(peer_id = peer.id, "publisher disconnected");
                break;
            }
            Err(e) => {
                warn!(peer_id = peer.id, error = %e, "publisher connection failed");
                break;
            }
        }
    }

    if let Some(snap) = peers.unregister(peer.id) {
        info!(
            peer_id = snap.id,
            addr = %snap.addr,
            frames = snap.frames,
            bytes = snap.bytes,
            uptime_secs = snap.uptime_secs,
            "publisher session closed"
        );
    }
}
