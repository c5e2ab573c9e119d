use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use tokio::sync::watch;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{error, info, trace};
use zrelay_error::{ErrorExt, RelayError, SetupError, TransportError};

use super::state::ForwarderState;
use crate::network::{Egress, Ingress, PeerRegistry, PeerRole, DEFAULT_MAX_FRAME_LEN};

/// Параметры прокси.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Адрес для издателей (входная сторона).
    pub publish_addr: String,
    /// Адрес для подписчиков (выходная сторона).
    pub subscribe_addr: String,
    /// Ёмкость общей очереди входной стороны.
    pub ingress_capacity: usize,
    /// Сколько фреймов подписчик может отстать, прежде чем начнёт терять.
    pub egress_capacity: usize,
    pub max_frame_len: usize,
}

/// Реально открытые адреса (с учётом порта 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundAddrs {
    pub publish: SocketAddr,
    pub subscribe: SocketAddr,
}

/// Статистика прокси.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProxyStats {
    pub publishers: usize,
    pub subscribers: usize,
    pub frames_relayed: u64,
    pub bytes_relayed: u64,
}

#[derive(Debug, Default)]
struct RelayCounters {
    frames: AtomicU64,
    bytes: AtomicU64,
}

/// Прокси-форвардер: пересылает каждый фрейм с входной стороны на выходную
/// без изменений и в порядке получения.
///
/// Содержимое фреймов не анализируется: фильтрация по теме целиком на
/// стороне подписчика.
#[derive(Debug)]
pub struct ProxyForwarder {
    config: ProxyConfig,
    state: Arc<watch::Sender<ForwarderState>>,
    peers: Arc<PeerRegistry>,
    counters: Arc<RelayCounters>,
}

/// Форвардер с открытыми адресами, готовый к ретрансляции.
pub struct BoundForwarder {
    ingress: Ingress,
    egress: Egress,
    state: Arc<watch::Sender<ForwarderState>>,
    counters: Arc<RelayCounters>,
    peers: Arc<PeerRegistry>,
    shutdown: CancellationToken,
    _listeners: DropGuard,
}

/// Наблюдатель за форвардером из других задач.
#[derive(Debug, Clone)]
pub struct ForwarderHandle {
    state: watch::Receiver<ForwarderState>,
    peers: Arc<PeerRegistry>,
    counters: Arc<RelayCounters>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl ProxyForwarder {
    pub fn new(config: ProxyConfig) -> Self {
        let (state, _) = watch::channel(ForwarderState::Init);
        Self {
            config,
            state: Arc::new(state),
            peers: Arc::new(PeerRegistry::new()),
            counters: Arc::new(RelayCounters::default()),
        }
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub fn state(&self) -> ForwarderState {
        *self.state.borrow()
    }

    pub fn handle(&self) -> ForwarderHandle {
        ForwarderHandle {
            state: self.state.subscribe(),
            peers: self.peers.clone(),
            counters: self.counters.clone(),
        }
    }

    /// Открывает оба адреса: сначала выходной, затем входной.
    ///
    /// Любая ошибка переводит форвардер в `Failed`; уже открытый адрес при
    /// этом закрывается.
    pub async fn bind(
        self,
        shutdown: CancellationToken,
    ) -> Result<BoundForwarder, SetupError> {
        let listeners = shutdown.child_token();

        let egress = match Egress::bind(
            &self.config.subscribe_addr,
            self.config.egress_capacity,
            self.peers.clone(),
            listeners.clone(),
        )
        .await
        {
            Ok(egress) => egress,
            Err(e) => return Err(self.fail(&listeners, e)),
        };

        let ingress = match Ingress::bind(
            &self.config.publish_addr,
            self.config.ingress_capacity,
            self.config.max_frame_len,
            self.peers.clone(),
            listeners.clone(),
        )
        .await
        {
            Ok(ingress) => ingress,
            Err(e) => return Err(self.fail(&listeners, e)),
        };

        transition(&self.state, ForwarderState::Bound);
        info!(
            publish = %ingress.local_addr(),
            subscribe = %egress.local_addr(),
            "proxy bound"
        );

        Ok(BoundForwarder {
            ingress,
            egress,
            state: self.state,
            counters: self.counters,
            peers: self.peers,
            shutdown,
            _listeners: listeners.drop_guard(),
        })
    }

    /// Открывает адреса и ретранслирует до отмены или фатальной ошибки.
    pub async fn run(
        self,
        shutdown: CancellationToken,
    ) -> Result<(), RelayError> {
        let bound = self.bind(shutdown).await?;
        bound.relay().await?;
        Ok(())
    }

    fn fail(
        &self,
        listeners: &CancellationToken,
        err: SetupError,
    ) -> SetupError {
        listeners.cancel();
        transition(&self.state, ForwarderState::Failed);
        error!(error = %err, code = err.status_code().code(), "proxy setup failed");
        err
    }
}

impl BoundForwarder {
    pub fn local_addrs(&self) -> BoundAddrs {
        BoundAddrs {
            publish: self.ingress.local_addr(),
            subscribe: self.egress.local_addr(),
        }
    }

    pub fn handle(&self) -> ForwarderHandle {
        ForwarderHandle {
            state: self.state.subscribe(),
            peers: self.peers.clone(),
            counters: self.counters.clone(),
        }
    }

    /// Цикл ретрансляции.
    ///
    /// Ждёт следующий фрейм входной стороны и отдаёт его выходной. Отмена
    /// завершает цикл с `Ok` (состояние `Stopped`); отказ любого слушателя
    /// фатален (состояние `Failed`).
    pub async fn relay(mut self) -> Result<(), TransportError> {
        transition(&self.state, ForwarderState::Relaying);
        info!("proxy relaying");

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => {
                    transition(&self.state, ForwarderState::Stopped);
                    info!(
                        frames = self.counters.frames.load(Ordering::Relaxed),
                        "proxy stopped"
                    );
                    return Ok(());
                }
                err = self.egress.failed() => {
                    return Err(self.fail(err));
                }
                res = self.ingress.recv() => match res {
                    Ok(frame) => {
                        let len = frame.len();
                        let receivers = self.egress.publish(frame);
                        self.counters.frames.fetch_add(1, Ordering::Relaxed);
                        self.counters.bytes.fetch_add(len as u64, Ordering::Relaxed);
                        trace!(len, receivers, "frame relayed");
                    }
                    Err(e) => return Err(self.fail(e)),
                },
            }
        }
    }

    fn fail(
        &self,
        err: TransportError,
    ) -> TransportError {
        transition(&self.state, ForwarderState::Failed);
        error!(error = %err, code = err.status_code().code(), "proxy relay failed");
        err
    }
}

impl ForwarderHandle {
    pub fn state(&self) -> ForwarderState {
        *self.state.borrow()
    }

    /// Ждёт состояния, удовлетворяющего `pred`.
    ///
    /// Возвращает `None`, если форвардер исчез раньше.
    pub async fn wait_for<F>(
        &mut self,
        mut pred: F,
    ) -> Option<ForwarderState>
    where
        F: FnMut(ForwarderState) -> bool,
    {
        self.state.wait_for(|s| pred(*s)).await.ok().map(|s| *s)
    }

    pub fn stats(&self) -> ProxyStats {
        ProxyStats {
            publishers: self.peers.count(PeerRole::Publisher),
            subscribers: self.peers.count(PeerRole::Subscriber),
            frames_relayed: self.counters.frames.load(Ordering::Relaxed),
            bytes_relayed: self.counters.bytes.load(Ordering::Relaxed),
        }
    }

    pub fn peers(&self) -> &PeerRegistry {
        &self.peers
    }
}

fn transition(
    state: &watch::Sender<ForwarderState>,
    next: ForwarderState,
) {
    state.send_if_modified(|current| {
        if current.can_transition_to(next) {
            trace!(from = %current, to = %next, "forwarder state");
            *current = next;
            true
        } else {
            false
        }
    });
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            publish_addr: "127.0.0.1:3327".into(),
            subscribe_addr: "127.0.0.1:3328".into(),
            ingress_capacity: 1024,
            egress_capacity: 1024,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}
