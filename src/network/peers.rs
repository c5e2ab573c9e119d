use std::{
    collections::HashMap,
    fmt,
    net::SocketAddr,
    sync::{
        atomic::{AtomicU32, AtomicU64, Ordering},
        Arc,
    },
    time::Instant,
};

use parking_lot::RwLock;

/// Сторона прокси, к которой подключён пир.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeerRole {
    /// Пир на входной стороне (публикует фреймы).
    Publisher,
    /// Пир на выходной стороне (получает фреймы).
    Subscriber,
}

/// Информация о подключённом пире.
///
/// Счётчики атомарные: их обновляет задача соединения, а читает кто угодно
/// через [`PeerRegistry`].
#[derive(Debug)]
pub struct PeerInfo {
    pub id: u32,
    pub addr: SocketAddr,
    pub role: PeerRole,
    connected_at: Instant,
    frames: AtomicU64,
    bytes: AtomicU64,
}

/// Снимок состояния пира.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerSnapshot {
    pub id: u32,
    pub addr: SocketAddr,
    pub role: PeerRole,
    pub uptime_secs: u64,
    pub frames: u64,
    pub bytes: u64,
}

/// Реестр подключённых пиров прокси.
///
/// Потокобезопасное хранилище: регистрацию выполняют слушатели, чтение —
/// статистика форвардера.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: RwLock<HashMap<u32, Arc<PeerInfo>>>,
    id_counter: AtomicU32,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl PeerInfo {
    fn new(
        id: u32,
        addr: SocketAddr,
        role: PeerRole,
    ) -> Self {
        Self {
            id,
            addr,
            role,
            connected_at: Instant::now(),
            frames: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
        }
    }

    /// Учитывает один фрейм длиной `len` байт.
    pub fn record_frame(
        &self,
        len: usize,
    ) {
        self.frames.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(len as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PeerSnapshot {
        PeerSnapshot {
            id: self.id,
            addr: self.addr,
            role: self.role,
            uptime_secs: self.connected_at.elapsed().as_secs(),
            frames: self.frames.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
        }
    }
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Регистрирует пира и возвращает его запись.
    pub fn register(
        &self,
        addr: SocketAddr,
        role: PeerRole,
    ) -> Arc<PeerInfo> {
        let id = self.id_counter.fetch_add(1, Ordering::Relaxed) + 1;
        let info = Arc::new(PeerInfo::new(id, addr, role));
        self.peers.write().insert(id, info.clone());
        info
    }

    /// Удаляет пира и возвращает его итоговый снимок. Для отсутствующего
    /// `id` возвращает `None`.
    pub fn unregister(
        &self,
        id: u32,
    ) -> Option<PeerSnapshot> {
        self.peers.write().remove(&id).map(|p| p.snapshot())
    }

    /// Количество подключённых пиров заданной роли.
    pub fn count(
        &self,
        role: PeerRole,
    ) -> usize {
        self.peers.read().values().filter(|p| p.role == role).count()
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl fmt::Display for PeerRole {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            PeerRole::Publisher => write!(f, "publisher"),
            PeerRole::Subscriber => write!(f, "subscriber"),
        }
    }
}
