//! Фрейминг поверх TCP.
//!
//! Каждый фрейм передаётся как `u32 big-endian длина ++ байты фрейма`.
//! Заголовок длины относится только к транспорту: сам фрейм остаётся плоской
//! последовательностью `prefix ++ payload`.

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use zrelay_error::TransportError;

use crate::pubsub::Frame;

/// Размер заголовка длины.
pub const HEADER_LEN: usize = 4;
/// Максимальный размер фрейма по умолчанию (1mb).
pub const DEFAULT_MAX_FRAME_LEN: usize = 1024 * 1024;

/// Читает фреймы из потока байт.
pub struct FrameReader<R> {
    inner: BufReader<R>,
    max_frame_len: usize,
}

/// Пишет фреймы в поток байт.
pub struct FrameWriter<W> {
    inner: BufWriter<W>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(
        inner: R,
        max_frame_len: usize,
    ) -> Self {
        Self {
            inner: BufReader::new(inner),
            max_frame_len,
        }
    }

    /// Читает следующий фрейм.
    ///
    /// # Возвращает
    /// - `Ok(Frame)` — целый фрейм
    /// - `Err(TransportError::Closed)` — поток закрыт (в том числе посреди
    ///   фрейма)
    /// - `Err(TransportError::FrameTooLarge)` — фрейм больше лимита; его байты
    ///   вычитаны и отброшены, поток остаётся синхронизированным
    /// - `Err(TransportError::Allocation)` — не удалось выделить буфер;
    ///   байты фрейма также отброшены
    /// - `Err(TransportError::Recv)` — прочие ошибки ввода-вывода
    pub async fn read_frame(&mut self) -> Result<Frame, TransportError> {
        self.read_frame_with(alloc_body).await
    }

    /// `read_frame` с заданным способом выделения буфера тела.
    async fn read_frame_with<A>(
        &mut self,
        alloc: A,
    ) -> Result<Frame, TransportError>
    where
        A: FnOnce(usize) -> Result<Vec<u8>, TransportError>,
    {
        let mut header = [0u8; HEADER_LEN];
        self.inner
            .read_exact(&mut header)
            .await
            .map_err(TransportError::from_read)?;
        let len = u32::from_be_bytes(header) as usize;

        if len > self.max_frame_len {
            self.discard(len).await?;
            return Err(TransportError::FrameTooLarge {
                len,
                max: self.max_frame_len,
            });
        }

        let mut buf = match alloc(len) {
            Ok(buf) => buf,
            Err(e) => {
                self.discard(len).await?;
                return Err(e);
            }
        };
        self.inner
            .read_exact(&mut buf)
            .await
            .map_err(TransportError::from_read)?;

        Ok(Frame::from(buf))
    }

    /// Пропускает `len` байт тела фрейма.
    async fn discard(
        &mut self,
        len: usize,
    ) -> Result<(), TransportError> {
        let mut limited = (&mut self.inner).take(len as u64);
        let skipped = tokio::io::copy(&mut limited, &mut tokio::io::sink())
            .await
            .map_err(TransportError::from_read)?;
        if skipped < len as u64 {
            return Err(TransportError::Closed);
        }
        Ok(())
    }

    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }
}

/// Буфер тела фрейма длиной `len`, выделенный без аварийного завершения.
fn alloc_body(len: usize) -> Result<Vec<u8>, TransportError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| TransportError::Allocation { requested: len })?;
    buf.resize(len, 0);
    Ok(buf)
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner: BufWriter::new(inner),
        }
    }

    /// Пишет фрейм целиком и сбрасывает буфер.
    pub async fn write_frame(
        &mut self,
        frame: &Frame,
    ) -> Result<(), TransportError> {
        let len = u32::try_from(frame.len()).map_err(|_| TransportError::FrameTooLarge {
            len: frame.len(),
            max: u32::MAX as usize,
        })?;

        let mut header = BytesMut::with_capacity(HEADER_LEN);
        header.put_u32(len);

        self.inner
            .write_all(&header)
            .await
            .map_err(TransportError::Send)?;
        self.inner
            .write_all(frame.as_bytes())
            .await
            .map_err(TransportError::Send)?;
        self.inner.flush().await.map_err(TransportError::Send)?;

        Ok(())
    }

    /// Корректно закрывает пишущую сторону.
    pub async fn shutdown(&mut self) -> Result<(), TransportError> {
        self.inner.shutdown().await.map_err(TransportError::Send)
    }
}
