use std::borrow::Cow;

use bytes::Bytes;
use zrelay_error::TransportError;

use super::topic;

/// Один непрозрачный фрейм: `prefix ++ payload` без разделителей.
///
/// Прокси никогда не разбирает фрейм. Границу между темой и полезной
/// нагрузкой знает только подписчик через свои префиксы.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Frame(Bytes);

impl Frame {
    /// Собирает фрейм `prefix ++ payload`.
    ///
    /// Буфер резервируется через `try_reserve_exact`: нехватка памяти
    /// возвращается как [`TransportError::Allocation`], а не аварийно
    /// завершает процесс.
    pub fn compose(
        prefix: &[u8],
        payload: &[u8],
    ) -> Result<Self, TransportError> {
        let requested = prefix
            .len()
            .checked_add(payload.len())
            .ok_or(TransportError::Allocation {
                requested: usize::MAX,
            })?;

        let mut buf = Vec::new();
        buf.try_reserve_exact(requested)
            .map_err(|_| TransportError::Allocation { requested })?;
        buf.extend_from_slice(prefix);
        buf.extend_from_slice(payload);

        Ok(Self(Bytes::from(buf)))
    }

    pub fn from_static(bytes: &'static [u8]) -> Self {
        Self(Bytes::from_static(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Полезная нагрузка после `prefix`, если фрейм начинается с него.
    pub fn strip_prefix(
        &self,
        prefix: &[u8],
    ) -> Option<&[u8]> {
        topic::matches(prefix, &self.0).then(|| &self.0[prefix.len()..])
    }

    /// Текстовое представление для логов.
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Bytes> for Frame {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

impl From<Vec<u8>> for Frame {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Bytes::from(bytes))
    }
}

impl From<&'static str> for Frame {
    fn from(s: &'static str) -> Self {
        Self(Bytes::from_static(s.as_bytes()))
    }
}
