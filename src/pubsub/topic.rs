//! Сопоставление тем по префиксу.
//!
//! Тема фрейма — это его ведущие байты. Подписчик объявляет набор префиксов
//! и получает фрейм, если хотя бы один префикс совпадает с началом фрейма
//! байт-в-байт. Пустой префикс совпадает с любым фреймом.

use bytes::Bytes;

/// Совпадает ли `prefix` с началом `frame`.
///
/// Истина тогда и только тогда, когда `frame` не короче `prefix` и первые
/// `prefix.len()` байт равны `prefix`. Пустой префикс совпадает всегда.
#[inline]
pub fn matches(
    prefix: &[u8],
    frame: &[u8],
) -> bool {
    frame.len() >= prefix.len() && &frame[..prefix.len()] == prefix
}

/// Набор префиксов подписчика.
///
/// Фрейм проходит фильтр, если совпадает любой из префиксов (логическое ИЛИ).
/// Пустой набор не пропускает ничего, поэтому подписчик обязан объявить хотя
/// бы один префикс до начала приёма.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicFilter {
    prefixes: Vec<Bytes>,
}

impl TopicFilter {
    /// Создаёт пустой фильтр.
    pub fn new() -> Self {
        Self::default()
    }

    /// Фильтр, пропускающий все фреймы.
    pub fn wildcard() -> Self {
        Self {
            prefixes: vec![Bytes::new()],
        }
    }

    /// Создаёт фильтр из набора префиксов. Дубликаты отбрасываются.
    pub fn with_prefixes<I, P>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[u8]>,
    {
        let mut filter = Self::new();
        for prefix in prefixes {
            filter.subscribe(prefix);
        }
        filter
    }

    /// Добавляет префикс. Возвращает `false`, если такой префикс уже есть.
    pub fn subscribe<P: AsRef<[u8]>>(
        &mut self,
        prefix: P,
    ) -> bool {
        let prefix = prefix.as_ref();
        if self.prefixes.iter().any(|p| p.as_ref() == prefix) {
            return false;
        }
        self.prefixes.push(Bytes::copy_from_slice(prefix));
        true
    }

    /// Проходит ли фрейм фильтр.
    pub fn matches(
        &self,
        frame: &[u8],
    ) -> bool {
        self.prefixes.iter().any(|p| matches(p, frame))
    }

    /// Содержит ли фильтр пустой префикс (подписка на всё).
    pub fn is_wildcard(&self) -> bool {
        self.prefixes.iter().any(|p| p.is_empty())
    }

    pub fn prefixes(&self) -> &[Bytes] {
        &self.prefixes
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}
