//! Подсистема Publish–Subscribe (pub/sub).
//!
//! Конечные точки, работающие через прокси:
//!
//! - `topic`: сопоставление тем по префиксу и фильтр подписчика.
//! - `message`: непрозрачный фрейм `prefix ++ payload`.
//! - `publisher`: издатель, периодически отправляющий фреймы.
//! - `subscriber`: подписчик, получающий фреймы по своим префиксам.

pub mod message;
pub mod publisher;
pub mod subscriber;
pub mod topic;

// Публичный экспорт всех типов и функций из вложенных
// модулей, чтобы упростить доступ к ним из внешнего кода.
pub use message::*;
pub use publisher::*;
pub use subscriber::*;
pub use topic::{matches, TopicFilter};
