//! Сетевой модуль zrelay.
//!
//! Транспорт прокси поверх TCP.
//!
//! ## Подмодули
//!
//! - `banner`: баннер, печатаемый при старте.
//! - `framing`: фрейминг `u32 длина ++ байты`.
//! - `listener`: открытие адресов и приём соединений.
//! - `ingress`: входная сторона (издатели), общая очередь фреймов.
//! - `egress`: выходная сторона (подписчики), рассылка всем.
//! - `peers`: реестр подключённых пиров и их счётчики.

pub mod banner;
pub mod egress;
pub mod framing;
pub mod ingress;
pub mod listener;
pub mod peers;

// Publicly re-export all error types and functions from the submodules to
// simplify access from external code.
pub use egress::*;
pub use framing::*;
pub use ingress::*;
pub use peers::*;
