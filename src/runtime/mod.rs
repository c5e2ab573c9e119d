//! Запуск процесса: форвардер, издатель и подписчики как отдельные задачи
//! под общим токеном отмены.

pub mod roles;
pub mod signals;
pub mod supervisor;

// Publicly re-export all error types and functions from the submodules to
// simplify access from external code.
pub use roles::*;
pub use signals::*;
pub use supervisor::*;
