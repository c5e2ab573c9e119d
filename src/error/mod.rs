//! Ошибки zrelay.
//!
//! Ошибки ролей (`SetupError`, `TransportError`, `RelayError`) живут в
//! `zrelay-error`; здесь только ошибки окружения процесса.

pub mod config;
pub mod logging;

// Publicly re-export all error types and functions from the submodules to
// simplify access from external code.
pub use self::config::*;
pub use self::logging::*;
pub use zrelay_error::*;
