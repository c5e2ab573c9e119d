//! Прокси-форвардер и его жизненный цикл.

pub mod forwarder;
pub mod state;

// Publicly re-export all error types and functions from the submodules to
// simplify access from external code.
pub use forwarder::*;
pub use state::*;
