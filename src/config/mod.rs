pub mod settings;

// Publicly re-export all error types and functions from the submodules to
// simplify access from external code.
pub use settings::*;
