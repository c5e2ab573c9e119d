pub mod relay;
pub mod setup;
pub mod transport;

// Publicly re-export all error types and functions from the submodules to
// simplify access from external code.
pub use relay::*;
pub use setup::*;
pub use transport::*;
