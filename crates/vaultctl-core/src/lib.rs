//! vaultctl-core - Shared functionality for vaultctl clients
//!
//! The wire protocol spoken by vaultd servers and the standard
//! client-side paths.

pub mod paths;
pub mod protocol;

pub use paths::Paths;
pub use protocol::{Command, VariableMap, VaultRequest, VaultResponse};
