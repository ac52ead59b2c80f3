//! vaultctl - client for a vaultd environment vault
//!
//! "Edit locally, save explicitly, trust the server."
//!
//! The library owns the client-side state of one vault session:
//! - session: connection lifecycle and the remembered-connection store
//! - catalog: the authoritative list of environments and the selection
//! - editor: the in-memory variable buffer for the selected environment
//! - workbench: the coordinator that reconciles local edits with the
//!   server-confirmed state on save
//!
//! All server contact goes through the transport adapter; mutations of
//! the variable buffer are purely local until an explicit save.

pub mod catalog;
pub mod editor;
pub mod error;
pub mod session;
pub mod transport;
pub mod workbench;

#[cfg(test)]
pub(crate) mod fixture;

pub use catalog::EnvironmentCatalog;
pub use editor::VariableSetEditor;
pub use error::ClientError;
pub use session::{ConnectionConfig, ConnectionStore, RetryPolicy, SessionManager, SessionState};
pub use transport::{SaveConfirmation, VaultTransport};
pub use workbench::Workbench;
