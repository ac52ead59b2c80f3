//! Client error kinds

use thiserror::Error;

/// Errors surfaced by the vaultctl client
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Authentication rejected: {0}")]
    Auth(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Save rejected: {0}")]
    Save(String),

    #[error("Environment already exists: {0}")]
    AlreadyExists(String),

    #[error("Environment not found: {0}")]
    NotFound(String),

    #[error("Key already exists: {0}")]
    RenameConflict(String),

    #[error("Invalid environment name: {0}")]
    InvalidName(String),

    #[error("Not connected to a vault server")]
    NotConnected,

    #[error("No environment selected")]
    NothingSelected,

    #[error("Invalid connection config: {0}")]
    InvalidConfig(String),

    #[error("Save already in flight for environment: {0}")]
    SaveInFlight(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
