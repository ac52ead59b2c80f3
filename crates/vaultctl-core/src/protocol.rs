//! Wire protocol for vaultd servers
//!
//! One JSON request per TCP connection, one JSON response back.
//! The client writes the request, closes its write half, and reads
//! the response to end of stream.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key/value variables of one environment.
///
/// A BTreeMap so display order is stable across round trips.
pub type VariableMap = BTreeMap<String, String>;

/// Commands understood by a vaultd server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Command {
    /// Configuration handshake, carries optional credentials
    Handshake,
    /// List all environment names
    ListEnvironments,
    /// Fetch the variables of one environment
    ShellActivation,
    /// Overwrite one environment with the transmitted variables
    SaveEnvironment,
    /// Create an empty environment
    CreateEnvironment,
    /// Delete an environment
    DeleteEnvironment,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Handshake => "handshake",
            Command::ListEnvironments => "list-environments",
            Command::ShellActivation => "shell-activation",
            Command::SaveEnvironment => "save-environment",
            Command::CreateEnvironment => "create-environment",
            Command::DeleteEnvironment => "delete-environment",
        }
    }
}

/// A request to a vaultd server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultRequest {
    /// Identifies the client program (e.g. "vaultctl")
    pub client_id: String,
    pub command: Command,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<VariableMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl VaultRequest {
    pub fn new(client_id: &str, command: Command) -> Self {
        Self {
            client_id: client_id.to_string(),
            command,
            environment: None,
            variables: None,
            username: None,
            password: None,
        }
    }

    pub fn with_environment(mut self, name: &str) -> Self {
        self.environment = Some(name.to_string());
        self
    }

    pub fn with_variables(mut self, variables: VariableMap) -> Self {
        self.variables = Some(variables);
        self
    }

    pub fn with_credentials(mut self, username: Option<&str>, password: Option<&str>) -> Self {
        self.username = username.map(String::from);
        self.password = password.map(String::from);
        self
    }
}

/// A response from a vaultd server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultResponse {
    pub success: bool,
    /// Key/value pairs, present on variable-returning commands
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_vars: Option<Vec<(String, String)>>,
    /// Human-readable status or error message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Environment names, present on list-environments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environments: Option<Vec<String>>,
}

impl VaultResponse {
    /// A bare success response
    pub fn ok() -> Self {
        Self {
            success: true,
            env_vars: None,
            message: None,
            environments: None,
        }
    }

    /// A failure response with a message
    pub fn failure(message: &str) -> Self {
        Self {
            success: false,
            env_vars: None,
            message: Some(message.to_string()),
            environments: None,
        }
    }

    /// Collect env_vars pairs into a map (empty if absent)
    pub fn variables(&self) -> VariableMap {
        self.env_vars
            .as_ref()
            .map(|pairs| pairs.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// The message, or a fallback when the server sent none
    pub fn message_or(&self, fallback: &str) -> String {
        self.message.clone().unwrap_or_else(|| fallback.to_string())
    }
}
