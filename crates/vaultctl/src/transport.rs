//! Transport adapter for vaultd servers
//!
//! One TCP connection per request: write the JSON body, shut down the
//! write half, read the JSON response to end of stream. No business
//! logic lives here; every method maps a server refusal to the error
//! kind its caller expects.

use crate::error::ClientError;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;
use vaultctl_core::protocol::{Command, VariableMap, VaultRequest, VaultResponse};

/// Client identifier sent with every request
pub const CLIENT_ID: &str = "vaultctl";

/// What the server accepted on a successful save
#[derive(Debug, Clone)]
pub struct SaveConfirmation {
    /// Human-readable confirmation from the server
    pub message: String,
    /// The authoritative variable set after the save
    pub variables: VariableMap,
}

/// Adapter that speaks the vaultd wire protocol to one server
#[derive(Debug, Clone)]
pub struct VaultTransport {
    host: String,
    port: u16,
}

impl VaultTransport {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
        }
    }

    /// The server address (host:port)
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Send one request and read one response
    async fn send(&self, request: &VaultRequest) -> Result<VaultResponse, ClientError> {
        let address = self.address();
        debug!("Sending {} to {}", request.command.as_str(), address);

        let mut stream = TcpStream::connect(&address)
            .await
            .map_err(|e| ClientError::Connect(format!("{}: {}", address, e)))?;

        let request_bytes = serde_json::to_vec(request)
            .map_err(|e| ClientError::Transport(format!("encode request: {}", e)))?;
        stream
            .write_all(&request_bytes)
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        stream
            .shutdown()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let mut response_bytes = Vec::new();
        stream
            .read_to_end(&mut response_bytes)
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let response: VaultResponse = serde_json::from_slice(&response_bytes)
            .map_err(|e| ClientError::Transport(format!("parse response: {}", e)))?;

        debug!(
            "Response from {}: success={}",
            address, response.success
        );
        Ok(response)
    }

    /// Connectivity probe. Issues list-environments, which is exactly
    /// what a reachable, speaking server must answer.
    pub async fn test_connection(&self) -> Result<(), ClientError> {
        let request = VaultRequest::new(CLIENT_ID, Command::ListEnvironments);
        let response = self.send(&request).await?;

        if response.success {
            Ok(())
        } else {
            Err(ClientError::Connect(
                response.message_or("server refused the probe"),
            ))
        }
    }

    /// Configuration handshake with optional credentials
    pub async fn handshake(
        &self,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<(), ClientError> {
        let request =
            VaultRequest::new(CLIENT_ID, Command::Handshake).with_credentials(username, password);
        let response = self.send(&request).await?;

        if response.success {
            Ok(())
        } else {
            Err(ClientError::Auth(
                response.message_or("credentials rejected"),
            ))
        }
    }

    /// Full list of environment names
    pub async fn list_environments(&self) -> Result<Vec<String>, ClientError> {
        let request = VaultRequest::new(CLIENT_ID, Command::ListEnvironments);
        let response = self.send(&request).await.map_err(midsession)?;

        if response.success {
            Ok(response.environments.unwrap_or_default())
        } else {
            Err(ClientError::Transport(
                response.message_or("failed to list environments"),
            ))
        }
    }

    /// Variables of one environment
    pub async fn get_environment(&self, name: &str) -> Result<VariableMap, ClientError> {
        let request =
            VaultRequest::new(CLIENT_ID, Command::ShellActivation).with_environment(name);
        let response = self.send(&request).await.map_err(midsession)?;

        if response.success {
            Ok(response.variables())
        } else {
            Err(ClientError::NotFound(
                response.message_or(&format!("environment '{}' not found", name)),
            ))
        }
    }

    /// Overwrite one environment with the full variable set.
    ///
    /// The confirmation carries the map the server actually accepted.
    /// A server that omits env_vars is taken to have accepted the
    /// transmitted map verbatim.
    pub async fn save_environment(
        &self,
        name: &str,
        variables: VariableMap,
    ) -> Result<SaveConfirmation, ClientError> {
        let request = VaultRequest::new(CLIENT_ID, Command::SaveEnvironment)
            .with_environment(name)
            .with_variables(variables.clone());
        let response = self.send(&request).await.map_err(midsession)?;

        if response.success {
            let accepted = if response.env_vars.is_some() {
                response.variables()
            } else {
                variables
            };
            Ok(SaveConfirmation {
                message: response.message_or(&format!("Saved environment '{}'", name)),
                variables: accepted,
            })
        } else {
            Err(ClientError::Save(
                response.message_or(&format!("server rejected save of '{}'", name)),
            ))
        }
    }

    /// Create an empty environment server-side
    pub async fn create_environment(&self, name: &str) -> Result<String, ClientError> {
        let request =
            VaultRequest::new(CLIENT_ID, Command::CreateEnvironment).with_environment(name);
        let response = self.send(&request).await.map_err(midsession)?;

        if response.success {
            Ok(response.message_or(&format!("Created environment '{}'", name)))
        } else {
            Err(ClientError::AlreadyExists(
                response.message_or(&format!("could not create environment '{}'", name)),
            ))
        }
    }

    /// Delete an environment server-side
    pub async fn delete_environment(&self, name: &str) -> Result<String, ClientError> {
        let request =
            VaultRequest::new(CLIENT_ID, Command::DeleteEnvironment).with_environment(name);
        let response = self.send(&request).await.map_err(midsession)?;

        if response.success {
            Ok(response.message_or(&format!("Deleted environment '{}'", name)))
        } else {
            Err(ClientError::NotFound(
                response.message_or(&format!("could not delete environment '{}'", name)),
            ))
        }
    }
}

/// Mid-session operations surface unreachability as a transport
/// failure, not a connection-phase failure.
fn midsession(err: ClientError) -> ClientError {
    match err {
        ClientError::Connect(message) => ClientError::Transport(message),
        other => other,
    }
}
