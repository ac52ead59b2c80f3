//! Session lifecycle and remembered-connection storage
//!
//! A session is the client's configured relationship to one vault
//! server. Connecting validates the config, probes the server, and
//! performs the configuration handshake; any failure lands in
//! Failed(reason) with no half-open state. At most one connection
//! record is remembered across process restarts.

use crate::error::ClientError;
use crate::transport::VaultTransport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Default vaultd port
pub const DEFAULT_PORT: u16 = 4000;

/// Connection parameters supplied by the operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Persist this config across process restarts
    #[serde(default)]
    pub remember: bool,
}

impl ConnectionConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            username: None,
            password: None,
            remember: false,
        }
    }

    pub fn with_credentials(mut self, username: Option<String>, password: Option<String>) -> Self {
        self.username = username;
        self.password = password;
        self
    }

    pub fn remembered(mut self) -> Self {
        self.remember = true;
        self
    }

    /// Host must be non-empty, port in 1..=65535
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.host.trim().is_empty() {
            return Err(ClientError::InvalidConfig("host cannot be empty".into()));
        }
        if self.port == 0 {
            return Err(ClientError::InvalidConfig("port cannot be zero".into()));
        }
        Ok(())
    }

    /// The server address (host:port)
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// State of the one client session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Failed(String),
}

impl SessionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, SessionState::Connected)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Disconnected => write!(f, "disconnected"),
            SessionState::Connecting => write!(f, "connecting"),
            SessionState::Connected => write!(f, "connected"),
            SessionState::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// The persisted connection record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RememberedConnection {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Reconnect with this record without re-prompting
    #[serde(default)]
    pub auto_connect: bool,
    /// When this record was written
    #[serde(default = "Utc::now")]
    pub saved_at: DateTime<Utc>,
}

impl RememberedConnection {
    fn from_config(config: &ConnectionConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            username: config.username.clone(),
            password: config.password.clone(),
            auto_connect: true,
            saved_at: Utc::now(),
        }
    }

    /// Rehydrate into a config; a recalled connection stays remembered
    pub fn to_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            password: self.password.clone(),
            remember: true,
        }
    }
}

/// Store for the single remembered connection
pub struct ConnectionStore {
    /// Path to connection.json
    path: PathBuf,
}

impl ConnectionStore {
    /// Create a store rooted at the given config directory
    pub fn new(config_dir: &Path) -> Result<Self, ClientError> {
        std::fs::create_dir_all(config_dir)?;
        Ok(Self {
            path: config_dir.join("connection.json"),
        })
    }

    /// Persist the record, replacing any previous one
    pub fn remember(&self, record: &RememberedConnection) -> Result<(), ClientError> {
        let content = serde_json::to_string_pretty(record)
            .map_err(|e| ClientError::InvalidConfig(e.to_string()))?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    /// Retrieve the remembered record. Never errors: absence or a
    /// corrupt file both yield None.
    pub fn recall(&self) -> Option<RememberedConnection> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&content) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Ignoring corrupt connection record: {}", e);
                None
            }
        }
    }

    /// Remove the remembered record if present
    pub fn forget(&self) -> Result<(), ClientError> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

/// Retry policy for the connection phase.
///
/// The default is a single attempt per user action; mid-session
/// operations never retry.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Owns the session state machine and the connection store
pub struct SessionManager {
    state: SessionState,
    active: Option<ConnectionConfig>,
    store: ConnectionStore,
    retry: RetryPolicy,
}

impl SessionManager {
    pub fn new(store: ConnectionStore) -> Self {
        Self {
            state: SessionState::Disconnected,
            active: None,
            store,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// The config of the active session, if connected
    pub fn active_config(&self) -> Option<&ConnectionConfig> {
        self.active.as_ref()
    }

    /// Validate, probe, and handshake. Resolves to Connected or
    /// Failed, never Connecting. On success the transport for the new
    /// session is returned and the config is remembered when asked.
    pub async fn configure(
        &mut self,
        config: ConnectionConfig,
    ) -> Result<VaultTransport, ClientError> {
        config.validate()?;

        self.state = SessionState::Connecting;
        self.active = None;

        let transport = VaultTransport::new(&config.host, config.port);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match Self::try_connect(&transport, &config).await {
                Ok(()) => break,
                Err(e) => {
                    let retryable = !matches!(e, ClientError::Auth(_));
                    if retryable && attempt < self.retry.max_attempts {
                        debug!(
                            "Connection attempt {}/{} failed: {}",
                            attempt, self.retry.max_attempts, e
                        );
                        tokio::time::sleep(self.retry.backoff).await;
                        continue;
                    }
                    self.state = SessionState::Failed(e.to_string());
                    return Err(e);
                }
            }
        }

        if config.remember {
            if let Err(e) = self.store.remember(&RememberedConnection::from_config(&config)) {
                warn!("Connected, but could not persist connection record: {}", e);
            }
        }

        debug!("Session established with {}", config.address());
        self.state = SessionState::Connected;
        self.active = Some(config);
        Ok(transport)
    }

    async fn try_connect(
        transport: &VaultTransport,
        config: &ConnectionConfig,
    ) -> Result<(), ClientError> {
        transport.test_connection().await?;
        transport
            .handshake(config.username.as_deref(), config.password.as_deref())
            .await
    }

    /// Tear down the session. Always succeeds; the remembered record
    /// is only removed when the caller asks to forget it.
    pub fn disconnect(&mut self, forget: bool) {
        self.active = None;
        self.state = SessionState::Disconnected;
        if forget {
            if let Err(e) = self.store.forget() {
                warn!("Could not remove remembered connection: {}", e);
            }
        }
    }

    /// The remembered connection, rehydrated for reconnecting
    pub fn recall(&self) -> Option<ConnectionConfig> {
        self.store.recall().map(|record| record.to_config())
    }

    /// The raw remembered record (for display)
    pub fn recall_record(&self) -> Option<RememberedConnection> {
        self.store.recall()
    }
}
