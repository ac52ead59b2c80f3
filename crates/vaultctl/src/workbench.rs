//! Workbench - the one context object of a vaultctl client
//!
//! Owns the session, the environment catalog, the variable editor, and
//! the transport of the active session, and coordinates every
//! operation that crosses component boundaries. Catalog and editor
//! data are only valid under one connected session; the workbench
//! checks that before any server-touching call and invalidates both on
//! disconnect.
//!
//! Saving reconciles: the full buffer goes to the server, and the
//! server-confirmed result re-seeds the editor. A failed save leaves
//! the buffer untouched.

use crate::catalog::EnvironmentCatalog;
use crate::editor::VariableSetEditor;
use crate::error::ClientError;
use crate::session::{ConnectionConfig, SessionManager};
use crate::transport::VaultTransport;
use std::collections::HashSet;
use tracing::{debug, info};
use vaultctl_core::protocol::VariableMap;

pub struct Workbench {
    session: SessionManager,
    catalog: EnvironmentCatalog,
    editor: VariableSetEditor,
    transport: Option<VaultTransport>,
    /// Environments with a save in flight; one save per environment
    saving: HashSet<String>,
}

impl Workbench {
    pub fn new(session: SessionManager) -> Self {
        Self {
            session,
            catalog: EnvironmentCatalog::new(),
            editor: VariableSetEditor::new(),
            transport: None,
            saving: HashSet::new(),
        }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn catalog(&self) -> &EnvironmentCatalog {
        &self.catalog
    }

    pub fn editor(&self) -> &VariableSetEditor {
        &self.editor
    }

    /// Local mutations of the selected environment's buffer
    pub fn editor_mut(&mut self) -> &mut VariableSetEditor {
        &mut self.editor
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.editor.has_unsaved_changes()
    }

    /// Establish a session. Catalog and editor start empty; refresh
    /// and select to populate them.
    pub async fn connect(&mut self, config: ConnectionConfig) -> Result<(), ClientError> {
        let transport = self.session.configure(config).await?;
        self.transport = Some(transport);
        self.catalog.clear();
        self.editor.clear();
        self.saving.clear();
        Ok(())
    }

    /// Tear down the session and invalidate everything under it
    pub fn disconnect(&mut self, forget: bool) {
        self.session.disconnect(forget);
        self.transport = None;
        self.catalog.clear();
        self.editor.clear();
        self.saving.clear();
        debug!("Session closed, local state invalidated");
    }

    /// The transport of the connected session
    fn transport(&self) -> Result<&VaultTransport, ClientError> {
        if !self.session.is_connected() {
            return Err(ClientError::NotConnected);
        }
        self.transport.as_ref().ok_or(ClientError::NotConnected)
    }

    /// Re-fetch the environment list. On failure the previous catalog
    /// is retained.
    pub async fn refresh(&mut self) -> Result<&[String], ClientError> {
        let names = self.transport()?.list_environments().await?;
        self.catalog.replace(names);
        if self.catalog.selected().is_none() {
            // The selection (if any) was dropped server-side
            self.editor.clear();
        }
        Ok(self.catalog.names())
    }

    /// Select an environment and load its variables into the editor.
    /// A pending-create environment loads an empty buffer without
    /// touching the server. On failure the previous selection and
    /// buffer are retained.
    pub async fn select(&mut self, name: &str) -> Result<(), ClientError> {
        if self.catalog.is_pending(name) {
            self.catalog.select(name)?;
            self.editor.load(VariableMap::new());
            return Ok(());
        }
        if !self.catalog.contains(name) {
            return Err(ClientError::NotFound(name.to_string()));
        }

        let variables = self.transport()?.get_environment(name).await?;
        self.catalog.select(name)?;
        self.editor.load(variables);
        debug!("Selected '{}' ({} variables)", name, self.editor.len());
        Ok(())
    }

    /// Stage a new environment locally and select it. The server first
    /// learns of it when it is saved.
    pub fn stage_environment(&mut self, name: &str) -> Result<(), ClientError> {
        if !self.session.is_connected() {
            return Err(ClientError::NotConnected);
        }
        self.catalog.create_pending(name)?;
        self.catalog.select(name)?;
        self.editor.load(VariableMap::new());
        Ok(())
    }

    /// Save the buffer for the selected environment and reconcile the
    /// server-confirmed result back into the editor.
    pub async fn save(&mut self) -> Result<String, ClientError> {
        let name = self
            .catalog
            .selected()
            .ok_or(ClientError::NothingSelected)?
            .to_string();

        if !self.saving.insert(name.clone()) {
            return Err(ClientError::SaveInFlight(name));
        }

        let snapshot = self.editor.snapshot();
        let outcome = match self.transport() {
            Ok(transport) => transport.save_environment(&name, snapshot).await,
            Err(e) => Err(e),
        };
        self.saving.remove(&name);

        let confirmation = outcome?;
        self.editor.load(confirmation.variables);
        self.catalog.confirm(&name);
        info!("Saved environment '{}'", name);
        Ok(confirmation.message)
    }

    /// Create an environment server-side (the explicit path; staging
    /// plus save is the implicit one)
    pub async fn create_environment(&mut self, name: &str) -> Result<String, ClientError> {
        if name.trim().is_empty() {
            return Err(ClientError::InvalidName(
                "environment name cannot be empty".into(),
            ));
        }
        let message = self.transport()?.create_environment(name).await?;
        self.catalog.insert_confirmed(name);
        Ok(message)
    }

    /// Delete an environment. The server delete happens first; only on
    /// success do catalog and editor update, together, so a selected
    /// environment never lingers after its deletion. An environment
    /// that exists only as a local pending entry is dropped without a
    /// server call.
    pub async fn delete_environment(&mut self, name: &str) -> Result<String, ClientError> {
        if !self.catalog.contains(name) {
            return Err(ClientError::NotFound(name.to_string()));
        }

        let message = if self.catalog.is_pending(name) {
            format!("Discarded pending environment '{}'", name)
        } else {
            self.transport()?.delete_environment(name).await?
        };

        let was_selected = self.catalog.selected() == Some(name);
        self.catalog.remove(name);
        if was_selected {
            self.editor.clear();
        }
        info!("Removed environment '{}'", name);
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::spawn_server;
    use crate::session::{ConnectionConfig, ConnectionStore, SessionManager};
    use std::collections::BTreeMap;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use tempfile::{tempdir, TempDir};
    use vaultctl_core::protocol::{Command, VaultRequest, VaultResponse};

    /// A stateful stand-in vault: two environments, saves applied,
    /// failure switchable per test.
    struct StubVault {
        environments: Mutex<BTreeMap<String, VariableMap>>,
        fail_all: AtomicBool,
        fail_saves: AtomicBool,
    }

    impl StubVault {
        fn seeded() -> Arc<Self> {
            let mut environments = BTreeMap::new();
            environments.insert("prod".to_string(), VariableMap::new());
            let mut staging = VariableMap::new();
            staging.insert("API_KEY".to_string(), "abc".to_string());
            environments.insert("staging".to_string(), staging);

            Arc::new(Self {
                environments: Mutex::new(environments),
                fail_all: AtomicBool::new(false),
                fail_saves: AtomicBool::new(false),
            })
        }

        fn answer(&self, request: &VaultRequest) -> VaultResponse {
            if self.fail_all.load(Ordering::SeqCst) {
                return VaultResponse::failure("vault unavailable");
            }
            let mut environments = self.environments.lock().unwrap();
            match request.command {
                Command::Handshake => VaultResponse::ok(),
                Command::ListEnvironments => VaultResponse {
                    environments: Some(environments.keys().cloned().collect()),
                    ..VaultResponse::ok()
                },
                Command::ShellActivation => {
                    let name = request.environment.as_deref().unwrap_or_default();
                    match environments.get(name) {
                        Some(vars) => VaultResponse {
                            env_vars: Some(
                                vars.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                            ),
                            ..VaultResponse::ok()
                        },
                        None => VaultResponse::failure(&format!(
                            "Environment '{}' not found",
                            name
                        )),
                    }
                }
                Command::SaveEnvironment => {
                    if self.fail_saves.load(Ordering::SeqCst) {
                        return VaultResponse::failure("disk full");
                    }
                    let name = request.environment.clone().unwrap_or_default();
                    let vars = request.variables.clone().unwrap_or_default();
                    environments.insert(name.clone(), vars.clone());
                    VaultResponse {
                        env_vars: Some(vars.into_iter().collect()),
                        message: Some(format!("Saved environment '{}'", name)),
                        ..VaultResponse::ok()
                    }
                }
                Command::CreateEnvironment => {
                    let name = request.environment.clone().unwrap_or_default();
                    if environments.contains_key(&name) {
                        return VaultResponse::failure(&format!(
                            "Environment '{}' already exists",
                            name
                        ));
                    }
                    environments.insert(name, VariableMap::new());
                    VaultResponse::ok()
                }
                Command::DeleteEnvironment => {
                    let name = request.environment.as_deref().unwrap_or_default();
                    if environments.remove(name).is_none() {
                        return VaultResponse::failure(&format!(
                            "Environment '{}' not found",
                            name
                        ));
                    }
                    VaultResponse {
                        message: Some(format!("Deleted environment '{}'", name)),
                        ..VaultResponse::ok()
                    }
                }
            }
        }
    }

    async fn connected_workbench(vault: Arc<StubVault>) -> (Workbench, SocketAddr, TempDir) {
        let handler_vault = vault.clone();
        let addr = spawn_server(move |request| handler_vault.answer(request)).await;

        let dir = tempdir().unwrap();
        let session = SessionManager::new(ConnectionStore::new(dir.path()).unwrap());
        let mut workbench = Workbench::new(session);
        workbench
            .connect(ConnectionConfig::new("127.0.0.1", addr.port()))
            .await
            .unwrap();
        (workbench, addr, dir)
    }

    #[tokio::test]
    async fn test_operations_require_connected_session() {
        let dir = tempdir().unwrap();
        let session = SessionManager::new(ConnectionStore::new(dir.path()).unwrap());
        let mut workbench = Workbench::new(session);

        assert!(matches!(
            workbench.refresh().await,
            Err(ClientError::NotConnected)
        ));
        assert!(matches!(
            workbench.stage_environment("dev"),
            Err(ClientError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_refresh_is_idempotent() {
        let (mut workbench, _, _dir) = connected_workbench(StubVault::seeded()).await;

        let first: Vec<String> = workbench.refresh().await.unwrap().to_vec();
        let second: Vec<String> = workbench.refresh().await.unwrap().to_vec();

        assert_eq!(first, vec!["prod", "staging"]);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_refresh_failure_retains_previous_catalog() {
        let vault = StubVault::seeded();
        let (mut workbench, _, _dir) = connected_workbench(vault.clone()).await;

        workbench.refresh().await.unwrap();
        vault.fail_all.store(true, Ordering::SeqCst);

        let err = workbench.refresh().await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
        assert_eq!(workbench.catalog().names(), &["prod", "staging"]);
    }

    #[tokio::test]
    async fn test_select_loads_server_variables() {
        let (mut workbench, _, _dir) = connected_workbench(StubVault::seeded()).await;
        workbench.refresh().await.unwrap();

        workbench.select("staging").await.unwrap();

        let snapshot = workbench.editor().snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get("API_KEY").map(String::as_str), Some("abc"));
    }

    #[tokio::test]
    async fn test_select_failure_keeps_previous_buffer() {
        let vault = StubVault::seeded();
        let (mut workbench, _, _dir) = connected_workbench(vault.clone()).await;
        workbench.refresh().await.unwrap();
        workbench.select("staging").await.unwrap();

        // prod disappears server-side between refresh and select
        vault.environments.lock().unwrap().remove("prod");

        let err = workbench.select("prod").await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound(_)));
        assert_eq!(workbench.catalog().selected(), Some("staging"));
        assert_eq!(
            workbench.editor().get("API_KEY"),
            Some("abc"),
            "buffer must survive a failed select"
        );
    }

    #[tokio::test]
    async fn test_stage_then_select_yields_empty_buffer() {
        let (mut workbench, _, _dir) = connected_workbench(StubVault::seeded()).await;
        workbench.refresh().await.unwrap();

        workbench.stage_environment("dev").unwrap();

        assert!(workbench.catalog().names().contains(&"dev".to_string()));
        assert_eq!(workbench.catalog().selected(), Some("dev"));
        assert!(workbench.editor().is_empty());
    }

    #[tokio::test]
    async fn test_save_creates_pending_environment_server_side() {
        let vault = StubVault::seeded();
        let (mut workbench, _, _dir) = connected_workbench(vault.clone()).await;
        workbench.refresh().await.unwrap();

        workbench.stage_environment("dev").unwrap();
        workbench.editor_mut().set_value("X", "1");
        workbench.save().await.unwrap();

        assert!(!workbench.catalog().is_pending("dev"));
        let stored = vault.environments.lock().unwrap();
        assert_eq!(
            stored.get("dev").and_then(|v| v.get("X")).map(String::as_str),
            Some("1")
        );
    }

    #[tokio::test]
    async fn test_save_reseeds_editor_with_confirmed_map() {
        let (mut workbench, _, _dir) = connected_workbench(StubVault::seeded()).await;
        workbench.refresh().await.unwrap();
        workbench.select("staging").await.unwrap();

        workbench.editor_mut().set_value("X", "1");
        assert!(workbench.has_unsaved_changes());

        workbench.save().await.unwrap();

        assert!(!workbench.has_unsaved_changes());
        assert_eq!(workbench.editor().get("X"), Some("1"));
        assert_eq!(workbench.editor().get("API_KEY"), Some("abc"));
    }

    #[tokio::test]
    async fn test_failed_save_leaves_buffer_untouched() {
        let vault = StubVault::seeded();
        let (mut workbench, _, _dir) = connected_workbench(vault.clone()).await;
        workbench.refresh().await.unwrap();
        workbench.select("staging").await.unwrap();

        workbench.editor_mut().set_value("X", "1");
        vault.fail_saves.store(true, Ordering::SeqCst);

        let err = workbench.save().await.unwrap_err();
        assert!(matches!(err, ClientError::Save(_)));
        assert_eq!(workbench.editor().get("X"), Some("1"));
        assert!(workbench.has_unsaved_changes());

        // The in-flight guard is released; a retry reaches the server
        vault.fail_saves.store(false, Ordering::SeqCst);
        workbench.save().await.unwrap();
        assert!(!workbench.has_unsaved_changes());
    }

    #[tokio::test]
    async fn test_save_without_selection_fails_loudly() {
        let (mut workbench, _, _dir) = connected_workbench(StubVault::seeded()).await;
        workbench.refresh().await.unwrap();

        assert!(matches!(
            workbench.save().await,
            Err(ClientError::NothingSelected)
        ));
    }

    #[tokio::test]
    async fn test_delete_selected_clears_selection_and_editor() {
        let vault = StubVault::seeded();
        let (mut workbench, _, _dir) = connected_workbench(vault.clone()).await;
        workbench.refresh().await.unwrap();
        workbench.select("staging").await.unwrap();

        workbench.delete_environment("staging").await.unwrap();

        assert_eq!(workbench.catalog().selected(), None);
        assert!(workbench.editor().is_empty());
        assert!(!workbench.catalog().contains("staging"));
        assert!(!vault.environments.lock().unwrap().contains_key("staging"));
    }

    #[tokio::test]
    async fn test_delete_pending_skips_server() {
        let vault = StubVault::seeded();
        let (mut workbench, _, _dir) = connected_workbench(vault.clone()).await;
        workbench.refresh().await.unwrap();

        workbench.stage_environment("dev").unwrap();
        workbench.delete_environment("dev").await.unwrap();

        assert!(!workbench.catalog().contains("dev"));
        // Never existed server-side, so nothing to delete there
        assert!(!vault.environments.lock().unwrap().contains_key("dev"));
    }

    #[tokio::test]
    async fn test_create_environment_explicit_path() {
        let vault = StubVault::seeded();
        let (mut workbench, _, _dir) = connected_workbench(vault.clone()).await;
        workbench.refresh().await.unwrap();

        workbench.create_environment("dev").await.unwrap();
        assert!(workbench.catalog().contains("dev"));
        assert!(!workbench.catalog().is_pending("dev"));
        assert!(vault.environments.lock().unwrap().contains_key("dev"));

        let err = workbench.create_environment("dev").await.unwrap_err();
        assert!(matches!(err, ClientError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_disconnect_invalidates_catalog_and_editor() {
        let (mut workbench, _, _dir) = connected_workbench(StubVault::seeded()).await;
        workbench.refresh().await.unwrap();
        workbench.select("staging").await.unwrap();

        workbench.disconnect(false);

        assert!(!workbench.session().is_connected());
        assert!(workbench.catalog().names().is_empty());
        assert!(workbench.editor().is_empty());
        assert!(matches!(
            workbench.refresh().await,
            Err(ClientError::NotConnected)
        ));
    }
}
