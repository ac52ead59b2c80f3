//! Environment catalog
//!
//! Owns the ordered list of known environment names and the current
//! selection. Names arrive in server order; environments staged
//! locally before any server confirmation ("pending") are appended
//! after them and survive refreshes until a save confirms them.
//!
//! Invariant: the selection, when present, is always a member of the
//! list (pending entries included).

use crate::error::ClientError;

#[derive(Debug, Default)]
pub struct EnvironmentCatalog {
    names: Vec<String>,
    selected: Option<String>,
    /// Staged locally, not yet confirmed by the server; in creation order
    pending: Vec<String>,
}

impl EnvironmentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// All names, server order first, pending entries appended
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn is_pending(&self, name: &str) -> bool {
        self.pending.iter().any(|n| n == name)
    }

    /// Replace the list with a fresh server response. Pending entries
    /// the server now knows about become confirmed; the rest stay
    /// appended. A selection the server dropped is cleared.
    pub fn replace(&mut self, mut names: Vec<String>) {
        self.pending.retain(|p| !names.contains(p));
        names.extend(self.pending.iter().cloned());
        self.names = names;

        if let Some(selected) = &self.selected {
            if !self.contains(selected) {
                self.selected = None;
            }
        }
    }

    /// Stage a new environment locally. No server call is made; the
    /// first save of this environment creates it server-side.
    pub fn create_pending(&mut self, name: &str) -> Result<(), ClientError> {
        if name.trim().is_empty() {
            return Err(ClientError::InvalidName(
                "environment name cannot be empty".into(),
            ));
        }
        if self.contains(name) {
            return Err(ClientError::AlreadyExists(name.to_string()));
        }
        self.names.push(name.to_string());
        self.pending.push(name.to_string());
        Ok(())
    }

    /// Select a known (or pending) environment
    pub fn select(&mut self, name: &str) -> Result<(), ClientError> {
        if !self.contains(name) {
            return Err(ClientError::NotFound(name.to_string()));
        }
        self.selected = Some(name.to_string());
        Ok(())
    }

    /// Mark a pending environment as confirmed by the server
    pub fn confirm(&mut self, name: &str) {
        self.pending.retain(|p| p != name);
    }

    /// Record a server-side creation the catalog has not listed yet
    pub fn insert_confirmed(&mut self, name: &str) {
        if !self.contains(name) {
            self.names.push(name.to_string());
        }
        self.confirm(name);
    }

    /// Drop a name entirely; clears the selection if it pointed here.
    /// Returns whether the name was present.
    pub fn remove(&mut self, name: &str) -> bool {
        let had = self.contains(name);
        self.names.retain(|n| n != name);
        self.pending.retain(|p| p != name);
        if self.selected.as_deref() == Some(name) {
            self.selected = None;
        }
        had
    }

    /// Invalidate everything (on disconnect)
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
