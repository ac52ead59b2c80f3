//! Variable set editor
//!
//! The in-memory buffer for the selected environment's variables.
//! Mutations are purely local; nothing reaches the server until the
//! workbench saves. The buffer is replaced wholesale on selection
//! change and re-seeded from the server-confirmed map after a save.

use crate::error::ClientError;
use chrono::Utc;
use vaultctl_core::protocol::VariableMap;

/// Prefix for freshly added keys, to be renamed by the operator
const BLANK_KEY_PREFIX: &str = "NEW_VAR_";

#[derive(Debug, Default)]
pub struct VariableSetEditor {
    vars: VariableMap,
    /// The last-loaded map, for unsaved-change detection
    baseline: VariableMap,
}

impl VariableSetEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entire buffer and reset the baseline. Called on
    /// selection change and after a successful save.
    pub fn load(&mut self, map: VariableMap) {
        self.baseline = map.clone();
        self.vars = map;
    }

    /// Insert or overwrite. Keys are not validated; the server is the
    /// judge of what it accepts.
    pub fn set_value(&mut self, key: &str, value: &str) {
        self.vars.insert(key.to_string(), value.to_string());
    }

    /// Move a value from one key to another. Renaming a key onto
    /// itself is a no-op; renaming onto a different existing key is a
    /// conflict the caller must resolve explicitly.
    pub fn rename(&mut self, old_key: &str, new_key: &str, value: &str) -> Result<(), ClientError> {
        if old_key == new_key {
            return Ok(());
        }
        if self.vars.contains_key(new_key) {
            return Err(ClientError::RenameConflict(new_key.to_string()));
        }
        self.vars.remove(old_key);
        self.vars.insert(new_key.to_string(), value.to_string());
        Ok(())
    }

    /// Delete a key; absent keys are a no-op
    pub fn remove(&mut self, key: &str) {
        self.vars.remove(key);
    }

    /// Add a fresh empty variable under a unique generated key and
    /// return that key, for the operator to rename and fill in.
    pub fn add_blank(&mut self) -> String {
        let mut stamp = Utc::now().timestamp_millis();
        loop {
            let key = format!("{}{}", BLANK_KEY_PREFIX, stamp);
            if !self.vars.contains_key(&key) {
                self.vars.insert(key.clone(), String::new());
                return key;
            }
            stamp += 1;
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// A value copy of the buffer
    pub fn snapshot(&self) -> VariableMap {
        self.vars.clone()
    }

    /// Whether the buffer differs from the last-loaded map
    pub fn has_unsaved_changes(&self) -> bool {
        self.vars != self.baseline
    }

    /// Invalidate the buffer (on disconnect or environment deletion)
    pub fn clear(&mut self) {
        self.vars.clear();
        self.baseline.clear();
    }
}
