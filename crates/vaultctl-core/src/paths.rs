//! Standard paths used by vaultctl

use std::path::PathBuf;

/// Standard vaultctl paths
pub struct Paths {
    /// Config directory (~/.config/vaultctl)
    pub config: PathBuf,
    /// Data directory (~/.local/share/vaultctl)
    pub data: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

impl Paths {
    pub fn new() -> Self {
        let config = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("vaultctl");

        let data = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("vaultctl");

        Self { config, data }
    }
}
