//! Device configuration

use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Fallback when the platform page size cannot be queried
const FALLBACK_PAGE_SIZE: usize = 4096;

/// Device configuration, loadable from TOML
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Node name
    pub name: String,
    /// Device class name
    pub class_name: String,
    /// Size of the mapping-backed page (platform page size if unset)
    pub page_size: Option<usize>,
    /// Shared memory object backing the page (unique per instance if unset)
    pub page_object: Option<String>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: "khello".to_string(),
            class_name: "khello_class".to_string(),
            page_size: None,
            page_object: None,
        }
    }
}

impl DeviceConfig {
    /// Parse a config from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Check field constraints
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::Config("name must not be empty".to_string()));
        }
        if self.class_name.is_empty() {
            return Err(Error::Config("class_name must not be empty".to_string()));
        }
        if self.page_size == Some(0) {
            return Err(Error::Config("page_size must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Effective page size
    pub fn resolved_page_size(&self) -> usize {
        self.page_size.unwrap_or_else(platform_page_size)
    }
}

/// Page size reported by the OS
pub fn platform_page_size() -> usize {
    use nix::unistd::{sysconf, SysconfVar};

    match sysconf(SysconfVar::PAGE_SIZE) {
        Ok(Some(size)) if size > 0 => size as usize,
        _ => FALLBACK_PAGE_SIZE,
    }
}
