//! Configuration schema for Squeaker
//!
//! Configuration is stored at `~/.config/squeaker/config.toml`. Everything
//! has a default; the file is optional.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Smalltalk VM settings
    pub vm: VmConfig,

    /// Cache settings
    pub cache: CacheConfig,
}

/// Smalltalk VM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    /// VM executable; autodetected when unset
    pub path: Option<PathBuf>,

    /// Pass the headless flag to the VM
    pub headless: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            path: None,
            headless: true,
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache root; default is the user cache directory
    pub root: Option<PathBuf>,

    /// How many recent .changes files to retain after `run`
    pub recent_changes_keep: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: None,
            recent_changes_keep: 5,
        }
    }
}
