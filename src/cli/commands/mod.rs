//! Command implementations

mod build;
mod create;
mod dot;
mod gc;
mod run;
mod tags;

pub use build::build;
pub use create::create;
pub use dot::dot;
pub use gc::gc;
pub use run::run;
pub use tags::{resolve_tag, tags, unstage, untag};

use crate::config::Config;
use crate::error::{SqueakerError, SqueakerResult};
use crate::store::CacheStore;
use crate::vm::autodetect;
use std::path::PathBuf;

/// Open the cache store: CLI override, then config, then the default root
pub fn open_store(cli_root: Option<PathBuf>, config: &Config) -> CacheStore {
    let root = cli_root
        .or_else(|| config.cache.root.clone())
        .unwrap_or_else(CacheStore::default_root);
    CacheStore::new(root)
}

/// Pick the VM executable: CLI flag, then config, then autodetection
pub fn resolve_vm_path(flag: Option<PathBuf>, config: &Config) -> SqueakerResult<PathBuf> {
    flag.or_else(|| config.vm.path.clone())
        .or_else(autodetect::autodetect)
        .ok_or_else(|| SqueakerError::VmNotFound(autodetect::probe_report()))
}
