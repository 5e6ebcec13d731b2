pub mod check;
pub mod checklist;
pub mod console;
pub mod list;
pub mod run;
pub mod status;
pub mod verify;

use crate::models::FeatverifyConfig;
use crate::state::Store;
use crate::Result;
use std::path::{Path, PathBuf};

/// Project root, config and store location for one invocation
#[derive(Debug, Clone)]
pub struct Workspace {
    pub project_root: PathBuf,
    pub config: FeatverifyConfig,
    pub store_path: PathBuf,
}

impl Workspace {
    /// Resolve the workspace from CLI overrides, defaulting to the current directory
    pub fn resolve(project_root: Option<&Path>, store: Option<&Path>) -> Result<Self> {
        let project_root = match project_root {
            Some(root) => root.to_path_buf(),
            None => std::env::current_dir()?,
        };
        let config = FeatverifyConfig::load(&project_root)?;
        let store_path = store
            .map(Path::to_path_buf)
            .unwrap_or_else(|| config.store_path.clone());

        Ok(Self {
            project_root,
            config,
            store_path,
        })
    }

    /// Load the verification document; a missing document is fatal
    pub fn open_store(&self) -> Result<Store> {
        Ok(Store::open(&self.project_root, &self.store_path)?)
    }
}
