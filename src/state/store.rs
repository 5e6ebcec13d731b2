//! Store - typed load and atomic persist of the verification document

use super::error::StoreError;
use super::transitions::StateMachine;
use crate::models::VerificationDocument;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// The verification document plus where it lives
#[derive(Debug)]
pub struct Store {
    project_root: PathBuf,
    path: PathBuf,
    document: VerificationDocument,
}

impl Store {
    /// Load the document at `store_path` (relative paths resolve against `project_root`)
    ///
    /// A missing document is an error; nothing may proceed without it.
    pub fn open(project_root: impl Into<PathBuf>, store_path: &Path) -> Result<Self, StoreError> {
        let project_root = project_root.into();
        let path = project_root.join(store_path);

        if !path.exists() {
            return Err(StoreError::Missing(path));
        }

        let content = std::fs::read_to_string(&path).map_err(|source| StoreError::Read {
            path: path.clone(),
            source,
        })?;
        let document = serde_yaml::from_str(&content).map_err(|source| StoreError::Parse {
            path: path.clone(),
            source,
        })?;

        tracing::debug!(path = %path.display(), "loaded verification document");

        Ok(Self {
            project_root,
            path,
            document,
        })
    }

    /// Wrap an in-memory document; nothing is written until `save`
    pub fn new(
        project_root: impl Into<PathBuf>,
        store_path: &Path,
        document: VerificationDocument,
    ) -> Self {
        let project_root = project_root.into();
        let path = project_root.join(store_path);
        Self {
            project_root,
            path,
            document,
        }
    }

    /// Persist the document atomically
    ///
    /// Writes a temp file in the same directory, then renames it over the
    /// original so readers never observe a partial document.
    pub fn save(&self) -> Result<(), StoreError> {
        let content = serde_yaml::to_string(&self.document)?;

        let persist_err = |source: std::io::Error| StoreError::Persist {
            path: self.path.clone(),
            source,
        };

        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(persist_err)?;

        let mut temp_file = NamedTempFile::new_in(&parent).map_err(persist_err)?;
        temp_file
            .write_all(content.as_bytes())
            .map_err(persist_err)?;
        temp_file.flush().map_err(persist_err)?;
        temp_file.as_file().sync_all().map_err(persist_err)?;

        temp_file
            .persist(&self.path)
            .map_err(|e| persist_err(e.error))?;

        tracing::debug!(path = %self.path.display(), "persisted verification document");
        Ok(())
    }

    pub fn document(&self) -> &VerificationDocument {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut VerificationDocument {
        &mut self.document
    }

    /// State machine over this store's document
    pub fn state_machine(&mut self) -> StateMachine<'_> {
        StateMachine::new(&mut self.document, &self.project_root)
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
