//! Purpose: Resolve databases under a storage root for the CLI and embedders.
//! Exports: `LocalClient` and database lifecycle operations.
//! Role: Single place where "does this database exist" is decided.
//! Invariants: Only names listed in the global index count as existing databases.
//! Invariants: `Database::open` alone creates silently; the client refuses to.

use crate::core::database::Database;
use crate::core::error::{Error, ErrorKind};
use crate::core::format::check_name;
use crate::core::storage::{DirStorage, Storage};
use std::path::{Path, PathBuf};

pub type ApiResult<T> = Result<T, Error>;

#[derive(Clone, Debug)]
pub struct LocalClient {
    storage: DirStorage,
}

impl LocalClient {
    pub fn new() -> Self {
        Self {
            storage: DirStorage::default(),
        }
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.storage = DirStorage::new(root);
        self
    }

    pub fn root(&self) -> &Path {
        self.storage.root()
    }

    pub fn storage(&self) -> &DirStorage {
        &self.storage
    }

    pub fn list_databases(&self) -> ApiResult<Vec<String>> {
        self.storage.database_names()
    }

    pub fn create_database(&self, name: &str) -> ApiResult<Database> {
        check_name("database", name)?;
        if Database::exists(&self.storage, name)? {
            return Err(Error::new(ErrorKind::AlreadyExists)
                .with_message(format!("database {name:?} already exists"))
                .with_path(self.root().join(name)));
        }
        Database::open(self.storage.clone(), name)
    }

    pub fn open_database(&self, name: &str) -> ApiResult<Database> {
        check_name("database", name)?;
        if !Database::exists(&self.storage, name)? {
            return Err(Error::new(ErrorKind::NotFound)
                .with_message(format!("database {name:?} does not exist"))
                .with_path(self.root().join(name))
                .with_hint("Create it first with `rowdb db create <name>`."));
        }
        Database::open(self.storage.clone(), name)
    }

    pub fn delete_database(&self, name: &str) -> ApiResult<()> {
        self.open_database(name)?.delete()
    }
}

impl Default for LocalClient {
    fn default() -> Self {
        Self::new()
    }
}
