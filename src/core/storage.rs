// Directory and file primitives the database persists through.
//
// Paths handed to a `Storage` are relative to its root. Missing files read as
// empty and missing directories list as empty, so a fresh root loads as
// "nothing to load" rather than as an error.
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::core::error::Error;
use crate::core::format::INDEX_FILE;

pub trait Storage {
    /// Returns `true` only when the directory was newly created.
    fn create_dir_if_absent(&self, dir: &Path) -> Result<bool, Error>;

    /// Names of regular files directly inside `dir`, sorted.
    fn list_files(&self, dir: &Path) -> Result<Vec<String>, Error>;

    fn read_lines(&self, file: &Path) -> Result<Vec<String>, Error>;

    fn write_lines(&self, file: &Path, lines: &[String]) -> Result<(), Error>;

    /// Returns `false` when there was nothing to remove.
    fn remove_file(&self, file: &Path) -> Result<bool, Error>;

    fn remove_dir_all(&self, dir: &Path) -> Result<bool, Error>;

    fn database_names(&self) -> Result<Vec<String>, Error> {
        Ok(self
            .read_lines(Path::new(INDEX_FILE))?
            .into_iter()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect())
    }

    /// Appends `name` to the global index unless already listed.
    fn register_database(&self, name: &str) -> Result<bool, Error> {
        let mut names = self.database_names()?;
        if names.iter().any(|existing| existing == name) {
            return Ok(false);
        }
        names.push(name.to_string());
        self.write_lines(Path::new(INDEX_FILE), &names)?;
        Ok(true)
    }

    fn unregister_database(&self, name: &str) -> Result<bool, Error> {
        let mut names = self.database_names()?;
        let before = names.len();
        names.retain(|existing| existing != name);
        if names.len() == before {
            return Ok(false);
        }
        self.write_lines(Path::new(INDEX_FILE), &names)?;
        Ok(true)
    }
}

#[derive(Clone, Debug)]
pub struct DirStorage {
    root: PathBuf,
}

impl DirStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn default_root() -> PathBuf {
        let home = std::env::var_os("HOME").unwrap_or_default();
        PathBuf::from(home).join(".rowdb").join("databases")
    }

    fn resolve(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }
}

impl Default for DirStorage {
    fn default() -> Self {
        Self::new(Self::default_root())
    }
}

impl Storage for DirStorage {
    fn create_dir_if_absent(&self, dir: &Path) -> Result<bool, Error> {
        let path = self.resolve(dir);
        if path.is_dir() {
            return Ok(false);
        }
        fs::create_dir_all(&path).map_err(|err| {
            Error::from_io(err, &path).with_message("failed to create directory")
        })?;
        Ok(true)
    }

    fn list_files(&self, dir: &Path) -> Result<Vec<String>, Error> {
        let path = self.resolve(dir);
        let entries = match fs::read_dir(&path) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(Error::from_io(err, &path).with_message("failed to read directory"));
            }
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| {
                Error::from_io(err, &path).with_message("failed to read directory entry")
            })?;
            let is_file = entry
                .file_type()
                .map(|kind| kind.is_file())
                .unwrap_or(false);
            if is_file {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn read_lines(&self, file: &Path) -> Result<Vec<String>, Error> {
        let path = self.resolve(file);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(text.lines().map(str::to_string).collect()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(Error::from_io(err, &path).with_message("failed to read file")),
        }
    }

    fn write_lines(&self, file: &Path, lines: &[String]) -> Result<(), Error> {
        let path = self.resolve(file);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                Error::from_io(err, parent).with_message("failed to create directory")
            })?;
        }
        let mut out = fs::File::create(&path)
            .map_err(|err| Error::from_io(err, &path).with_message("failed to create file"))?;
        let mut text = String::new();
        for line in lines {
            text.push_str(line);
            text.push('\n');
        }
        out.write_all(text.as_bytes())
            .map_err(|err| Error::from_io(err, &path).with_message("failed to write file"))
    }

    fn remove_file(&self, file: &Path) -> Result<bool, Error> {
        let path = self.resolve(file);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(Error::from_io(err, &path).with_message("failed to delete file")),
        }
    }

    fn remove_dir_all(&self, dir: &Path) -> Result<bool, Error> {
        let path = self.resolve(dir);
        match fs::remove_dir_all(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(Error::from_io(err, &path).with_message("failed to delete directory")),
        }
    }
}
