//! Append-only registry of missing libraries shared between compiler processes.

use std::{
    ffi::OsString,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tempfile::NamedTempFile;
use tracing::{debug, trace};

use crate::{LibraryRegistryError, LockFile, LockRetryPolicy, Result, ZkMissingLibrary};

/// Directory, relative to the project root, holding the missing libraries cache.
pub const LIBRARIES_CACHE_DIR: &str = ".zksolc-libraries-cache";

/// File name of the missing libraries cache.
pub const MISSING_LIBRARIES_FILE: &str = "missing_library_dependencies.json";

/// Cross-process accumulator of [`ZkMissingLibrary`] records, persisted as a JSON array.
///
/// Every compiler process of a build session appends what it detected; appends are serialized
/// with an advisory lock on a sibling `.lock` file and the registry file is only ever replaced
/// atomically, so readers always see a complete JSON array. Nothing is cached in memory: the
/// file is the only state.
#[derive(Clone, Debug)]
pub struct ZkLibraryRegistry {
    path: PathBuf,
    lock_policy: LockRetryPolicy,
}

impl ZkLibraryRegistry {
    /// Creates a registry stored at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock_policy: LockRetryPolicy::default() }
    }

    /// Creates the registry used for the project at `project_root`.
    pub fn for_project(project_root: impl AsRef<Path>) -> Self {
        Self::new(Self::default_path(project_root))
    }

    /// Returns the missing libraries cache path of a project.
    pub fn default_path(project_root: impl AsRef<Path>) -> PathBuf {
        project_root.as_ref().join(LIBRARIES_CACHE_DIR).join(MISSING_LIBRARIES_FILE)
    }

    /// Sets how long [`Self::append`] keeps retrying a contended lock.
    pub fn with_lock_policy(mut self, lock_policy: LockRetryPolicy) -> Self {
        self.lock_policy = lock_policy;
        self
    }

    /// Path of the registry file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the lock file guarding the registry.
    pub fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| MISSING_LIBRARIES_FILE.into());
        name.push(".lock");
        self.path.with_file_name(name)
    }

    /// Creates the registry as an empty array if it does not exist yet.
    ///
    /// An existing registry is left untouched, so this can be called any number of times and
    /// concurrently from several processes.
    pub fn ensure_exists(&self) -> Result<()> {
        if self.path.exists() {
            return Ok(());
        }

        let dir = self.dir();
        fs::create_dir_all(dir).map_err(|source| self.io_err(dir, source))?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(|source| self.io_err(dir, source))?;
        tmp.write_all(b"[]").map_err(|source| self.io_err(tmp.path(), source))?;
        match tmp.persist_noclobber(&self.path) {
            Ok(_) => debug!(path = ?self.path, "created missing libraries registry"),
            Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => {
                trace!(path = ?self.path, "registry created concurrently");
            }
            Err(err) => return Err(self.io_err(&self.path, err.error)),
        }
        Ok(())
    }

    /// Appends `libraries`, in order, to the registry.
    ///
    /// Records are never de-duplicated: reporting the same library twice stores it twice.
    pub fn append(&self, libraries: &[ZkMissingLibrary]) -> Result<()> {
        // done before locking so that a fresh registry always has something to lock next to
        self.ensure_exists()?;
        if libraries.is_empty() {
            return Ok(());
        }

        let _lock = LockFile::acquire(self.lock_path(), &self.lock_policy)?;
        trace!(path = ?self.path, count = libraries.len(), "appending missing libraries");

        // the registry may have changed between the check above and taking the lock
        let content = fs::read(&self.path).map_err(|source| self.write_err(source))?;
        let mut recorded = self.parse(&content)?;
        recorded.extend_from_slice(libraries);
        self.write(&recorded).map_err(|source| self.write_err(source))?;

        debug!(path = ?self.path, total = recorded.len(), "updated missing libraries registry");
        Ok(())
    }

    /// Returns every recorded library, in insertion order.
    pub fn read(&self) -> Result<Vec<ZkMissingLibrary>> {
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(LibraryRegistryError::NotFound { path: self.path.clone() });
            }
            Err(source) => return Err(self.io_err(&self.path, source)),
        };
        self.parse(&content)
    }

    /// Removes the registry, typically before a fresh build session.
    pub fn cleanup(&self) -> Result<()> {
        if !self.dir().exists() {
            return Ok(());
        }
        let _lock = LockFile::acquire(self.lock_path(), &self.lock_policy)?;
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = ?self.path, "removed missing libraries registry");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(self.io_err(&self.path, source)),
        }
    }

    fn parse(&self, content: &[u8]) -> Result<Vec<ZkMissingLibrary>> {
        serde_json::from_slice(content)
            .map_err(|source| LibraryRegistryError::Corrupt { path: self.path.clone(), source })
    }

    /// Replaces the registry with `libraries` via a rename, never exposing a partial file.
    fn write(&self, libraries: &[ZkMissingLibrary]) -> io::Result<()> {
        let mut content = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(
            &mut content,
            PrettyFormatter::with_indent(b"    "),
        );
        libraries.serialize(&mut ser)?;

        let mut tmp = NamedTempFile::new_in(self.dir())?;
        tmp.write_all(&content)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|err| err.error)?;
        Ok(())
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }

    fn io_err(&self, path: &Path, source: io::Error) -> LibraryRegistryError {
        LibraryRegistryError::Io { path: path.to_path_buf(), source }
    }

    fn write_err(&self, source: io::Error) -> LibraryRegistryError {
        LibraryRegistryError::Write { path: self.path.clone(), source }
    }
}
