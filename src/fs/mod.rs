//! Filesystem access for the simulation directory
//!
//! Every file the simulation touches lives directly inside one directory and
//! is addressed by a flat name. [`TargetDir`] owns that directory and performs
//! all the blocking I/O the actors and the teardown need. None of these calls
//! are async: callers run them on the blocking pool.

use rand::rngs::OsRng;
use rand::RngCore;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Chunk size used when streaming random fill
const FILL_CHUNK: usize = 64 * 1024;

/// Permission bits applied by the metadata mutator (owner read+write+execute)
pub const OWNER_RWX: u32 = 0o700;

/// Errors opening or inspecting the target directory
#[derive(Debug, Error)]
pub enum FsError {
    #[error("Directory not found: {0}")]
    NotFound(PathBuf),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Directory is not empty: {0}")]
    NotEmpty(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The directory a simulation populates
#[derive(Debug, Clone)]
pub struct TargetDir {
    root: PathBuf,
}

impl TargetDir {
    /// Opens an existing directory, canonicalizing its path
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FsError> {
        let path = path.as_ref();
        let root = match path.canonicalize() {
            Ok(root) => root,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(FsError::NotFound(path.to_path_buf()))
            }
            Err(source) => {
                return Err(FsError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        if !root.is_dir() {
            return Err(FsError::NotADirectory(root));
        }

        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_of(name).exists()
    }

    /// Creates `name` as a new file holding `len` random bytes
    ///
    /// Fails with `AlreadyExists` rather than clobbering an existing file.
    pub fn create_random(&self, name: &str, len: u64) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.path_of(name))?;
        fill_random(&mut file, len)?;
        file.flush()
    }

    /// Truncates the existing file `name` and writes `len` random bytes
    ///
    /// A missing file is an error; it is never recreated.
    pub fn rewrite_random(&self, name: &str, len: u64) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(self.path_of(name))?;
        fill_random(&mut file, len)?;
        file.flush()
    }

    /// Reads up to `len` bytes from the start of `name`, returning the count read
    pub fn read_prefix(&self, name: &str, len: u64) -> io::Result<u64> {
        let file = File::open(self.path_of(name))?;
        let mut limited = file.take(len);
        let mut buf = [0u8; FILL_CHUNK];
        let mut total = 0u64;
        loop {
            match limited.read(&mut buf) {
                Ok(0) => return Ok(total),
                Ok(n) => total += n as u64,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Sets the permission bits of `name` to owner read+write+execute
    pub fn make_owner_rwx(&self, name: &str) -> io::Result<()> {
        fs::set_permissions(self.path_of(name), fs::Permissions::from_mode(OWNER_RWX))
    }

    /// Removes `name`, treating an already missing file as success
    ///
    /// Returns whether a file was actually removed.
    pub fn remove_quiet(&self, name: &str) -> io::Result<bool> {
        match fs::remove_file(self.path_of(name)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Names of every non-directory entry
    pub fn list_files(&self) -> Result<Vec<String>, FsError> {
        let entries = fs::read_dir(&self.root).map_err(|source| FsError::Io {
            path: self.root.clone(),
            source,
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping unreadable directory entry: {}", e);
                    continue;
                }
            };
            // Entries can vanish between read_dir and file_type
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_dir() {
                debug!("Skipping subdirectory {:?}", entry.file_name());
                continue;
            }
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    /// Whether the directory has no entries at all
    pub fn is_empty(&self) -> Result<bool, FsError> {
        let mut entries = fs::read_dir(&self.root).map_err(|source| FsError::Io {
            path: self.root.clone(),
            source,
        })?;
        Ok(entries.next().is_none())
    }

    /// Removes every file in the directory, returning how many were removed
    ///
    /// Files deleted concurrently by someone else are ignored; other removal
    /// failures are logged and skipped.
    pub fn sweep(&self) -> Result<usize, FsError> {
        let mut removed = 0;
        for name in self.list_files()? {
            match self.remove_quiet(&name) {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => warn!(file = %name, "Failed to remove file during sweep: {}", e),
            }
        }
        debug!(removed, dir = %self.root.display(), "Directory sweep finished");
        Ok(removed)
    }
}

/// Writes `len` bytes from the operating system random source
fn fill_random(dest: &mut impl Write, len: u64) -> io::Result<()> {
    let mut buf = vec![0u8; FILL_CHUNK.min(len as usize)];
    let mut remaining = len;
    while remaining > 0 {
        let chunk = remaining.min(buf.len() as u64) as usize;
        OsRng
            .try_fill_bytes(&mut buf[..chunk])
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        dest.write_all(&buf[..chunk])?;
        remaining -= chunk as u64;
    }
    Ok(())
}
