use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;
use serde::{de::DeserializeOwned, Serialize};
use tempfile::NamedTempFile;

/// Location of the host's OS-side state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPaths {
    root: PathBuf,
}

impl HostPaths {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// `REMIND_HOME`, else `<data dir>/remind`.
    pub fn from_env() -> Self {
        if let Ok(home) = std::env::var("REMIND_HOME") {
            if !home.trim().is_empty() {
                return Self::new(home);
            }
        }
        let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(base.join("remind"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn channels_file(&self) -> PathBuf {
        self.root.join("channels.json")
    }

    pub fn alarms_file(&self) -> PathBuf {
        self.root.join("alarms.json")
    }

    pub fn shade_file(&self) -> PathBuf {
        self.root.join("shade.json")
    }

    /// Next values of the display and activation id sequences.
    pub fn counters_file(&self) -> PathBuf {
        self.root.join("counters.json")
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".lock");
    path.with_file_name(name)
}

fn read_document<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    match fs::read_to_string(path) {
        Ok(raw) if raw.trim().is_empty() => Ok(T::default()),
        Ok(raw) => serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse {}", path.display())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(T::default()),
        Err(err) => Err(err).with_context(|| format!("failed to read {}", path.display())),
    }
}

/// Reads a JSON document under a shared lock. Missing or empty files yield
/// the default value.
pub fn read_json<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    // Opened read-only: a writable handle would raise a change event on
    // close and wake the alarm daemon.
    let lock = match File::open(lock_path(path)) {
        Ok(lock) => lock,
        // Nothing has been written yet.
        Err(err) if err.kind() == io::ErrorKind::NotFound => return read_document(path),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to open lock for {}", path.display()))
        }
    };
    lock.lock_shared()?;
    let value = read_document(path);
    let _ = lock.unlock();
    value
}

/// Read-modify-write of a JSON document under an exclusive lock. The new
/// content is staged in a temporary file next to the target and renamed
/// over it, so readers see either the old or the new document, never a
/// partial one.
pub fn update_json<T, R>(path: &Path, apply: impl FnOnce(&mut T) -> R) -> Result<R>
where
    T: Serialize + DeserializeOwned + Default,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let lock = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path(path))
        .with_context(|| format!("failed to open lock for {}", path.display()))?;
    lock.lock_exclusive()?;

    let result = (|| -> Result<R> {
        let mut value: T = read_document(path)?;
        let result = apply(&mut value);

        let mut staged = NamedTempFile::new_in(dir)
            .with_context(|| format!("failed to stage {}", path.display()))?;
        serde_json::to_writer_pretty(&mut staged, &value)?;
        staged.flush()?;
        staged.as_file().sync_all()?;
        staged
            .persist(path)
            .with_context(|| format!("failed to replace {}", path.display()))?;
        Ok(result)
    })();

    let _ = lock.unlock();
    result
}
