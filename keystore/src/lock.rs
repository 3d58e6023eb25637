//! Advisory per-directory file locking: readers may coexist, writers are
//! exclusive. Guards the `<dir>/.lock` sentinel file for the lifetime of
//! the returned guard, per spec.md section 5's concurrency requirement.

use crate::error::KeystoreResult;
use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::Path;

fn lock_file_path(dir: &Path) -> std::path::PathBuf {
    dir.join(".lock")
}

fn open_lock_file(dir: &Path) -> KeystoreResult<File> {
    Ok(OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(lock_file_path(dir))?)
}

/// RAII guard over a keystore directory's advisory lock. Unlocks on drop.
pub struct DirLock {
    file: File,
}

impl DirLock {
    /// Acquire a shared lock, for operations that only read the store.
    pub fn shared(dir: &Path) -> KeystoreResult<Self> {
        let file = open_lock_file(dir)?;
        FileExt::lock_shared(&file)?;
        Ok(Self { file })
    }

    /// Acquire an exclusive lock, for operations that mutate the store.
    pub fn exclusive(dir: &Path) -> KeystoreResult<Self> {
        let file = open_lock_file(dir)?;
        FileExt::lock_exclusive(&file)?;
        Ok(Self { file })
    }
}

impl Drop for DirLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
