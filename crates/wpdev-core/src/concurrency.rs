//! Per-environment locking.
//!
//! Every command that mutates an environment holds `<root>/.locks/<slug>.lock`
//! for its duration, so two `wpdev` processes never write the same instance
//! directory at once. Different slugs never contend.

use crate::CoreError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::Path;

/// Exclusive advisory lock on one environment's lock file.
///
/// Released when dropped, including on early return through `?`.
pub struct InstanceLock {
    lock_file: File,
}

fn open_lock_file(lock_path: &Path) -> Result<File, CoreError> {
    if let Some(parent) = lock_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    Ok(OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(lock_path)?)
}

impl InstanceLock {
    /// Blocks until no other process holds the environment.
    pub fn acquire(lock_path: &Path) -> Result<Self, CoreError> {
        let file = open_lock_file(lock_path)?;
        file.lock_exclusive()
            .map_err(|e| CoreError::Io(std::io::Error::new(std::io::ErrorKind::WouldBlock, e)))?;
        Ok(Self { lock_file: file })
    }

    /// `Ok(None)` when another process is working on the environment.
    pub fn try_acquire(lock_path: &Path) -> Result<Option<Self>, CoreError> {
        let file = open_lock_file(lock_path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self { lock_file: file })),
            Err(_) => Ok(None),
        }
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = self.lock_file.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_is_exclusive_until_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("locks/site.lock");

        let held = InstanceLock::acquire(&lock_path).unwrap();
        assert!(lock_path.exists());
        assert!(InstanceLock::try_acquire(&lock_path).unwrap().is_none());

        drop(held);
        assert!(InstanceLock::try_acquire(&lock_path).unwrap().is_some());
    }

    #[test]
    fn environments_lock_independently() {
        let dir = tempfile::tempdir().unwrap();
        let store = crate::InstanceStore::new(dir.path());
        let alpha = wpdev_schema::Slug::parse("alpha").unwrap();
        let beta = wpdev_schema::Slug::parse("beta").unwrap();

        let _held = InstanceLock::acquire(&store.lock_path(&alpha)).unwrap();
        assert!(InstanceLock::try_acquire(&store.lock_path(&alpha)).unwrap().is_none());
        assert!(InstanceLock::try_acquire(&store.lock_path(&beta)).unwrap().is_some());
        assert!(store.lock_path(&alpha).ends_with(".locks/alpha.lock"));
    }
}
