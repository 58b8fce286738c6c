//! Per-account run lock.
//!
//! A lock is a file created with `create_new`, so acquisition fails if any
//! other run (in any process) already holds it. The file is removed on drop.
//! A run that dies without unwinding leaves the file behind; remove it by
//! hand after checking no rebalancer is running.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::{Error, Result};

#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Take the lock at `path`, creating parent directories as needed.
    pub fn acquire(path: &Path) -> Result<Self> {
        let io_err = |source: std::io::Error| Error::Lock {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(Error::Locked {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => return Err(io_err(e)),
        };

        // Held from here on, so a failed write still removes the file
        let lock = Self {
            path: path.to_path_buf(),
        };
        writeln!(file, "{}", std::process::id()).map_err(io_err)?;
        debug!("Acquired run lock {}", path.display());
        Ok(lock)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Failed to remove run lock {}: {e}", self.path.display());
        }
    }
}
