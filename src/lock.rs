// src/lock.rs

//! Per-root exclusion lock
//!
//! Mutating commands take this lock before touching anything under the
//! data root and release it on every exit path. The synchronization
//! primitive is the operating system's advisory file lock (`flock`); the
//! lock file's content is the holder's PID, purely informational.
//!
//! Because the advisory lock is tied to the open file handle, the kernel
//! releases it when the process terminates for any reason, so a crashed
//! holder never wedges the root.

use crate::error::{Error, Result};
use crate::layout::{create_dir_restricted, Layout};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info};

/// Advisory exclusion lock over one data root
pub struct Lock {
    file: Option<File>,
    path: PathBuf,
}

impl Lock {
    /// Try to acquire the lock without blocking. Contention fails with
    /// `AnotherInstanceRunning`; on success the file is truncated, the
    /// PID written, and the content synced. Acquisition precedes every
    /// other touch of the data root, so it creates its own parent
    /// directory (with the layout's restricted mode).
    pub fn acquire(layout: &Layout) -> Result<Self> {
        let path = layout.lock_file();
        if let Some(parent) = path.parent() {
            create_dir_restricted(parent)?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        match file.try_lock_exclusive() {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                return Err(Error::AnotherInstanceRunning(path));
            }
            Err(e) => return Err(e.into()),
        }

        // Holder identification only; the flock above is the real lock.
        file.set_len(0)?;
        write!(file, "{}", std::process::id())?;
        file.sync_all()?;

        info!("acquired lock at {}", path.display());
        Ok(Self {
            file: Some(file),
            path,
        })
    }

    /// Release the lock and close the handle. A second call fails with
    /// `NotAcquired` rather than succeeding silently.
    pub fn release(&mut self) -> Result<()> {
        match self.file.take() {
            Some(file) => {
                FileExt::unlock(&file)?;
                info!("released lock at {}", self.path.display());
                Ok(())
            }
            None => Err(Error::NotAcquired),
        }
    }

    /// Advisory probe: is some process holding the lock for this root?
    /// Must not corrupt state if it races with a real holder.
    pub fn is_locked(layout: &Layout) -> bool {
        let path = layout.lock_file();
        if !path.exists() {
            return false;
        }
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(_) => return false,
        };
        match file.try_lock_exclusive() {
            Ok(()) => {
                let _ = FileExt::unlock(&file);
                false
            }
            Err(_) => true,
        }
    }
}

impl Drop for Lock {
    fn drop(&mut self) {
        // Safety net for panic paths; normal flow calls release().
        if let Some(file) = self.file.take() {
            let _ = FileExt::unlock(&file);
            debug!("lock at {} dropped", self.path.display());
        }
    }
}
