use std::fs::{File, OpenOptions};
use std::path::Path;

use anyhow::{Result, anyhow};
use log::debug;
use rustix::fs::{FlockOperation, flock};

/// Exclusive whole-process lock. Released when dropped or when the process
/// exits.
#[derive(Debug)]
pub struct RunLock {
    _file: File,
}

impl RunLock {
    /// Block until the lock at `path` is held.
    pub fn acquire<P: AsRef<Path>>(path: P) -> Result<Self> {
        let p = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(p)
            .map_err(|e| anyhow!("unable to open lock file {:?}: {}", p, e))?;
        debug!("Waiting for lock {:?}", p);
        flock(&file, FlockOperation::LockExclusive)
            .map_err(|e| anyhow!("unable to lock {:?}: {}", p, e))?;
        debug!("Acquired lock {:?}", p);
        Ok(Self { _file: file })
    }
}
