use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::camera::CaptureError;
use crate::journal::{Event, Journal};

/// Exclusive hold on the camera across processes, backed by a lock file
/// containing the holder's PID.
///
/// A lock left by a dead process is replaced, which needs `/proc` to tell
/// live holders from dead ones. Elsewhere every existing lock counts as
/// held. Two processes recovering the same stale lock at the same instant
/// can both succeed; the supervisor runs a single instance.
#[derive(Debug)]
pub struct DeviceLock {
    path: Option<PathBuf>,
}

impl DeviceLock {
    pub fn acquire(path: &Path, journal: &dyn Journal) -> Result<Self, CaptureError> {
        match create(path) {
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            other => return other.map_err(|source| lock_error(path, source)),
        }

        match read_holder(path) {
            Some(pid) if process_alive(pid) => Err(CaptureError::Busy {
                path: path.to_path_buf(),
                holder: pid,
            }),
            None if !STALE_CHECK => Err(CaptureError::Busy {
                path: path.to_path_buf(),
                holder: 0,
            }),
            _ => {
                journal.record(Event::StaleLockRemoved {
                    path: path.to_path_buf(),
                });
                fs::remove_file(path).map_err(|source| lock_error(path, source))?;
                create(path).map_err(|source| match source.kind() {
                    ErrorKind::AlreadyExists => CaptureError::Busy {
                        path: path.to_path_buf(),
                        holder: read_holder(path).unwrap_or(0),
                    },
                    _ => lock_error(path, source),
                })
            }
        }
    }

    /// Removes the lock file now, reporting a failure instead of ignoring it.
    pub fn release(mut self) -> io::Result<()> {
        match self.path.take() {
            Some(path) => fs::remove_file(path),
            None => Ok(()),
        }
    }
}

impl Drop for DeviceLock {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            let _ = fs::remove_file(path);
        }
    }
}

fn create(path: &Path) -> io::Result<DeviceLock> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;
    let lock = DeviceLock {
        path: Some(path.to_path_buf()),
    };
    write!(file, "{}", std::process::id())?;
    Ok(lock)
}

fn lock_error(path: &Path, source: io::Error) -> CaptureError {
    CaptureError::Lock {
        path: path.to_path_buf(),
        source,
    }
}

fn read_holder(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// Whether holders can be checked for liveness on this platform.
const STALE_CHECK: bool = cfg!(target_os = "linux");

#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

#[cfg(not(target_os = "linux"))]
fn process_alive(_pid: u32) -> bool {
    true
}
