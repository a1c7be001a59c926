use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Advisory lock serializing writes to the cadence data directory.
///
/// The watch loop and one-shot commands may run side by side; platform
/// flock (Unix) keeps their load-mutate-save cycles from interleaving.
pub struct FileLock {
    _file: File,
    path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not create lock file at {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not lock {path}: another cad process may be writing")]
    Timeout { path: PathBuf },
    #[error("lock error: {0}")]
    Io(#[from] std::io::Error),
}

impl FileLock {
    /// Acquire the lock, waiting up to `timeout` for a holder to let go.
    pub fn acquire(data_dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        let lock_path = data_dir.join(".lock");
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| LockError::Create {
                path: lock_path.clone(),
                source: e,
            })?;

        let deadline = Instant::now() + timeout;
        loop {
            match try_lock(&file) {
                Ok(()) => {
                    return Ok(FileLock {
                        _file: file,
                        path: lock_path,
                    });
                }
                Err(_) if Instant::now() < deadline => {
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(_) => return Err(LockError::Timeout { path: lock_path }),
            }
        }
    }

    /// Acquire with the default 5 second timeout.
    pub fn acquire_default(data_dir: &Path) -> Result<Self, LockError> {
        Self::acquire(data_dir, Duration::from_secs(5))
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // flock releases with the descriptor; the file itself is litter
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(unix)]
fn try_lock(file: &File) -> Result<(), std::io::Error> {
    use std::os::unix::io::AsRawFd;
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn try_lock(_file: &File) -> Result<(), std::io::Error> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn acquire_release_reacquire() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("cadence");
        fs::create_dir_all(&dir).unwrap();

        let lock = FileLock::acquire_default(&dir);
        assert!(lock.is_ok());
        drop(lock);

        assert!(FileLock::acquire_default(&dir).is_ok());
    }

    #[test]
    fn second_holder_times_out() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("cadence");
        fs::create_dir_all(&dir).unwrap();

        let _held = FileLock::acquire_default(&dir).unwrap();
        let second = FileLock::acquire(&dir, Duration::from_millis(50));
        assert!(matches!(second, Err(LockError::Timeout { .. })));
    }
}
