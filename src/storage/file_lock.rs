use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use tracing::debug;
use crate::core::error::{Error, ErrorKind, Result};
use crate::storage::layout::StorageLayout;

/// Exclusive writer lock on an index directory. The holder's pid is written
/// into the lock file so a refused writer can say who holds it.
pub struct FileLock {
    file: File,
}

impl FileLock {
    /// Take the lock without blocking; fails with `InvalidState` when another
    /// writer, in this process or another, already holds it
    pub fn acquire(storage: &StorageLayout) -> Result<Self> {
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(storage.lock_path())?;

        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            use libc::{flock, LOCK_EX, LOCK_NB};

            let locked = unsafe { flock(file.as_raw_fd(), LOCK_EX | LOCK_NB) == 0 };
            if !locked {
                let mut holder = String::new();
                let _ = file.read_to_string(&mut holder);
                return Err(Error::new(
                    ErrorKind::InvalidState,
                    format!(
                        "index {} already has a writer (pid {})",
                        storage.base_dir.display(),
                        holder.trim()
                    ),
                ));
            }
        }

        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        write!(file, "{}", std::process::id())?;
        debug!(path = %storage.lock_path().display(), "writer lock acquired");

        Ok(FileLock { file })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            use libc::{flock, LOCK_UN};

            unsafe {
                flock(self.file.as_raw_fd(), LOCK_UN);
            }
        }
    }
}
