use std::{
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use nix::{
    errno::Errno,
    fcntl::{Flock, FlockArg},
};
use tracing::warn;

use crate::error::QueueError;

const LOCK_ATTEMPTS: u32 = 50;
const LOCK_BACKOFF: Duration = Duration::from_millis(20);

/// last `n` characters of `s`
pub fn tail_chars(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match s.char_indices().rev().nth(n - 1) {
        Some((index, _)) => &s[index..],
        None => s,
    }
}

/// first `n` characters of `s`
pub fn truncate_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((index, _)) => &s[..index],
        None => s,
    }
}

/// quotes a word for `sh`, leaving plain words untouched
pub fn shell_quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./:=@%+,".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// Exclusive advisory lock on a lock file, held until dropped.
///
/// `flock` locks belong to the open file description, so two handles opened
/// separately exclude each other even inside one process.
pub struct FileLock {
    _lock: Flock<File>,
}

impl FileLock {
    /// blocks until the lock is held, retrying transient failures
    pub fn acquire(path: &Path) -> Result<Self, QueueError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .open(path)
                .map_err(QueueError::io(path))?;
            match Flock::lock(file, FlockArg::LockExclusive) {
                Ok(lock) => return Ok(Self { _lock: lock }),
                Err((_, Errno::EINTR)) => continue,
                Err((_, errno @ (Errno::EAGAIN | Errno::ENOLCK))) if attempts < LOCK_ATTEMPTS => {
                    warn!("lock on {:?} failed ({}), retrying", path, errno);
                    thread::sleep(LOCK_BACKOFF * attempts);
                }
                Err((_, errno)) => {
                    return Err(QueueError::Lock {
                        path: path.to_path_buf(),
                        attempts,
                        errno,
                    })
                }
            }
        }
    }
}

/// replaces `path` with `contents` through a temporary file and a rename
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let tmp = sibling(path, "tmp");
    {
        let mut file = File::create(&tmp)?;
        file.write_all(contents)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)
}

/// `path` with `suffix` appended to its file name
pub fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}
