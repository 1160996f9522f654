//! Advisory, cross-process file locking.

use std::{
    fs::{File, OpenOptions},
    io,
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use fs4::FileExt;
use tracing::trace;

/// Errors returned by [`LockFile::acquire`].
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// The lock file could not be opened or locked.
    #[error("failed to lock {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] io::Error),
    /// The lock was still held by another process after all retries.
    #[error("lock {} still held after {} attempts", .0.display(), .1)]
    Timeout(PathBuf, u32),
}

/// How long to keep retrying a contended lock.
///
/// Every retry waits twice as long as the previous one, starting at `min_timeout`; the sum of all
/// waits never exceeds `max_timeout`. [`LockFile::acquire`] sleeps a random duration between half
/// and all of each delay, so contenders started together do not keep retrying in lockstep.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LockRetryPolicy {
    /// Maximum number of retries after the first attempt.
    pub retries: u32,
    /// Wait before the first retry.
    pub min_timeout: Duration,
    /// Cap on the total time spent waiting.
    pub max_timeout: Duration,
}

impl Default for LockRetryPolicy {
    fn default() -> Self {
        Self {
            retries: 10,
            min_timeout: Duration::from_millis(1),
            max_timeout: Duration::from_millis(1000),
        }
    }
}

impl LockRetryPolicy {
    /// Returns a policy that fails immediately on contention.
    pub fn no_retry() -> Self {
        Self { retries: 0, min_timeout: Duration::ZERO, max_timeout: Duration::ZERO }
    }

    /// Longest waits to perform between consecutive lock attempts.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        let mut remaining = self.max_timeout;
        (0..self.retries).map_while(move |attempt| {
            if remaining.is_zero() {
                return None;
            }
            let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
            let delay = self.min_timeout.saturating_mul(factor).min(remaining);
            remaining -= delay;
            Some(delay)
        })
    }
}

/// An exclusively locked file, unlocked once dropped.
///
/// The file itself is left on disk: removing it while other processes wait on it would let two
/// of them lock different inodes under the same path.
#[derive(Debug)]
pub struct LockFile {
    file: File,
    lock_path: PathBuf,
}

impl LockFile {
    /// Creates `lock_path` if needed and locks it exclusively, retrying according to `policy`.
    pub fn acquire(
        lock_path: impl Into<PathBuf>,
        policy: &LockRetryPolicy,
    ) -> Result<Self, LockError> {
        let lock_path = lock_path.into();
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&lock_path)
            .map_err(|err| LockError::Io(lock_path.clone(), err))?;

        let mut delays = policy.delays();
        let mut attempts = 0;
        loop {
            attempts += 1;
            match FileExt::try_lock_exclusive(&file) {
                Ok(()) => {
                    trace!(path = ?lock_path, attempts, "acquired lock");
                    return Ok(Self { file, lock_path });
                }
                Err(err) if is_contended(&err) => {}
                Err(err) => return Err(LockError::Io(lock_path, err)),
            }

            let Some(delay) = delays.next() else {
                return Err(LockError::Timeout(lock_path, attempts));
            };
            let delay = jitter(delay);
            trace!(path = ?lock_path, attempts, ?delay, "lock contended, backing off");
            thread::sleep(delay);
        }
    }

    /// Path of the underlying lock file.
    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.file) {
            trace!(path = ?self.lock_path, %err, "failed to unlock");
        }
    }
}

/// Returns a random duration in `[delay / 2, delay]`.
fn jitter(delay: Duration) -> Duration {
    let half = delay / 2;
    half + half.mul_f64(rand::random::<f64>())
}

fn is_contended(err: &io::Error) -> bool {
    #[cfg(windows)]
    {
        const ERROR_LOCK_VIOLATION: i32 = 33;
        if err.raw_os_error() == Some(ERROR_LOCK_VIOLATION) {
            return true;
        }
    }
    err.kind() == io::ErrorKind::WouldBlock
}
