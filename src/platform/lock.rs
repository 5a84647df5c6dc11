// LogDigest - platform/lock.rs
//
// Per-date run lock.
//
// A JSON sentinel `root/<date>.lock` claims exclusive ownership of the
// working directory `root/<date>/` for one run. It is created with
// create-new semantics so two runs racing for the same date cannot both win.
// A sentinel left behind by a crashed run is recovered when its PID is no
// longer alive or it is older than the staleness threshold.

use crate::util::error::LockError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Contents of the lock sentinel file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockSentinel {
    /// PID of the process holding the lock.
    pub pid: u32,
    /// Hostname of the machine.
    pub hostname: String,
    /// When the sentinel was created.
    pub created_at: DateTime<Utc>,
    /// Date the run covers.
    pub date: String,
}

impl LockSentinel {
    fn current(date: &str) -> Self {
        Self {
            pid: std::process::id(),
            hostname: hostname(),
            created_at: Utc::now(),
            date: date.to_string(),
        }
    }

    /// Whether this sentinel's PID is still alive. Cross-host sentinels are
    /// assumed alive.
    fn is_holder_alive(&self) -> bool {
        if self.hostname != hostname() {
            return true;
        }
        is_pid_alive(self.pid)
    }

    fn is_stale(&self, threshold: Duration) -> bool {
        let age = Utc::now().signed_duration_since(self.created_at);
        age.to_std().map_or(false, |age| age > threshold)
    }
}

/// Held run lock. The sentinel is removed when this value is dropped.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Acquire the lock at `path` for `date`.
    ///
    /// Fails with `LockError::Held` if a live, non-stale sentinel exists.
    pub fn acquire(path: &Path, date: &str, stale_after: Duration) -> Result<Self, LockError> {
        let io_err = |source: io::Error| LockError::Io {
            path: path.to_path_buf(),
            source,
        };

        // Second pass only happens after a stale sentinel was removed.
        for _ in 0..2 {
            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(path)
            {
                Ok(mut file) => {
                    let sentinel = LockSentinel::current(date);
                    let json = serde_json::to_vec_pretty(&sentinel)
                        .map_err(|e| io_err(io::Error::new(io::ErrorKind::InvalidData, e)))?;
                    if let Err(e) = file.write_all(&json) {
                        let _ = std::fs::remove_file(path);
                        return Err(io_err(e));
                    }
                    tracing::debug!(
                        path = %path.display(),
                        pid = sentinel.pid,
                        "Run lock acquired"
                    );
                    return Ok(Self {
                        path: path.to_path_buf(),
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    match read_sentinel(path) {
                        Ok(existing)
                            if existing.is_holder_alive() && !existing.is_stale(stale_after) =>
                        {
                            return Err(LockError::Held {
                                path: path.to_path_buf(),
                                pid: existing.pid,
                                hostname: existing.hostname,
                            });
                        }
                        Ok(existing) => {
                            tracing::warn!(
                                path = %path.display(),
                                pid = existing.pid,
                                created_at = %existing.created_at,
                                "Recovering stale run lock"
                            );
                        }
                        Err(e) => {
                            tracing::warn!(
                                path = %path.display(),
                                error = %e,
                                "Unreadable run lock; treating as stale"
                            );
                        }
                    }
                    match std::fs::remove_file(path) {
                        Ok(()) => {}
                        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                        Err(e) => return Err(io_err(e)),
                    }
                }
                Err(e) => return Err(io_err(e)),
            }
        }

        // Another process re-created the sentinel between removal and retry.
        match read_sentinel(path) {
            Ok(existing) => Err(LockError::Held {
                path: path.to_path_buf(),
                pid: existing.pid,
                hostname: existing.hostname,
            }),
            Err(e) => Err(io_err(e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Run lock released"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove run lock"
            ),
        }
    }
}

fn read_sentinel(path: &Path) -> io::Result<LockSentinel> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .or_else(|_| std::env::var("HOST"))
        .unwrap_or_else(|_| "unknown".into())
}

/// On Linux a live PID has a `/proc/<pid>` entry. Elsewhere liveness cannot
/// be checked without platform calls, so the holder is assumed alive and
/// only the staleness threshold recovers the lock.
fn is_pid_alive(pid: u32) -> bool {
    if cfg!(target_os = "linux") {
        Path::new(&format!("/proc/{pid}")).exists()
    } else {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn test_acquire_and_release() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2024-01-01.lock");
        {
            let lock = RunLock::acquire(&path, "2024-01-01", HOUR).unwrap();
            assert!(lock.path().exists());
            let sentinel = read_sentinel(&path).unwrap();
            assert_eq!(sentinel.pid, std::process::id());
            assert_eq!(sentinel.date, "2024-01-01");
        }
        assert!(!path.exists(), "lock must be removed on drop");
    }

    #[test]
    fn test_second_acquire_is_held() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2024-01-01.lock");
        let _lock = RunLock::acquire(&path, "2024-01-01", HOUR).unwrap();
        let second = RunLock::acquire(&path, "2024-01-01", HOUR);
        assert!(matches!(second, Err(LockError::Held { .. })));
    }

    #[test]
    fn test_stale_sentinel_is_recovered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2024-01-01.lock");
        let old = LockSentinel {
            pid: std::process::id(),
            hostname: hostname(),
            created_at: Utc::now() - chrono::Duration::hours(12),
            date: "2024-01-01".to_string(),
        };
        std::fs::write(&path, serde_json::to_vec(&old).unwrap()).unwrap();
        let lock = RunLock::acquire(&path, "2024-01-01", HOUR).unwrap();
        let fresh = read_sentinel(lock.path()).unwrap();
        assert!(fresh.created_at > old.created_at);
    }

    #[test]
    fn test_corrupt_sentinel_is_recovered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2024-01-01.lock");
        std::fs::write(&path, "not json").unwrap();
        assert!(RunLock::acquire(&path, "2024-01-01", HOUR).is_ok());
    }
}
