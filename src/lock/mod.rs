//! Exclusive locking for registry mutation.
//!
//! Every path that mutates the persisted registry must hold the exclusive
//! lock. The lock is advisory and cooperative: it cannot stop a process that
//! bypasses it, so all mutation in this crate goes through [`LockGuard`].
//!
//! Two backends implement the same bounded-wait-then-fail contract:
//!
//! - [`MarkerLock`] — a marker file claimed atomically with `O_EXCL`,
//!   coordinating multiple processes on one host. The marker body records
//!   the owner pid and acquisition time so a marker left behind by a
//!   crashed owner can be detected and reclaimed.
//! - [`InProcessLock`] — a mutex-backed lock for tests and embedded use
//!   where everything lives in one process.

use chrono::{DateTime, Utc};
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Default interval between claim attempts.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default ceiling on the total wait before giving up.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(5);

/// Default age past which a marker is considered abandoned.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(600);

/// Errors from lock operations.
#[derive(Error, Debug)]
pub enum LockError {
    #[error("lock not acquired within {waited:?}")]
    Timeout { waited: Duration },

    #[error("lock marker I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type LockResult<T> = Result<T, LockError>;

/// A mutual-exclusion primitive with a bounded acquire.
///
/// `acquire` waits up to the backend's configured ceiling and fails with
/// [`LockError::Timeout`] if the resource stays held; a caller that times
/// out must not touch the guarded state. `release` is idempotent — releasing
/// a lock that is not held succeeds.
pub trait ExclusiveLock: Send + Sync {
    fn acquire(&self) -> LockResult<()>;
    fn release(&self) -> LockResult<()>;
}

/// RAII wrapper that releases the lock on every exit path.
pub struct LockGuard<'a> {
    lock: &'a dyn ExclusiveLock,
}

impl<'a> LockGuard<'a> {
    /// Acquire the lock, returning a guard that releases it on drop.
    pub fn acquire(lock: &'a dyn ExclusiveLock) -> LockResult<Self> {
        lock.acquire()?;
        Ok(Self { lock })
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.lock.release() {
            tracing::warn!("[lock] release failed: {e}");
        }
    }
}

/// Contents of the exclusive marker file.
///
/// Presence of the file means the registry is held; absence means it is
/// free. The body exists only for diagnostics and staleness detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockMarker {
    /// Pid of the process that created the marker.
    pub owner_pid: u32,
    /// When the marker was created.
    pub acquired_at: DateTime<Utc>,
}

impl LockMarker {
    /// Build a marker describing the current process.
    pub fn current() -> Self {
        Self {
            owner_pid: std::process::id(),
            acquired_at: Utc::now(),
        }
    }

    /// Age of the marker. Clock skew that makes the marker appear to come
    /// from the future counts as zero.
    pub fn age(&self) -> Duration {
        Utc::now()
            .signed_duration_since(self.acquired_at)
            .to_std()
            .unwrap_or_default()
    }
}

/// Whether a pid is alive on this host.
#[cfg(target_os = "linux")]
fn pid_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{pid}")).exists()
}

/// Without procfs there is no cheap safe check; assume alive and let the
/// age threshold handle abandoned markers.
#[cfg(not(target_os = "linux"))]
fn pid_alive(_pid: u32) -> bool {
    true
}

/// Multi-process lock backed by an exclusive marker file.
///
/// Claiming is atomic (`create_new`), so two processes racing for the same
/// marker cannot both succeed. While held by someone else, `acquire` polls
/// at a fixed interval up to a fixed ceiling, reclaiming markers whose
/// owner is dead or whose age exceeds the staleness threshold.
#[derive(Debug)]
pub struct MarkerLock {
    marker_path: PathBuf,
    poll_interval: Duration,
    max_wait: Duration,
    /// `None` disables age-based reclaim; dead-pid reclaim always applies.
    stale_after: Option<Duration>,
}

impl MarkerLock {
    /// Create a lock on the given marker path with default timing.
    pub fn new(marker_path: impl Into<PathBuf>) -> Self {
        Self {
            marker_path: marker_path.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_wait: DEFAULT_MAX_WAIT,
            stale_after: Some(DEFAULT_STALE_AFTER),
        }
    }

    /// Override poll interval and total wait ceiling.
    pub fn with_timing(mut self, poll_interval: Duration, max_wait: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.max_wait = max_wait;
        self
    }

    /// Override the staleness threshold (`None` disables age reclaim).
    pub fn with_stale_after(mut self, stale_after: Option<Duration>) -> Self {
        self.stale_after = stale_after;
        self
    }

    /// Path of the marker file.
    pub fn marker_path(&self) -> &Path {
        &self.marker_path
    }

    /// Try to claim the marker atomically. Returns false when it is
    /// already held.
    fn try_claim(&self) -> LockResult<bool> {
        if let Some(parent) = self.marker_path.parent() {
            fs::create_dir_all(parent).map_err(|e| LockError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.marker_path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => {
                return Err(LockError::Io {
                    path: self.marker_path.clone(),
                    source: e,
                });
            }
        };

        let marker = LockMarker::current();
        let body = serde_json::to_string_pretty(&marker)
            .expect("lock marker serialization is infallible");

        if let Err(e) = file.write_all(body.as_bytes()) {
            // Never leave a half-written marker claiming the lock.
            let _ = fs::remove_file(&self.marker_path);
            return Err(LockError::Io {
                path: self.marker_path.clone(),
                source: e,
            });
        }

        tracing::debug!(
            "[lock] acquired {} (pid {})",
            self.marker_path.display(),
            marker.owner_pid
        );
        Ok(true)
    }

    /// Remove the marker if its owner is dead or it has outlived the
    /// staleness threshold. Returns true when a marker was reclaimed.
    fn reclaim_if_stale(&self) -> LockResult<bool> {
        let raw = match fs::read_to_string(&self.marker_path) {
            Ok(raw) => raw,
            // Released between our claim attempt and this read.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => {
                return Err(LockError::Io {
                    path: self.marker_path.clone(),
                    source: e,
                });
            }
        };

        let reason = match serde_json::from_str::<LockMarker>(&raw) {
            Ok(marker) => {
                if !pid_alive(marker.owner_pid) {
                    Some(format!("owner pid {} is dead", marker.owner_pid))
                } else if let Some(threshold) = self.stale_after {
                    if marker.age() > threshold {
                        Some(format!(
                            "marker older than {:?} (owner pid {} still alive)",
                            threshold, marker.owner_pid
                        ))
                    } else {
                        None
                    }
                } else {
                    None
                }
            }
            // Unparsable marker: only the file's mtime age can tell us
            // whether it was abandoned.
            Err(_) => match (self.stale_after, self.marker_mtime_age()) {
                (Some(threshold), Some(age)) if age > threshold => {
                    Some("unparsable marker past staleness threshold".to_string())
                }
                _ => None,
            },
        };

        let Some(reason) = reason else {
            return Ok(false);
        };

        // Re-read before removal: if the marker changed hands since we
        // inspected it, the new owner's marker must not be clobbered.
        if fs::read_to_string(&self.marker_path)
            .map(|now| now != raw)
            .unwrap_or(true)
        {
            return Ok(false);
        }

        match fs::remove_file(&self.marker_path) {
            Ok(()) => {
                tracing::warn!(
                    "[lock] reclaimed stale marker {}: {reason}",
                    self.marker_path.display()
                );
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(LockError::Io {
                path: self.marker_path.clone(),
                source: e,
            }),
        }
    }

    fn marker_mtime_age(&self) -> Option<Duration> {
        let modified = fs::metadata(&self.marker_path).ok()?.modified().ok()?;
        modified.elapsed().ok()
    }
}

impl ExclusiveLock for MarkerLock {
    fn acquire(&self) -> LockResult<()> {
        let started = Instant::now();

        loop {
            if self.try_claim()? {
                return Ok(());
            }

            if self.reclaim_if_stale()? {
                // Reclaimed: loop straight back to a claim attempt.
                continue;
            }

            let waited = started.elapsed();
            if waited >= self.max_wait {
                return Err(LockError::Timeout { waited });
            }

            let remaining = self.max_wait - waited;
            std::thread::sleep(self.poll_interval.min(remaining));
        }
    }

    fn release(&self) -> LockResult<()> {
        match fs::remove_file(&self.marker_path) {
            Ok(()) => {
                tracing::debug!("[lock] released {}", self.marker_path.display());
                Ok(())
            }
            // Absence is not an error: release is idempotent.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LockError::Io {
                path: self.marker_path.clone(),
                source: e,
            }),
        }
    }
}

/// Single-process lock with the same bounded-wait contract as
/// [`MarkerLock`], for tests and embedded single-process deployments.
pub struct InProcessLock {
    held: Mutex<bool>,
    freed: Condvar,
    max_wait: Duration,
}

impl InProcessLock {
    pub fn new(max_wait: Duration) -> Self {
        Self {
            held: Mutex::new(false),
            freed: Condvar::new(),
            max_wait,
        }
    }
}

impl Default for InProcessLock {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WAIT)
    }
}

impl ExclusiveLock for InProcessLock {
    fn acquire(&self) -> LockResult<()> {
        let deadline = Instant::now() + self.max_wait;
        let mut held = self.held.lock();

        while *held {
            let now = Instant::now();
            if now >= deadline {
                return Err(LockError::Timeout {
                    waited: self.max_wait,
                });
            }
            if self.freed.wait_for(&mut held, deadline - now).timed_out() && *held {
                return Err(LockError::Timeout {
                    waited: self.max_wait,
                });
            }
        }

        *held = true;
        Ok(())
    }

    fn release(&self) -> LockResult<()> {
        let mut held = self.held.lock();
        *held = false;
        self.freed.notify_one();
        Ok(())
    }
}
