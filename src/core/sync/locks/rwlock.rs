/*!
 * Reader/Writer Lock
 *
 * Many concurrent readers or exactly one writer. State is a reader count and
 * a write flag, both updated under an internal spinlock that is held only
 * for the check-and-update, never across a wait. Blocking entry points
 * spin-retry their `try_` variants with backoff.
 *
 * No fairness is provided: a steady stream of readers can starve a writer.
 */

use super::spinlock::Spinlock;
use crate::core::errors::{SyncError, SyncResult};
use crate::core::sync::config::SyncConfig;
use crate::core::sync::spinwait::Backoff;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::error;

/// Lock mode for the mode-generic entry points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum LockMode {
    /// No lock; acquiring always succeeds
    NoLock = 0,
    /// Shared read lock
    Read = 1,
    /// Exclusive write lock
    Write = 2,
}

impl TryFrom<u8> for LockMode {
    type Error = SyncError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(LockMode::NoLock),
            1 => Ok(LockMode::Read),
            2 => Ok(LockMode::Write),
            other => Err(SyncError::InvalidLockMode(other)),
        }
    }
}

/// Reader/writer lock
///
/// # Invariant
///
/// `writeflag` implies `nreader == 0`.
///
/// # Conversion
///
/// `convert_read_lock_to_write_lock` waits until the caller is the sole
/// reader. At most one reader may attempt conversion at a time: two readers
/// converting concurrently deadlock, each waiting for the other to leave.
pub struct MutexReaderWriter {
    guard: Spinlock,
    nreader: AtomicUsize,
    writeflag: AtomicBool,
    config: SyncConfig,
}

impl MutexReaderWriter {
    pub fn new() -> Self {
        Self::with_config(SyncConfig::default())
    }

    pub fn with_config(config: SyncConfig) -> Self {
        Self {
            guard: Spinlock::new(),
            nreader: AtomicUsize::new(0),
            writeflag: AtomicBool::new(false),
            config,
        }
    }

    /// Acquire a read lock if no writer holds the lock
    pub fn try_read_lock(&self) -> bool {
        let _guard = self.guard.scoped();
        let gotit = !self.writeflag.load(Ordering::Relaxed);
        if gotit {
            self.nreader.fetch_add(1, Ordering::Relaxed);
        }
        gotit
    }

    /// Acquire the write lock if nobody holds the lock
    pub fn try_write_lock(&self) -> bool {
        let _guard = self.guard.scoped();
        let gotit =
            !self.writeflag.load(Ordering::Relaxed) && self.nreader.load(Ordering::Relaxed) == 0;
        if gotit {
            self.writeflag.store(true, Ordering::Relaxed);
        }
        gotit
    }

    /// Mode-generic try; `NoLock` always succeeds
    pub fn try_lock(&self, mode: LockMode) -> bool {
        match mode {
            LockMode::Read => self.try_read_lock(),
            LockMode::Write => self.try_write_lock(),
            LockMode::NoLock => true,
        }
    }

    /// Upgrade to the write lock if the caller is the only reader
    pub fn try_convert_read_lock_to_write_lock(&self) -> bool {
        let _guard = self.guard.scoped();
        let gotit =
            !self.writeflag.load(Ordering::Relaxed) && self.nreader.load(Ordering::Relaxed) == 1;
        if gotit {
            self.nreader.store(0, Ordering::Relaxed);
            self.writeflag.store(true, Ordering::Relaxed);
        }
        gotit
    }

    pub fn read_lock(&self) {
        let mut backoff = Backoff::new(&self.config);
        backoff.wait_until(|| self.try_read_lock());
    }

    pub fn write_lock(&self) {
        let mut backoff = Backoff::new(&self.config);
        backoff.wait_until(|| self.try_write_lock());
    }

    pub fn lock(&self, mode: LockMode) {
        let mut backoff = Backoff::new(&self.config);
        backoff.wait_until(|| self.try_lock(mode));
    }

    pub fn read_unlock(&self) -> SyncResult<()> {
        let _guard = self.guard.scoped();
        let nreader = self.nreader.load(Ordering::Relaxed);
        if nreader == 0 {
            return Err(SyncError::NotReadLocked);
        }
        self.nreader.store(nreader - 1, Ordering::Relaxed);
        Ok(())
    }

    pub fn write_unlock(&self) -> SyncResult<()> {
        let _guard = self.guard.scoped();
        if !self.writeflag.load(Ordering::Relaxed) {
            return Err(SyncError::NotWriteLocked);
        }
        self.writeflag.store(false, Ordering::Relaxed);
        Ok(())
    }

    pub fn unlock(&self, mode: LockMode) -> SyncResult<()> {
        match mode {
            LockMode::Read => self.read_unlock(),
            LockMode::Write => self.write_unlock(),
            LockMode::NoLock => Ok(()),
        }
    }

    /// Convert a held read lock to the write lock without releasing it
    ///
    /// Waits until every other reader has left. See the type-level docs for
    /// the single-converter precondition.
    pub fn convert_read_lock_to_write_lock(&self) -> SyncResult<()> {
        if self.nreader.load(Ordering::Relaxed) == 0 {
            return Err(SyncError::NotReadLocked);
        }
        let mut backoff = Backoff::new(&self.config);
        backoff.wait_until(|| self.try_convert_read_lock_to_write_lock());
        Ok(())
    }

    /// Downgrade the write lock to a read lock; always immediate
    pub fn convert_write_lock_to_read_lock(&self) -> SyncResult<()> {
        let _guard = self.guard.scoped();
        if !self.writeflag.load(Ordering::Relaxed) {
            return Err(SyncError::NotWriteLocked);
        }
        self.nreader.fetch_add(1, Ordering::Relaxed);
        self.writeflag.store(false, Ordering::Relaxed);
        Ok(())
    }

    /// Current number of readers (diagnostic, racy)
    pub fn readers(&self) -> usize {
        self.nreader.load(Ordering::Relaxed)
    }

    /// Whether a writer holds the lock (diagnostic, racy)
    pub fn is_write_locked(&self) -> bool {
        self.writeflag.load(Ordering::Relaxed)
    }

    /// Acquire a read lock released when the guard drops
    pub fn read_guard(&self) -> ModeGuard<'_> {
        self.read_lock();
        ModeGuard {
            lock: self,
            mode: LockMode::Read,
        }
    }

    /// Acquire the write lock released when the guard drops
    pub fn write_guard(&self) -> ModeGuard<'_> {
        self.write_lock();
        ModeGuard {
            lock: self,
            mode: LockMode::Write,
        }
    }
}

impl Default for MutexReaderWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard for one lock mode of a `MutexReaderWriter`
#[must_use = "dropping the guard releases the lock immediately"]
pub struct ModeGuard<'a> {
    lock: &'a MutexReaderWriter,
    mode: LockMode,
}

impl ModeGuard<'_> {
    /// Mode currently held
    pub fn mode(&self) -> LockMode {
        self.mode
    }

    /// Upgrade a read guard in place; see `convert_read_lock_to_write_lock`
    pub fn upgrade(&mut self) -> SyncResult<()> {
        if self.mode != LockMode::Read {
            return Err(SyncError::NotReadLocked);
        }
        self.lock.convert_read_lock_to_write_lock()?;
        self.mode = LockMode::Write;
        Ok(())
    }

    /// Downgrade a write guard in place
    pub fn downgrade(&mut self) -> SyncResult<()> {
        if self.mode != LockMode::Write {
            return Err(SyncError::NotWriteLocked);
        }
        self.lock.convert_write_lock_to_read_lock()?;
        self.mode = LockMode::Read;
        Ok(())
    }
}

impl Drop for ModeGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.lock.unlock(self.mode) {
            error!(mode = ?self.mode, error = %e, "Reader/writer guard release failed");
        }
    }
}
