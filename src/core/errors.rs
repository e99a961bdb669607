/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::core::bincode::BincodeError;
pub use crate::memory::MemoryError;
pub use crate::world::WorldError;

/// Result type for local synchronization operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Contract violations detected by the local lock family
#[derive(Error, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum SyncError {
    #[error("Unlock called on a lock that is not held")]
    #[diagnostic(
        code(sync::not_locked),
        help("Every unlock must pair with a prior successful lock or try_lock.")
    )]
    NotLocked,

    #[error("Lock is held by another thread")]
    #[diagnostic(
        code(sync::not_owner),
        help("Only the thread that acquired the mutex may unlock it or wait on it.")
    )]
    NotOwner,

    #[error("Mutex is not reentrant and is already held by this thread")]
    #[diagnostic(
        code(sync::reentrant),
        help("Release the mutex before locking it again, or restructure the critical section.")
    )]
    Reentrant,

    #[error("Wait queue overflow: capacity {capacity} waiters")]
    #[diagnostic(
        code(sync::queue_overflow),
        help("Raise SyncConfig::queue_capacity to at least the number of contending threads.")
    )]
    QueueOverflow { capacity: usize },

    #[error("Read unlock without a matching read lock")]
    #[diagnostic(code(sync::not_read_locked))]
    NotReadLocked,

    #[error("Write unlock without a matching write lock")]
    #[diagnostic(code(sync::not_write_locked))]
    NotWriteLocked,

    #[error("Invalid lock mode: {0}")]
    #[diagnostic(
        code(sync::invalid_lock_mode),
        help("Valid modes are 0 (no lock), 1 (read) and 2 (write).")
    )]
    InvalidLockMode(u8),
}

/// Unified runtime error type with miette diagnostics
#[derive(Error, Debug, Diagnostic)]
pub enum RuntimeError {
    #[error("Synchronization error: {0}")]
    #[diagnostic(transparent)]
    Sync(#[from] SyncError),

    #[error("Memory error: {0}")]
    #[diagnostic(transparent)]
    Memory(#[from] MemoryError),

    #[error("Process group error: {0}")]
    #[diagnostic(transparent)]
    World(#[from] WorldError),

    #[error("Wire codec error: {0}")]
    #[diagnostic(
        code(runtime::codec),
        help("The payload was produced by an incompatible runtime version or is corrupt.")
    )]
    Codec(#[from] BincodeError),
}
