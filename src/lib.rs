/*!
 * Group Runtime Library
 * Process-group concurrency substrate: local locks, distributed references,
 * and global memory accounting
 */

#![cfg_attr(feature = "nightly", feature(core_intrinsics))]

pub mod core;
pub mod memory;
pub mod monitoring;
pub mod world;

// Re-exports
pub use crate::core::errors::*;
pub use crate::core::sync::{
    try_two_locks, Backoff, BlockingConditionVariable, ConditionVariable, LockMode, Mutex,
    MutexFair, MutexReaderWriter, RawLock, ScopedLock, Spinlock, SyncConfig,
};
pub use crate::core::types::{GroupId, HandlerId, ProcessId};
pub use memory::{MemoryConfig, MemoryError, MemoryStats, MemoryStatsSnapshot, TrackingAllocator};
pub use monitoring::init_tracing;
pub use world::{
    ExportTable, GroupRegistry, LoopbackNetwork, LoopbackWorld, RemoteRefWire, RemoteReference,
    World, WorldError, WorldResult,
};
