/*!
 * Core Types
 * Identifiers shared by the synchronization and process-group layers
 */

/// Rank of a process within its group
pub type ProcessId = u32;

/// Identifier of a process group, valid in every participating process
pub type GroupId = u64;

/// Identifier of a registered active-message handler
pub type HandlerId = u32;

/// Address of an exported object on its owning process
pub type Address = usize;

/// Size type for memory accounting
pub type Size = usize;

/// Unified result type for runtime operations
pub type RuntimeResult<T> = Result<T, super::errors::RuntimeError>;
