/*!
 * Memory Module
 * Process-wide allocation accounting with an optional byte ceiling
 */

pub mod allocator;
pub mod config;
pub mod stats;
pub mod types;

pub use allocator::TrackingAllocator;
pub use config::MemoryConfig;
pub use stats::MemoryStats;
pub use types::{MemoryError, MemoryResult, MemoryStatsSnapshot};
