/*!
 * Memory Types
 * Snapshot and error types for allocation accounting
 */

use crate::core::limits::MEMORY_OVERHEAD_PER_FRAGMENT;
use crate::core::types::Size;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Memory operation result
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Memory errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum MemoryError {
    #[error("Out of memory: requested {requested} bytes with {live} bytes live exceeds ceiling of {ceiling} bytes")]
    #[diagnostic(
        code(memory::ceiling_exceeded),
        help("Free memory or raise the ceiling with MemoryStats::set_ceiling.")
    )]
    CeilingExceeded {
        requested: Size,
        live: Size,
        ceiling: Size,
    },
}

/// Point-in-time copy of the allocation counters
///
/// Taken without locking, so fields may be mutually inconsistent while other
/// threads allocate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStatsSnapshot {
    pub alloc_calls: u64,
    pub dealloc_calls: u64,
    pub live_fragments: Size,
    pub peak_fragments: Size,
    pub live_bytes: Size,
    pub peak_bytes: Size,
    pub ceiling: Option<Size>,
    pub trace: bool,
}

impl MemoryStatsSnapshot {
    /// Bookkeeping overhead attributed to the live fragments
    pub fn overhead_bytes(&self) -> Size {
        self.live_fragments * MEMORY_OVERHEAD_PER_FRAGMENT
    }
}

impl fmt::Display for MemoryStatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "    Group runtime memory statistics")?;
        writeln!(f, "    -------------------------------")?;
        writeln!(
            f,
            "      overhead bytes per frag {:>12}",
            MEMORY_OVERHEAD_PER_FRAGMENT
        )?;
        writeln!(
            f,
            "       calls to alloc and free {:>12} {:>12}",
            self.alloc_calls, self.dealloc_calls
        )?;
        writeln!(
            f,
            "  cur and max frags allocated {:>12} {:>12}",
            self.live_fragments, self.peak_fragments
        )?;
        write!(
            f,
            "  cur and max bytes allocated {:>12} {:>12}",
            self.live_bytes, self.peak_bytes
        )?;
        if let Some(ceiling) = self.ceiling {
            write!(f, "\n                 byte ceiling {:>12}", ceiling)?;
        }
        Ok(())
    }
}
