/*!
 * Memory Configuration
 * Ceiling and trace settings, loadable from the environment
 */

use super::stats::MemoryStats;
use serde::{Deserialize, Serialize};
use std::env;
use tracing::{info, warn};

/// Environment variable holding the live-byte ceiling
pub const MEM_LIMIT_ENV: &str = "GROUP_RUNTIME_MEM_LIMIT";

/// Environment variable enabling per-allocation trace lines
pub const MEM_TRACE_ENV: &str = "GROUP_RUNTIME_MEM_TRACE";

/// Memory accounting settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Maximum live bytes; `None` means unlimited
    pub ceiling: Option<usize>,
    /// Emit a trace line per allocation and deallocation
    pub trace: bool,
}

impl MemoryConfig {
    pub const fn new() -> Self {
        Self {
            ceiling: None,
            trace: false,
        }
    }

    pub const fn with_ceiling(mut self, ceiling: usize) -> Self {
        self.ceiling = Some(ceiling);
        self
    }

    pub const fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Read settings from `GROUP_RUNTIME_MEM_LIMIT` and `GROUP_RUNTIME_MEM_TRACE`
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        let ceiling = env::var(MEM_LIMIT_ENV).ok().and_then(|raw| {
            match raw.trim().parse::<usize>() {
                Ok(ceiling) => Some(ceiling),
                Err(e) => {
                    warn!(value = %raw, error = %e, "Ignoring invalid {}", MEM_LIMIT_ENV);
                    None
                }
            }
        });

        let trace = env::var(MEM_TRACE_ENV)
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self { ceiling, trace }
    }

    /// Install these settings on `stats`
    pub fn apply(&self, stats: &MemoryStats) {
        stats.set_ceiling(self.ceiling);
        stats.set_trace(self.trace);
        info!(
            ceiling = ?self.ceiling,
            trace = self.trace,
            "Memory accounting configured"
        );
    }
}
