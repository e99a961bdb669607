/*!
 * Core Module
 * Fundamental runtime types, limits, error handling and local synchronization
 */

pub mod bincode;
pub mod errors;
pub mod hints;
pub mod limits;
pub mod sync;
pub mod types;

// Re-export for convenience
pub use errors::*;
pub use hints::*;
pub use types::*;
