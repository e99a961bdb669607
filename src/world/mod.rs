/*!
 * Process Groups
 * Group abstraction, active messages and distributed references
 */

pub mod exports;
pub mod loopback;
pub mod message;
pub mod reference;
pub mod registry;
pub mod traits;
pub mod types;

pub use exports::ExportTable;
pub use loopback::{LoopbackNetwork, LoopbackWorld};
pub use message::ActiveMessage;
pub use reference::{install_handlers, RemoteRefWire, RemoteReference};
pub use registry::GroupRegistry;
pub use traits::{with_group, Handler, World};
pub use types::{WorldError, WorldResult};
