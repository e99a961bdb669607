/*!
 * Process Group Traits
 * The collaborator interface remote references are built on
 */

use super::exports::ExportTable;
use super::message::ActiveMessage;
use super::types::{WorldError, WorldResult};
use crate::core::types::{GroupId, HandlerId, ProcessId};
use bytes::Bytes;
use std::sync::Arc;

/// Active-message handler
///
/// Invoked on the destination process with the group the message arrived on.
pub type Handler = Arc<dyn Fn(&dyn World, ActiveMessage) -> WorldResult<()> + Send + Sync>;

/// A process group as seen from one member process
pub trait World: Send + Sync {
    /// Rank of the local process within the group
    fn rank(&self) -> ProcessId;

    /// Number of processes in the group
    fn size(&self) -> ProcessId;

    /// Group identifier, meaningful on every member
    fn id(&self) -> GroupId;

    /// Fire a one-way message at `dest`; never blocks for a reply
    fn send_one_way(&self, dest: ProcessId, handler: HandlerId, payload: Bytes) -> WorldResult<()>;

    /// Register `handler` under `id` on the local process
    fn register_handler(&self, id: HandlerId, handler: Handler) -> WorldResult<()>;

    /// Recover the local handle of another group this process belongs to
    fn resolve_group(&self, id: GroupId) -> Option<Arc<dyn World>>;

    /// Objects this process has exported through remote references
    fn exports(&self) -> &ExportTable;
}

/// Run `f` against group `id`, which may be `world` itself
pub fn with_group<R>(
    world: &dyn World,
    id: GroupId,
    f: impl FnOnce(&dyn World) -> WorldResult<R>,
) -> WorldResult<R> {
    if world.id() == id {
        return f(world);
    }
    let group = world
        .resolve_group(id)
        .ok_or(WorldError::UnknownGroup(id))?;
    f(&*group)
}
