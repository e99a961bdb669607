/*!
 * Loopback Process Group
 *
 * Simulates an N-process group inside one OS process. Each rank has its own
 * inbox, handler table, export table and group registry, so code running
 * against a `LoopbackWorld` sees the same separation it would across real
 * processes. Messages are only dispatched when a rank is polled.
 */

use super::exports::ExportTable;
use super::message::ActiveMessage;
use super::reference::install_handlers;
use super::registry::GroupRegistry;
use super::traits::{Handler, World};
use super::types::{WorldError, WorldResult};
use crate::core::types::{GroupId, HandlerId, ProcessId};
use crate::monitoring::span_handler;
use ahash::RandomState;
use bytes::Bytes;
use dashmap::DashMap;
use flume::{Receiver, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{error, info};

/// One rank of a loopback group
pub struct LoopbackWorld {
    rank: ProcessId,
    id: GroupId,
    peers: Arc<[Sender<ActiveMessage>]>,
    inbox: Receiver<ActiveMessage>,
    handlers: DashMap<HandlerId, Handler, RandomState>,
    exports: ExportTable,
    registry: Arc<GroupRegistry>,
    dispatched: AtomicU64,
    failed: AtomicU64,
}

impl LoopbackWorld {
    /// This rank's group directory
    pub fn registry(&self) -> &Arc<GroupRegistry> {
        &self.registry
    }

    /// Messages waiting in this rank's inbox
    pub fn pending(&self) -> usize {
        self.inbox.len()
    }

    /// Handler invocations completed so far
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    /// Handler invocations that returned an error or found no handler
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Dispatch one queued message, returning its outcome
    pub fn poll_one(&self) -> Option<WorldResult<()>> {
        let msg = self.inbox.try_recv().ok()?;
        let span = span_handler(self.rank, msg.src, msg.handler, msg.payload.len());
        let _entered = span.enter();

        // Clone the handler out so the table is not locked while it runs
        let handler = self.handlers.get(&msg.handler).map(|h| Arc::clone(h.value()));
        let handler_id = msg.handler;
        let result = match handler {
            Some(handler) => handler(self as &dyn World, msg),
            None => Err(WorldError::NoHandler(handler_id)),
        };

        span.record_result(result.is_ok());
        match &result {
            Ok(()) => {
                self.dispatched.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                error!(rank = self.rank, handler = handler_id, error = %e, "Active message failed");
            }
        }
        Some(result)
    }

    /// Drain the inbox, returning the number of messages handled
    ///
    /// Handler failures are logged and counted; they do not stop the drain.
    pub fn poll(&self) -> usize {
        let mut handled = 0;
        while self.poll_one().is_some() {
            handled += 1;
        }
        handled
    }
}

impl World for LoopbackWorld {
    fn rank(&self) -> ProcessId {
        self.rank
    }

    fn size(&self) -> ProcessId {
        self.peers.len() as ProcessId
    }

    fn id(&self) -> GroupId {
        self.id
    }

    fn send_one_way(&self, dest: ProcessId, handler: HandlerId, payload: Bytes) -> WorldResult<()> {
        let peer = self
            .peers
            .get(dest as usize)
            .ok_or(WorldError::UnknownProcess(dest))?;
        peer.send(ActiveMessage::new(self.rank, handler, payload))
            .map_err(|_| WorldError::Disconnected(dest))
    }

    fn register_handler(&self, id: HandlerId, handler: Handler) -> WorldResult<()> {
        use dashmap::mapref::entry::Entry;
        match self.handlers.entry(id) {
            Entry::Occupied(_) => Err(WorldError::HandlerExists(id)),
            Entry::Vacant(slot) => {
                slot.insert(handler);
                Ok(())
            }
        }
    }

    fn resolve_group(&self, id: GroupId) -> Option<Arc<dyn World>> {
        self.registry.resolve(id)
    }

    fn exports(&self) -> &ExportTable {
        &self.exports
    }
}

impl std::fmt::Debug for LoopbackWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackWorld")
            .field("rank", &self.rank)
            .field("size", &self.peers.len())
            .field("id", &self.id)
            .field("pending", &self.inbox.len())
            .finish()
    }
}

/// An in-process group of `LoopbackWorld` ranks
pub struct LoopbackNetwork {
    worlds: Vec<Arc<LoopbackWorld>>,
}

impl LoopbackNetwork {
    /// Create a group of `size` ranks, each with a fresh registry
    pub fn new(size: ProcessId, id: GroupId) -> WorldResult<Self> {
        let registries = (0..size).map(|_| Arc::new(GroupRegistry::new())).collect();
        Self::with_registries(id, registries)
    }

    /// Create a group whose rank `r` joins the process directory `registries[r]`
    ///
    /// Sharing registries between networks models processes that belong to
    /// several groups at once.
    pub fn with_registries(id: GroupId, registries: Vec<Arc<GroupRegistry>>) -> WorldResult<Self> {
        let (senders, receivers): (Vec<_>, Vec<_>) =
            registries.iter().map(|_| flume::unbounded()).unzip();
        let peers: Arc<[Sender<ActiveMessage>]> = senders.into();

        let mut worlds = Vec::with_capacity(registries.len());
        for (rank, (inbox, registry)) in receivers.into_iter().zip(registries).enumerate() {
            let world = Arc::new(LoopbackWorld {
                rank: rank as ProcessId,
                id,
                peers: Arc::clone(&peers),
                inbox,
                handlers: DashMap::with_hasher(RandomState::new()),
                exports: ExportTable::new(),
                registry,
                dispatched: AtomicU64::new(0),
                failed: AtomicU64::new(0),
            });
            install_handlers(&*world)?;
            let handle: Arc<dyn World> = world.clone();
            world.registry.register(&handle);
            worlds.push(world);
        }

        info!(group = id, size = worlds.len(), "Loopback process group created");
        Ok(Self { worlds })
    }

    pub fn size(&self) -> ProcessId {
        self.worlds.len() as ProcessId
    }

    /// Handle for `rank`
    pub fn world(&self, rank: ProcessId) -> Option<&Arc<LoopbackWorld>> {
        self.worlds.get(rank as usize)
    }

    pub fn worlds(&self) -> &[Arc<LoopbackWorld>] {
        &self.worlds
    }

    /// Poll every rank until no messages remain; returns messages handled
    pub fn poll(&self) -> usize {
        let mut total = 0;
        loop {
            let handled: usize = self.worlds.iter().map(|w| w.poll()).sum();
            if handled == 0 {
                return total;
            }
            total += handled;
        }
    }
}
