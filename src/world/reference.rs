/*!
 * Remote References
 *
 * A `RemoteReference<T>` names an object owned by exactly one process of a
 * group: the triple `(address, owning rank, group id)`. The owning process
 * keeps the object alive through its `ExportTable` until every reference
 * has been released.
 *
 * ## Ownership
 * - References are move-only; moving one (or its wire form) transfers the
 *   obligation to release it, and no counter is touched
 * - `release` on the owning process decrements locally; anywhere else it
 *   sends a one-way decrement message to the owner
 * - `duplicate` is the only way to obtain a second reference and performs a
 *   real increment on the owner
 *
 * ## Ordering
 * Messages between two processes are delivered in send order. A duplicate
 * made on a non-owning process sends its increment before any release the
 * same process sends later, so the owner never sees the count reach zero
 * early. A duplicate shipped to a third process and released from there
 * has no such ordering against the increment; the duplicating process
 * must keep its own reference until the owner has processed the increment.
 */

use super::message::ActiveMessage;
use super::traits::{with_group, Handler, World};
use super::types::{WorldError, WorldResult};
use crate::core::bincode::encode_payload;
use crate::core::limits::{DECREMENT_HANDLER, INCREMENT_HANDLER, NULL_GROUP};
use crate::core::types::{Address, GroupId, ProcessId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, warn};

/// Serialised triple carried in messages
///
/// Deliberately neither `Clone` nor `Copy`: the value that is deserialised
/// is the one that must be turned back into a reference and released.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRefWire {
    pub addr: u64,
    pub owner: ProcessId,
    pub group: GroupId,
}

/// Move-only handle to an object owned by one process of a group
pub struct RemoteReference<T> {
    addr: Address,
    owner: ProcessId,
    group: GroupId,
    _marker: PhantomData<fn() -> Arc<T>>,
}

impl<T> RemoteReference<T> {
    /// A reference to nothing; releasing it is a no-op
    pub const fn null() -> Self {
        Self {
            addr: 0,
            owner: 0,
            group: NULL_GROUP,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.addr == 0
    }

    /// Rank of the owning process
    #[inline]
    pub fn owner(&self) -> ProcessId {
        self.owner
    }

    #[inline]
    pub fn group_id(&self) -> GroupId {
        self.group
    }

    /// Address of the object in the owner's address space
    #[inline]
    pub fn addr(&self) -> Address {
        self.addr
    }

    /// Whether the calling process of `world` owns the object
    pub fn is_local(&self, world: &dyn World) -> bool {
        !self.is_null() && self.owner == world.rank() && self.group == world.id()
    }

    /// Move the ownership obligation into its wire form
    pub fn into_wire(mut self) -> RemoteRefWire {
        let wire = RemoteRefWire {
            addr: self.addr as u64,
            owner: self.owner,
            group: self.group,
        };
        self.clear();
        wire
    }

    /// Take over the ownership obligation carried by `wire`
    pub fn from_wire(wire: RemoteRefWire) -> Self {
        if wire.addr == 0 {
            return Self::null();
        }
        Self {
            addr: wire.addr as Address,
            owner: wire.owner,
            group: wire.group,
            _marker: PhantomData,
        }
    }

    /// Release this reference exactly once
    ///
    /// Releasing a null (or already released) reference does nothing. On
    /// error the reference is left untouched.
    pub fn release(&mut self, world: &dyn World) -> WorldResult<()> {
        if self.is_null() {
            return Ok(());
        }
        let (addr, owner) = (self.addr, self.owner);
        with_group(world, self.group, |group| {
            if owner == group.rank() {
                group.exports().release(addr)
            } else {
                let payload = encode_payload(&self.wire())?;
                group.send_one_way(owner, DECREMENT_HANDLER, payload)
            }
        })?;
        debug!(addr = format_args!("{:#x}", addr), owner, "Released remote reference");
        self.clear();
        Ok(())
    }

    /// Second reference to the same object, with a real increment on the owner
    pub fn duplicate(&self, world: &dyn World) -> WorldResult<Self> {
        if self.is_null() {
            return Ok(Self::null());
        }
        with_group(world, self.group, |group| {
            if self.owner == group.rank() {
                group.exports().retain(self.addr)
            } else {
                let payload = encode_payload(&self.wire())?;
                group.send_one_way(self.owner, INCREMENT_HANDLER, payload)
            }
        })?;
        Ok(Self {
            addr: self.addr,
            owner: self.owner,
            group: self.group,
            _marker: PhantomData,
        })
    }

    fn wire(&self) -> RemoteRefWire {
        RemoteRefWire {
            addr: self.addr as u64,
            owner: self.owner,
            group: self.group,
        }
    }

    fn clear(&mut self) {
        self.addr = 0;
        self.owner = 0;
        self.group = NULL_GROUP;
    }
}

impl<T: Send + Sync + 'static> RemoteReference<T> {
    /// Export `value` from the calling process and reference it
    ///
    /// The `Arc` is consumed: from here on the reference, not the caller,
    /// holds that strong count.
    pub fn new(world: &dyn World, value: Arc<T>) -> Self {
        let addr = world.exports().export(value);
        Self {
            addr,
            owner: world.rank(),
            group: world.id(),
            _marker: PhantomData,
        }
    }

    /// Local handle to the object, if this process owns it
    pub fn as_local(&self, world: &dyn World) -> Option<Arc<T>> {
        if !self.is_local(world) {
            return None;
        }
        world.exports().get(self.addr).ok()
    }

    /// Like `as_local`, reporting why no handle is available
    pub fn try_as_local(&self, world: &dyn World) -> WorldResult<Arc<T>> {
        if self.is_null() {
            return Err(WorldError::NullReference);
        }
        if self.group != world.id() {
            return Err(WorldError::UnknownGroup(self.group));
        }
        if self.owner != world.rank() {
            return Err(WorldError::UnknownProcess(self.owner));
        }
        world.exports().get(self.addr)
    }
}

impl<T> Default for RemoteReference<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T> Drop for RemoteReference<T> {
    fn drop(&mut self) {
        if !self.is_null() {
            warn!(
                addr = format_args!("{:#x}", self.addr),
                owner = self.owner,
                group = self.group,
                "Remote reference dropped without release; the object leaks until its owner exits"
            );
        }
    }
}

impl<T> fmt::Display for RemoteReference<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<remote: ptr={:#x}, rank={}, id={}>",
            self.addr, self.owner, self.group
        )
    }
}

impl<T> fmt::Debug for RemoteReference<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteReference")
            .field("addr", &format_args!("{:#x}", self.addr))
            .field("owner", &self.owner)
            .field("group", &self.group)
            .finish()
    }
}

fn handle_decrement(world: &dyn World, msg: ActiveMessage) -> WorldResult<()> {
    let wire: RemoteRefWire = msg.decode()?;
    with_group(world, wire.group, |group| {
        if wire.owner != group.rank() {
            return Err(WorldError::UnknownProcess(wire.owner));
        }
        group.exports().release(wire.addr as Address)
    })
}

fn handle_increment(world: &dyn World, msg: ActiveMessage) -> WorldResult<()> {
    let wire: RemoteRefWire = msg.decode()?;
    with_group(world, wire.group, |group| {
        if wire.owner != group.rank() {
            return Err(WorldError::UnknownProcess(wire.owner));
        }
        group.exports().retain(wire.addr as Address)
    })
}

/// Register the reference-count handlers on `world`
///
/// Must run once per group member before any reference is released.
pub fn install_handlers(world: &dyn World) -> WorldResult<()> {
    let decrement: Handler = Arc::new(handle_decrement);
    let increment: Handler = Arc::new(handle_increment);
    world.register_handler(DECREMENT_HANDLER, decrement)?;
    world.register_handler(INCREMENT_HANDLER, increment)?;
    Ok(())
}
