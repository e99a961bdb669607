/*!
 * Export Table
 *
 * Owner-side record of every object handed out through a remote reference.
 * Each outstanding reference owns one strong count of the exported `Arc`,
 * held as a raw pointer until the matching release arrives.
 *
 * ## Guarantees
 * - A decrement arriving by message is applied with the exported type, not
 *   the type the sender believed it had
 * - Releasing an address with no outstanding count is reported as
 *   `DoubleRelease` instead of freeing memory twice
 * - Counts still outstanding when the table is dropped are released and
 *   logged as leaks
 */

use super::types::{WorldError, WorldResult};
use crate::core::types::Address;
use ahash::RandomState;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::any::{type_name, TypeId};
use std::sync::Arc;
use tracing::{debug, warn};

type ErasedFn = unsafe fn(Address);

struct ExportEntry {
    outstanding: usize,
    type_id: TypeId,
    type_name: &'static str,
    release: ErasedFn,
    retain: ErasedFn,
}

unsafe fn release_arc<T>(addr: Address) {
    drop(Arc::from_raw(addr as *const T));
}

unsafe fn retain_arc<T>(addr: Address) {
    Arc::increment_strong_count(addr as *const T);
}

/// Exported objects keyed by address
pub struct ExportTable {
    entries: DashMap<Address, ExportEntry, RandomState>,
}

impl ExportTable {
    pub fn new() -> Self {
        Self {
            entries: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Move one strong count of `value` into the table and return its address
    pub fn export<T: Send + Sync + 'static>(&self, value: Arc<T>) -> Address {
        let addr = Arc::into_raw(value) as Address;
        self.entries
            .entry(addr)
            .and_modify(|e| e.outstanding += 1)
            .or_insert_with(|| ExportEntry {
                outstanding: 1,
                type_id: TypeId::of::<T>(),
                type_name: type_name::<T>(),
                release: release_arc::<T>,
                retain: retain_arc::<T>,
            });
        debug!(addr = format_args!("{:#x}", addr), ty = type_name::<T>(), "Exported object");
        addr
    }

    /// Drop one outstanding count of `addr`
    pub fn release(&self, addr: Address) -> WorldResult<()> {
        let release = match self.entries.entry(addr) {
            Entry::Occupied(mut entry) => {
                let release = entry.get().release;
                entry.get_mut().outstanding -= 1;
                if entry.get().outstanding == 0 {
                    entry.remove();
                }
                release
            }
            Entry::Vacant(_) => {
                warn!(
                    addr = format_args!("{:#x}", addr),
                    "Release of a reference with no outstanding count"
                );
                return Err(WorldError::DoubleRelease { addr });
            }
        };

        // Outside the shard lock: the object's destructor may release others.
        // SAFETY: the entry held one strong count of the recorded type.
        unsafe { release(addr) };
        Ok(())
    }

    /// Add one outstanding count to an already exported `addr`
    pub fn retain(&self, addr: Address) -> WorldResult<()> {
        let mut entry = self
            .entries
            .get_mut(&addr)
            .ok_or(WorldError::NotExported { addr })?;
        // SAFETY: the entry holds at least one strong count, so the
        // allocation is alive while the guard is held.
        unsafe { (entry.retain)(addr) };
        entry.outstanding += 1;
        Ok(())
    }

    /// New local handle to the exported object, checked against `T`
    pub fn get<T: Send + Sync + 'static>(&self, addr: Address) -> WorldResult<Arc<T>> {
        let entry = self
            .entries
            .get(&addr)
            .ok_or(WorldError::NotExported { addr })?;
        if entry.type_id != TypeId::of::<T>() {
            return Err(WorldError::TypeMismatch {
                expected: type_name::<T>(),
                found: entry.type_name,
            });
        }
        // SAFETY: type verified above; the entry's count keeps it alive.
        unsafe {
            Arc::increment_strong_count(addr as *const T);
            Ok(Arc::from_raw(addr as *const T))
        }
    }

    /// Outstanding references to `addr` (0 if not exported)
    pub fn outstanding(&self, addr: Address) -> usize {
        self.entries.get(&addr).map_or(0, |e| e.outstanding)
    }

    pub fn contains(&self, addr: Address) -> bool {
        self.entries.contains_key(&addr)
    }

    /// Number of distinct exported objects
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ExportTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ExportTable {
    fn drop(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        let entries = std::mem::take(&mut self.entries);
        warn!(objects = entries.len(), "Export table dropped with outstanding references");
        for (addr, entry) in entries {
            for _ in 0..entry.outstanding {
                // SAFETY: each outstanding count is one strong count.
                unsafe { (entry.release)(addr) };
            }
        }
    }
}

impl std::fmt::Debug for ExportTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportTable")
            .field("objects", &self.entries.len())
            .finish()
    }
}
