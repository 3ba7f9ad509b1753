//! Validity side-table
//!
//! Liveness of an owned value is tracked in a small arena-style table
//! mapping a stable slot id to an alive flag plus a holder count. The
//! owner and every loan derived from it hold a [`LocalStamp`] or
//! [`SyncStamp`] naming the slot and consult the table on each access,
//! rather than aliasing a shared flag directly. A slot is removed when
//! its last stamp is dropped.
//!
//! Two tables exist: a thread-local one with plain fields (no
//! synchronization, lowest overhead) and a global sharded one with atomic
//! fields for the thread-safe containers. A stamp belongs to exactly one
//! table; the two kinds never mix within one owner.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use dashmap::DashMap;
use lazy_static::lazy_static;

/// Stable identifier of a validity slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SlotId(u64);

// ============================================================================
// Single-threaded table
// ============================================================================

struct LocalSlot {
    alive: bool,
    holders: u32,
}

thread_local! {
    static LOCAL_SLOTS: RefCell<HashMap<u64, LocalSlot>> = RefCell::new(HashMap::new());
    static LOCAL_NEXT: Cell<u64> = const { Cell::new(1) };
}

/// Handle to a slot in the thread-local validity table
///
/// Cloning retains the slot; dropping releases it. The alive flag
/// transitions true -> false exactly once, via [`LocalStamp::invalidate`].
#[derive(Debug)]
pub(crate) struct LocalStamp {
    id: SlotId,
}

impl LocalStamp {
    /// Allocate a fresh alive slot with one holder
    pub fn new() -> Self {
        let id = LOCAL_NEXT.with(|next| {
            let id = next.get();
            next.set(id + 1);
            id
        });
        LOCAL_SLOTS.with(|slots| {
            slots.borrow_mut().insert(
                id,
                LocalSlot {
                    alive: true,
                    holders: 1,
                },
            );
        });
        Self { id: SlotId(id) }
    }

    #[cfg(test)]
    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn is_alive(&self) -> bool {
        LOCAL_SLOTS.with(|slots| {
            slots
                .borrow()
                .get(&self.id.0)
                .map(|slot| slot.alive)
                .unwrap_or(false)
        })
    }

    /// Mark the slot dead (idempotent)
    pub fn invalidate(&self) {
        LOCAL_SLOTS.with(|slots| {
            if let Some(slot) = slots.borrow_mut().get_mut(&self.id.0) {
                slot.alive = false;
            }
        });
    }

    #[cfg(test)]
    pub fn holders(&self) -> u32 {
        LOCAL_SLOTS.with(|slots| {
            slots
                .borrow()
                .get(&self.id.0)
                .map(|slot| slot.holders)
                .unwrap_or(0)
        })
    }
}

impl Clone for LocalStamp {
    fn clone(&self) -> Self {
        LOCAL_SLOTS.with(|slots| {
            if let Some(slot) = slots.borrow_mut().get_mut(&self.id.0) {
                slot.holders += 1;
            }
        });
        Self { id: self.id }
    }
}

impl Drop for LocalStamp {
    fn drop(&mut self) {
        // try_with: the table may already be gone during thread teardown
        let _ = LOCAL_SLOTS.try_with(|slots| {
            let mut slots = slots.borrow_mut();
            let empty = match slots.get_mut(&self.id.0) {
                Some(slot) => {
                    slot.holders -= 1;
                    slot.holders == 0
                }
                None => false,
            };
            if empty {
                slots.remove(&self.id.0);
            }
        });
    }
}

// ============================================================================
// Thread-safe table
// ============================================================================

struct SharedSlot {
    alive: AtomicBool,
    holders: AtomicU32,
}

lazy_static! {
    static ref SHARED_SLOTS: DashMap<u64, SharedSlot> = DashMap::new();
}

static SHARED_NEXT: AtomicU64 = AtomicU64::new(1);

/// Handle to a slot in the global validity table
///
/// Same contract as [`LocalStamp`], with atomic fields so the flag and
/// counter are totally ordered across threads.
#[derive(Debug)]
pub(crate) struct SyncStamp {
    id: SlotId,
}

impl SyncStamp {
    pub fn new() -> Self {
        let id = SHARED_NEXT.fetch_add(1, Ordering::SeqCst);
        SHARED_SLOTS.insert(
            id,
            SharedSlot {
                alive: AtomicBool::new(true),
                holders: AtomicU32::new(1),
            },
        );
        Self { id: SlotId(id) }
    }

    pub fn is_alive(&self) -> bool {
        SHARED_SLOTS
            .get(&self.id.0)
            .map(|slot| slot.alive.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    pub fn invalidate(&self) {
        if let Some(slot) = SHARED_SLOTS.get(&self.id.0) {
            slot.alive.store(false, Ordering::SeqCst);
        }
    }

    #[cfg(test)]
    pub fn holders(&self) -> u32 {
        SHARED_SLOTS
            .get(&self.id.0)
            .map(|slot| slot.holders.load(Ordering::SeqCst))
            .unwrap_or(0)
    }
}

impl Clone for SyncStamp {
    fn clone(&self) -> Self {
        if let Some(slot) = SHARED_SLOTS.get(&self.id.0) {
            slot.holders.fetch_add(1, Ordering::SeqCst);
        }
        Self { id: self.id }
    }
}

impl Drop for SyncStamp {
    fn drop(&mut self) {
        // The decrement happens under the shard guard; the removal must
        // happen after the guard is dropped or DashMap deadlocks on its
        // own shard lock.
        let remaining = match SHARED_SLOTS.get(&self.id.0) {
            Some(slot) => slot.holders.fetch_sub(1, Ordering::SeqCst) - 1,
            None => return,
        };
        if remaining == 0 {
            SHARED_SLOTS.remove(&self.id.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_stamp_lifecycle() {
        let stamp = LocalStamp::new();
        assert!(stamp.is_alive());
        assert_eq!(stamp.holders(), 1);

        let copy = stamp.clone();
        assert_eq!(stamp.holders(), 2);
        assert_eq!(copy.id(), stamp.id());

        stamp.invalidate();
        assert!(!stamp.is_alive());
        assert!(!copy.is_alive(), "clones observe the same slot");

        drop(copy);
        assert_eq!(stamp.holders(), 1);
    }

    #[test]
    fn test_local_slot_removed_at_zero() {
        let stamp = LocalStamp::new();
        let probe = stamp.clone();
        drop(stamp);
        assert_eq!(probe.holders(), 1);
        let id = probe.id();
        drop(probe);

        // A stamp with a dangling id reports dead, not garbage
        let ghost = LocalStamp { id };
        assert!(!ghost.is_alive());
    }

    #[test]
    fn test_local_invalidate_is_idempotent() {
        let stamp = LocalStamp::new();
        stamp.invalidate();
        stamp.invalidate();
        assert!(!stamp.is_alive());
    }

    #[test]
    fn test_sync_stamp_lifecycle() {
        let stamp = SyncStamp::new();
        assert!(stamp.is_alive());

        let copy = stamp.clone();
        assert_eq!(stamp.holders(), 2);

        stamp.invalidate();
        assert!(!copy.is_alive());

        drop(stamp);
        assert_eq!(copy.holders(), 1);
    }

    #[test]
    fn test_sync_stamps_share_across_threads() {
        let stamp = SyncStamp::new();
        let copy = stamp.clone();
        let handle = std::thread::spawn(move || {
            let alive_before = copy.is_alive();
            copy.invalidate();
            alive_before
        });
        assert!(handle.join().unwrap());
        assert!(!stamp.is_alive());
    }
}
