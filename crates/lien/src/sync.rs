//! Thread-safe owned value container and loans
//!
//! Mirrors the single-threaded containers with atomic bookkeeping. The
//! borrow meter is one packed `AtomicU32` (exclusive bit plus shared
//! count) so two threads racing `borrow_mut` are decided by a single
//! compare-exchange: exactly one wins, the loser fails immediately with
//! the matching borrow error. Payload access goes through `try_read` /
//! `try_write` only; contention maps to a typed error, nothing blocks.
//! Which thread wins a race is unspecified, only that one does.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, TryLockError};

use crate::error::{LienError, LienResult};
use crate::hold::{Hold, Loan, LoanMut};
use crate::loan::LoanKind;
use crate::payload::{Payload, Shape};
use crate::validity::SyncStamp;

const EXCLUSIVE: u32 = 1 << 31;
const COUNT_MASK: u32 = EXCLUSIVE - 1;

type SyncPayload<T> = Payload<T, Arc<T>>;

#[derive(Debug)]
struct SyncStore<T> {
    payload: RwLock<Option<SyncPayload<T>>>,
    borrows: AtomicU32,
}

impl<T> SyncStore<T> {
    fn meter(&self) -> u32 {
        self.borrows.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct SyncAnchor<T> {
    store: Arc<SyncStore<T>>,
    stamp: SyncStamp,
}

/// Exclusive-ownership container, thread-safe flavor
///
/// Sharing a `SyncVal` across threads (by reference) is supported; the
/// payload type only needs the usual `Send + Sync` bounds the containers
/// inherit structurally.
#[derive(Debug)]
pub struct SyncVal<T> {
    anchor: Option<SyncAnchor<T>>,
}

/// Wrap a value in a new thread-safe owner
pub fn wrap_sync<T>(value: T) -> SyncVal<T> {
    SyncVal::wrap(value)
}

impl<T> SyncVal<T> {
    pub fn wrap(value: T) -> Self {
        Self::with_payload(Payload::ByValue(value))
    }

    pub fn wrap_boxed(value: Box<T>) -> Self {
        Self::with_payload(Payload::ByPointer(value))
    }

    /// Take ownership of a shared smart handle; the payload stays aliased
    /// and refuses mutation
    pub fn wrap_handle(value: Arc<T>) -> Self {
        Self::with_payload(Payload::BySmartHandle(value))
    }

    fn with_payload(payload: SyncPayload<T>) -> Self {
        Self {
            anchor: Some(SyncAnchor {
                store: Arc::new(SyncStore {
                    payload: RwLock::new(Some(payload)),
                    borrows: AtomicU32::new(0),
                }),
                stamp: SyncStamp::new(),
            }),
        }
    }

    fn anchor(&self) -> LienResult<&SyncAnchor<T>> {
        self.anchor.as_ref().ok_or(LienError::Moved)
    }

    pub fn is_valid(&self) -> bool {
        self.anchor
            .as_ref()
            .map(|anchor| anchor.stamp.is_alive())
            .unwrap_or(false)
    }

    pub fn shape(&self) -> LienResult<Shape> {
        let anchor = self.anchor()?;
        let slot = try_read_lock(&anchor.store.payload)?;
        match slot.as_ref() {
            Some(payload) => Ok(payload.shape()),
            None => Err(LienError::Moved),
        }
    }

    pub fn shared_count(&self) -> u32 {
        self.anchor
            .as_ref()
            .map(|anchor| anchor.store.meter() & COUNT_MASK)
            .unwrap_or(0)
    }

    pub fn is_mut_borrowed(&self) -> bool {
        self.anchor
            .as_ref()
            .map(|anchor| anchor.store.meter() & EXCLUSIVE != 0)
            .unwrap_or(false)
    }

    fn check_unborrowed(anchor: &SyncAnchor<T>) -> LienResult<()> {
        let meter = anchor.store.meter();
        if meter & EXCLUSIVE != 0 {
            return Err(LienError::StillBorrowedMutably);
        }
        if meter & COUNT_MASK > 0 {
            return Err(LienError::StillBorrowedImmutably {
                count: meter & COUNT_MASK,
            });
        }
        Ok(())
    }

    /// Explicit move: refused while any loan is outstanding
    pub fn transfer(&mut self) -> LienResult<Self> {
        Self::check_unborrowed(self.anchor()?)?;
        Ok(Self {
            anchor: self.anchor.take(),
        })
    }

    /// Checked drop: refused while loans are outstanding
    pub fn dispose(&mut self) -> LienResult<()> {
        Self::check_unborrowed(self.anchor()?)?;
        if let Some(anchor) = self.anchor.take() {
            anchor.stamp.invalidate();
            if let Ok(mut slot) = anchor.store.payload.try_write() {
                *slot = None;
            }
        }
        Ok(())
    }

    pub fn try_clone(&self) -> LienResult<Self>
    where
        T: Clone,
    {
        let anchor = self.anchor()?;
        if anchor.store.meter() & EXCLUSIVE != 0 {
            return Err(LienError::BorrowedMutably);
        }
        let slot = try_read_lock(&anchor.store.payload)?;
        match slot.as_ref() {
            Some(payload) => Ok(Self::with_payload(payload.duplicate())),
            None => Err(LienError::Moved),
        }
    }

    /// Issue a shared loan; a compare-exchange loop keeps the increment
    /// atomic against racing exclusive claims
    pub fn borrow(&self) -> LienResult<SyncRef<T>> {
        let anchor = self.anchor()?;
        let mut meter = anchor.store.meter();
        loop {
            if meter & EXCLUSIVE != 0 {
                return Err(LienError::BorrowedMutably);
            }
            match anchor.store.borrows.compare_exchange(
                meter,
                meter + 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => break,
                Err(observed) => meter = observed,
            }
        }
        Ok(SyncRef::new(anchor.store.clone(), anchor.stamp.clone()))
    }

    /// Issue the exclusive loan; the single compare-exchange from zero is
    /// what makes a two-thread race resolve to exactly one winner
    pub fn borrow_mut(&self) -> LienResult<SyncRefMut<T>> {
        let anchor = self.anchor()?;
        match anchor
            .store
            .borrows
            .compare_exchange(0, EXCLUSIVE, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => Ok(SyncRefMut::new(anchor.store.clone(), anchor.stamp.clone())),
            Err(observed) => {
                if observed & EXCLUSIVE != 0 {
                    Err(LienError::BorrowedMutably)
                } else {
                    Err(LienError::BorrowedImmutably {
                        count: observed & COUNT_MASK,
                    })
                }
            }
        }
    }

    pub fn get(&self) -> LienResult<SyncReadGuard<'_, T>> {
        let anchor = self.anchor()?;
        if anchor.store.meter() & EXCLUSIVE != 0 {
            return Err(LienError::BorrowedMutably);
        }
        sync_read_guard(&anchor.store, LienError::Moved)
    }

    pub fn get_mut(&self) -> LienResult<SyncWriteGuard<'_, T>> {
        let anchor = self.anchor()?;
        let meter = anchor.store.meter();
        if meter & EXCLUSIVE != 0 {
            return Err(LienError::BorrowedMutably);
        }
        if meter & COUNT_MASK > 0 {
            return Err(LienError::BorrowedImmutably {
                count: meter & COUNT_MASK,
            });
        }
        sync_write_guard(&anchor.store, LienError::Moved)
    }

    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> LienResult<R> {
        Ok(f(&*self.get()?))
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> LienResult<R> {
        Ok(f(&mut *self.get_mut()?))
    }
}

impl<T> Hold for SyncVal<T> {
    type Value = T;
    type Shared = SyncRef<T>;
    type Exclusive = SyncRefMut<T>;

    fn wrap(value: T) -> Self {
        SyncVal::wrap(value)
    }

    fn is_valid(&self) -> bool {
        SyncVal::is_valid(self)
    }

    fn transfer(&mut self) -> LienResult<Self> {
        SyncVal::transfer(self)
    }

    fn dispose(&mut self) -> LienResult<()> {
        SyncVal::dispose(self)
    }

    fn try_clone(&self) -> LienResult<Self>
    where
        T: Clone,
    {
        SyncVal::try_clone(self)
    }

    fn borrow(&self) -> LienResult<SyncRef<T>> {
        SyncVal::borrow(self)
    }

    fn borrow_mut(&self) -> LienResult<SyncRefMut<T>> {
        SyncVal::borrow_mut(self)
    }

    fn read<R>(&self, f: impl FnOnce(&T) -> R) -> LienResult<R> {
        SyncVal::read(self, f)
    }

    fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> LienResult<R> {
        SyncVal::write(self, f)
    }
}

impl<T> Drop for SyncVal<T> {
    fn drop(&mut self) {
        if let Some(anchor) = self.anchor.take() {
            let borrowed = anchor.store.meter() != 0;
            if borrowed && crate::strict_drop() && !std::thread::panicking() {
                panic!("SyncVal dropped while still borrowed");
            }
            anchor.stamp.invalidate();
            if let Ok(mut slot) = anchor.store.payload.try_write() {
                *slot = None;
            }
        }
    }
}

impl<T: fmt::Display> fmt::Display for SyncVal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            return write!(f, "SyncVal {{ is_valid: false }}");
        }
        match self.get() {
            Ok(guard) => write!(f, "SyncVal {{ is_valid: true, value: {} }}", &*guard),
            Err(_) => write!(f, "SyncVal {{ is_valid: true }}"),
        }
    }
}

// ============================================================================
// Loans
// ============================================================================

#[derive(Debug)]
struct SyncLoanAnchor<T> {
    store: Arc<SyncStore<T>>,
    stamp: SyncStamp,
}

impl<T> SyncLoanAnchor<T> {
    fn live(slot: &Option<Self>) -> LienResult<&Self> {
        match slot.as_ref() {
            Some(anchor) if anchor.stamp.is_alive() => Ok(anchor),
            _ => Err(LienError::Expired),
        }
    }
}

/// Shared (read-only) loan, thread-safe flavor
#[derive(Debug)]
pub struct SyncRef<T> {
    anchor: Option<SyncLoanAnchor<T>>,
}

impl<T> SyncRef<T> {
    fn new(store: Arc<SyncStore<T>>, stamp: SyncStamp) -> Self {
        Self {
            anchor: Some(SyncLoanAnchor { store, stamp }),
        }
    }

    pub fn kind(&self) -> LoanKind {
        LoanKind::Shared
    }

    pub fn is_valid(&self) -> bool {
        self.anchor
            .as_ref()
            .map(|anchor| anchor.stamp.is_alive())
            .unwrap_or(false)
    }

    pub fn release(&mut self) {
        if let Some(anchor) = self.anchor.take() {
            if anchor.stamp.is_alive() {
                anchor.store.borrows.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }

    pub fn transfer(&mut self) -> Self {
        Self {
            anchor: self.anchor.take(),
        }
    }

    pub fn get(&self) -> LienResult<SyncReadGuard<'_, T>> {
        let anchor = SyncLoanAnchor::live(&self.anchor)?;
        sync_read_guard(&anchor.store, LienError::Expired)
    }

    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> LienResult<R> {
        Ok(f(&*self.get()?))
    }
}

impl<T> Drop for SyncRef<T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T> Loan for SyncRef<T> {
    type Value = T;

    fn is_valid(&self) -> bool {
        SyncRef::is_valid(self)
    }

    fn release(&mut self) {
        SyncRef::release(self)
    }

    fn transfer(&mut self) -> Self {
        SyncRef::transfer(self)
    }

    fn read<R>(&self, f: impl FnOnce(&T) -> R) -> LienResult<R> {
        SyncRef::read(self, f)
    }
}

impl<T: fmt::Display> fmt::Display for SyncRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Ok(guard) => write!(f, "SyncRef {{ is_valid: true, value: {} }}", &*guard),
            Err(_) => write!(f, "SyncRef {{ is_valid: false }}"),
        }
    }
}

/// Exclusive (read-write) loan, thread-safe flavor
#[derive(Debug)]
pub struct SyncRefMut<T> {
    anchor: Option<SyncLoanAnchor<T>>,
}

impl<T> SyncRefMut<T> {
    fn new(store: Arc<SyncStore<T>>, stamp: SyncStamp) -> Self {
        Self {
            anchor: Some(SyncLoanAnchor { store, stamp }),
        }
    }

    pub fn kind(&self) -> LoanKind {
        LoanKind::Exclusive
    }

    pub fn is_valid(&self) -> bool {
        self.anchor
            .as_ref()
            .map(|anchor| anchor.stamp.is_alive())
            .unwrap_or(false)
    }

    pub fn release(&mut self) {
        if let Some(anchor) = self.anchor.take() {
            if anchor.stamp.is_alive() {
                anchor.store.borrows.fetch_and(COUNT_MASK, Ordering::SeqCst);
            }
        }
    }

    pub fn transfer(&mut self) -> Self {
        Self {
            anchor: self.anchor.take(),
        }
    }

    pub fn get(&self) -> LienResult<SyncReadGuard<'_, T>> {
        let anchor = SyncLoanAnchor::live(&self.anchor)?;
        sync_read_guard(&anchor.store, LienError::Expired)
    }

    pub fn get_mut(&self) -> LienResult<SyncWriteGuard<'_, T>> {
        let anchor = SyncLoanAnchor::live(&self.anchor)?;
        sync_write_guard(&anchor.store, LienError::Expired)
    }

    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> LienResult<R> {
        Ok(f(&*self.get()?))
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> LienResult<R> {
        Ok(f(&mut *self.get_mut()?))
    }
}

impl<T> Drop for SyncRefMut<T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T> Loan for SyncRefMut<T> {
    type Value = T;

    fn is_valid(&self) -> bool {
        SyncRefMut::is_valid(self)
    }

    fn release(&mut self) {
        SyncRefMut::release(self)
    }

    fn transfer(&mut self) -> Self {
        SyncRefMut::transfer(self)
    }

    fn read<R>(&self, f: impl FnOnce(&T) -> R) -> LienResult<R> {
        SyncRefMut::read(self, f)
    }
}

impl<T> LoanMut for SyncRefMut<T> {
    fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> LienResult<R> {
        SyncRefMut::write(self, f)
    }
}

impl<T: fmt::Display> fmt::Display for SyncRefMut<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Ok(guard) => write!(f, "SyncRefMut {{ is_valid: true, value: {} }}", &*guard),
            Err(_) => write!(f, "SyncRefMut {{ is_valid: false }}"),
        }
    }
}

// ============================================================================
// Guards
// ============================================================================

/// Shared view into a thread-safe payload
pub struct SyncReadGuard<'a, T> {
    inner: RwLockReadGuard<'a, Option<SyncPayload<T>>>,
}

impl<T> Deref for SyncReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self.inner.as_ref() {
            Some(payload) => payload.as_ref(),
            // The payload cannot be cleared while this read lock is held.
            None => unreachable!("payload vanished under a read guard"),
        }
    }
}

impl<T: fmt::Display> fmt::Display for SyncReadGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (**self).fmt(f)
    }
}

/// Exclusive view into a thread-safe payload
pub struct SyncWriteGuard<'a, T> {
    inner: RwLockWriteGuard<'a, Option<SyncPayload<T>>>,
}

impl<T> Deref for SyncWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self.inner.as_ref() {
            Some(payload) => payload.as_ref(),
            None => unreachable!("payload vanished under a write guard"),
        }
    }
}

impl<T> DerefMut for SyncWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        match self.inner.as_mut().and_then(Payload::as_mut) {
            Some(value) => value,
            // Shape was checked when the guard was issued.
            None => unreachable!("write guard over an aliased payload"),
        }
    }
}

fn try_read_lock<T>(
    lock: &RwLock<Option<SyncPayload<T>>>,
) -> LienResult<RwLockReadGuard<'_, Option<SyncPayload<T>>>> {
    match lock.try_read() {
        Ok(guard) => Ok(guard),
        // The meters, not the lock, carry the discipline; a poisoned lock
        // only means some other thread panicked mid-access.
        Err(TryLockError::Poisoned(poisoned)) => Ok(poisoned.into_inner()),
        Err(TryLockError::WouldBlock) => Err(LienError::BorrowedMutably),
    }
}

fn try_write_lock<T>(
    lock: &RwLock<Option<SyncPayload<T>>>,
) -> LienResult<RwLockWriteGuard<'_, Option<SyncPayload<T>>>> {
    match lock.try_write() {
        Ok(guard) => Ok(guard),
        Err(TryLockError::Poisoned(poisoned)) => Ok(poisoned.into_inner()),
        Err(TryLockError::WouldBlock) => Err(LienError::BorrowedMutably),
    }
}

fn sync_read_guard<T>(
    store: &SyncStore<T>,
    missing: LienError,
) -> LienResult<SyncReadGuard<'_, T>> {
    let inner = try_read_lock(&store.payload)?;
    if inner.is_none() {
        return Err(missing);
    }
    Ok(SyncReadGuard { inner })
}

fn sync_write_guard<T>(
    store: &SyncStore<T>,
    missing: LienError,
) -> LienResult<SyncWriteGuard<'_, T>> {
    let inner = try_write_lock(&store.payload)?;
    match inner.as_ref() {
        None => Err(missing),
        Some(payload) if payload.shape() == Shape::BySmartHandle => Err(LienError::SharedMutation),
        Some(_) => Ok(SyncWriteGuard { inner }),
    }
}
