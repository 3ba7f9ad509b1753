//! Single-threaded owned value container
//!
//! [`Val`] owns exactly one payload and enforces the borrow discipline at
//! runtime: any number of shared loans, or one exclusive loan, never
//! both. The payload and its borrow meter live in a store shared with
//! every loan; liveness lives in the validity side-table. A moved-out or
//! disposed owner keeps no anchor at all, so every later operation fails
//! with [`LienError::Moved`].

use std::cell::{self, Cell, RefCell};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use crate::error::{LienError, LienResult};
use crate::hold::Hold;
use crate::loan::{Ref, RefMut};
use crate::payload::{Payload, Shape};
use crate::validity::LocalStamp;

/// Payload slot plus borrow meter, shared by an owner and its loans
#[derive(Debug)]
pub(crate) struct Store<T> {
    pub(crate) payload: RefCell<Option<Payload<T, Rc<T>>>>,
    pub(crate) shared: Cell<u32>,
    pub(crate) exclusive: Cell<bool>,
}

#[derive(Debug)]
struct Anchor<T> {
    store: Rc<Store<T>>,
    stamp: LocalStamp,
}

/// Exclusive-ownership container, single-threaded flavor
///
/// Created with [`wrap`], [`Val::wrap_boxed`] or [`Val::wrap_handle`].
/// A native Rust move of a `Val` is an ordinary transfer and needs no
/// bookkeeping; [`Val::transfer`] is the explicit form that poisons the
/// source so later use is caught at runtime.
#[derive(Debug)]
pub struct Val<T> {
    anchor: Option<Anchor<T>>,
}

/// Wrap a value in a new single-threaded owner
pub fn wrap<T>(value: T) -> Val<T> {
    Val::wrap(value)
}

impl<T> Val<T> {
    pub fn wrap(value: T) -> Self {
        Self::with_payload(Payload::ByValue(value))
    }

    /// Take ownership of an already-boxed value
    pub fn wrap_boxed(value: Box<T>) -> Self {
        Self::with_payload(Payload::ByPointer(value))
    }

    /// Take ownership of a shared smart handle; the payload stays aliased
    /// and refuses mutation
    pub fn wrap_handle(value: Rc<T>) -> Self {
        Self::with_payload(Payload::BySmartHandle(value))
    }

    fn with_payload(payload: Payload<T, Rc<T>>) -> Self {
        Self {
            anchor: Some(Anchor {
                store: Rc::new(Store {
                    payload: RefCell::new(Some(payload)),
                    shared: Cell::new(0),
                    exclusive: Cell::new(false),
                }),
                stamp: LocalStamp::new(),
            }),
        }
    }

    fn anchor(&self) -> LienResult<&Anchor<T>> {
        self.anchor.as_ref().ok_or(LienError::Moved)
    }

    pub fn is_valid(&self) -> bool {
        self.anchor
            .as_ref()
            .map(|anchor| anchor.stamp.is_alive())
            .unwrap_or(false)
    }

    /// The payload's construction shape
    pub fn shape(&self) -> LienResult<Shape> {
        let anchor = self.anchor()?;
        let slot = anchor
            .store
            .payload
            .try_borrow()
            .map_err(|_| LienError::BorrowedMutably)?;
        match slot.as_ref() {
            Some(payload) => Ok(payload.shape()),
            None => Err(LienError::Moved),
        }
    }

    /// Outstanding shared loans
    pub fn shared_count(&self) -> u32 {
        self.anchor
            .as_ref()
            .map(|anchor| anchor.store.shared.get())
            .unwrap_or(0)
    }

    /// Whether the exclusive loan is outstanding
    pub fn is_mut_borrowed(&self) -> bool {
        self.anchor
            .as_ref()
            .map(|anchor| anchor.store.exclusive.get())
            .unwrap_or(false)
    }

    fn check_unborrowed(anchor: &Anchor<T>) -> LienResult<()> {
        if anchor.store.exclusive.get() {
            return Err(LienError::StillBorrowedMutably);
        }
        let count = anchor.store.shared.get();
        if count > 0 {
            return Err(LienError::StillBorrowedImmutably { count });
        }
        Ok(())
    }

    /// Explicit move: the payload, meter and validity slot travel to the
    /// returned owner and the source is poisoned. Refused while any loan
    /// is outstanding; relocating a borrowed value would strand its loans.
    pub fn transfer(&mut self) -> LienResult<Self> {
        Self::check_unborrowed(self.anchor()?)?;
        Ok(Self {
            anchor: self.anchor.take(),
        })
    }

    /// Checked drop: refuses while loans are outstanding, then kills the
    /// validity slot and releases the payload in place
    pub fn dispose(&mut self) -> LienResult<()> {
        Self::check_unborrowed(self.anchor()?)?;
        if let Some(anchor) = self.anchor.take() {
            anchor.stamp.invalidate();
            if let Ok(mut slot) = anchor.store.payload.try_borrow_mut() {
                *slot = None;
            }
        }
        Ok(())
    }

    /// Deep copy into a fresh owner with its own validity slot
    pub fn try_clone(&self) -> LienResult<Self>
    where
        T: Clone,
    {
        let anchor = self.anchor()?;
        if anchor.store.exclusive.get() {
            return Err(LienError::BorrowedMutably);
        }
        let slot = anchor
            .store
            .payload
            .try_borrow()
            .map_err(|_| LienError::BorrowedMutably)?;
        match slot.as_ref() {
            Some(payload) => Ok(Self::with_payload(payload.duplicate())),
            None => Err(LienError::Moved),
        }
    }

    /// Issue a shared loan
    pub fn borrow(&self) -> LienResult<Ref<T>> {
        let anchor = self.anchor()?;
        if anchor.store.exclusive.get() {
            return Err(LienError::BorrowedMutably);
        }
        anchor.store.shared.set(anchor.store.shared.get() + 1);
        Ok(Ref::new(anchor.store.clone(), anchor.stamp.clone()))
    }

    /// Issue the exclusive loan
    pub fn borrow_mut(&self) -> LienResult<RefMut<T>> {
        let anchor = self.anchor()?;
        if anchor.store.exclusive.get() {
            return Err(LienError::BorrowedMutably);
        }
        let count = anchor.store.shared.get();
        if count > 0 {
            return Err(LienError::BorrowedImmutably { count });
        }
        anchor.store.exclusive.set(true);
        Ok(RefMut::new(anchor.store.clone(), anchor.stamp.clone()))
    }

    /// Shared view of the payload; refused while exclusively loaned
    pub fn get(&self) -> LienResult<ReadGuard<'_, T>> {
        let anchor = self.anchor()?;
        if anchor.store.exclusive.get() {
            return Err(LienError::BorrowedMutably);
        }
        read_guard(&anchor.store)
    }

    /// Exclusive view of the payload; refused while any loan is out
    pub fn get_mut(&self) -> LienResult<WriteGuard<'_, T>> {
        let anchor = self.anchor()?;
        Self::check_unborrowed(anchor).map_err(|err| match err {
            LienError::StillBorrowedMutably => LienError::BorrowedMutably,
            LienError::StillBorrowedImmutably { count } => LienError::BorrowedImmutably { count },
            other => other,
        })?;
        write_guard(&anchor.store)
    }

    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> LienResult<R> {
        Ok(f(&*self.get()?))
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> LienResult<R> {
        Ok(f(&mut *self.get_mut()?))
    }
}

impl<T> Hold for Val<T> {
    type Value = T;
    type Shared = Ref<T>;
    type Exclusive = RefMut<T>;

    fn wrap(value: T) -> Self {
        Val::wrap(value)
    }

    fn is_valid(&self) -> bool {
        Val::is_valid(self)
    }

    fn transfer(&mut self) -> LienResult<Self> {
        Val::transfer(self)
    }

    fn dispose(&mut self) -> LienResult<()> {
        Val::dispose(self)
    }

    fn try_clone(&self) -> LienResult<Self>
    where
        T: Clone,
    {
        Val::try_clone(self)
    }

    fn borrow(&self) -> LienResult<Ref<T>> {
        Val::borrow(self)
    }

    fn borrow_mut(&self) -> LienResult<RefMut<T>> {
        Val::borrow_mut(self)
    }

    fn read<R>(&self, f: impl FnOnce(&T) -> R) -> LienResult<R> {
        Val::read(self, f)
    }

    fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> LienResult<R> {
        Val::write(self, f)
    }
}

impl<T> Drop for Val<T> {
    fn drop(&mut self) {
        if let Some(anchor) = self.anchor.take() {
            let borrowed = anchor.store.exclusive.get() || anchor.store.shared.get() > 0;
            if borrowed && crate::strict_drop() && !std::thread::panicking() {
                panic!("Val dropped while still borrowed");
            }
            anchor.stamp.invalidate();
            if let Ok(mut slot) = anchor.store.payload.try_borrow_mut() {
                *slot = None;
            }
        }
    }
}

impl<T: fmt::Display> fmt::Display for Val<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            return write!(f, "Val {{ is_valid: false }}");
        }
        match self.get() {
            Ok(guard) => write!(f, "Val {{ is_valid: true, value: {} }}", &*guard),
            Err(_) => write!(f, "Val {{ is_valid: true }}"),
        }
    }
}

// ============================================================================
// Guards
// ============================================================================

/// Shared view into a payload
pub struct ReadGuard<'a, T> {
    inner: cell::Ref<'a, T>,
}

impl<T> Deref for ReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: fmt::Display> fmt::Display for ReadGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}

/// Exclusive view into a payload
pub struct WriteGuard<'a, T> {
    inner: cell::RefMut<'a, T>,
}

impl<T> Deref for WriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T> DerefMut for WriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

pub(crate) fn read_guard<T>(store: &Store<T>) -> LienResult<ReadGuard<'_, T>> {
    let slot = store
        .payload
        .try_borrow()
        .map_err(|_| LienError::BorrowedMutably)?;
    match cell::Ref::filter_map(slot, |slot| slot.as_ref().map(Payload::as_ref)) {
        Ok(inner) => Ok(ReadGuard { inner }),
        Err(_) => Err(LienError::Moved),
    }
}

pub(crate) fn write_guard<T>(store: &Store<T>) -> LienResult<WriteGuard<'_, T>> {
    let slot = store
        .payload
        .try_borrow_mut()
        .map_err(|_| LienError::BorrowedMutably)?;
    if slot.is_none() {
        return Err(LienError::Moved);
    }
    match cell::RefMut::filter_map(slot, |slot| slot.as_mut().and_then(Payload::as_mut)) {
        Ok(inner) => Ok(WriteGuard { inner }),
        // The payload is present, so the only way the projection fails is
        // an aliased smart-handle payload.
        Err(_) => Err(LienError::SharedMutation),
    }
}
