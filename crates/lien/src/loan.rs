//! Single-threaded loan handles
//!
//! [`Ref`] and [`RefMut`] are the non-owning handles issued by
//! [`Val`](crate::Val). Each one carries the release obligation for the
//! counter it incremented: dropping or releasing a handle gives the
//! counter back exactly once, and a handle outliving its owner reports
//! [`LienError::Expired`] instead of touching freed state.

use std::fmt;
use std::rc::Rc;

use strum_macros::Display;

use crate::error::{LienError, LienResult};
use crate::hold::{Loan, LoanMut};
use crate::val::{read_guard, write_guard, ReadGuard, Store, WriteGuard};
use crate::validity::LocalStamp;

/// Which side of the borrow discipline a loan occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum LoanKind {
    Shared,
    Exclusive,
}

#[derive(Debug)]
struct LoanAnchor<T> {
    store: Rc<Store<T>>,
    stamp: LocalStamp,
}

impl<T> LoanAnchor<T> {
    fn live(slot: &Option<Self>) -> LienResult<&Self> {
        match slot.as_ref() {
            Some(anchor) if anchor.stamp.is_alive() => Ok(anchor),
            _ => Err(LienError::Expired),
        }
    }
}

/// Shared (read-only) loan
#[derive(Debug)]
pub struct Ref<T> {
    anchor: Option<LoanAnchor<T>>,
}

impl<T> Ref<T> {
    pub(crate) fn new(store: Rc<Store<T>>, stamp: LocalStamp) -> Self {
        Self {
            anchor: Some(LoanAnchor { store, stamp }),
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

    /// Give the shared count back; idempotent, and a no-op once the
    /// owner's slot is dead (the meter died with it)
    pub fn release(&mut self) {
        if let Some(anchor) = self.anchor.take() {
            if anchor.stamp.is_alive() {
                let count = anchor.store.shared.get();
                anchor.store.shared.set(count.saturating_sub(1));
            }
        }
    }

    /// Hand the release obligation to a new handle; the source is
    /// neutered and its later release/drop is a no-op
    pub fn transfer(&mut self) -> Self {
        Self {
            anchor: self.anchor.take(),
        }
    }

    pub fn get(&self) -> LienResult<ReadGuard<'_, T>> {
        let anchor = LoanAnchor::live(&self.anchor)?;
        read_guard(&anchor.store)
    }

    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> LienResult<R> {
        Ok(f(&*self.get()?))
    }
}

impl<T> Drop for Ref<T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T> Loan for Ref<T> {
    type Value = T;

    fn is_valid(&self) -> bool {
        Ref::is_valid(self)
    }

    fn release(&mut self) {
        Ref::release(self)
    }

    fn transfer(&mut self) -> Self {
        Ref::transfer(self)
    }

    fn read<R>(&self, f: impl FnOnce(&T) -> R) -> LienResult<R> {
        Ref::read(self, f)
    }
}

impl<T: fmt::Display> fmt::Display for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Ok(guard) => write!(f, "Ref {{ is_valid: true, value: {} }}", &*guard),
            Err(_) => write!(f, "Ref {{ is_valid: false }}"),
        }
    }
}

/// Exclusive (read-write) loan
#[derive(Debug)]
pub struct RefMut<T> {
    anchor: Option<LoanAnchor<T>>,
}

impl<T> RefMut<T> {
    pub(crate) fn new(store: Rc<Store<T>>, stamp: LocalStamp) -> Self {
        Self {
            anchor: Some(LoanAnchor { store, stamp }),
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

    /// Clear the exclusive flag; idempotent
    pub fn release(&mut self) {
        if let Some(anchor) = self.anchor.take() {
            if anchor.stamp.is_alive() {
                anchor.store.exclusive.set(false);
            }
        }
    }

    pub fn transfer(&mut self) -> Self {
        Self {
            anchor: self.anchor.take(),
        }
    }

    pub fn get(&self) -> LienResult<ReadGuard<'_, T>> {
        let anchor = LoanAnchor::live(&self.anchor)?;
        read_guard(&anchor.store)
    }

    pub fn get_mut(&self) -> LienResult<WriteGuard<'_, T>> {
        let anchor = LoanAnchor::live(&self.anchor)?;
        write_guard(&anchor.store)
    }

    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> LienResult<R> {
        Ok(f(&*self.get()?))
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> LienResult<R> {
        Ok(f(&mut *self.get_mut()?))
    }
}

impl<T> Drop for RefMut<T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T> Loan for RefMut<T> {
    type Value = T;

    fn is_valid(&self) -> bool {
        RefMut::is_valid(self)
    }

    fn release(&mut self) {
        RefMut::release(self)
    }

    fn transfer(&mut self) -> Self {
        RefMut::transfer(self)
    }

    fn read<R>(&self, f: impl FnOnce(&T) -> R) -> LienResult<R> {
        RefMut::read(self, f)
    }
}

impl<T> LoanMut for RefMut<T> {
    fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> LienResult<R> {
        RefMut::write(self, f)
    }
}

impl<T: fmt::Display> fmt::Display for RefMut<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Ok(guard) => write!(f, "RefMut {{ is_valid: true, value: {} }}", &*guard),
            Err(_) => write!(f, "RefMut {{ is_valid: false }}"),
        }
    }
}
