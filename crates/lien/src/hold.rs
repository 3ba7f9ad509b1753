//! Shared capability interface over both container modes
//!
//! The single-threaded and thread-safe containers are two concrete
//! implementations behind one interface: [`Hold`] for owners, [`Loan`] /
//! [`LoanMut`] for the handles they issue. The mode is picked at
//! construction (`wrap` vs `wrap_sync`); nothing downstream carries a
//! mode parameter except the [`Opt`](crate::Opt)/[`Res`](crate::Res)
//! wrappers, which are written once over the sealed [`Mode`] family.

use crate::error::LienResult;

/// Exclusive-ownership capability set
///
/// Implemented by [`Val`](crate::Val) and [`SyncVal`](crate::SyncVal).
/// Every operation that can observe a moved-out, dropped, or borrowed
/// state reports it as a typed error instead of succeeding quietly.
pub trait Hold: Sized {
    type Value;
    type Shared: Loan<Value = Self::Value>;
    type Exclusive: LoanMut<Value = Self::Value>;

    /// Take ownership of a value; never fails
    fn wrap(value: Self::Value) -> Self;

    /// True while the payload is present and its validity slot is alive
    fn is_valid(&self) -> bool;

    /// Explicit move: poisons the source, refuses while borrowed
    fn transfer(&mut self) -> LienResult<Self>;

    /// Explicit checked drop: refuses while borrowed
    fn dispose(&mut self) -> LienResult<()>;

    /// Deep copy into a new independent owner
    fn try_clone(&self) -> LienResult<Self>
    where
        Self::Value: Clone;

    /// Issue a shared loan
    fn borrow(&self) -> LienResult<Self::Shared>;

    /// Issue the exclusive loan
    fn borrow_mut(&self) -> LienResult<Self::Exclusive>;

    /// Run `f` over the payload by shared access
    fn read<R>(&self, f: impl FnOnce(&Self::Value) -> R) -> LienResult<R>;

    /// Run `f` over the payload by exclusive access
    fn write<R>(&self, f: impl FnOnce(&mut Self::Value) -> R) -> LienResult<R>;
}

/// Non-owning handle capability set (shared side)
pub trait Loan: Sized {
    type Value;

    /// True until released, and only while the owner's slot is alive
    fn is_valid(&self) -> bool;

    /// Give the counter back to the owner; idempotent
    fn release(&mut self);

    /// Hand the release obligation to a new handle, neutering the source
    fn transfer(&mut self) -> Self;

    /// Run `f` over the loaned payload
    fn read<R>(&self, f: impl FnOnce(&Self::Value) -> R) -> LienResult<R>;
}

/// Non-owning handle capability set (exclusive side)
pub trait LoanMut: Loan {
    /// Run `f` over the loaned payload by exclusive access
    fn write<R>(&self, f: impl FnOnce(&mut Self::Value) -> R) -> LienResult<R>;
}

mod sealed {
    pub trait Sealed {}
}

/// Family of container modes: maps a payload type to its holder type
pub trait Mode: sealed::Sealed + 'static {
    type Holder<T>: Hold<Value = T>;
}

/// Single-threaded mode: plain counters, no synchronization
///
/// A value in this mode and all loans derived from it must stay on one
/// thread; the types are `!Send` so the compiler enforces it.
pub struct Local;

/// Thread-safe mode: atomic counters, serialized validity teardown
pub struct Threaded;

impl sealed::Sealed for Local {}
impl sealed::Sealed for Threaded {}

impl Mode for Local {
    type Holder<T> = crate::val::Val<T>;
}

impl Mode for Threaded {
    type Holder<T> = crate::sync::SyncVal<T>;
}
