//! Optional wrapper over an owned value
//!
//! [`Opt`] is a Some/None wrapper around one holder slot. It adds
//! null-safety combinators without weakening the ownership rules of the
//! wrapped value: every validity and borrow check is delegated to the
//! holder. Written once over the [`Mode`] family, so `Opt<T>` is the
//! single-threaded form and [`SyncOpt<T>`] the thread-safe one.

use std::fmt;

use ecow::EcoString;

use crate::error::{LienError, LienResult};
use crate::hold::{Hold, Local, Mode, Threaded};

/// Some/None wrapper around an owned value
pub struct Opt<T, M: Mode = Local> {
    slot: Option<M::Holder<T>>,
}

/// Thread-safe optional
pub type SyncOpt<T> = Opt<T, Threaded>;

/// A Some optional owning `value`
pub fn some<T>(value: T) -> Opt<T> {
    Opt::some(value)
}

/// An empty optional
pub fn none<T>() -> Opt<T> {
    Opt::none()
}

/// A Some optional in thread-safe mode
pub fn sync_some<T>(value: T) -> SyncOpt<T> {
    Opt::some(value)
}

/// An empty optional in thread-safe mode
pub fn sync_none<T>() -> SyncOpt<T> {
    Opt::none()
}

impl<T, M: Mode> Opt<T, M> {
    pub fn some(value: T) -> Self {
        Self {
            slot: Some(<M::Holder<T> as Hold>::wrap(value)),
        }
    }

    pub fn none() -> Self {
        Self { slot: None }
    }

    pub(crate) fn from_holder(holder: M::Holder<T>) -> Self {
        Self { slot: Some(holder) }
    }

    pub fn is_some(&self) -> bool {
        self.slot.is_some()
    }

    pub fn is_none(&self) -> bool {
        self.slot.is_none()
    }

    /// True if Some and the contained value matches the predicate
    pub fn is_some_and(&self, predicate: impl FnOnce(&T) -> bool) -> LienResult<bool> {
        match &self.slot {
            Some(holder) => holder.read(predicate),
            None => Ok(false),
        }
    }

    /// Borrow-based view: `Opt<T>` to `Opt<Ref<T>>`, leaving the receiver
    /// in place
    pub fn as_ref(&self) -> LienResult<Opt<<M::Holder<T> as Hold>::Shared, M>> {
        match &self.slot {
            Some(holder) => {
                let loan = holder.borrow()?;
                Ok(Opt::from_holder(Hold::wrap(loan)))
            }
            None => Ok(Opt::none()),
        }
    }

    /// Borrow-based view: `Opt<T>` to `Opt<RefMut<T>>`
    pub fn as_mut(&self) -> LienResult<Opt<<M::Holder<T> as Hold>::Exclusive, M>> {
        match &self.slot {
            Some(holder) => {
                let loan = holder.borrow_mut()?;
                Ok(Opt::from_holder(Hold::wrap(loan)))
            }
            None => Ok(Opt::none()),
        }
    }

    /// Apply `f` to the contained reference and wrap the output in a new
    /// optional; None passes through without touching the payload
    pub fn map<U>(&self, f: impl FnOnce(&T) -> U) -> LienResult<Opt<U, M>> {
        match &self.slot {
            Some(holder) => Ok(Opt::from_holder(Hold::wrap(holder.read(f)?))),
            None => Ok(Opt::none()),
        }
    }

    /// Replace the content; the previous value, if any, is dropped
    pub fn insert(&mut self, value: T) {
        self.slot = Some(<M::Holder<T> as Hold>::wrap(value));
    }

    /// Move the content out, leaving None behind
    pub fn take(&mut self) -> Self {
        Self {
            slot: self.slot.take(),
        }
    }

    /// The contained holder, or `Msg(msg)` when None
    pub fn expect(self, msg: impl Into<EcoString>) -> LienResult<M::Holder<T>> {
        match self.slot {
            Some(holder) => Ok(holder),
            None => Err(LienError::Msg(msg.into())),
        }
    }

    /// The contained holder, or `NoneValue` when None
    pub fn unwrap(self) -> LienResult<M::Holder<T>> {
        self.slot.ok_or(LienError::NoneValue)
    }

    /// The contained holder, or a fresh one owning `fallback`
    pub fn unwrap_or(self, fallback: T) -> M::Holder<T> {
        match self.slot {
            Some(holder) => holder,
            None => Hold::wrap(fallback),
        }
    }

    pub fn unwrap_or_else(self, f: impl FnOnce() -> T) -> M::Holder<T> {
        match self.slot {
            Some(holder) => holder,
            None => Hold::wrap(f()),
        }
    }

    pub fn unwrap_or_default(self) -> M::Holder<T>
    where
        T: Default,
    {
        match self.slot {
            Some(holder) => holder,
            None => Hold::wrap(T::default()),
        }
    }

    /// Deep copy of the contained value via the holder's clone
    pub fn cloned(&self) -> LienResult<Self>
    where
        T: Clone,
    {
        match &self.slot {
            Some(holder) => Ok(Self {
                slot: Some(holder.try_clone()?),
            }),
            None => Ok(Self { slot: None }),
        }
    }
}

impl<T, M: Mode> Default for Opt<T, M> {
    fn default() -> Self {
        Self::none()
    }
}

impl<T: fmt::Display, M: Mode> fmt::Display for Opt<T, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.slot {
            Some(holder) => match holder.read(ToString::to_string) {
                Ok(rendered) => write!(f, "Opt {{ is_some: true, value: {} }}", rendered),
                Err(_) => write!(f, "Opt {{ is_some: true }}"),
            },
            None => write!(f, "Opt {{ is_some: false }}"),
        }
    }
}

impl<T, M: Mode> fmt::Debug for Opt<T, M>
where
    M::Holder<T>: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Opt").field("slot", &self.slot).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_some_none() {
        let s = some(1);
        assert!(s.is_some());
        assert!(!s.is_none());
        let n = none::<i32>();
        assert!(n.is_none());
    }

    #[test]
    fn test_map_passes_none_through() {
        let n = none::<i32>();
        let mapped = n.map(|v| v * 2).unwrap();
        assert!(mapped.is_none());

        let s = some(21);
        let mapped = s.map(|v| v * 2).unwrap();
        assert_eq!(mapped.unwrap().unwrap().read(|v| *v).unwrap(), 42);
        // map does not consume the receiver
        assert!(s.is_some());
    }

    #[test]
    fn test_take_leaves_none() {
        let mut s = some("gone".to_string());
        let taken = s.take();
        assert!(s.is_none());
        assert!(taken.is_some());
        assert_eq!(
            taken.unwrap().unwrap().read(String::clone).unwrap(),
            "gone"
        );
    }

    #[test]
    fn test_unwrap_fallbacks() {
        assert_eq!(none::<i32>().unwrap_or(7).read(|v| *v).unwrap(), 7);
        assert_eq!(some(7).unwrap_or(9).read(|v| *v).unwrap(), 7);
        assert_eq!(none::<i32>().unwrap_or_else(|| 3).read(|v| *v).unwrap(), 3);
        assert_eq!(none::<i32>().unwrap_or_default().read(|v| *v).unwrap(), 0);
    }

    #[test]
    fn test_unwrap_none_fails() {
        assert_eq!(none::<i32>().unwrap().unwrap_err(), LienError::NoneValue);
        assert_eq!(
            none::<i32>().expect("needed a value").unwrap_err(),
            LienError::Msg("needed a value".into())
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", some(5)), "Opt { is_some: true, value: 5 }");
        assert_eq!(format!("{}", none::<i32>()), "Opt { is_some: false }");
    }
}
