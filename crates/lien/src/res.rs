//! Fallible wrapper over a success/failure pair
//!
//! [`Res`] holds exactly one of two holder slots: the Ok value or the Err
//! value. Occupancy is exclusive for every constructed instance; both
//! slots are empty only after [`Res::transfer`] has poisoned the source,
//! and every operation on that state fails with
//! [`LienError::Moved`](crate::LienError::Moved).

use std::fmt;

use ecow::EcoString;

use crate::error::{LienError, LienResult};
use crate::hold::{Hold, Local, Mode, Threaded};
use crate::opt::Opt;

/// Ok/Err wrapper around a pair of owned-value slots
pub struct Res<T, E, M: Mode = Local> {
    ok: Option<M::Holder<T>>,
    err: Option<M::Holder<E>>,
}

/// Thread-safe fallible
pub type SyncRes<T, E> = Res<T, E, Threaded>;

/// An Ok result owning `value`
pub fn ok<T, E>(value: T) -> Res<T, E> {
    Res::new_ok(value)
}

/// An Err result owning `error`
pub fn err<T, E>(error: E) -> Res<T, E> {
    Res::new_err(error)
}

/// An Ok result in thread-safe mode
pub fn sync_ok<T, E>(value: T) -> SyncRes<T, E> {
    Res::new_ok(value)
}

/// An Err result in thread-safe mode
pub fn sync_err<T, E>(error: E) -> SyncRes<T, E> {
    Res::new_err(error)
}

impl<T, E, M: Mode> Res<T, E, M> {
    pub fn new_ok(value: T) -> Self {
        Self {
            ok: Some(<M::Holder<T> as Hold>::wrap(value)),
            err: None,
        }
    }

    pub fn new_err(error: E) -> Self {
        Self {
            ok: None,
            err: Some(<M::Holder<E> as Hold>::wrap(error)),
        }
    }

    fn from_ok_holder(holder: M::Holder<T>) -> Self {
        Self {
            ok: Some(holder),
            err: None,
        }
    }

    fn from_err_holder(holder: M::Holder<E>) -> Self {
        Self {
            ok: None,
            err: Some(holder),
        }
    }

    /// True until the result has been consumed by a transfer
    pub fn is_valid(&self) -> bool {
        self.ok.is_some() || self.err.is_some()
    }

    pub fn is_ok(&self) -> bool {
        self.ok.is_some()
    }

    pub fn is_err(&self) -> bool {
        self.err.is_some()
    }

    /// True if Ok and the contained value matches the predicate
    pub fn is_ok_and(&self, predicate: impl FnOnce(&T) -> bool) -> LienResult<bool> {
        match &self.ok {
            Some(holder) => holder.read(predicate),
            None => Ok(false),
        }
    }

    /// True if Err and the contained error matches the predicate
    pub fn is_err_and(&self, predicate: impl FnOnce(&E) -> bool) -> LienResult<bool> {
        match &self.err {
            Some(holder) => holder.read(predicate),
            None => Ok(false),
        }
    }

    /// Explicit move: both slots travel out and the source is poisoned
    pub fn transfer(&mut self) -> LienResult<Self> {
        if !self.is_valid() {
            return Err(LienError::Moved);
        }
        Ok(Self {
            ok: self.ok.take(),
            err: self.err.take(),
        })
    }

    /// Project the Ok side into an optional, consuming the result
    pub fn ok(self) -> LienResult<Opt<T, M>> {
        if !self.is_valid() {
            return Err(LienError::Moved);
        }
        Ok(match self.ok {
            Some(holder) => Opt::from_holder(holder),
            None => Opt::none(),
        })
    }

    /// Project the Err side into an optional, consuming the result
    pub fn err(self) -> LienResult<Opt<E, M>> {
        if !self.is_valid() {
            return Err(LienError::Moved);
        }
        Ok(match self.err {
            Some(holder) => Opt::from_holder(holder),
            None => Opt::none(),
        })
    }

    /// Borrow-based view of whichever side is occupied, leaving the
    /// receiver in place
    #[allow(clippy::type_complexity)]
    pub fn as_ref(
        &self,
    ) -> LienResult<Res<<M::Holder<T> as Hold>::Shared, <M::Holder<E> as Hold>::Shared, M>> {
        if let Some(holder) = &self.ok {
            Ok(Res::from_ok_holder(Hold::wrap(holder.borrow()?)))
        } else if let Some(holder) = &self.err {
            Ok(Res::from_err_holder(Hold::wrap(holder.borrow()?)))
        } else {
            Err(LienError::Moved)
        }
    }

    /// Exclusive borrow-based view of whichever side is occupied
    #[allow(clippy::type_complexity)]
    pub fn as_mut(
        &self,
    ) -> LienResult<Res<<M::Holder<T> as Hold>::Exclusive, <M::Holder<E> as Hold>::Exclusive, M>>
    {
        if let Some(holder) = &self.ok {
            Ok(Res::from_ok_holder(Hold::wrap(holder.borrow_mut()?)))
        } else if let Some(holder) = &self.err {
            Ok(Res::from_err_holder(Hold::wrap(holder.borrow_mut()?)))
        } else {
            Err(LienError::Moved)
        }
    }

    /// Transform the Ok side; an Err side passes through by cloning, since
    /// the receiver keeps its original
    pub fn map<U>(&self, f: impl FnOnce(&T) -> U) -> LienResult<Res<U, E, M>>
    where
        E: Clone,
    {
        if let Some(holder) = &self.ok {
            Ok(Res::from_ok_holder(Hold::wrap(holder.read(f)?)))
        } else if let Some(holder) = &self.err {
            Ok(Res::from_err_holder(holder.try_clone()?))
        } else {
            Err(LienError::Moved)
        }
    }

    /// Transform the Err side; an Ok side passes through by cloning
    pub fn map_err<F>(&self, f: impl FnOnce(&E) -> F) -> LienResult<Res<T, F, M>>
    where
        T: Clone,
    {
        if let Some(holder) = &self.err {
            Ok(Res::from_err_holder(Hold::wrap(holder.read(f)?)))
        } else if let Some(holder) = &self.ok {
            Ok(Res::from_ok_holder(holder.try_clone()?))
        } else {
            Err(LienError::Moved)
        }
    }

    /// The Ok holder, or `ErrValue` when this is an Err
    pub fn unwrap(self) -> LienResult<M::Holder<T>> {
        if !self.is_valid() {
            return Err(LienError::Moved);
        }
        self.ok.ok_or(LienError::ErrValue)
    }

    /// The Err holder, or `OkValue` when this is an Ok
    pub fn unwrap_err(self) -> LienResult<M::Holder<E>> {
        if !self.is_valid() {
            return Err(LienError::Moved);
        }
        self.err.ok_or(LienError::OkValue)
    }

    /// The Ok holder, or `Msg(msg)` when this is an Err
    pub fn expect(self, msg: impl Into<EcoString>) -> LienResult<M::Holder<T>> {
        if !self.is_valid() {
            return Err(LienError::Moved);
        }
        self.ok.ok_or_else(|| LienError::Msg(msg.into()))
    }

    /// The Err holder, or `Msg(msg)` when this is an Ok
    pub fn expect_err(self, msg: impl Into<EcoString>) -> LienResult<M::Holder<E>> {
        if !self.is_valid() {
            return Err(LienError::Moved);
        }
        self.err.ok_or_else(|| LienError::Msg(msg.into()))
    }

    /// The Ok holder, or a fresh one owning `fallback`
    pub fn unwrap_or(self, fallback: T) -> LienResult<M::Holder<T>> {
        if !self.is_valid() {
            return Err(LienError::Moved);
        }
        Ok(match self.ok {
            Some(holder) => holder,
            None => Hold::wrap(fallback),
        })
    }

    pub fn unwrap_or_default(self) -> LienResult<M::Holder<T>>
    where
        T: Default,
    {
        if !self.is_valid() {
            return Err(LienError::Moved);
        }
        Ok(match self.ok {
            Some(holder) => holder,
            None => Hold::wrap(T::default()),
        })
    }

    /// Deep copy of whichever side is occupied
    pub fn cloned(&self) -> LienResult<Self>
    where
        T: Clone,
        E: Clone,
    {
        if let Some(holder) = &self.ok {
            Ok(Res::from_ok_holder(holder.try_clone()?))
        } else if let Some(holder) = &self.err {
            Ok(Res::from_err_holder(holder.try_clone()?))
        } else {
            Err(LienError::Moved)
        }
    }
}

impl<T: fmt::Display, E: fmt::Display, M: Mode> fmt::Display for Res<T, E, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(holder) = &self.ok {
            match holder.read(ToString::to_string) {
                Ok(rendered) => write!(f, "Res {{ Ok, value: {} }}", rendered),
                Err(_) => write!(f, "Res {{ Ok }}"),
            }
        } else if let Some(holder) = &self.err {
            match holder.read(ToString::to_string) {
                Ok(rendered) => write!(f, "Res {{ Err, error: {} }}", rendered),
                Err(_) => write!(f, "Res {{ Err }}"),
            }
        } else {
            write!(f, "Res {{ is_valid: false }}")
        }
    }
}

impl<T, E, M: Mode> fmt::Debug for Res<T, E, M>
where
    M::Holder<T>: fmt::Debug,
    M::Holder<E>: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Res")
            .field("ok", &self.ok)
            .field("err", &self.err)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_err_matrix() {
        let r = ok::<i32, String>(5);
        assert!(r.is_valid());
        assert!(r.is_ok());
        assert!(!r.is_err());
        assert_eq!(r.unwrap().unwrap().read(|v| *v).unwrap(), 5);

        let r = ok::<i32, String>(5);
        assert_eq!(r.unwrap_err().unwrap_err(), LienError::OkValue);

        let r = err::<i32, String>("bad".to_string());
        assert!(r.is_err());
        assert_eq!(r.unwrap().unwrap_err(), LienError::ErrValue);
    }

    #[test]
    fn test_transfer_poisons_source() {
        let mut r = ok::<i32, String>(1);
        let moved = r.transfer().unwrap();
        assert!(!r.is_valid());
        assert!(moved.is_ok());
        assert_eq!(r.transfer().unwrap_err(), LienError::Moved);
        assert_eq!(r.cloned().unwrap_err(), LienError::Moved);
    }

    #[test]
    fn test_map_clones_untouched_side() {
        let r = err::<i32, String>("oops".to_string());
        let mapped = r.map(|v| v + 1).unwrap();
        assert!(mapped.is_err());
        // The receiver keeps its own error
        assert!(r.is_err());
        assert_eq!(
            mapped.unwrap_err().unwrap().read(String::clone).unwrap(),
            "oops"
        );

        let r = ok::<i32, String>(2);
        let mapped = r.map_err(|e| e.len()).unwrap();
        assert!(mapped.is_ok());
        assert!(r.is_ok());
    }

    #[test]
    fn test_projections() {
        let r = ok::<i32, String>(5);
        let o = r.ok().unwrap();
        assert!(o.is_some());

        let r = ok::<i32, String>(5);
        let e = r.err().unwrap();
        assert!(e.is_none());
    }

    #[test]
    fn test_unwrap_or() {
        let r = err::<i32, String>("x".to_string());
        assert_eq!(r.unwrap_or(9).unwrap().read(|v| *v).unwrap(), 9);
        let r = ok::<i32, String>(3);
        assert_eq!(r.unwrap_or(9).unwrap().read(|v| *v).unwrap(), 3);
        let r = err::<i32, String>("x".to_string());
        assert_eq!(r.unwrap_or_default().unwrap().read(|v| *v).unwrap(), 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            format!("{}", ok::<i32, String>(5)),
            "Res { Ok, value: 5 }"
        );
        assert_eq!(
            format!("{}", err::<i32, String>("bad".to_string())),
            "Res { Err, error: bad }"
        );
    }
}
