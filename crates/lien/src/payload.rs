//! Tagged payload shapes
//!
//! The shape a value is held by is recorded at construction as an explicit
//! tag and dispatched by a single match: plain values, boxed values, and
//! reference-counted smart handles. Smart-handle payloads are aliased by
//! construction, so they refuse mutable access; clone delegates to the
//! shape (a smart handle clones the handle, not the pointee).

use std::ops::Deref;

use strum_macros::Display;

/// How a payload is held inside an owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Shape {
    ByValue,
    ByPointer,
    BySmartHandle,
}

/// Payload storage slot
///
/// `H` is the smart-handle type of the owning mode (`Rc<T>` for the
/// single-threaded containers, `Arc<T>` for the thread-safe ones).
#[derive(Debug)]
pub(crate) enum Payload<T, H> {
    ByValue(T),
    ByPointer(Box<T>),
    BySmartHandle(H),
}

impl<T, H: Deref<Target = T>> Payload<T, H> {
    pub fn shape(&self) -> Shape {
        match self {
            Payload::ByValue(_) => Shape::ByValue,
            Payload::ByPointer(_) => Shape::ByPointer,
            Payload::BySmartHandle(_) => Shape::BySmartHandle,
        }
    }

    pub fn as_ref(&self) -> &T {
        match self {
            Payload::ByValue(value) => value,
            Payload::ByPointer(boxed) => boxed,
            Payload::BySmartHandle(handle) => handle,
        }
    }

    /// Mutable access; `None` for smart handles, which alias their pointee
    pub fn as_mut(&mut self) -> Option<&mut T> {
        match self {
            Payload::ByValue(value) => Some(value),
            Payload::ByPointer(boxed) => Some(boxed),
            Payload::BySmartHandle(_) => None,
        }
    }
}

impl<T: Clone, H: Deref<Target = T> + Clone> Payload<T, H> {
    /// Shape-dispatched copy: values and boxes clone the pointee, smart
    /// handles clone the handle
    pub fn duplicate(&self) -> Self {
        match self {
            Payload::ByValue(value) => Payload::ByValue(value.clone()),
            Payload::ByPointer(boxed) => Payload::ByPointer(boxed.clone()),
            Payload::BySmartHandle(handle) => Payload::BySmartHandle(handle.clone()),
        }
    }
}
