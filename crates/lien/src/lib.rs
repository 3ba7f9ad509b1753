//! Runtime ownership and borrow tracking
//!
//! lien wraps values in move-only containers that enforce the borrow
//! discipline at runtime: any number of shared loans, or exactly one
//! exclusive loan, never both; using a value after it has been moved or
//! dropped is an error. Violations are never tolerated silently; every
//! one surfaces immediately as a typed [`LienError`].
//!
//! Two modes exist, picked at construction and never mixed per value:
//! [`wrap`] builds a single-threaded [`Val`] with plain counters, and
//! [`wrap_sync`] builds a [`SyncVal`] whose counters are atomic and whose
//! validity teardown is serialized. [`Opt`] and [`Res`] layer Some/None
//! and Ok/Err semantics on top without weakening the rules underneath.
//!
//! ```
//! use lien::{wrap, LienError};
//!
//! let v = wrap(42);
//! let loan = v.borrow_mut().unwrap();
//! loan.write(|n| *n = 43).unwrap();
//! assert_eq!(v.borrow().unwrap_err(), LienError::BorrowedMutably);
//! drop(loan);
//! assert_eq!(v.read(|n| *n).unwrap(), 43);
//! ```

mod error;
pub use error::*;

mod validity;

mod payload;
pub use payload::Shape;

mod hold;
pub use hold::*;

mod val;
pub use val::*;

mod loan;
pub use loan::*;

mod sync;
pub use sync::*;

mod opt;
pub use opt::*;

mod res;
pub use res::*;


use std::sync::atomic::{AtomicBool, Ordering};

/// Global drop strictness
///
/// Off (the default), an owner that goes out of scope while loans are
/// still outstanding force-releases silently and the loans expire. On,
/// such a drop panics instead, so leaks of the discipline are caught in
/// tests.
static STRICT_DROP: AtomicBool = AtomicBool::new(false);

/// Set whether scope-dropping a still-borrowed owner panics
pub fn set_strict_drop(strict: bool) {
    STRICT_DROP.store(strict, Ordering::SeqCst);
}

/// Whether scope-dropping a still-borrowed owner panics
pub fn strict_drop() -> bool {
    STRICT_DROP.load(Ordering::SeqCst)
}
