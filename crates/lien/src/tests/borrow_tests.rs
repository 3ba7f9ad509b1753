//! Borrow discipline tests
//!
//! The conflict matrix: many shared loans, or one exclusive loan, never
//! both, checked at call time with typed errors.

use crate::{wrap, LienError};

/// A fresh owner is valid and unborrowed
#[test]
fn test_fresh_owner_state() {
    let v = wrap(42);
    assert!(v.is_valid());
    assert_eq!(v.shared_count(), 0);
    assert!(!v.is_mut_borrowed());
}

/// Shared loans stack; the count rises and falls monotonically
#[test]
fn test_shared_loans_stack() {
    let v = wrap(1);
    let a = v.borrow().unwrap();
    let b = v.borrow().unwrap();
    let c = v.borrow().unwrap();
    assert_eq!(v.shared_count(), 3);

    drop(b);
    assert_eq!(v.shared_count(), 2);
    drop(a);
    drop(c);
    assert_eq!(v.shared_count(), 0);
}

/// An exclusive loan excludes shared loans, and vice versa
#[test]
fn test_conflict_matrix() {
    let v = wrap(1);

    // shared first: exclusive is refused with the shared count
    let shared = v.borrow().unwrap();
    assert_eq!(
        v.borrow_mut().unwrap_err(),
        LienError::BorrowedImmutably { count: 1 }
    );
    drop(shared);

    // exclusive first: everything else is refused
    let exclusive = v.borrow_mut().unwrap();
    assert_eq!(v.borrow().unwrap_err(), LienError::BorrowedMutably);
    assert_eq!(v.borrow_mut().unwrap_err(), LienError::BorrowedMutably);
    drop(exclusive);

    // both gone: either kind works again
    assert!(v.borrow().is_ok());
}

/// Owner-side access respects outstanding loans
#[test]
fn test_owner_access_under_loans() {
    let v = wrap(String::from("data"));

    let exclusive = v.borrow_mut().unwrap();
    assert_eq!(v.read(|s| s.len()).unwrap_err(), LienError::BorrowedMutably);
    drop(exclusive);

    let shared = v.borrow().unwrap();
    // reading alongside shared loans is fine
    assert_eq!(v.read(|s| s.len()).unwrap(), 4);
    // writing is not
    assert_eq!(
        v.write(|s| s.push('!')).unwrap_err(),
        LienError::BorrowedImmutably { count: 1 }
    );
    drop(shared);
    v.write(|s| s.push('!')).unwrap();
    assert_eq!(v.read(|s| s.clone()).unwrap(), "data!");
}

/// Two owners never interfere with each other's meters
#[test]
fn test_owners_are_independent() {
    let a = wrap(1);
    let b = wrap(2);
    let _loan = a.borrow_mut().unwrap();
    assert!(b.borrow_mut().is_ok());
}

/// Borrowing a moved-out owner reports the move, not a borrow conflict
#[test]
fn test_borrow_after_move() {
    let mut v = wrap(1);
    let _moved = v.transfer().unwrap();
    assert_eq!(v.borrow().unwrap_err(), LienError::Moved);
    assert_eq!(v.borrow_mut().unwrap_err(), LienError::Moved);
}
