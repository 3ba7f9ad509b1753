//! Move semantics tests
//!
//! A native Rust move needs no bookkeeping; the explicit `transfer`
//! poisons its source so later use is caught. Either way the payload is
//! relocated, not destroyed, and a borrowed value refuses to move at all.

use crate::{wrap, Hold, LienError, LoanKind};

/// A native move is just Rust ownership; the destination works
#[test]
fn test_native_move() {
    let a = wrap(String::from("payload"));
    let b = a;
    assert!(b.is_valid());
    assert_eq!(b.read(String::clone).unwrap(), "payload");
}

/// An explicit transfer empties the source and poisons it
#[test]
fn test_explicit_transfer() {
    let mut a = wrap(7);
    let b = a.transfer().unwrap();

    assert!(!a.is_valid());
    assert!(b.is_valid());
    assert_eq!(a.read(|n| *n).unwrap_err(), LienError::Moved);
    assert_eq!(a.transfer().unwrap_err(), LienError::Moved);
    assert_eq!(b.read(|n| *n).unwrap(), 7);
}

/// Transfer is refused while loans are outstanding, like dispose
#[test]
fn test_transfer_refused_while_borrowed() {
    let mut v = wrap(1);

    let shared = v.borrow().unwrap();
    assert_eq!(
        v.transfer().unwrap_err(),
        LienError::StillBorrowedImmutably { count: 1 }
    );
    drop(shared);

    let exclusive = v.borrow_mut().unwrap();
    assert_eq!(v.transfer().unwrap_err(), LienError::StillBorrowedMutably);
    drop(exclusive);

    assert!(v.transfer().is_ok());
}

/// The transferred owner carries the same meter and validity slot
#[test]
fn test_transfer_carries_state() {
    let mut a = wrap(10);
    let b = a.transfer().unwrap();

    let loan = b.borrow().unwrap();
    assert_eq!(b.shared_count(), 1);
    assert_eq!(loan.kind(), LoanKind::Shared);
    assert_eq!(loan.read(|n| *n).unwrap(), 10);
}

/// Loan transfer hands the release obligation over
#[test]
fn test_loan_transfer() {
    let v = wrap(1);
    let mut original = v.borrow_mut().unwrap();
    let moved = original.transfer();

    assert!(!original.is_valid());
    assert!(moved.is_valid());
    assert!(v.is_mut_borrowed());

    drop(original);
    assert!(v.is_mut_borrowed(), "neutered loan releases nothing");
    drop(moved);
    assert!(!v.is_mut_borrowed());
}

/// Transferring a neutered loan yields another neutered loan
#[test]
fn test_transfer_neutered_loan() {
    let v = wrap(1);
    let mut loan = v.borrow().unwrap();
    let mut moved = loan.transfer();
    moved.release();

    let ghost = moved.transfer();
    assert!(!ghost.is_valid());
    assert_eq!(v.shared_count(), 0);
}

/// The Hold trait exposes the same transfer discipline generically
#[test]
fn test_transfer_through_trait() {
    fn relocate<H: Hold>(holder: &mut H) -> crate::LienResult<H> {
        holder.transfer()
    }

    let mut v = wrap(3);
    let moved = relocate(&mut v).unwrap();
    assert!(!v.is_valid());
    assert_eq!(moved.read(|n| *n).unwrap(), 3);
}
