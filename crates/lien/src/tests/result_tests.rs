//! Fallible wrapper tests

use crate::{err, ok, sync_err, sync_ok, LienError, Res};

/// The ok(5) scenario: occupancy, unwrap, and the wrong-side failure
#[test]
fn test_ok_scenario() {
    let r = ok::<i32, String>(5);
    assert!(r.is_ok());
    assert!(!r.is_err());
    assert_eq!(r.unwrap().unwrap().read(|n| *n).unwrap(), 5);

    let r = ok::<i32, String>(5);
    assert_eq!(r.unwrap_err().unwrap_err(), LienError::ErrValue);
}

/// Occupancy is exclusive for every constructed result
#[test]
fn test_exclusive_occupancy() {
    let r = ok::<i32, String>(1);
    assert_ne!(r.is_ok(), r.is_err());

    let r = err::<i32, String>("e".to_string());
    assert_ne!(r.is_ok(), r.is_err());
}

/// Side predicates inspect without consuming
#[test]
fn test_side_predicates() {
    let r = ok::<i32, String>(4);
    assert!(r.is_ok_and(|n| n % 2 == 0).unwrap());
    assert!(!r.is_err_and(|_| true).unwrap());

    let r = err::<i32, String>("oops".to_string());
    assert!(r.is_err_and(|e| e.len() == 4).unwrap());
    assert!(!r.is_ok_and(|_| true).unwrap());
}

/// Projections to optionals
#[test]
fn test_projections() {
    let o = ok::<i32, String>(5).ok().unwrap();
    assert!(o.is_some());

    let o = ok::<i32, String>(5).err().unwrap();
    assert!(o.is_none());

    let o = err::<i32, String>("e".to_string()).err().unwrap();
    assert!(o.is_some());
}

/// map transforms Ok and clones an untouched Err through
#[test]
fn test_map_and_map_err() {
    let r = ok::<i32, String>(20);
    let mapped = r.map(|n| n * 2).unwrap();
    assert_eq!(mapped.unwrap().unwrap().read(|n| *n).unwrap(), 40);
    assert!(r.is_ok(), "map leaves the receiver in place");

    let r = err::<i32, String>("kept".to_string());
    let mapped = r.map(|n| n * 2).unwrap();
    assert!(mapped.is_err());
    assert!(r.is_err());

    let remapped = r.map_err(|e| e.len()).unwrap();
    assert_eq!(remapped.unwrap_err().unwrap().read(|n| *n).unwrap(), 4);
}

/// as_ref views the occupied side without consuming the result
#[test]
fn test_as_ref_view() {
    let r = ok::<i32, String>(8);
    let view = r.as_ref().unwrap();
    assert!(view.is_ok());
    let loan_holder = view.unwrap().unwrap();
    assert_eq!(loan_holder.read(|loan| loan.read(|n| *n).unwrap()).unwrap(), 8);

    // the loan blocks exclusive access to the underlying value
    assert_eq!(
        r.as_mut().unwrap_err(),
        LienError::BorrowedImmutably { count: 1 }
    );
    drop(loan_holder);
    assert!(r.is_ok());
}

/// expect carries the caller's message
#[test]
fn test_expect_messages() {
    let r = err::<i32, String>("e".to_string());
    assert_eq!(
        r.expect("wanted ok").unwrap_err(),
        LienError::Msg("wanted ok".into())
    );

    let r = ok::<i32, String>(1);
    assert_eq!(
        r.expect_err("wanted err").unwrap_err(),
        LienError::Msg("wanted err".into())
    );
}

/// A consumed result fails Moved on every operation
#[test]
fn test_consumed_result() {
    let mut r = ok::<i32, String>(1);
    let _moved = r.transfer().unwrap();
    assert!(!r.is_valid());
    assert_eq!(r.as_ref().unwrap_err(), LienError::Moved);
    assert_eq!(r.map(|n| *n).unwrap_err(), LienError::Moved);
    assert_eq!(r.unwrap().unwrap_err(), LienError::Moved);
}

/// The thread-safe constructors build the sync flavor
#[test]
fn test_sync_result() {
    let r = sync_ok::<i32, String>(5);
    assert!(r.is_ok());
    assert_eq!(r.unwrap().unwrap().read(|n| *n).unwrap(), 5);

    let r = sync_err::<i32, String>("e".to_string());
    assert!(r.is_err());
}

/// cloned duplicates whichever side is occupied
#[test]
fn test_cloned() {
    let r: Res<i32, String> = ok(3);
    let copy = r.cloned().unwrap();
    assert!(copy.is_ok());
    assert_eq!(copy.unwrap().unwrap().read(|n| *n).unwrap(), 3);
    assert!(r.is_ok());
}
