//! Error types for lien
//!
//! Every access violation the containers can detect is a variant of
//! [`LienError`], reported with error codes and suggestions using the
//! `miette` diagnostic library. All failures are immediate and
//! synchronous; none are retryable.

use ecow::EcoString;
use miette::Diagnostic;
use thiserror::Error;

/// Alias for Result with lien errors
pub type LienResult<T> = std::result::Result<T, LienError>;

/// Access violations detected by the ownership containers
///
/// These are programmer-error conditions, not transient faults: the
/// library never retries, corrects, or defers them. Callers that want to
/// avoid them check `is_valid`/`is_some`/`is_ok` before unchecked access.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum LienError {
    // ========================================================================
    // Ownership errors (lien_own_E00xx)
    // ========================================================================
    /// Operation on a value whose payload was transferred out or dropped
    #[error("value has already been moved or dropped")]
    #[diagnostic(
        code(lien_own_E0001),
        help("Check is_valid() before using a value that may have been transferred")
    )]
    Moved,

    /// Drop or transfer attempted while an exclusive loan is outstanding
    #[error("value is still borrowed mutably")]
    #[diagnostic(
        code(lien_own_E0002),
        help("Release the exclusive loan before dropping or transferring the owner")
    )]
    StillBorrowedMutably,

    /// Drop or transfer attempted while shared loans are outstanding
    #[error("value is still borrowed immutably ({count} outstanding)")]
    #[diagnostic(
        code(lien_own_E0003),
        help("Release all shared loans before dropping or transferring the owner")
    )]
    StillBorrowedImmutably { count: u32 },

    // ========================================================================
    // Borrow errors (lien_borrow_E01xx)
    // ========================================================================
    /// Access conflicts with an existing exclusive loan
    #[error("value is already borrowed mutably")]
    #[diagnostic(
        code(lien_borrow_E0101),
        help("Only one exclusive loan may exist at a time, and it excludes shared loans")
    )]
    BorrowedMutably,

    /// Exclusive access conflicts with existing shared loans
    #[error("value is already borrowed immutably ({count} outstanding)")]
    #[diagnostic(
        code(lien_borrow_E0102),
        help("An exclusive loan cannot coexist with shared loans; release them first")
    )]
    BorrowedImmutably { count: u32 },

    // ========================================================================
    // Loan errors (lien_loan_E02xx)
    // ========================================================================
    /// A loan used after its owner was dropped
    #[error("the value this loan points to has already been dropped")]
    #[diagnostic(
        code(lien_loan_E0201),
        help("A loan expires when its owner is disposed; check is_valid() on the loan")
    )]
    Expired,

    /// Mutation attempted through an aliased (smart-handle) payload
    #[error("cannot mutate a payload that is aliased by a smart handle")]
    #[diagnostic(
        code(lien_loan_E0202),
        help("A by_smart_handle payload is shared by construction and is read-only here")
    )]
    SharedMutation,

    // ========================================================================
    // Wrapper errors (lien_opt_E03xx, lien_res_E04xx)
    // ========================================================================
    /// `unwrap` on a None optional
    #[error("optional is None")]
    #[diagnostic(
        code(lien_opt_E0301),
        help("Check is_some() first, or use unwrap_or/unwrap_or_else/unwrap_or_default")
    )]
    NoneValue,

    /// `unwrap` on an Err result
    #[error("result is Err")]
    #[diagnostic(
        code(lien_res_E0401),
        help("Check is_ok() first, or use unwrap_or/unwrap_or_default")
    )]
    ErrValue,

    /// `unwrap_err` on an Ok result
    #[error("result is Ok")]
    #[diagnostic(code(lien_res_E0402), help("Check is_err() before calling unwrap_err"))]
    OkValue,

    /// Free-form message (used by expect/expect_err)
    #[error("{0}")]
    Msg(EcoString),
}

impl From<String> for LienError {
    fn from(msg: String) -> Self {
        LienError::Msg(msg.into())
    }
}

impl<'a> From<&'a str> for LienError {
    fn from(msg: &'a str) -> Self {
        LienError::Msg(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            format!("{}", LienError::Moved),
            "value has already been moved or dropped"
        );
        assert_eq!(
            format!("{}", LienError::StillBorrowedImmutably { count: 2 }),
            "value is still borrowed immutably (2 outstanding)"
        );
        assert_eq!(format!("{}", LienError::Msg("boom".into())), "boom");
    }

    #[test]
    fn test_error_from_str() {
        let err: LienError = "custom".into();
        assert_eq!(err, LienError::Msg("custom".into()));
    }
}
