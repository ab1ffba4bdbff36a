//! Ledger domain errors

use core_kernel::MoneyError;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur in the ledger domain
///
/// Validation failures are permanent: retrying with the same inputs will
/// fail again, and the caller should surface the exact kind to the user.
/// `WriteConflict` and `StoreUnavailable` are transient and safe to retry
/// with identical inputs, because nothing is written until the final
/// atomic commit.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// No debit/credit account pair is registered for this combination
    #[error("No account mapping for category {category} with payment method {method}")]
    UnknownAccountMapping { category: String, method: String },

    /// Insurance portion plus patient portion does not equal the total
    #[error("Payer split does not balance: insurance {insurance} + patient {patient} != total {total}")]
    SplitMismatch {
        total: Decimal,
        insurance: Decimal,
        patient: Decimal,
    },

    /// Posting rejected before reaching the store
    #[error("Invalid posting: {0}")]
    InvalidPosting(String),

    /// Bill not found for this tenant
    #[error("Bill not found: {0}")]
    BillNotFound(String),

    /// Bill is cancelled and frozen from further transactions
    #[error("Bill is cancelled: {0}")]
    BillCancelled(String),

    /// Bill is already fully settled
    #[error("Bill already settled: {0}")]
    AlreadySettled(String),

    /// Refund would exceed the amount actually collected
    #[error("Refund of {requested} exceeds net collected amount {collectable}")]
    RefundExceedsCollected {
        requested: Decimal,
        collectable: Decimal,
    },

    /// Concurrent update detected; the operation may be retried
    #[error("Write conflict: {0}")]
    WriteConflict(String),

    /// The underlying store is temporarily unavailable
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Monetary arithmetic failure (currency mismatch)
    #[error("Money error: {0}")]
    Money(#[from] MoneyError),
}

impl LedgerError {
    /// Returns true when the caller may safely retry with the same inputs
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LedgerError::WriteConflict(_) | LedgerError::StoreUnavailable(_)
        )
    }
}
