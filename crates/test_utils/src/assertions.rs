//! Custom assertion helpers for ledger invariants

use core_kernel::Money;
use domain_ledger::{Bill, FinancialTransaction, TransactionType};

/// Asserts both balance identities on a bill
///
/// `paid + remaining == original` and `insurance + patient == original`.
pub fn assert_bill_conserved(bill: &Bill) {
    assert!(
        bill.is_conserved(),
        "bill {} violates balance conservation: original={} paid={} remaining={} insurance={} patient={}",
        bill.id,
        bill.original_amount,
        bill.paid_amount,
        bill.remaining_balance,
        bill.insurance_covered,
        bill.patient_responsibility,
    );
}

/// Asserts that a bill's paid amount is traceable to its ledger rows
///
/// The sum of completed payments and insurance settlements minus completed
/// refunds must equal `paid_amount`.
pub fn assert_ledger_traceable(bill: &Bill, rows: &[FinancialTransaction]) {
    let mut net = Money::zero(bill.original_amount.currency());
    for row in rows.iter().filter(|r| r.is_completed()) {
        net = match row.transaction_type {
            TransactionType::Payment | TransactionType::InsurancePayment => {
                net.checked_add(&row.amount).expect("currency mismatch")
            }
            TransactionType::Refund => net.checked_sub(&row.amount).expect("currency mismatch"),
            TransactionType::Adjustment => net,
        };
    }

    assert_eq!(
        net, bill.paid_amount,
        "bill {} paid amount {} is not traceable to its ledger rows (net collected {})",
        bill.id, bill.paid_amount, net,
    );
}
