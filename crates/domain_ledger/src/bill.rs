//! Bill aggregate
//!
//! A `Bill` is the running paid/outstanding state of one billable charge.
//! Its balance fields are derived from the ledger and are only mutated by
//! the reconciliation engine, inside the same atomic commit as the
//! transactions that justify the change.
//!
//! # Invariants
//!
//! - `paid_amount + remaining_balance == original_amount` at all times
//! - `insurance_covered + patient_responsibility == original_amount`
//! - Bills are never deleted; cancellation is a status transition

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{BillId, Money, PatientId, TenantId};

use crate::error::LedgerError;
use crate::transaction::TransactionCategory;

/// Which service line generated the charge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Pharmacy,
    Hospital,
    Lab,
}

impl ServiceType {
    /// Maps a revenue category to its service line
    pub fn for_category(category: TransactionCategory) -> Option<ServiceType> {
        match category {
            TransactionCategory::PharmacySale => Some(ServiceType::Pharmacy),
            TransactionCategory::HospitalService => Some(ServiceType::Hospital),
            TransactionCategory::LabTest => Some(ServiceType::Lab),
            TransactionCategory::Refund => None,
        }
    }
}

/// Settlement state of a bill
///
/// Status is a pure function of the balance fields, the due date, and the
/// current date; it is recomputed on every write and never drifts from its
/// inputs. `Cancelled` is the one administrative exception: once set it
/// freezes the bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillStatus {
    Pending,
    Partial,
    Paid,
    Overdue,
    Cancelled,
}

impl BillStatus {
    /// Derives the status from the raw balance fields
    pub fn derive(
        paid_amount: Money,
        remaining_balance: Money,
        due_date: NaiveDate,
        today: NaiveDate,
    ) -> BillStatus {
        if !remaining_balance.is_positive() {
            BillStatus::Paid
        } else if today > due_date {
            BillStatus::Overdue
        } else if paid_amount.is_positive() {
            BillStatus::Partial
        } else {
            BillStatus::Pending
        }
    }
}

/// A billable charge and its running paid/outstanding state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bill {
    /// Unique identifier (time-ordered)
    pub id: BillId,
    /// Owning organization
    pub tenant_id: TenantId,
    /// Patient the charge belongs to
    pub patient_id: PatientId,
    /// Human-traceable number, unique within the tenant
    pub bill_number: String,
    /// Which service line generated the charge
    pub service_type: ServiceType,
    /// Total charge, fixed at creation
    pub original_amount: Money,
    /// Insurer-covered portion of the original amount
    pub insurance_covered: Money,
    /// Patient-owed portion of the original amount
    pub patient_responsibility: Money,
    /// Amount collected so far, net of refunds
    pub paid_amount: Money,
    /// Amount still outstanding
    pub remaining_balance: Money,
    /// Settlement state, recomputed on every write
    pub status: BillStatus,
    /// Payment due date
    pub due_date: NaiveDate,
    /// Date the service was rendered
    pub service_date: NaiveDate,
    /// Late fees added to the bill
    pub late_fees_applied: Money,
    /// Operator who generated the bill
    pub generated_by: String,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
    /// Optimistic-concurrency counter, bumped by the store on commit
    pub version: u64,
}

impl Bill {
    /// Creates a new unpaid bill
    ///
    /// # Errors
    ///
    /// - [`LedgerError::SplitMismatch`] if the insurer/patient split does
    ///   not sum to the original amount
    /// - [`LedgerError::InvalidPosting`] if any portion is negative
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tenant_id: TenantId,
        patient_id: PatientId,
        bill_number: impl Into<String>,
        service_type: ServiceType,
        original_amount: Money,
        insurance_covered: Money,
        patient_responsibility: Money,
        due_date: NaiveDate,
        service_date: NaiveDate,
        generated_by: impl Into<String>,
    ) -> Result<Self, LedgerError> {
        if insurance_covered.is_negative() || patient_responsibility.is_negative() {
            return Err(LedgerError::InvalidPosting(
                "payer split portions cannot be negative".to_string(),
            ));
        }

        let split = insurance_covered.checked_add(&patient_responsibility)?;
        if split != original_amount {
            return Err(LedgerError::SplitMismatch {
                total: original_amount.amount(),
                insurance: insurance_covered.amount(),
                patient: patient_responsibility.amount(),
            });
        }

        let now = Utc::now();
        let currency = original_amount.currency();
        let paid = Money::zero(currency);

        Ok(Self {
            id: BillId::new_v7(),
            tenant_id,
            patient_id,
            bill_number: bill_number.into(),
            service_type,
            original_amount,
            insurance_covered,
            patient_responsibility,
            paid_amount: paid,
            remaining_balance: original_amount,
            status: BillStatus::derive(paid, original_amount, due_date, now.date_naive()),
            due_date,
            service_date,
            late_fees_applied: Money::zero(currency),
            generated_by: generated_by.into(),
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }

    /// Returns true if the bill is frozen from further transactions
    pub fn is_cancelled(&self) -> bool {
        self.status == BillStatus::Cancelled
    }

    /// Returns true if the bill is fully settled
    pub fn is_settled(&self) -> bool {
        self.status == BillStatus::Paid
    }

    /// Applies a collected payment to the balance
    ///
    /// # Errors
    ///
    /// - [`LedgerError::BillCancelled`] if the bill is frozen
    /// - [`LedgerError::InvalidPosting`] for non-positive amounts or
    ///   payments above the outstanding balance
    pub fn apply_payment(&mut self, amount: Money, today: NaiveDate) -> Result<(), LedgerError> {
        if self.is_cancelled() {
            return Err(LedgerError::BillCancelled(self.id.to_string()));
        }
        if !amount.is_positive() {
            return Err(LedgerError::InvalidPosting(
                "payment amount must be positive".to_string(),
            ));
        }
        if amount.amount() > self.remaining_balance.amount() {
            return Err(LedgerError::InvalidPosting(format!(
                "payment {} exceeds outstanding balance {}",
                amount, self.remaining_balance
            )));
        }

        self.paid_amount = self.paid_amount.checked_add(&amount)?;
        self.remaining_balance = self.remaining_balance.checked_sub(&amount)?;
        self.refresh(today);
        Ok(())
    }

    /// Applies a refund, moving the balance back toward outstanding
    ///
    /// # Errors
    ///
    /// - [`LedgerError::BillCancelled`] if the bill is frozen
    /// - [`LedgerError::RefundExceedsCollected`] if the refund exceeds the
    ///   amount collected on this bill
    pub fn apply_refund(&mut self, amount: Money, today: NaiveDate) -> Result<(), LedgerError> {
        if self.is_cancelled() {
            return Err(LedgerError::BillCancelled(self.id.to_string()));
        }
        if !amount.is_positive() {
            return Err(LedgerError::InvalidPosting(
                "refund amount must be positive".to_string(),
            ));
        }
        if amount.amount() > self.paid_amount.amount() {
            return Err(LedgerError::RefundExceedsCollected {
                requested: amount.amount(),
                collectable: self.paid_amount.amount(),
            });
        }

        self.paid_amount = self.paid_amount.checked_sub(&amount)?;
        self.remaining_balance = self.remaining_balance.checked_add(&amount)?;
        self.refresh(today);
        Ok(())
    }

    /// Freezes the bill; history is preserved, further transactions fail
    pub fn cancel(&mut self) {
        self.status = BillStatus::Cancelled;
        self.updated_at = Utc::now();
    }

    /// Returns true when the balance identities hold
    pub fn is_conserved(&self) -> bool {
        let balance_ok = self
            .paid_amount
            .checked_add(&self.remaining_balance)
            .map(|sum| sum == self.original_amount)
            .unwrap_or(false);
        let split_ok = self
            .insurance_covered
            .checked_add(&self.patient_responsibility)
            .map(|sum| sum == self.original_amount)
            .unwrap_or(false);
        balance_ok && split_ok
    }

    fn refresh(&mut self, today: NaiveDate) {
        self.status = BillStatus::derive(
            self.paid_amount,
            self.remaining_balance,
            self.due_date,
            today,
        );
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    fn usd(amount: rust_decimal::Decimal) -> Money {
        Money::new(amount, Currency::USD)
    }

    fn sample_bill() -> Bill {
        let today = Utc::now().date_naive();
        Bill::new(
            TenantId::new(),
            PatientId::new(),
            "BILL-0000000000001-deadbeef-0A0B0C",
            ServiceType::Hospital,
            usd(dec!(100.00)),
            usd(dec!(85.00)),
            usd(dec!(15.00)),
            today + chrono::Days::new(30),
            today,
            "front-desk",
        )
        .unwrap()
    }

    #[test]
    fn test_new_bill_is_pending_and_conserved() {
        let bill = sample_bill();
        assert_eq!(bill.status, BillStatus::Pending);
        assert_eq!(bill.paid_amount, usd(dec!(0)));
        assert_eq!(bill.remaining_balance, usd(dec!(100.00)));
        assert!(bill.is_conserved());
    }

    #[test]
    fn test_split_mismatch_rejected() {
        let today = Utc::now().date_naive();
        let result = Bill::new(
            TenantId::new(),
            PatientId::new(),
            "BILL-1",
            ServiceType::Pharmacy,
            usd(dec!(100.00)),
            usd(dec!(90.00)),
            usd(dec!(15.00)),
            today,
            today,
            "till-1",
        );

        assert!(matches!(result, Err(LedgerError::SplitMismatch { .. })));
    }

    #[test]
    fn test_negative_split_portion_rejected() {
        let today = Utc::now().date_naive();
        let result = Bill::new(
            TenantId::new(),
            PatientId::new(),
            "BILL-2",
            ServiceType::Pharmacy,
            usd(dec!(100.00)),
            usd(dec!(110.00)),
            usd(dec!(-10.00)),
            today,
            today,
            "till-1",
        );

        assert!(matches!(result, Err(LedgerError::InvalidPosting(_))));
    }

    #[test]
    fn test_full_payment_settles_bill() {
        let mut bill = sample_bill();
        let today = Utc::now().date_naive();

        bill.apply_payment(usd(dec!(100.00)), today).unwrap();

        assert_eq!(bill.status, BillStatus::Paid);
        assert_eq!(bill.remaining_balance, usd(dec!(0)));
        assert!(bill.is_conserved());
    }

    #[test]
    fn test_refund_reopens_bill_as_partial() {
        let mut bill = sample_bill();
        let today = Utc::now().date_naive();

        bill.apply_payment(usd(dec!(100.00)), today).unwrap();
        bill.apply_refund(usd(dec!(20.00)), today).unwrap();

        assert_eq!(bill.paid_amount, usd(dec!(80.00)));
        assert_eq!(bill.remaining_balance, usd(dec!(20.00)));
        assert_eq!(bill.status, BillStatus::Partial);
        assert!(bill.is_conserved());
    }

    #[test]
    fn test_refund_above_paid_rejected() {
        let mut bill = sample_bill();
        let today = Utc::now().date_naive();

        bill.apply_payment(usd(dec!(100.00)), today).unwrap();
        let result = bill.apply_refund(usd(dec!(150.00)), today);

        assert!(matches!(
            result,
            Err(LedgerError::RefundExceedsCollected { .. })
        ));
        assert_eq!(bill.paid_amount, usd(dec!(100.00)));
    }

    #[test]
    fn test_overpayment_rejected() {
        let mut bill = sample_bill();
        let today = Utc::now().date_naive();

        let result = bill.apply_payment(usd(dec!(150.00)), today);
        assert!(matches!(result, Err(LedgerError::InvalidPosting(_))));
    }

    #[test]
    fn test_cancelled_bill_is_frozen() {
        let mut bill = sample_bill();
        let today = Utc::now().date_naive();

        bill.cancel();

        assert!(matches!(
            bill.apply_payment(usd(dec!(10.00)), today),
            Err(LedgerError::BillCancelled(_))
        ));
        assert!(matches!(
            bill.apply_refund(usd(dec!(10.00)), today),
            Err(LedgerError::BillCancelled(_))
        ));
    }

    #[test]
    fn test_status_derivation_overdue() {
        let due = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
        let after = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let on_time = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();

        let status = BillStatus::derive(usd(dec!(0)), usd(dec!(50.00)), due, after);
        assert_eq!(status, BillStatus::Overdue);

        let status = BillStatus::derive(usd(dec!(0)), usd(dec!(50.00)), due, on_time);
        assert_eq!(status, BillStatus::Pending);

        let status = BillStatus::derive(usd(dec!(25.00)), usd(dec!(25.00)), due, on_time);
        assert_eq!(status, BillStatus::Partial);

        let status = BillStatus::derive(usd(dec!(50.00)), usd(dec!(0)), due, after);
        assert_eq!(status, BillStatus::Paid);
    }
}
