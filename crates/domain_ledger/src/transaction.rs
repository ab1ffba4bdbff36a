//! Financial transaction types
//!
//! A `FinancialTransaction` is one append-only ledger row: a movement of
//! value between a debit account and a credit account, tied back to the
//! bill it settles. Once posted with `Completed` status it is never edited;
//! corrections are new refund or adjustment entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{BillId, Money, PatientId, TenantId, TransactionId};

use crate::accounts::LedgerAccount;

/// Kind of money movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Patient-paid settlement
    Payment,
    /// Insurer-covered settlement
    InsurancePayment,
    /// Money returned to the payer
    Refund,
    /// Explicit auditable correction entry
    Adjustment,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionType::Payment => "payment",
            TransactionType::InsurancePayment => "insurance_payment",
            TransactionType::Refund => "refund",
            TransactionType::Adjustment => "adjustment",
        };
        write!(f, "{}", s)
    }
}

/// Revenue category of the underlying charge
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionCategory {
    PharmacySale,
    HospitalService,
    LabTest,
    Refund,
}

impl TransactionCategory {
    /// Returns true for categories that book revenue
    pub fn is_revenue(&self) -> bool {
        !matches!(self, TransactionCategory::Refund)
    }
}

impl fmt::Display for TransactionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionCategory::PharmacySale => "pharmacy_sale",
            TransactionCategory::HospitalService => "hospital_service",
            TransactionCategory::LabTest => "lab_test",
            TransactionCategory::Refund => "refund",
        };
        write!(f, "{}", s)
    }
}

/// Settlement status of a ledger row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Reversed,
}

/// How the payer settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    Check,
    MobileWallet,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Check => "check",
            PaymentMethod::MobileWallet => "mobile_wallet",
        };
        write!(f, "{}", s)
    }
}

/// An immutable double-entry ledger row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialTransaction {
    /// Unique identifier (time-ordered)
    pub id: TransactionId,
    /// Owning organization
    pub tenant_id: TenantId,
    /// Human-traceable number, unique within the tenant
    pub transaction_number: String,
    /// Kind of money movement
    pub transaction_type: TransactionType,
    /// Revenue category of the underlying charge
    pub category: TransactionCategory,
    /// Amount moved (always non-negative)
    pub amount: Money,
    /// Account debited
    pub debit_account: LedgerAccount,
    /// Account credited
    pub credit_account: LedgerAccount,
    /// Bill this row settles (None only for pure adjustments)
    pub bill_id: Option<BillId>,
    /// Patient the charge belongs to
    pub patient_id: Option<PatientId>,
    /// How the payer settled (None for insurer-side and adjustment rows)
    pub payment_method: Option<PaymentMethod>,
    /// External settlement reference (card authorization, bank ref)
    pub payment_reference: Option<String>,
    /// Description
    pub description: String,
    /// Free-form audit notes
    pub notes: Option<String>,
    /// Settlement status
    pub status: TransactionStatus,
    /// When the financial event occurred
    pub transaction_date: DateTime<Utc>,
    /// When the row was posted to the ledger
    pub posted_date: DateTime<Utc>,
    /// Operator who recorded the event
    pub recorded_by: String,
}

impl FinancialTransaction {
    /// Creates a completed ledger row ready for posting
    ///
    /// The engine only ever posts settled point-of-sale events, so rows are
    /// born `Completed`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tenant_id: TenantId,
        transaction_number: impl Into<String>,
        transaction_type: TransactionType,
        category: TransactionCategory,
        amount: Money,
        debit_account: LedgerAccount,
        credit_account: LedgerAccount,
        description: impl Into<String>,
        recorded_by: impl Into<String>,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: TransactionId::new_v7(),
            tenant_id,
            transaction_number: transaction_number.into(),
            transaction_type,
            category,
            amount,
            debit_account,
            credit_account,
            bill_id: None,
            patient_id: None,
            payment_method: None,
            payment_reference: None,
            description: description.into(),
            notes: None,
            status: TransactionStatus::Completed,
            transaction_date: now,
            posted_date: now,
            recorded_by: recorded_by.into(),
        }
    }

    /// Ties the row to the bill it settles
    pub fn for_bill(mut self, bill_id: BillId) -> Self {
        self.bill_id = Some(bill_id);
        self
    }

    /// Sets the patient
    pub fn with_patient(mut self, patient_id: PatientId) -> Self {
        self.patient_id = Some(patient_id);
        self
    }

    /// Sets the payment method
    pub fn with_payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = Some(method);
        self
    }

    /// Sets the external settlement reference
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.payment_reference = Some(reference.into());
        self
    }

    /// Adds audit notes
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Returns true if the row has settled
    pub fn is_completed(&self) -> bool {
        self.status == TransactionStatus::Completed
    }
}
