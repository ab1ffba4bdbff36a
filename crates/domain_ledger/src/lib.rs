//! Ledger Domain - Multi-Payer Billing Reconciliation
//!
//! This crate implements the financial core of the healthcare platform: an
//! append-only ledger of double-entry transactions and the reconciliation
//! logic that keeps every bill's paid/outstanding balance consistent with
//! the transactions that produced it.
//!
//! # Double-Entry Accounting Principles
//!
//! Every ledger entry moves value between two named accounts:
//! - Debits increase asset/expense accounts
//! - Credits increase liability/equity/revenue accounts
//!
//! # Core Invariants
//!
//! - `paid_amount + remaining_balance == original_amount` for every bill
//! - `insurance_covered + patient_responsibility == original_amount`
//! - Posted transactions are immutable; corrections are new refund or
//!   adjustment entries, never in-place edits
//! - Every bill mutation commits atomically with the ledger entries that
//!   justify it
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_ledger::{ChartOfAccounts, MemoryStore, ReconciliationEngine, SaleRequest};
//!
//! let store = Arc::new(MemoryStore::new());
//! let engine = ReconciliationEngine::new(ChartOfAccounts::standard(), store);
//!
//! let receipt = engine.record_sale(SaleRequest { .. })?;
//! ```

pub mod accounts;
pub mod bill;
pub mod engine;
pub mod error;
pub mod numbering;
pub mod store;
pub mod summary;
pub mod transaction;

pub use accounts::{AccountType, ChartOfAccounts, LedgerAccount};
pub use bill::{Bill, BillStatus, ServiceType};
pub use engine::{
    AdjustmentRequest, LabBillRequest, ReconciliationEngine, RefundRequest, SaleReceipt,
    SaleRequest,
};
pub use error::LedgerError;
pub use numbering::TransactionNumberGenerator;
pub use store::{BillWrite, MemoryStore, ReconciliationStore, StagedCommit};
pub use summary::{FinancialSummary, SummaryReader};
pub use transaction::{
    FinancialTransaction, PaymentMethod, TransactionCategory, TransactionStatus, TransactionType,
};
