//! Reconciliation engine
//!
//! The one write path into the ledger. Each public operation validates its
//! inputs, resolves accounts through the injected chart, stages the full
//! set of writes, and commits them through the store in a single atomic
//! unit. Version conflicts on a bill are retried from a fresh read a
//! bounded number of times; validation failures surface unchanged.

use chrono::{Days, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use core_kernel::{BillId, Money, PatientId, TenantId, TransactionId};

use crate::accounts::{ChartOfAccounts, LedgerAccount};
use crate::bill::{Bill, ServiceType};
use crate::error::LedgerError;
use crate::numbering::TransactionNumberGenerator;
use crate::store::{BillWrite, ReconciliationStore, StagedCommit};
use crate::transaction::{
    FinancialTransaction, PaymentMethod, TransactionCategory, TransactionStatus, TransactionType,
};

/// Attempts per operation before a version conflict is returned to the caller
const COMMIT_RETRIES: usize = 3;

/// Default payment terms when the caller supplies no due date
const DEFAULT_PAYMENT_TERMS_DAYS: u64 = 30;

/// A point-of-sale charge settled in full at recording time
///
/// Covers both pharmacy sales and hospital services; `category` selects
/// which. The insurer/patient split must sum to the total.
#[derive(Debug, Clone)]
pub struct SaleRequest {
    pub tenant_id: TenantId,
    pub patient_id: PatientId,
    pub category: TransactionCategory,
    pub total: Money,
    pub insurance: Money,
    pub patient_due: Money,
    pub payment_method: PaymentMethod,
    pub payment_reference: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub recorded_by: String,
}

/// An unpaid lab charge, settled later by `record_lab_payment`
#[derive(Debug, Clone)]
pub struct LabBillRequest {
    pub tenant_id: TenantId,
    pub patient_id: PatientId,
    pub amount: Money,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub recorded_by: String,
}

/// A refund against a previously collected bill
#[derive(Debug, Clone)]
pub struct RefundRequest {
    pub tenant_id: TenantId,
    pub bill_id: BillId,
    pub patient_id: PatientId,
    pub amount: Money,
    pub reason: String,
    pub payment_method: PaymentMethod,
    pub recorded_by: String,
}

/// An explicit correction entry posted straight to the ledger
///
/// Adjustments never edit a bill's balance; they exist so every correction
/// is itself an auditable ledger row.
#[derive(Debug, Clone)]
pub struct AdjustmentRequest {
    pub tenant_id: TenantId,
    pub bill_id: Option<BillId>,
    pub category: TransactionCategory,
    pub amount: Money,
    pub debit_account: LedgerAccount,
    pub credit_account: LedgerAccount,
    pub description: String,
    pub recorded_by: String,
}

/// What a recorded sale produced
#[derive(Debug, Clone)]
pub struct SaleReceipt {
    pub bill_id: BillId,
    pub bill_number: String,
    pub transaction_ids: Vec<TransactionId>,
}

/// The reconciliation engine
///
/// Constructed with an injected chart of accounts and a shared store.
/// All operations are tenant-scoped and atomic.
pub struct ReconciliationEngine<S> {
    chart: ChartOfAccounts,
    numbers: TransactionNumberGenerator,
    store: Arc<S>,
}

impl<S: ReconciliationStore> ReconciliationEngine<S> {
    /// Creates an engine over the given store
    pub fn new(chart: ChartOfAccounts, store: Arc<S>) -> Self {
        Self {
            chart,
            numbers: TransactionNumberGenerator::new(),
            store,
        }
    }

    /// Records a fully settled point-of-sale charge
    ///
    /// Creates one bill (already `Paid`) plus one or two completed
    /// transactions: an insurance settlement for the insurer-covered
    /// portion (only when that portion is positive) and a patient payment
    /// for the rest. Bill and transactions commit atomically.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::SplitMismatch`] if insurance + patient != total
    /// - [`LedgerError::InvalidPosting`] for non-positive totals, negative
    ///   portions, or a non-revenue category
    /// - [`LedgerError::UnknownAccountMapping`] if the chart has no entry
    ///   for the category/method combination
    pub fn record_sale(&self, request: SaleRequest) -> Result<SaleReceipt, LedgerError> {
        let service_type = ServiceType::for_category(request.category).ok_or_else(|| {
            LedgerError::InvalidPosting(format!(
                "category {} cannot be sold at point of sale",
                request.category
            ))
        })?;

        if !request.total.is_positive() {
            return Err(LedgerError::InvalidPosting(
                "sale total must be positive".to_string(),
            ));
        }
        if request.insurance.is_negative() || request.patient_due.is_negative() {
            return Err(LedgerError::InvalidPosting(
                "payer split portions cannot be negative".to_string(),
            ));
        }

        let split = request.insurance.checked_add(&request.patient_due)?;
        if split != request.total {
            debug!(
                total = %request.total,
                insurance = %request.insurance,
                patient = %request.patient_due,
                "rejecting sale with unbalanced payer split"
            );
            return Err(LedgerError::SplitMismatch {
                total: request.total.amount(),
                insurance: request.insurance.amount(),
                patient: request.patient_due.amount(),
            });
        }

        let today = Utc::now().date_naive();
        let due_date = request.due_date.unwrap_or_else(|| {
            today
                .checked_add_days(Days::new(DEFAULT_PAYMENT_TERMS_DAYS))
                .unwrap_or(today)
        });
        let description = request
            .description
            .unwrap_or_else(|| format!("{} charge", request.category));

        let mut bill = Bill::new(
            request.tenant_id,
            request.patient_id,
            self.numbers.next_bill_number(&request.tenant_id),
            service_type,
            request.total,
            request.insurance,
            request.patient_due,
            due_date,
            today,
            request.recorded_by.clone(),
        )?;

        let mut transactions = Vec::with_capacity(2);

        if request.insurance.is_positive() {
            let (debit, credit) = self.chart.insurance_accounts(request.category)?;
            transactions.push(
                FinancialTransaction::new(
                    request.tenant_id,
                    self.numbers.next_transaction_number(&request.tenant_id),
                    TransactionType::InsurancePayment,
                    request.category,
                    request.insurance,
                    debit,
                    credit,
                    description.clone(),
                    request.recorded_by.clone(),
                )
                .for_bill(bill.id)
                .with_patient(request.patient_id),
            );
        }

        if request.patient_due.is_positive() {
            let (debit, credit) = self
                .chart
                .payment_accounts(request.category, request.payment_method)?;
            let mut txn = FinancialTransaction::new(
                request.tenant_id,
                self.numbers.next_transaction_number(&request.tenant_id),
                TransactionType::Payment,
                request.category,
                request.patient_due,
                debit,
                credit,
                description.clone(),
                request.recorded_by.clone(),
            )
            .for_bill(bill.id)
            .with_patient(request.patient_id)
            .with_payment_method(request.payment_method);
            if let Some(reference) = &request.payment_reference {
                txn = txn.with_reference(reference.clone());
            }
            transactions.push(txn);
        }

        // Point-of-sale charges settle in full at recording time
        bill.apply_payment(request.total, today)?;

        let receipt = SaleReceipt {
            bill_id: bill.id,
            bill_number: bill.bill_number.clone(),
            transaction_ids: transactions.iter().map(|t| t.id).collect(),
        };

        self.store.commit(StagedCommit {
            bill: Some(BillWrite::Create(bill)),
            transactions,
        })?;

        info!(
            tenant_id = %request.tenant_id,
            bill_id = %receipt.bill_id,
            total = %request.total,
            "recorded point-of-sale charge"
        );
        Ok(receipt)
    }

    /// Creates an unpaid lab bill for a completed lab order
    ///
    /// The bill starts `Pending` with the full amount outstanding and no
    /// ledger rows; `record_lab_payment` settles it later.
    pub fn create_lab_bill(&self, request: LabBillRequest) -> Result<BillId, LedgerError> {
        if !request.amount.is_positive() {
            return Err(LedgerError::InvalidPosting(
                "lab bill amount must be positive".to_string(),
            ));
        }

        let today = Utc::now().date_naive();
        let due_date = request.due_date.unwrap_or_else(|| {
            today
                .checked_add_days(Days::new(DEFAULT_PAYMENT_TERMS_DAYS))
                .unwrap_or(today)
        });

        let bill = Bill::new(
            request.tenant_id,
            request.patient_id,
            self.numbers.next_bill_number(&request.tenant_id),
            ServiceType::Lab,
            request.amount,
            Money::zero(request.amount.currency()),
            request.amount,
            due_date,
            today,
            request.recorded_by,
        )?;
        let bill_id = bill.id;

        self.store.commit(StagedCommit {
            bill: Some(BillWrite::Create(bill)),
            transactions: vec![],
        })?;

        info!(tenant_id = %request.tenant_id, bill_id = %bill_id, "created lab bill");
        Ok(bill_id)
    }

    /// Settles an existing lab bill in full
    ///
    /// Posts exactly one payment transaction for the outstanding balance,
    /// crediting lab revenue, and moves the bill to `Paid` in the same
    /// commit.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::BillNotFound`] if the tenant has no such bill
    /// - [`LedgerError::AlreadySettled`] if the bill is already paid
    /// - [`LedgerError::BillCancelled`] if the bill is frozen
    pub fn record_lab_payment(
        &self,
        tenant_id: TenantId,
        bill_id: BillId,
        payment_method: PaymentMethod,
        recorded_by: &str,
    ) -> Result<TransactionId, LedgerError> {
        let mut attempt = 0;
        loop {
            let mut bill = self.load_bill(&tenant_id, &bill_id)?;
            if bill.is_cancelled() {
                return Err(LedgerError::BillCancelled(bill_id.to_string()));
            }
            if bill.is_settled() {
                return Err(LedgerError::AlreadySettled(bill_id.to_string()));
            }

            let amount = bill.remaining_balance;
            let (debit, credit) = self
                .chart
                .payment_accounts(TransactionCategory::LabTest, payment_method)?;

            let expected_version = bill.version;
            let today = Utc::now().date_naive();
            bill.apply_payment(amount, today)?;

            let txn = FinancialTransaction::new(
                tenant_id,
                self.numbers.next_transaction_number(&tenant_id),
                TransactionType::Payment,
                TransactionCategory::LabTest,
                amount,
                debit,
                credit,
                format!("Settlement of lab bill {}", bill.bill_number),
                recorded_by,
            )
            .for_bill(bill_id)
            .with_patient(bill.patient_id)
            .with_payment_method(payment_method);
            let txn_id = txn.id;

            let result = self.store.commit(StagedCommit {
                bill: Some(BillWrite::Update {
                    bill,
                    expected_version,
                }),
                transactions: vec![txn],
            });

            match result {
                Ok(()) => {
                    info!(
                        tenant_id = %tenant_id,
                        bill_id = %bill_id,
                        amount = %amount,
                        "recorded lab bill settlement"
                    );
                    return Ok(txn_id);
                }
                Err(err) if self.should_retry(&err, &mut attempt, &bill_id) => continue,
                Err(err) => return Err(err),
            }
        }
    }

    /// Records a refund against a previously collected bill
    ///
    /// The refund can never exceed what was actually collected net of
    /// prior refunds, computed from the completed ledger rows for the
    /// bill. Posts one refund transaction and moves the bill's balance
    /// back toward outstanding in the same commit.
    pub fn record_refund(&self, request: RefundRequest) -> Result<TransactionId, LedgerError> {
        if !request.amount.is_positive() {
            return Err(LedgerError::InvalidPosting(
                "refund amount must be positive".to_string(),
            ));
        }

        let mut attempt = 0;
        loop {
            let mut bill = self.load_bill(&request.tenant_id, &request.bill_id)?;
            if bill.is_cancelled() {
                return Err(LedgerError::BillCancelled(request.bill_id.to_string()));
            }

            let rows = self
                .store
                .transactions_for_bill(&request.tenant_id, &request.bill_id)?;
            let collected = net_collected(&rows, request.amount.currency())?;
            if request.amount.amount() > collected.amount() {
                debug!(
                    bill_id = %request.bill_id,
                    requested = %request.amount,
                    collected = %collected,
                    "rejecting refund above net collected"
                );
                return Err(LedgerError::RefundExceedsCollected {
                    requested: request.amount.amount(),
                    collectable: collected.amount(),
                });
            }

            let (debit, credit) = self.chart.refund_accounts(request.payment_method)?;
            let expected_version = bill.version;
            let today = Utc::now().date_naive();
            bill.apply_refund(request.amount, today)?;

            let txn = FinancialTransaction::new(
                request.tenant_id,
                self.numbers.next_transaction_number(&request.tenant_id),
                TransactionType::Refund,
                TransactionCategory::Refund,
                request.amount,
                debit,
                credit,
                format!("Refund against bill {}", bill.bill_number),
                request.recorded_by.clone(),
            )
            .for_bill(request.bill_id)
            .with_patient(request.patient_id)
            .with_payment_method(request.payment_method)
            .with_notes(request.reason.clone());
            let txn_id = txn.id;

            let result = self.store.commit(StagedCommit {
                bill: Some(BillWrite::Update {
                    bill,
                    expected_version,
                }),
                transactions: vec![txn],
            });

            match result {
                Ok(()) => {
                    info!(
                        tenant_id = %request.tenant_id,
                        bill_id = %request.bill_id,
                        amount = %request.amount,
                        "recorded refund"
                    );
                    return Ok(txn_id);
                }
                Err(err) if self.should_retry(&err, &mut attempt, &request.bill_id) => continue,
                Err(err) => return Err(err),
            }
        }
    }

    /// Posts an explicit correction entry to the ledger
    ///
    /// Ledger-only: the referenced bill, if any, is validated but never
    /// edited. Corrections to balances go through `record_refund`.
    pub fn record_adjustment(
        &self,
        request: AdjustmentRequest,
    ) -> Result<TransactionId, LedgerError> {
        if !request.amount.is_positive() {
            return Err(LedgerError::InvalidPosting(
                "adjustment amount must be positive".to_string(),
            ));
        }
        if request.debit_account == request.credit_account {
            return Err(LedgerError::InvalidPosting(
                "debit and credit accounts must differ".to_string(),
            ));
        }

        if let Some(bill_id) = &request.bill_id {
            let bill = self.load_bill(&request.tenant_id, bill_id)?;
            if bill.is_cancelled() {
                return Err(LedgerError::BillCancelled(bill_id.to_string()));
            }
        }

        let mut txn = FinancialTransaction::new(
            request.tenant_id,
            self.numbers.next_transaction_number(&request.tenant_id),
            TransactionType::Adjustment,
            request.category,
            request.amount,
            request.debit_account,
            request.credit_account,
            request.description,
            request.recorded_by,
        );
        if let Some(bill_id) = request.bill_id {
            txn = txn.for_bill(bill_id);
        }
        let txn_id = txn.id;

        self.store.commit(StagedCommit {
            bill: None,
            transactions: vec![txn],
        })?;

        info!(tenant_id = %request.tenant_id, transaction_id = %txn_id, "posted adjustment");
        Ok(txn_id)
    }

    /// Administratively cancels a bill, freezing it from further
    /// transactions
    ///
    /// # Errors
    ///
    /// - [`LedgerError::AlreadySettled`] if the bill is fully paid
    /// - [`LedgerError::BillCancelled`] if it is already cancelled
    pub fn cancel_bill(&self, tenant_id: TenantId, bill_id: BillId) -> Result<(), LedgerError> {
        let mut attempt = 0;
        loop {
            let mut bill = self.load_bill(&tenant_id, &bill_id)?;
            if bill.is_cancelled() {
                return Err(LedgerError::BillCancelled(bill_id.to_string()));
            }
            if bill.is_settled() {
                return Err(LedgerError::AlreadySettled(bill_id.to_string()));
            }

            let expected_version = bill.version;
            bill.cancel();

            let result = self.store.commit(StagedCommit {
                bill: Some(BillWrite::Update {
                    bill,
                    expected_version,
                }),
                transactions: vec![],
            });

            match result {
                Ok(()) => {
                    info!(tenant_id = %tenant_id, bill_id = %bill_id, "cancelled bill");
                    return Ok(());
                }
                Err(err) if self.should_retry(&err, &mut attempt, &bill_id) => continue,
                Err(err) => return Err(err),
            }
        }
    }

    /// Looks up a bill by id
    pub fn bill(&self, tenant_id: &TenantId, id: &BillId) -> Result<Option<Bill>, LedgerError> {
        self.store.bill(tenant_id, id)
    }

    /// Looks up a ledger row by id
    pub fn transaction(
        &self,
        tenant_id: &TenantId,
        id: &TransactionId,
    ) -> Result<Option<FinancialTransaction>, LedgerError> {
        self.store.transaction(tenant_id, id)
    }

    /// Returns all ledger rows referencing a bill
    pub fn transactions_for_bill(
        &self,
        tenant_id: &TenantId,
        bill_id: &BillId,
    ) -> Result<Vec<FinancialTransaction>, LedgerError> {
        self.store.transactions_for_bill(tenant_id, bill_id)
    }

    fn load_bill(&self, tenant_id: &TenantId, bill_id: &BillId) -> Result<Bill, LedgerError> {
        self.store
            .bill(tenant_id, bill_id)?
            .ok_or_else(|| LedgerError::BillNotFound(bill_id.to_string()))
    }

    fn should_retry(&self, err: &LedgerError, attempt: &mut usize, bill_id: &BillId) -> bool {
        if matches!(err, LedgerError::WriteConflict(_)) && *attempt + 1 < COMMIT_RETRIES {
            *attempt += 1;
            warn!(
                bill_id = %bill_id,
                attempt = *attempt,
                "write conflict, retrying from fresh read"
            );
            true
        } else {
            false
        }
    }
}

/// Sums what was actually collected for a bill, net of refunds
///
/// Only `Completed` rows count: payments and insurance settlements add,
/// refunds subtract, adjustments are ledger-only and ignored.
fn net_collected(
    rows: &[FinancialTransaction],
    currency: core_kernel::Currency,
) -> Result<Money, LedgerError> {
    let mut collected = Money::zero(currency);
    for row in rows {
        if row.status != TransactionStatus::Completed {
            continue;
        }
        collected = match row.transaction_type {
            TransactionType::Payment | TransactionType::InsurancePayment => {
                collected.checked_add(&row.amount)?
            }
            TransactionType::Refund => collected.checked_sub(&row.amount)?,
            TransactionType::Adjustment => collected,
        };
    }
    Ok(collected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    fn usd(amount: rust_decimal::Decimal) -> Money {
        Money::new(amount, Currency::USD)
    }

    fn engine() -> ReconciliationEngine<MemoryStore> {
        ReconciliationEngine::new(ChartOfAccounts::standard(), Arc::new(MemoryStore::new()))
    }

    fn sale(tenant_id: TenantId, total: Money, insurance: Money, patient: Money) -> SaleRequest {
        SaleRequest {
            tenant_id,
            patient_id: PatientId::new(),
            category: TransactionCategory::PharmacySale,
            total,
            insurance,
            patient_due: patient,
            payment_method: PaymentMethod::Cash,
            payment_reference: None,
            description: None,
            due_date: None,
            recorded_by: "till-1".to_string(),
        }
    }

    #[test]
    fn test_split_mismatch_rejected_before_any_write() {
        let engine = engine();
        let tenant_id = TenantId::new();

        let result = engine.record_sale(sale(
            tenant_id,
            usd(dec!(100.00)),
            usd(dec!(90.00)),
            usd(dec!(15.00)),
        ));

        assert!(matches!(result, Err(LedgerError::SplitMismatch { .. })));
    }

    #[test]
    fn test_refund_category_sale_rejected() {
        let engine = engine();
        let mut request = sale(
            TenantId::new(),
            usd(dec!(10.00)),
            usd(dec!(0)),
            usd(dec!(10.00)),
        );
        request.category = TransactionCategory::Refund;

        assert!(matches!(
            engine.record_sale(request),
            Err(LedgerError::InvalidPosting(_))
        ));
    }

    #[test]
    fn test_net_collected_subtracts_refunds() {
        let tenant_id = TenantId::new();
        let bill_id = BillId::new();
        let payment = FinancialTransaction::new(
            tenant_id,
            "TXN-1",
            TransactionType::Payment,
            TransactionCategory::PharmacySale,
            usd(dec!(100.00)),
            LedgerAccount::Cash,
            LedgerAccount::PharmacyRevenue,
            "sale",
            "till-1",
        )
        .for_bill(bill_id);
        let refund = FinancialTransaction::new(
            tenant_id,
            "TXN-2",
            TransactionType::Refund,
            TransactionCategory::Refund,
            usd(dec!(30.00)),
            LedgerAccount::RefundExpense,
            LedgerAccount::Cash,
            "refund",
            "till-1",
        )
        .for_bill(bill_id);

        let net = net_collected(&[payment, refund], Currency::USD).unwrap();
        assert_eq!(net, usd(dec!(70.00)));
    }

    #[test]
    fn test_adjustment_with_equal_accounts_rejected() {
        let engine = engine();
        let result = engine.record_adjustment(AdjustmentRequest {
            tenant_id: TenantId::new(),
            bill_id: None,
            category: TransactionCategory::HospitalService,
            amount: usd(dec!(5.00)),
            debit_account: LedgerAccount::Cash,
            credit_account: LedgerAccount::Cash,
            description: "bad".to_string(),
            recorded_by: "audit".to_string(),
        });

        assert!(matches!(result, Err(LedgerError::InvalidPosting(_))));
    }
}
