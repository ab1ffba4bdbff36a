//! Read-only financial reporting
//!
//! Aggregates the completed ledger rows for a tenant and date range into
//! the totals the dashboards consume. Never writes; tolerates concurrent
//! engine commits and may reflect a recent-but-not-instantaneous snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use core_kernel::{Currency, Money, TenantId};

use crate::error::LedgerError;
use crate::store::ReconciliationStore;
use crate::transaction::{TransactionCategory, TransactionType};

/// Aggregated view of a tenant's completed transactions over a period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub tenant_id: TenantId,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    /// Revenue collected (payments + insurance settlements)
    pub total_revenue: Money,
    /// Money returned to payers
    pub total_refunds: Money,
    /// Correction entries posted in the period
    pub total_adjustments: Money,
    /// Insurer-covered portion of revenue
    pub insurance_payments: Money,
    /// Patient-paid portion of revenue
    pub patient_payments: Money,
    /// Revenue broken down by charge category
    pub revenue_by_category: BTreeMap<TransactionCategory, Money>,
    /// Number of completed revenue-bearing transactions
    pub transaction_count: usize,
}

/// Read-only aggregation over the ledger store
pub struct SummaryReader<S> {
    store: Arc<S>,
    currency: Currency,
}

impl<S: ReconciliationStore> SummaryReader<S> {
    /// Creates a reader reporting in the given currency
    pub fn new(store: Arc<S>, currency: Currency) -> Self {
        Self { store, currency }
    }

    /// Summarizes all completed transactions in the range (inclusive)
    pub fn summarize(
        &self,
        tenant_id: TenantId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<FinancialSummary, LedgerError> {
        let rows = self.store.transactions_in_range(&tenant_id, start, end)?;

        let zero = Money::zero(self.currency);
        let mut summary = FinancialSummary {
            tenant_id,
            period_start: start,
            period_end: end,
            total_revenue: zero,
            total_refunds: zero,
            total_adjustments: zero,
            insurance_payments: zero,
            patient_payments: zero,
            revenue_by_category: BTreeMap::new(),
            transaction_count: 0,
        };

        for row in rows {
            if !row.is_completed() {
                continue;
            }

            match row.transaction_type {
                TransactionType::Payment => {
                    summary.patient_payments = summary.patient_payments.checked_add(&row.amount)?;
                    self.book_revenue(&mut summary, row.category, row.amount)?;
                }
                TransactionType::InsurancePayment => {
                    summary.insurance_payments =
                        summary.insurance_payments.checked_add(&row.amount)?;
                    self.book_revenue(&mut summary, row.category, row.amount)?;
                }
                TransactionType::Refund => {
                    summary.total_refunds = summary.total_refunds.checked_add(&row.amount)?;
                }
                TransactionType::Adjustment => {
                    summary.total_adjustments =
                        summary.total_adjustments.checked_add(&row.amount)?;
                }
            }
        }

        Ok(summary)
    }

    fn book_revenue(
        &self,
        summary: &mut FinancialSummary,
        category: TransactionCategory,
        amount: Money,
    ) -> Result<(), LedgerError> {
        summary.total_revenue = summary.total_revenue.checked_add(&amount)?;
        summary.transaction_count += 1;

        let entry = summary
            .revenue_by_category
            .entry(category)
            .or_insert_with(|| Money::zero(self.currency));
        *entry = entry.checked_add(&amount)?;
        Ok(())
    }
}
