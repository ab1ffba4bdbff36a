//! Chart of accounts
//!
//! Fixed registry mapping transaction categories and payment methods to
//! named ledger accounts. The chart is built once and injected into the
//! reconciliation engine, so the sale, lab, and refund paths can never
//! drift apart in which accounts they post to.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::LedgerError;
use crate::transaction::{PaymentMethod, TransactionCategory};

/// Classification of accounts for double-entry bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountType {
    /// Asset accounts (debit normal balance)
    Asset,
    /// Liability accounts (credit normal balance)
    Liability,
    /// Revenue accounts (credit normal balance)
    Revenue,
    /// Expense accounts (debit normal balance)
    Expense,
}

impl AccountType {
    /// Returns true if this account type has a debit normal balance
    pub fn is_debit_normal(&self) -> bool {
        matches!(self, AccountType::Asset | AccountType::Expense)
    }
}

/// The ledger buckets value can move between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerAccount {
    /// Till cash
    Cash,
    /// Bank settlement account (card, transfer, check, wallet)
    Bank,
    /// Amounts owed by insurers
    InsuranceReceivable,
    /// Pharmacy sales revenue
    PharmacyRevenue,
    /// Hospital services revenue
    HospitalRevenue,
    /// Lab test revenue
    LabRevenue,
    /// Refunds paid out
    RefundExpense,
}

impl LedgerAccount {
    /// Returns the account code
    pub fn code(&self) -> &'static str {
        match self {
            LedgerAccount::Cash => "1000",
            LedgerAccount::Bank => "1010",
            LedgerAccount::InsuranceReceivable => "1100",
            LedgerAccount::PharmacyRevenue => "4000",
            LedgerAccount::HospitalRevenue => "4100",
            LedgerAccount::LabRevenue => "4200",
            LedgerAccount::RefundExpense => "5000",
        }
    }

    /// Returns the display name
    pub fn name(&self) -> &'static str {
        match self {
            LedgerAccount::Cash => "Cash",
            LedgerAccount::Bank => "Bank",
            LedgerAccount::InsuranceReceivable => "Insurance Receivable",
            LedgerAccount::PharmacyRevenue => "Pharmacy Revenue",
            LedgerAccount::HospitalRevenue => "Hospital Revenue",
            LedgerAccount::LabRevenue => "Lab Revenue",
            LedgerAccount::RefundExpense => "Refund Expense",
        }
    }

    /// Returns the account classification
    pub fn account_type(&self) -> AccountType {
        match self {
            LedgerAccount::Cash | LedgerAccount::Bank | LedgerAccount::InsuranceReceivable => {
                AccountType::Asset
            }
            LedgerAccount::PharmacyRevenue
            | LedgerAccount::HospitalRevenue
            | LedgerAccount::LabRevenue => AccountType::Revenue,
            LedgerAccount::RefundExpense => AccountType::Expense,
        }
    }
}

/// Versioned account configuration injected into the reconciliation engine
///
/// All account resolution is pure lookup; unknown combinations fail with
/// [`LedgerError::UnknownAccountMapping`].
#[derive(Debug, Clone)]
pub struct ChartOfAccounts {
    version: u32,
    revenue: HashMap<TransactionCategory, LedgerAccount>,
    settlement: HashMap<PaymentMethod, LedgerAccount>,
    receivable: LedgerAccount,
    refund_expense: LedgerAccount,
}

impl ChartOfAccounts {
    /// Creates the standard chart for the healthcare platform
    pub fn standard() -> Self {
        let mut revenue = HashMap::new();
        revenue.insert(TransactionCategory::PharmacySale, LedgerAccount::PharmacyRevenue);
        revenue.insert(TransactionCategory::HospitalService, LedgerAccount::HospitalRevenue);
        revenue.insert(TransactionCategory::LabTest, LedgerAccount::LabRevenue);

        let mut settlement = HashMap::new();
        settlement.insert(PaymentMethod::Cash, LedgerAccount::Cash);
        settlement.insert(PaymentMethod::Card, LedgerAccount::Bank);
        settlement.insert(PaymentMethod::BankTransfer, LedgerAccount::Bank);
        settlement.insert(PaymentMethod::Check, LedgerAccount::Bank);
        settlement.insert(PaymentMethod::MobileWallet, LedgerAccount::Bank);

        Self {
            version: 1,
            revenue,
            settlement,
            receivable: LedgerAccount::InsuranceReceivable,
            refund_expense: LedgerAccount::RefundExpense,
        }
    }

    /// Returns the chart version
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Resolves the (debit, credit) pair for a patient-paid settlement
    ///
    /// Debits cash-or-bank selected by the payment method, credits the
    /// category's revenue account.
    pub fn payment_accounts(
        &self,
        category: TransactionCategory,
        method: PaymentMethod,
    ) -> Result<(LedgerAccount, LedgerAccount), LedgerError> {
        let debit = self.settlement_account(method)?;
        let credit = self.revenue_account(category)?;
        Ok((debit, credit))
    }

    /// Resolves the (debit, credit) pair for an insurer-covered settlement
    ///
    /// Debits the insurance receivable, credits the category's revenue
    /// account.
    pub fn insurance_accounts(
        &self,
        category: TransactionCategory,
    ) -> Result<(LedgerAccount, LedgerAccount), LedgerError> {
        let credit = self.revenue_account(category)?;
        Ok((self.receivable, credit))
    }

    /// Resolves the (debit, credit) pair for a refund
    ///
    /// Debits the refund expense, credits cash-or-bank selected by the
    /// payment method.
    pub fn refund_accounts(
        &self,
        method: PaymentMethod,
    ) -> Result<(LedgerAccount, LedgerAccount), LedgerError> {
        let credit = self.settlement_account(method)?;
        Ok((self.refund_expense, credit))
    }

    fn revenue_account(&self, category: TransactionCategory) -> Result<LedgerAccount, LedgerError> {
        self.revenue
            .get(&category)
            .copied()
            .ok_or_else(|| LedgerError::UnknownAccountMapping {
                category: category.to_string(),
                method: "any".to_string(),
            })
    }

    fn settlement_account(&self, method: PaymentMethod) -> Result<LedgerAccount, LedgerError> {
        self.settlement
            .get(&method)
            .copied()
            .ok_or_else(|| LedgerError::UnknownAccountMapping {
                category: "any".to_string(),
                method: method.to_string(),
            })
    }
}
