//! Store abstraction and in-memory implementation
//!
//! Two logical tables back the subsystem: `financial_transactions`
//! (append-only) and `bills` (mutable aggregates). Every engine operation
//! stages its full set of writes and commits them through a single
//! [`ReconciliationStore::commit`] call, so a reader never observes a bill
//! without its backing transactions or vice versa.
//!
//! Bill writes are serialized per bill with an optimistic version check;
//! a stale version fails with [`LedgerError::WriteConflict`] and the caller
//! retries from a fresh read. Different bills never conflict.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::info;

use core_kernel::{BillId, TenantId, TransactionId};

use crate::bill::Bill;
use crate::error::LedgerError;
use crate::transaction::FinancialTransaction;

/// A bill write staged for atomic commit
#[derive(Debug, Clone)]
pub enum BillWrite {
    /// Insert a newly created bill
    Create(Bill),
    /// Replace an existing bill, guarded by its version at read time
    Update { bill: Bill, expected_version: u64 },
}

/// The full set of writes for one engine operation
///
/// Either everything in the staged commit becomes visible or nothing does.
#[derive(Debug, Clone)]
pub struct StagedCommit {
    /// Bill create/update, if the operation touches a bill
    pub bill: Option<BillWrite>,
    /// Ledger rows to append
    pub transactions: Vec<FinancialTransaction>,
}

/// Persistence seam for the reconciliation engine
///
/// Reads return snapshots; `commit` is the only write entry point. A SQL
/// adapter would implement this trait with a database transaction.
pub trait ReconciliationStore: Send + Sync {
    /// Loads a bill by id, scoped to the tenant
    fn bill(&self, tenant_id: &TenantId, id: &BillId) -> Result<Option<Bill>, LedgerError>;

    /// Loads a bill by its human-traceable number
    fn bill_by_number(
        &self,
        tenant_id: &TenantId,
        bill_number: &str,
    ) -> Result<Option<Bill>, LedgerError>;

    /// Loads a single ledger row
    fn transaction(
        &self,
        tenant_id: &TenantId,
        id: &TransactionId,
    ) -> Result<Option<FinancialTransaction>, LedgerError>;

    /// Returns all ledger rows referencing a bill
    fn transactions_for_bill(
        &self,
        tenant_id: &TenantId,
        bill_id: &BillId,
    ) -> Result<Vec<FinancialTransaction>, LedgerError>;

    /// Returns all ledger rows in the date range (inclusive)
    fn transactions_in_range(
        &self,
        tenant_id: &TenantId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<FinancialTransaction>, LedgerError>;

    /// Applies a staged commit atomically
    fn commit(&self, staged: StagedCommit) -> Result<(), LedgerError>;
}

#[derive(Debug, Default)]
struct Tables {
    transactions: Vec<FinancialTransaction>,
    bills: HashMap<BillId, Bill>,
}

/// In-memory store
///
/// Readers share the read lock; commits take the write lock for the brief
/// apply step and enforce the per-bill version check.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>, LedgerError> {
        self.tables
            .read()
            .map_err(|_| LedgerError::StoreUnavailable("store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Tables>, LedgerError> {
        self.tables
            .write()
            .map_err(|_| LedgerError::StoreUnavailable("store lock poisoned".to_string()))
    }
}

impl ReconciliationStore for MemoryStore {
    fn bill(&self, tenant_id: &TenantId, id: &BillId) -> Result<Option<Bill>, LedgerError> {
        let tables = self.read()?;
        Ok(tables
            .bills
            .get(id)
            .filter(|b| &b.tenant_id == tenant_id)
            .cloned())
    }

    fn bill_by_number(
        &self,
        tenant_id: &TenantId,
        bill_number: &str,
    ) -> Result<Option<Bill>, LedgerError> {
        let tables = self.read()?;
        Ok(tables
            .bills
            .values()
            .find(|b| &b.tenant_id == tenant_id && b.bill_number == bill_number)
            .cloned())
    }

    fn transaction(
        &self,
        tenant_id: &TenantId,
        id: &TransactionId,
    ) -> Result<Option<FinancialTransaction>, LedgerError> {
        let tables = self.read()?;
        Ok(tables
            .transactions
            .iter()
            .find(|t| &t.id == id && &t.tenant_id == tenant_id)
            .cloned())
    }

    fn transactions_for_bill(
        &self,
        tenant_id: &TenantId,
        bill_id: &BillId,
    ) -> Result<Vec<FinancialTransaction>, LedgerError> {
        let tables = self.read()?;
        Ok(tables
            .transactions
            .iter()
            .filter(|t| &t.tenant_id == tenant_id && t.bill_id.as_ref() == Some(bill_id))
            .cloned()
            .collect())
    }

    fn transactions_in_range(
        &self,
        tenant_id: &TenantId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<FinancialTransaction>, LedgerError> {
        let tables = self.read()?;
        Ok(tables
            .transactions
            .iter()
            .filter(|t| {
                &t.tenant_id == tenant_id
                    && t.transaction_date >= start
                    && t.transaction_date <= end
            })
            .cloned()
            .collect())
    }

    fn commit(&self, staged: StagedCommit) -> Result<(), LedgerError> {
        let mut tables = self.write()?;

        // Validate everything before mutating anything
        match &staged.bill {
            Some(BillWrite::Create(bill)) => {
                if tables.bills.contains_key(&bill.id) {
                    return Err(LedgerError::WriteConflict(format!(
                        "bill {} already exists",
                        bill.id
                    )));
                }
                let duplicate_number = tables
                    .bills
                    .values()
                    .any(|b| b.tenant_id == bill.tenant_id && b.bill_number == bill.bill_number);
                if duplicate_number {
                    return Err(LedgerError::WriteConflict(format!(
                        "bill number {} already exists",
                        bill.bill_number
                    )));
                }
            }
            Some(BillWrite::Update {
                bill,
                expected_version,
            }) => {
                let current = tables
                    .bills
                    .get(&bill.id)
                    .ok_or_else(|| LedgerError::BillNotFound(bill.id.to_string()))?;
                if current.version != *expected_version {
                    return Err(LedgerError::WriteConflict(format!(
                        "bill {} version is {}, expected {}",
                        bill.id, current.version, expected_version
                    )));
                }
            }
            None => {}
        }

        let transaction_count = staged.transactions.len();
        let bill_id = match staged.bill {
            Some(BillWrite::Create(bill)) => {
                let id = bill.id;
                tables.bills.insert(id, bill);
                Some(id)
            }
            Some(BillWrite::Update {
                mut bill,
                expected_version,
            }) => {
                bill.version = expected_version + 1;
                let id = bill.id;
                tables.bills.insert(id, bill);
                Some(id)
            }
            None => None,
        };

        tables.transactions.extend(staged.transactions);

        info!(
            bill_id = bill_id.map(|id| id.to_string()),
            transactions = transaction_count,
            "ledger commit applied"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::LedgerAccount;
    use crate::bill::ServiceType;
    use crate::transaction::{TransactionCategory, TransactionType};
    use core_kernel::{Currency, Money, PatientId};
    use rust_decimal_macros::dec;

    fn new_bill(tenant_id: TenantId) -> Bill {
        let today = Utc::now().date_naive();
        let total = Money::new(dec!(50.00), Currency::USD);
        Bill::new(
            tenant_id,
            PatientId::new(),
            "BILL-1",
            ServiceType::Lab,
            total,
            Money::zero(Currency::USD),
            total,
            today,
            today,
            "lab-desk",
        )
        .unwrap()
    }

    fn new_transaction(tenant_id: TenantId, bill_id: BillId) -> FinancialTransaction {
        FinancialTransaction::new(
            tenant_id,
            "TXN-1",
            TransactionType::Payment,
            TransactionCategory::LabTest,
            Money::new(dec!(50.00), Currency::USD),
            LedgerAccount::Cash,
            LedgerAccount::LabRevenue,
            "Lab bill settlement",
            "lab-desk",
        )
        .for_bill(bill_id)
    }

    #[test]
    fn test_commit_creates_bill_and_transactions_together() {
        let store = MemoryStore::new();
        let tenant_id = TenantId::new();
        let bill = new_bill(tenant_id);
        let bill_id = bill.id;
        let txn = new_transaction(tenant_id, bill_id);
        let txn_id = txn.id;

        store
            .commit(StagedCommit {
                bill: Some(BillWrite::Create(bill)),
                transactions: vec![txn],
            })
            .unwrap();

        assert!(store.bill(&tenant_id, &bill_id).unwrap().is_some());
        assert!(store.transaction(&tenant_id, &txn_id).unwrap().is_some());
        assert_eq!(
            store.transactions_for_bill(&tenant_id, &bill_id).unwrap().len(),
            1
        );
    }

    #[test]
    fn test_stale_version_update_conflicts() {
        let store = MemoryStore::new();
        let tenant_id = TenantId::new();
        let bill = new_bill(tenant_id);
        let bill_id = bill.id;

        store
            .commit(StagedCommit {
                bill: Some(BillWrite::Create(bill)),
                transactions: vec![],
            })
            .unwrap();

        let snapshot = store.bill(&tenant_id, &bill_id).unwrap().unwrap();

        // First writer commits at the snapshot version
        store
            .commit(StagedCommit {
                bill: Some(BillWrite::Update {
                    bill: snapshot.clone(),
                    expected_version: snapshot.version,
                }),
                transactions: vec![],
            })
            .unwrap();

        // Second writer still holds the stale snapshot
        let result = store.commit(StagedCommit {
            bill: Some(BillWrite::Update {
                bill: snapshot.clone(),
                expected_version: snapshot.version,
            }),
            transactions: vec![],
        });

        assert!(matches!(result, Err(LedgerError::WriteConflict(_))));
    }

    #[test]
    fn test_duplicate_bill_number_conflicts() {
        let store = MemoryStore::new();
        let tenant_id = TenantId::new();

        store
            .commit(StagedCommit {
                bill: Some(BillWrite::Create(new_bill(tenant_id))),
                transactions: vec![],
            })
            .unwrap();

        let result = store.commit(StagedCommit {
            bill: Some(BillWrite::Create(new_bill(tenant_id))),
            transactions: vec![],
        });

        assert!(matches!(result, Err(LedgerError::WriteConflict(_))));
    }

    #[test]
    fn test_reads_are_tenant_scoped() {
        let store = MemoryStore::new();
        let tenant_id = TenantId::new();
        let other_tenant = TenantId::new();
        let bill = new_bill(tenant_id);
        let bill_id = bill.id;

        store
            .commit(StagedCommit {
                bill: Some(BillWrite::Create(bill)),
                transactions: vec![],
            })
            .unwrap();

        assert!(store.bill(&other_tenant, &bill_id).unwrap().is_none());
        assert!(store.bill(&tenant_id, &bill_id).unwrap().is_some());
    }

    #[test]
    fn test_failed_commit_leaves_no_partial_state() {
        let store = MemoryStore::new();
        let tenant_id = TenantId::new();
        let bill = new_bill(tenant_id);
        let bill_id = bill.id;

        // Update of a bill that was never created: rejected before any write
        let txn = new_transaction(tenant_id, bill_id);
        let result = store.commit(StagedCommit {
            bill: Some(BillWrite::Update {
                bill,
                expected_version: 0,
            }),
            transactions: vec![txn],
        });

        assert!(result.is_err());
        assert!(store
            .transactions_for_bill(&tenant_id, &bill_id)
            .unwrap()
            .is_empty());
    }
}
