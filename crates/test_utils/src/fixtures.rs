//! Pre-built test fixtures

use std::sync::Arc;

use core_kernel::{Currency, Money, TenantId};
use domain_ledger::{ChartOfAccounts, MemoryStore, ReconciliationEngine, SummaryReader};
use rust_decimal::Decimal;

/// Common monetary amounts for tests
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// A USD amount from a decimal
    pub fn usd(amount: Decimal) -> Money {
        Money::new(amount, Currency::USD)
    }

    /// Zero USD
    pub fn zero() -> Money {
        Money::zero(Currency::USD)
    }
}

/// A ready-to-use engine over a fresh in-memory store
///
/// Bundles the shared store so tests can build readers or inspect state
/// alongside the engine.
pub struct LedgerFixture {
    pub tenant_id: TenantId,
    pub store: Arc<MemoryStore>,
    pub engine: ReconciliationEngine<MemoryStore>,
}

impl LedgerFixture {
    /// Creates a fixture with the standard chart of accounts
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let engine = ReconciliationEngine::new(ChartOfAccounts::standard(), Arc::clone(&store));
        Self {
            tenant_id: TenantId::new(),
            store,
            engine,
        }
    }

    /// Builds a summary reader over the fixture's store
    pub fn reader(&self) -> SummaryReader<MemoryStore> {
        SummaryReader::new(Arc::clone(&self.store), Currency::USD)
    }
}

impl Default for LedgerFixture {
    fn default() -> Self {
        Self::new()
    }
}
