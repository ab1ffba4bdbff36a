//! Tenant-scoped document numbering
//!
//! Numbers are time-sortable (zero-padded millisecond prefix) and carry a
//! tenant segment plus a random suffix, so concurrent writers never need a
//! central sequence counter to stay collision-free.

use chrono::Utc;
use rand::Rng;

use core_kernel::TenantId;

/// Generates transaction and bill numbers
///
/// Stateless: only a clock and a random source are required.
#[derive(Debug, Clone, Default)]
pub struct TransactionNumberGenerator;

impl TransactionNumberGenerator {
    /// Creates a new generator
    pub fn new() -> Self {
        Self
    }

    /// Returns the next transaction number for the tenant
    pub fn next_transaction_number(&self, tenant_id: &TenantId) -> String {
        Self::next("TXN", tenant_id)
    }

    /// Returns the next bill number for the tenant
    pub fn next_bill_number(&self, tenant_id: &TenantId) -> String {
        Self::next("BILL", tenant_id)
    }

    fn next(prefix: &str, tenant_id: &TenantId) -> String {
        let millis = Utc::now().timestamp_millis();
        let tenant = tenant_id.as_uuid().simple().to_string();
        let suffix: u32 = rand::thread_rng().gen_range(0..0x100_0000);

        format!("{}-{:013}-{}-{:06X}", prefix, millis, &tenant[..8], suffix)
    }
}
