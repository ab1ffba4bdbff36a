//! Test data builders
//!
//! Builders construct engine requests with sensible defaults so tests only
//! spell out the fields they care about.

use chrono::NaiveDate;
use core_kernel::{BillId, Money, PatientId, TenantId};
use domain_ledger::{
    LabBillRequest, PaymentMethod, RefundRequest, SaleRequest, TransactionCategory,
};
use rust_decimal_macros::dec;

use crate::fixtures::MoneyFixtures;

/// Builder for point-of-sale charges
///
/// Defaults to a $100 pharmacy sale split $85 insurance / $15 patient,
/// paid in cash.
pub struct SaleRequestBuilder {
    tenant_id: TenantId,
    patient_id: PatientId,
    category: TransactionCategory,
    total: Money,
    insurance: Money,
    patient_due: Money,
    payment_method: PaymentMethod,
    due_date: Option<NaiveDate>,
    recorded_by: String,
}

impl SaleRequestBuilder {
    /// Creates a builder with default values for the tenant
    pub fn new(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            patient_id: PatientId::new(),
            category: TransactionCategory::PharmacySale,
            total: MoneyFixtures::usd(dec!(100.00)),
            insurance: MoneyFixtures::usd(dec!(85.00)),
            patient_due: MoneyFixtures::usd(dec!(15.00)),
            payment_method: PaymentMethod::Cash,
            due_date: None,
            recorded_by: "test-operator".to_string(),
        }
    }

    /// Sets the patient
    pub fn with_patient(mut self, patient_id: PatientId) -> Self {
        self.patient_id = patient_id;
        self
    }

    /// Sets the charge category
    pub fn with_category(mut self, category: TransactionCategory) -> Self {
        self.category = category;
        self
    }

    /// Sets the full payer split in one call
    pub fn with_split(mut self, total: Money, insurance: Money, patient_due: Money) -> Self {
        self.total = total;
        self.insurance = insurance;
        self.patient_due = patient_due;
        self
    }

    /// Sets the payment method
    pub fn with_payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = method;
        self
    }

    /// Sets the due date
    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Builds the request
    pub fn build(self) -> SaleRequest {
        SaleRequest {
            tenant_id: self.tenant_id,
            patient_id: self.patient_id,
            category: self.category,
            total: self.total,
            insurance: self.insurance,
            patient_due: self.patient_due,
            payment_method: self.payment_method,
            payment_reference: None,
            description: None,
            due_date: self.due_date,
            recorded_by: self.recorded_by,
        }
    }
}

/// Builder for unpaid lab bills
pub struct LabBillRequestBuilder {
    tenant_id: TenantId,
    patient_id: PatientId,
    amount: Money,
    due_date: Option<NaiveDate>,
}

impl LabBillRequestBuilder {
    /// Creates a builder defaulting to a $50 lab bill
    pub fn new(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            patient_id: PatientId::new(),
            amount: MoneyFixtures::usd(dec!(50.00)),
            due_date: None,
        }
    }

    /// Sets the patient
    pub fn with_patient(mut self, patient_id: PatientId) -> Self {
        self.patient_id = patient_id;
        self
    }

    /// Sets the amount
    pub fn with_amount(mut self, amount: Money) -> Self {
        self.amount = amount;
        self
    }

    /// Sets the due date
    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Builds the request
    pub fn build(self) -> LabBillRequest {
        LabBillRequest {
            tenant_id: self.tenant_id,
            patient_id: self.patient_id,
            amount: self.amount,
            description: None,
            due_date: self.due_date,
            recorded_by: "test-operator".to_string(),
        }
    }
}

/// Builder for refunds
pub struct RefundRequestBuilder {
    tenant_id: TenantId,
    bill_id: BillId,
    patient_id: PatientId,
    amount: Money,
    reason: String,
    payment_method: PaymentMethod,
}

impl RefundRequestBuilder {
    /// Creates a builder defaulting to a $20 cash refund
    pub fn new(tenant_id: TenantId, bill_id: BillId) -> Self {
        Self {
            tenant_id,
            bill_id,
            patient_id: PatientId::new(),
            amount: MoneyFixtures::usd(dec!(20.00)),
            reason: "returned goods".to_string(),
            payment_method: PaymentMethod::Cash,
        }
    }

    /// Sets the patient
    pub fn with_patient(mut self, patient_id: PatientId) -> Self {
        self.patient_id = patient_id;
        self
    }

    /// Sets the amount
    pub fn with_amount(mut self, amount: Money) -> Self {
        self.amount = amount;
        self
    }

    /// Sets the reason
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Builds the request
    pub fn build(self) -> RefundRequest {
        RefundRequest {
            tenant_id: self.tenant_id,
            bill_id: self.bill_id,
            patient_id: self.patient_id,
            amount: self.amount,
            reason: self.reason,
            payment_method: self.payment_method,
            recorded_by: "test-operator".to_string(),
        }
    }
}
