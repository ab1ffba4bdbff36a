//! Core Kernel - Foundational types for the healthcare ledger
//!
//! This crate provides the building blocks shared by every domain module:
//! - Money types with precise decimal arithmetic
//! - Strongly-typed entity identifiers

pub mod money;
pub mod identifiers;

pub use money::{Money, Currency, MoneyError};
pub use identifiers::{TenantId, PatientId, BillId, TransactionId};
