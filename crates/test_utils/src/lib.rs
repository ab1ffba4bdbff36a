//! Test Utilities Crate
//!
//! Shared test infrastructure for the ledger test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built engine/store fixtures and common amounts
//! - `builders`: Builder patterns for request construction
//! - `assertions`: Custom assertion helpers for ledger invariants

pub mod assertions;
pub mod builders;
pub mod fixtures;

pub use assertions::*;
pub use builders::*;
pub use fixtures::*;
