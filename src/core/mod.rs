//! Core business logic - framework-agnostic referral operations.
//!
//! Layered as registry and ledgers (`code`, `usage`, `reward`) underneath the
//! orchestrating `engine`; `report` reads across the ledgers for stats. The
//! HTTP layer calls into these modules and adds no logic of its own.

/// Code registry: create, lookup, update, delete, atomic usage increment
pub mod code;
/// Referral engine: validate, apply, settle
pub mod engine;
/// Per-user referral statistics
pub mod report;
/// Reward ledger: pending rewards and their settlement transition
pub mod reward;
/// Usage ledger: append-only redemption records
pub mod usage;

pub use engine::Engine;
