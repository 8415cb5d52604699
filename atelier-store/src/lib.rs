//! Atelier Store - Relational Store Contract
//!
//! Defines the query contract the rest of the system requires of its
//! relational store (equality, inclusion, null-check, case-insensitive
//! pattern match, and range filters, with ordering and limits), plus an
//! in-memory reference implementation used by tests and the dev server.

pub mod memory;
pub mod queries;
pub mod store;

pub use memory::MemoryStore;
pub use queries::*;
pub use store::Store;
