//! Domain model for partitioned document storage.
//!
//! # Responsibility
//! - Define the canonical document shape shared by all repository operations.
//! - Keep identity and physical-location concerns explicit in the type.
//!
//! # Invariants
//! - Every document is identified by a stable `DocumentId`, unique across
//!   the whole logical collection regardless of partition.
//! - The physical locator (`self_link`) is assigned by the store, never by
//!   core code.

pub mod document;
