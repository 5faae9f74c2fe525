//! Repository layer over the partitioned store.
//!
//! # Responsibility
//! - Expose the public CRUD/query surface for the logical collection.
//! - Decide per operation between a single-partition target and an
//!   all-partition scatter-gather.
//!
//! # Invariants
//! - Repository operations never surface throttling; every store call runs
//!   through the retry executor.
//! - Unresolvable partition keys are semantic errors
//!   (`InvalidPartitionKey`, `MissingPartitionKey`), never silent fallbacks,
//!   except for `get_by_id` whose scatter fallback is part of its contract.

pub mod document_repo;
