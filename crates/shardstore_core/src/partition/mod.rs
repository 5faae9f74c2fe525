//! Partition placement: key extraction, hashing and set provisioning.
//!
//! # Responsibility
//! - Map documents and partial key objects onto one of N fixed partitions.
//! - Own the ordered partition list and its lazy provisioning.
//!
//! # Invariants
//! - Placement is a pure function of (key string, ordered partition list);
//!   the list never changes after construction.
//! - The list order is load-bearing: buckets are indexes, not names.

pub mod resolver;
pub mod set;
