//! Partition set provisioning and enumeration.
//!
//! # Responsibility
//! - Ensure the database and the N backing collections exist, absorbing
//!   throttling through the retry executor.
//! - Expose the partition identifiers in strictly increasing index order.
//!
//! # Invariants
//! - The returned order is `prefix0, prefix1, ..` — the resolver's
//!   hash-to-bucket mapping depends on this index order, not on names.
//! - A non-throttle provisioning failure aborts the whole ensure; no
//!   partial list ever escapes.

use crate::retry::execute_with_retries;
use crate::store::{PartitionId, Provisioner, StoreResult};
use log::info;

/// Fixed, ordered set of physical partitions backing a logical collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionSet {
    partitions: Vec<PartitionId>,
}

impl PartitionSet {
    /// Looks up or creates collections `"{prefix}{i}"` for `i in 0..count`
    /// inside an already-ensured database.
    ///
    /// Idempotent end to end: the provisioner looks up before creating, so a
    /// second ensure with the same prefix/count returns the same list
    /// without re-creating anything. Every provisioning call is routed
    /// through the retry executor, so throttling never surfaces.
    pub async fn ensure(
        provisioner: &dyn Provisioner,
        database: &str,
        prefix: &str,
        count: u32,
    ) -> StoreResult<Self> {
        info!(
            "event=partition_ensure module=partition status=start database={database} prefix={prefix} count={count}"
        );

        let mut partitions = Vec::with_capacity(count as usize);
        for index in 0..count {
            let name = format!("{prefix}{index}");
            let partition =
                execute_with_retries(|| provisioner.ensure_collection(database, &name)).await?;
            partitions.push(partition);
        }

        info!(
            "event=partition_ensure module=partition status=ok database={database} prefix={prefix} count={count}"
        );
        Ok(Self { partitions })
    }

    /// Returns the partition identifiers in index order.
    pub fn ids(&self) -> &[PartitionId] {
        &self.partitions
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    /// Returns one partition by bucket index.
    pub fn get(&self, index: usize) -> Option<&PartitionId> {
        self.partitions.get(index)
    }
}
