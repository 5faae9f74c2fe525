//! Partitioned document-repository core.
//!
//! A logical collection is sharded over N physical partitions; documents
//! are placed by a deterministic hash of their partition key, reads decide
//! between a single targeted partition and an all-partition scatter-gather,
//! and transient throttling from the backing store is absorbed by a retry
//! executor. This crate is the single source of truth for those placement
//! and fan-out invariants; the backing store itself is an injected
//! collaborator.

pub mod config;
pub mod logging;
pub mod model;
pub mod partition;
pub mod repo;
pub mod retry;
pub mod store;

pub use config::{ConfigError, ConnectionMode, ConnectionPolicy, Protocol, RepositoryConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::document::{Document, DocumentId};
pub use partition::resolver::{
    FieldKeyExtractor, HashPartitionResolver, IdKeyExtractor, KeyExtractor, ResolverError,
};
pub use partition::set::PartitionSet;
pub use repo::document_repo::{DocumentRepository, RepoError, RepoResult};
pub use retry::execute_with_retries;
pub use store::{
    DocumentQuery, MemoryStore, PartitionId, Provisioner, QuerySpec, StoreClient, StoreError,
    StoreResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
