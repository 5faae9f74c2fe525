//! Repository configuration surface.
//!
//! # Responsibility
//! - Carry the knobs a repository needs at construction: endpoint and
//!   credential (passed through to the store client), database name,
//!   collection prefix, partition count, connection policy, error policy.
//!
//! # Invariants
//! - `partition_count` is positive; the count is fixed for the lifetime of
//!   the repository (online re-partitioning is unsupported).
//! - Endpoint, credential and connection policy are opaque to core logic;
//!   only store client constructors interpret them.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// How the client tunnels requests to the store. Opaque pass-through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionMode {
    #[default]
    Gateway,
    Direct,
}

/// Wire protocol selection. Opaque pass-through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    #[default]
    Https,
    Tcp,
}

/// Connection policy handed unmodified to the store client constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectionPolicy {
    pub mode: ConnectionMode,
    pub protocol: Protocol,
}

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    ZeroPartitionCount,
    EmptyDatabaseName,
    EmptyCollectionPrefix,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroPartitionCount => write!(f, "partition count must be positive"),
            Self::EmptyDatabaseName => write!(f, "database name cannot be empty"),
            Self::EmptyCollectionPrefix => write!(f, "collection prefix cannot be empty"),
        }
    }
}

impl Error for ConfigError {}

/// Everything a `DocumentRepository` needs at construction time.
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    /// Store endpoint address; interpreted only by the client constructor.
    pub endpoint: String,
    /// Store credential; interpreted only by the client constructor.
    pub auth_key: String,
    /// Database holding all backing collections.
    pub database: String,
    /// Collection name prefix; partition `i` is named `"{prefix}{i}"`.
    pub collection_prefix: String,
    /// Number of physical partitions. Fixed for the repository lifetime.
    pub partition_count: u32,
    /// Connection policy passed through to the client.
    pub connection: ConnectionPolicy,
    /// When `true`, generic write failures are logged and absorbed into
    /// absent/false results instead of propagating. Off by default; prefer
    /// handling the typed error at the call site.
    pub absorb_write_failures: bool,
}

impl RepositoryConfig {
    /// Creates a config with defaults for the optional knobs.
    pub fn new(
        endpoint: impl Into<String>,
        auth_key: impl Into<String>,
        database: impl Into<String>,
        collection_prefix: impl Into<String>,
        partition_count: u32,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            auth_key: auth_key.into(),
            database: database.into(),
            collection_prefix: collection_prefix.into(),
            partition_count,
            connection: ConnectionPolicy::default(),
            absorb_write_failures: false,
        }
    }

    /// Validates construction-time invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.partition_count == 0 {
            return Err(ConfigError::ZeroPartitionCount);
        }
        if self.database.trim().is_empty() {
            return Err(ConfigError::EmptyDatabaseName);
        }
        if self.collection_prefix.trim().is_empty() {
            return Err(ConfigError::EmptyCollectionPrefix);
        }
        Ok(())
    }
}
