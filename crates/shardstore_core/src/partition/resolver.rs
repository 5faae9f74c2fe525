//! Hash-based partition resolution.
//!
//! # Responsibility
//! - Turn a document (or partial key object) into a key string via the
//!   configured extractor, and the key string into exactly one partition.
//!
//! # Invariants
//! - Resolution is deterministic: the same key string against the same
//!   partition list always yields the same partition.
//! - The hash is fixed (xxh3_64), never the std keyed hasher, so placement
//!   survives process restarts.
//! - Extraction failure is an explicit `None`, never a panic; callers decide
//!   between scatter-gather fallback and a hard error.

use crate::model::document::Document;
use crate::store::PartitionId;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use xxhash_rust::xxh3::xxh3_64;

/// Extracts the partition-key string from a document.
///
/// Implemented per document family; the single source of truth for which
/// field(s) determine partitioning. Returning `None` means the candidate
/// does not carry enough data to place it.
pub trait KeyExtractor: Send + Sync {
    fn extract_key(&self, candidate: &Document) -> Option<String>;
}

/// Extractor reading one named string field from the document body.
///
/// Covers the common case where a single payload field (for example
/// `shardKey` or `tenantId`) drives placement.
#[derive(Debug, Clone)]
pub struct FieldKeyExtractor {
    field: String,
}

impl FieldKeyExtractor {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }
}

impl KeyExtractor for FieldKeyExtractor {
    fn extract_key(&self, candidate: &Document) -> Option<String> {
        candidate
            .string_field(&self.field)
            .map(|value| value.to_string())
    }
}

/// Extractor using the document id itself as the partition key.
///
/// With this extractor an id-only probe always resolves, so `get_by_id`
/// stays a single-partition read and never falls back to scanning.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdKeyExtractor;

impl KeyExtractor for IdKeyExtractor {
    fn extract_key(&self, candidate: &Document) -> Option<String> {
        if candidate.id.is_empty() {
            return None;
        }
        Some(candidate.id.clone())
    }
}

/// Resolver construction error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverError {
    EmptyPartitionList,
}

impl Display for ResolverError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyPartitionList => write!(f, "partition list must not be empty"),
        }
    }
}

impl Error for ResolverError {}

/// Deterministic key-to-partition mapper over a fixed ordered list.
///
/// Built once per repository lifetime; changing the partition count requires
/// constructing a new resolver (and is not supported while documents exist
/// under the old layout).
pub struct HashPartitionResolver {
    partitions: Vec<PartitionId>,
    extractor: Arc<dyn KeyExtractor>,
}

impl HashPartitionResolver {
    /// Captures the ordered partition list and the extractor.
    ///
    /// # Errors
    /// - `ResolverError::EmptyPartitionList` when `partitions` is empty.
    pub fn new(
        partitions: Vec<PartitionId>,
        extractor: Arc<dyn KeyExtractor>,
    ) -> Result<Self, ResolverError> {
        if partitions.is_empty() {
            return Err(ResolverError::EmptyPartitionList);
        }
        Ok(Self {
            partitions,
            extractor,
        })
    }

    /// Resolves a document (full or partial) to its partition.
    ///
    /// Returns `None` when the extractor cannot produce a key from the
    /// candidate.
    pub fn resolve(&self, candidate: &Document) -> Option<&PartitionId> {
        self.extractor
            .extract_key(candidate)
            .map(|key| self.resolve_key(&key))
    }

    /// Maps one key string onto the partition list by hash modulo length.
    pub fn resolve_key(&self, key: &str) -> &PartitionId {
        let bucket = (xxh3_64(key.as_bytes()) % self.partitions.len() as u64) as usize;
        &self.partitions[bucket]
    }

    /// Returns the captured partition list in bucket order.
    pub fn partitions(&self) -> &[PartitionId] {
        &self.partitions
    }
}
