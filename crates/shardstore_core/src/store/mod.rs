//! Store client and provisioning contracts.
//!
//! # Responsibility
//! - Define the async seams between core logic and the backing document
//!   store: per-partition CRUD/query and idempotent resource provisioning.
//! - Define the transport error taxonomy core code dispatches on.
//!
//! # Invariants
//! - Every client call is scoped to a single named partition or to an
//!   opaque locator; nothing at this layer fans out.
//! - Throttling is reported as `StoreError::Throttled` with the
//!   server-supplied backoff so the retry executor can absorb it.

use crate::model::document::Document;
use async_trait::async_trait;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

pub mod memory;

pub use memory::MemoryStore;

/// Stable name of one physical collection backing the logical collection.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type PartitionId = String;

pub type StoreResult<T> = Result<T, StoreError>;

/// Transport-level store error taxonomy.
#[derive(Debug)]
pub enum StoreError {
    /// Transient rate-limit rejection carrying the server-suggested wait.
    Throttled { retry_after: Duration },
    /// The addressed document or resource does not exist.
    NotFound(String),
    /// A document with the same id already exists in the target partition.
    Conflict(DocumentIdConflict),
    /// Any other backend failure, preserved as text.
    Backend(String),
}

/// Identity detail for `StoreError::Conflict`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentIdConflict {
    pub partition: PartitionId,
    pub id: String,
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Throttled { retry_after } => {
                write!(f, "request throttled, retry after {retry_after:?}")
            }
            Self::NotFound(what) => write!(f, "store resource not found: {what}"),
            Self::Conflict(conflict) => write!(
                f,
                "document id `{}` already exists in partition `{}`",
                conflict.id, conflict.partition
            ),
            Self::Backend(message) => write!(f, "store backend failure: {message}"),
        }
    }
}

impl Error for StoreError {}

impl StoreError {
    /// Returns whether this error is the transient throttle signal.
    pub fn is_throttled(&self) -> bool {
        matches!(self, Self::Throttled { .. })
    }
}

/// Shared predicate evaluated store-side against candidate documents.
pub type DocumentPredicate = Arc<dyn Fn(&Document) -> bool + Send + Sync>;

/// Structured query: AND-ed field equality conditions.
///
/// The structured form exists so stores that compile queries server-side get
/// something inspectable instead of an opaque closure.
#[derive(Debug, Clone, Default)]
pub struct QuerySpec {
    pub conditions: Vec<(String, Value)>,
}

impl QuerySpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one `field == value` condition.
    pub fn with_equals(mut self, field: impl Into<String>, value: Value) -> Self {
        self.conditions.push((field.into(), value));
        self
    }

    /// Returns whether `doc` satisfies every condition.
    pub fn matches(&self, doc: &Document) -> bool {
        self.conditions
            .iter()
            .all(|(field, value)| doc.field(field) == Some(value))
    }
}

/// Query input accepted by every store client, in predicate or spec form.
#[derive(Clone)]
pub enum DocumentQuery {
    Predicate(DocumentPredicate),
    Spec(QuerySpec),
}

impl DocumentQuery {
    /// Wraps a closure as a predicate query.
    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(&Document) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(predicate))
    }

    /// Returns whether `doc` matches this query.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Self::Predicate(predicate) => predicate(doc),
            Self::Spec(spec) => spec.matches(doc),
        }
    }
}

impl std::fmt::Debug for DocumentQuery {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Predicate(_) => f.write_str("DocumentQuery::Predicate(..)"),
            Self::Spec(spec) => f.debug_tuple("DocumentQuery::Spec").field(spec).finish(),
        }
    }
}

/// Per-partition document access contract implemented by store backends.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Creates `doc` in `partition`; returns the stored document with its
    /// locator assigned. Fails with `Conflict` when the id already exists
    /// in that partition.
    async fn create_document(
        &self,
        partition: &PartitionId,
        doc: &Document,
    ) -> StoreResult<Document>;

    /// Reads one document by id within `partition`.
    async fn read_document(
        &self,
        partition: &PartitionId,
        id: &str,
    ) -> StoreResult<Option<Document>>;

    /// Replaces the document at `locator` with `doc`.
    async fn replace_document(&self, locator: &str, doc: &Document) -> StoreResult<Document>;

    /// Deletes the document at `locator`. Fails with `NotFound` when the
    /// locator no longer resolves.
    async fn delete_document(&self, locator: &str) -> StoreResult<()>;

    /// Returns all documents in `partition` matching `query`, in the
    /// store's own order.
    async fn query_documents(
        &self,
        partition: &PartitionId,
        query: &DocumentQuery,
    ) -> StoreResult<Vec<Document>>;
}

/// Idempotent resource provisioning contract.
///
/// Implementations must look up before creating, so repeated calls with the
/// same names neither fail nor duplicate resources. Provisioning raises the
/// same error shape as `StoreClient`, so calls can be routed through the
/// retry executor.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Looks up or creates the named database.
    async fn ensure_database(&self, name: &str) -> StoreResult<()>;

    /// Looks up or creates one collection inside `database`; returns its
    /// stable partition identifier.
    async fn ensure_collection(&self, database: &str, name: &str) -> StoreResult<PartitionId>;
}
