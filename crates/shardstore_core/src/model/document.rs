//! Document domain model.
//!
//! # Responsibility
//! - Define the schema-free record persisted across partitioned collections.
//! - Provide constructors for full documents and id-only resolution probes.
//!
//! # Invariants
//! - `id` is stable and never reused for another document.
//! - `self_link` is an opaque physical locator owned by the store; core code
//!   only carries it, never parses it.
//! - The partitioning field value must not change after the document is
//!   stored; a changed value makes the document unreachable under its
//!   original partition (moving documents is unsupported).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Stable identifier for every document in the logical collection.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type DocumentId = String;

/// Schema-free record stored in exactly one physical partition.
///
/// The body is an open JSON map so one storage shape can carry any
/// application payload without core code knowing its fields. Which body
/// field (if any) drives partitioning is the key extractor's concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Stable global ID used for lookup, placement probes and auditing.
    pub id: DocumentId,
    /// Opaque physical locator assigned by the store on write.
    ///
    /// `None` until the document has been stored at least once, or when the
    /// instance is a partial probe that never touches storage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    /// Arbitrary application payload fields.
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl Document {
    /// Creates a document with a caller-provided stable ID.
    ///
    /// Used by import paths where identity already exists externally.
    pub fn new(id: impl Into<DocumentId>, body: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            self_link: None,
            body,
        }
    }

    /// Creates a document with a generated stable ID.
    pub fn generate(body: Map<String, Value>) -> Self {
        Self::new(Uuid::new_v4().to_string(), body)
    }

    /// Creates an id-only partial document.
    ///
    /// Used as input to partition-key resolution when only the identifier is
    /// known; it carries no payload and must never be persisted.
    pub fn probe(id: impl Into<DocumentId>) -> Self {
        Self::new(id, Map::new())
    }

    /// Returns one body field by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.body.get(name)
    }

    /// Returns one body field as a string slice, when it is a JSON string.
    pub fn string_field(&self, name: &str) -> Option<&str> {
        self.body.get(name).and_then(Value::as_str)
    }

    /// Sets one body field, replacing any previous value.
    pub fn set_field(&mut self, name: impl Into<String>, value: Value) {
        self.body.insert(name.into(), value);
    }

    /// Returns whether this document has a known physical location.
    pub fn is_stored(&self) -> bool {
        self.self_link.is_some()
    }
}
