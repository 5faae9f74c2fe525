//! In-process store backend.
//!
//! # Responsibility
//! - Implement `StoreClient` and `Provisioner` over plain in-memory maps.
//! - Give tests and the CLI probe a deterministic backend with observable
//!   provisioning/read counters and scriptable throttling.
//!
//! # Invariants
//! - Locators have the shape `mem://<partition>/<id>` and are only parsed
//!   here; everything above this module treats them as opaque.
//! - Partition names must not contain `/`.

use super::{
    DocumentIdConflict, DocumentQuery, PartitionId, Provisioner, StoreClient, StoreError,
    StoreResult,
};
use crate::model::document::Document;
use async_trait::async_trait;
use log::debug;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

const LOCATOR_SCHEME: &str = "mem://";

/// In-memory document store for tests and local probes.
///
/// All state sits behind one mutex; operations are short and never hold the
/// lock across an await point.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    databases: BTreeSet<String>,
    partitions: BTreeMap<PartitionId, BTreeMap<String, Document>>,
    collection_creates: u64,
    partition_reads: BTreeMap<PartitionId, u64>,
    throttle_plan: VecDeque<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules the next `count` store/provisioner calls to fail with
    /// `StoreError::Throttled { retry_after }`.
    pub fn throttle_next(&self, count: usize, retry_after: Duration) {
        let mut inner = self.lock();
        for _ in 0..count {
            inner.throttle_plan.push_back(retry_after);
        }
    }

    /// Returns how many collections have actually been created (lookups of
    /// existing collections do not count).
    pub fn collection_create_count(&self) -> u64 {
        self.lock().collection_creates
    }

    /// Returns how many point-reads and queries have touched `partition`.
    pub fn partition_read_count(&self, partition: &str) -> u64 {
        self.lock()
            .partition_reads
            .get(partition)
            .copied()
            .unwrap_or(0)
    }

    /// Returns all document ids currently stored in `partition`, sorted.
    pub fn partition_document_ids(&self, partition: &str) -> Vec<String> {
        self.lock()
            .partitions
            .get(partition)
            .map(|docs| docs.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock means a panic mid-mutation in this same process;
        // tests should see that panic, not a deadlock.
        self.inner.lock().unwrap_or_else(|err| err.into_inner())
    }
}

impl Inner {
    fn take_throttle(&mut self) -> StoreResult<()> {
        match self.throttle_plan.pop_front() {
            Some(retry_after) => Err(StoreError::Throttled { retry_after }),
            None => Ok(()),
        }
    }

    fn count_read(&mut self, partition: &str) {
        *self
            .partition_reads
            .entry(partition.to_string())
            .or_insert(0) += 1;
    }
}

fn locator_for(partition: &str, id: &str) -> String {
    format!("{LOCATOR_SCHEME}{partition}/{id}")
}

fn parse_locator(locator: &str) -> StoreResult<(String, String)> {
    let remainder = locator
        .strip_prefix(LOCATOR_SCHEME)
        .ok_or_else(|| StoreError::Backend(format!("malformed locator `{locator}`")))?;
    match remainder.split_once('/') {
        Some((partition, id)) if !partition.is_empty() && !id.is_empty() => {
            Ok((partition.to_string(), id.to_string()))
        }
        _ => Err(StoreError::Backend(format!(
            "malformed locator `{locator}`"
        ))),
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    async fn create_document(
        &self,
        partition: &PartitionId,
        doc: &Document,
    ) -> StoreResult<Document> {
        let mut inner = self.lock();
        inner.take_throttle()?;

        let docs = inner
            .partitions
            .get_mut(partition)
            .ok_or_else(|| StoreError::NotFound(format!("partition `{partition}`")))?;
        if docs.contains_key(&doc.id) {
            return Err(StoreError::Conflict(DocumentIdConflict {
                partition: partition.clone(),
                id: doc.id.clone(),
            }));
        }

        let mut stored = doc.clone();
        stored.self_link = Some(locator_for(partition, &doc.id));
        docs.insert(stored.id.clone(), stored.clone());
        debug!(
            "event=doc_create module=store status=ok partition={partition} id={}",
            stored.id
        );
        Ok(stored)
    }

    async fn read_document(
        &self,
        partition: &PartitionId,
        id: &str,
    ) -> StoreResult<Option<Document>> {
        let mut inner = self.lock();
        inner.take_throttle()?;
        inner.count_read(partition);

        let docs = inner
            .partitions
            .get(partition)
            .ok_or_else(|| StoreError::NotFound(format!("partition `{partition}`")))?;
        Ok(docs.get(id).cloned())
    }

    async fn replace_document(&self, locator: &str, doc: &Document) -> StoreResult<Document> {
        let (partition, id) = parse_locator(locator)?;
        let mut inner = self.lock();
        inner.take_throttle()?;

        let docs = inner
            .partitions
            .get_mut(&partition)
            .ok_or_else(|| StoreError::NotFound(format!("partition `{partition}`")))?;
        if !docs.contains_key(&id) {
            return Err(StoreError::NotFound(format!("document at `{locator}`")));
        }

        let mut stored = doc.clone();
        stored.self_link = Some(locator.to_string());
        docs.insert(id, stored.clone());
        Ok(stored)
    }

    async fn delete_document(&self, locator: &str) -> StoreResult<()> {
        let (partition, id) = parse_locator(locator)?;
        let mut inner = self.lock();
        inner.take_throttle()?;

        let docs = inner
            .partitions
            .get_mut(&partition)
            .ok_or_else(|| StoreError::NotFound(format!("partition `{partition}`")))?;
        if docs.remove(&id).is_none() {
            return Err(StoreError::NotFound(format!("document at `{locator}`")));
        }
        Ok(())
    }

    async fn query_documents(
        &self,
        partition: &PartitionId,
        query: &DocumentQuery,
    ) -> StoreResult<Vec<Document>> {
        let mut inner = self.lock();
        inner.take_throttle()?;
        inner.count_read(partition);

        let docs = inner
            .partitions
            .get(partition)
            .ok_or_else(|| StoreError::NotFound(format!("partition `{partition}`")))?;
        Ok(docs
            .values()
            .filter(|doc| query.matches(doc))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl Provisioner for MemoryStore {
    async fn ensure_database(&self, name: &str) -> StoreResult<()> {
        let mut inner = self.lock();
        inner.take_throttle()?;
        inner.databases.insert(name.to_string());
        Ok(())
    }

    async fn ensure_collection(&self, database: &str, name: &str) -> StoreResult<PartitionId> {
        if name.contains('/') {
            return Err(StoreError::Backend(format!(
                "collection name `{name}` must not contain `/`"
            )));
        }

        let mut inner = self.lock();
        inner.take_throttle()?;
        if !inner.databases.contains(database) {
            return Err(StoreError::NotFound(format!("database `{database}`")));
        }

        if !inner.partitions.contains_key(name) {
            inner.partitions.insert(name.to_string(), BTreeMap::new());
            inner.collection_creates += 1;
            debug!("event=collection_create module=store status=ok database={database} name={name}");
        }
        Ok(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_locator, MemoryStore};
    use crate::model::document::Document;
    use crate::store::{DocumentQuery, Provisioner, StoreClient, StoreError};
    use serde_json::json;
    use std::time::Duration;

    async fn provisioned_store() -> MemoryStore {
        let store = MemoryStore::new();
        store.ensure_database("appdb").await.unwrap();
        store.ensure_collection("appdb", "docs0").await.unwrap();
        store
    }

    fn doc(id: &str, shard: &str) -> Document {
        let mut doc = Document::new(id, serde_json::Map::new());
        doc.set_field("shardKey", json!(shard));
        doc
    }

    #[tokio::test]
    async fn create_assigns_locator_and_rejects_duplicate_id() {
        let store = provisioned_store().await;
        let partition = "docs0".to_string();

        let stored = store.create_document(&partition, &doc("d1", "a")).await.unwrap();
        assert_eq!(stored.self_link.as_deref(), Some("mem://docs0/d1"));

        let err = store
            .create_document(&partition, &doc("d1", "a"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn replace_and_delete_resolve_locators() {
        let store = provisioned_store().await;
        let partition = "docs0".to_string();

        let stored = store.create_document(&partition, &doc("d1", "a")).await.unwrap();
        let locator = stored.self_link.clone().unwrap();

        let mut updated = stored.clone();
        updated.set_field("flag", json!(true));
        let replaced = store.replace_document(&locator, &updated).await.unwrap();
        assert_eq!(replaced.field("flag"), Some(&json!(true)));

        store.delete_document(&locator).await.unwrap();
        let err = store.delete_document(&locator).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn query_filters_by_predicate_and_counts_reads() {
        let store = provisioned_store().await;
        let partition = "docs0".to_string();
        store.create_document(&partition, &doc("d1", "a")).await.unwrap();
        store.create_document(&partition, &doc("d2", "b")).await.unwrap();

        let query = DocumentQuery::predicate(|doc| doc.string_field("shardKey") == Some("a"));
        let hits = store.query_documents(&partition, &query).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "d1");
        assert_eq!(store.partition_read_count("docs0"), 1);
    }

    #[tokio::test]
    async fn query_spec_matches_on_field_equality() {
        let store = provisioned_store().await;
        let partition = "docs0".to_string();
        store.create_document(&partition, &doc("d1", "a")).await.unwrap();
        store.create_document(&partition, &doc("d2", "b")).await.unwrap();

        let spec = crate::store::QuerySpec::new().with_equals("shardKey", json!("b"));
        let hits = store
            .query_documents(&partition, &DocumentQuery::Spec(spec))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "d2");
    }

    #[tokio::test]
    async fn throttle_plan_fails_next_calls_then_clears() {
        let store = provisioned_store().await;
        let partition = "docs0".to_string();
        store.throttle_next(1, Duration::from_millis(5));

        let err = store.read_document(&partition, "d1").await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Throttled { retry_after } if retry_after == Duration::from_millis(5)
        ));
        assert!(store.read_document(&partition, "d1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ensure_collection_is_lookup_before_create() {
        let store = MemoryStore::new();
        store.ensure_database("appdb").await.unwrap();
        store.ensure_collection("appdb", "docs0").await.unwrap();
        store.ensure_collection("appdb", "docs0").await.unwrap();
        assert_eq!(store.collection_create_count(), 1);
    }

    #[test]
    fn parse_locator_rejects_malformed_input() {
        assert!(parse_locator("mem://docs0/d1").is_ok());
        assert!(parse_locator("docs0/d1").is_err());
        assert!(parse_locator("mem://docs0/").is_err());
        assert!(parse_locator("mem:///d1").is_err());
    }
}
