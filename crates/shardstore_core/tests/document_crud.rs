use serde_json::json;
use shardstore_core::{
    Document, DocumentRepository, FieldKeyExtractor, KeyExtractor, MemoryStore, RepoError,
    RepositoryConfig, StoreError,
};
use std::sync::Arc;

fn config() -> RepositoryConfig {
    RepositoryConfig::new("mem://local", "test-key", "appdb", "docs", 3)
}

fn repo(
    store: &Arc<MemoryStore>,
    config: RepositoryConfig,
) -> DocumentRepository<MemoryStore, MemoryStore> {
    let extractor: Arc<dyn KeyExtractor> = Arc::new(FieldKeyExtractor::new("shardKey"));
    DocumentRepository::new(config, store.clone(), store.clone(), extractor).unwrap()
}

fn shard_doc(id: &str, shard: &str) -> Document {
    let mut doc = Document::new(id, serde_json::Map::new());
    doc.set_field("shardKey", json!(shard));
    doc
}

#[tokio::test]
async fn insert_returns_stored_document_with_locator() {
    let store = Arc::new(MemoryStore::new());
    let repo = repo(&store, config());

    let stored = repo.insert(&shard_doc("d1", "a")).await.unwrap().unwrap();
    assert_eq!(stored.id, "d1");
    assert!(stored.is_stored());

    let loaded = repo.get_by_id("d1").await.unwrap().unwrap();
    assert_eq!(loaded, stored);
}

#[tokio::test]
async fn insert_without_partition_key_is_a_distinct_error() {
    let store = Arc::new(MemoryStore::new());
    let repo = repo(&store, config());

    let keyless = Document::new("d1", serde_json::Map::new());
    let err = repo.insert(&keyless).await.unwrap_err();
    assert!(matches!(err, RepoError::MissingPartitionKey));

    // Nothing may have been written anywhere.
    let partitions = repo.partition_ids().await.unwrap();
    for partition in partitions {
        assert!(store.partition_document_ids(&partition).is_empty());
    }
}

#[tokio::test]
async fn duplicate_insert_propagates_conflict_by_default() {
    let store = Arc::new(MemoryStore::new());
    let repo = repo(&store, config());

    repo.insert(&shard_doc("d1", "a")).await.unwrap();
    let err = repo.insert(&shard_doc("d1", "a")).await.unwrap_err();
    assert!(matches!(err, RepoError::Store(StoreError::Conflict(_))));
}

#[tokio::test]
async fn opt_in_absorb_policy_turns_write_failures_into_absent_results() {
    let store = Arc::new(MemoryStore::new());
    let mut absorbing = config();
    absorbing.absorb_write_failures = true;
    let repo = repo(&store, absorbing);

    repo.insert(&shard_doc("d1", "a")).await.unwrap();
    // Conflict is a store failure, so the opt-in policy absorbs it.
    let absorbed = repo.insert(&shard_doc("d1", "a")).await.unwrap();
    assert!(absorbed.is_none());

    // Malformed locator is a store failure too; absorbed into `false`.
    assert!(!repo.delete("not-a-locator").await.unwrap());

    // Partition-key programmer errors are never absorbed.
    let keyless = Document::new("d2", serde_json::Map::new());
    let err = repo.insert(&keyless).await.unwrap_err();
    assert!(matches!(err, RepoError::MissingPartitionKey));
}

#[tokio::test]
async fn update_replaces_in_place_when_locator_is_known() {
    let store = Arc::new(MemoryStore::new());
    let repo = repo(&store, config());

    let mut stored = repo.insert(&shard_doc("d1", "a")).await.unwrap().unwrap();
    stored.set_field("status", json!("done"));

    assert!(repo.update(&stored).await.unwrap());

    let loaded = repo.get_by_id("d1").await.unwrap().unwrap();
    assert_eq!(loaded.field("status"), Some(&json!("done")));
}

#[tokio::test]
async fn update_recovers_locator_from_partition_key_when_unknown() {
    let store = Arc::new(MemoryStore::new());
    let repo = repo(&store, config());

    repo.insert(&shard_doc("d1", "a")).await.unwrap();

    // Same identity and shard key, but no physical location attached.
    let mut detached = shard_doc("d1", "a");
    detached.set_field("status", json!("done"));
    assert!(detached.self_link.is_none());

    assert!(repo.update(&detached).await.unwrap());

    let loaded = repo.get_by_id("d1").await.unwrap().unwrap();
    assert_eq!(loaded.field("status"), Some(&json!("done")));
    assert!(loaded.is_stored());
}

#[tokio::test]
async fn update_of_unknown_document_returns_false() {
    let store = Arc::new(MemoryStore::new());
    let repo = repo(&store, config());

    assert!(!repo.update(&shard_doc("ghost", "a")).await.unwrap());
}

#[tokio::test]
async fn update_without_locator_or_key_is_invalid_partition_key() {
    let store = Arc::new(MemoryStore::new());
    let repo = repo(&store, config());

    let keyless = Document::new("d1", serde_json::Map::new());
    let err = repo.update(&keyless).await.unwrap_err();
    assert!(matches!(err, RepoError::InvalidPartitionKey));
}

#[tokio::test]
async fn delete_by_locator_returns_false_once_gone() {
    let store = Arc::new(MemoryStore::new());
    let repo = repo(&store, config());

    let stored = repo.insert(&shard_doc("d1", "a")).await.unwrap().unwrap();
    let locator = stored.self_link.unwrap();

    assert!(repo.delete(&locator).await.unwrap());
    assert!(!repo.delete(&locator).await.unwrap());
    assert!(repo.get_by_id("d1").await.unwrap().is_none());
}

#[tokio::test]
async fn delete_by_id_composes_lookup_and_delete() {
    let store = Arc::new(MemoryStore::new());
    let repo = repo(&store, config());

    repo.insert(&shard_doc("d1", "a")).await.unwrap();

    assert!(repo.delete_by_id("d1").await.unwrap());
    assert!(!repo.delete_by_id("d1").await.unwrap());
    assert!(!repo.delete_by_id("never-existed").await.unwrap());
}

#[tokio::test]
async fn zero_partition_count_is_rejected_at_construction() {
    let store = Arc::new(MemoryStore::new());
    let mut bad = config();
    bad.partition_count = 0;

    let extractor: Arc<dyn KeyExtractor> = Arc::new(FieldKeyExtractor::new("shardKey"));
    let err = DocumentRepository::new(bad, store.clone(), store.clone(), extractor).unwrap_err();
    assert!(matches!(err, RepoError::Config(_)));
}
