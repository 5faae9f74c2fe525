//! CLI smoke entry point.
//!
//! # Responsibility
//! - Exercise `shardstore_core` end to end against the in-memory store.
//! - Keep output deterministic for quick local sanity checks.

use serde_json::json;
use shardstore_core::{
    Document, DocumentQuery, DocumentRepository, FieldKeyExtractor, KeyExtractor, MemoryStore,
    RepoError, RepositoryConfig,
};
use std::sync::Arc;

fn shard_doc(id: &str, shard: &str) -> Document {
    let mut doc = Document::new(id, serde_json::Map::new());
    doc.set_field("shardKey", json!(shard));
    doc
}

#[tokio::main]
async fn main() -> Result<(), RepoError> {
    println!("shardstore_core version={}", shardstore_core::core_version());

    let store = Arc::new(MemoryStore::new());
    let extractor: Arc<dyn KeyExtractor> = Arc::new(FieldKeyExtractor::new("shardKey"));
    let config = RepositoryConfig::new("mem://local", "probe-key", "appdb", "docs", 3);
    let repo = DocumentRepository::new(config, store.clone(), store.clone(), extractor)?;

    for (id, shard) in [("d1", "a"), ("d2", "b"), ("d3", "c"), ("d4", "a")] {
        let stored = repo
            .insert(&shard_doc(id, shard))
            .await?
            .expect("insert propagates failures instead of absorbing them");
        println!(
            "inserted id={id} shardKey={shard} locator={}",
            stored.self_link.as_deref().unwrap_or("-")
        );
    }

    for partition in repo.partition_ids().await? {
        println!(
            "partition={partition} documents={:?}",
            store.partition_document_ids(&partition)
        );
    }

    let all = repo.query(&DocumentQuery::predicate(|_| true)).await?;
    println!("scatter-gather total={}", all.len());

    let found = repo.get_by_id("d4").await?;
    println!(
        "get_by_id d4 found={}",
        found.map(|doc| doc.id).unwrap_or_else(|| "-".to_string())
    );

    Ok(())
}
