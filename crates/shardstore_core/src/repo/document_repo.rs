//! Partitioned document repository facade.
//!
//! # Responsibility
//! - Compose resolver and partition set into the public CRUD/query API.
//! - Run the one-time init ladder (database, partitions, resolver) on first
//!   access, synchronized so concurrent first calls provision exactly once.
//!
//! # Invariants
//! - Init is monotonic: once `resolver_ready` is reached the state never
//!   regresses; a failed init is not cached and the next access retries
//!   from scratch.
//! - Write-failure absorption only happens when the config opts in, and only
//!   for store errors, never for partition-key programmer errors.

use crate::config::{ConfigError, RepositoryConfig};
use crate::model::document::Document;
use crate::partition::resolver::{HashPartitionResolver, KeyExtractor, ResolverError};
use crate::partition::set::PartitionSet;
use crate::retry::execute_with_retries;
use crate::store::{DocumentQuery, PartitionId, Provisioner, StoreClient, StoreError};
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tokio::sync::OnceCell;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error taxonomy.
///
/// Throttling never appears here: it is absorbed below this layer by the
/// retry executor.
#[derive(Debug)]
pub enum RepoError {
    /// A caller-supplied partial key object could not be resolved to a
    /// partition. Raised by targeted queries; indicates the caller does not
    /// actually know the partitioning field(s).
    InvalidPartitionKey,
    /// The extractor produced no key from a document being inserted; a
    /// caller data-model bug, not a transient condition.
    MissingPartitionKey,
    Config(ConfigError),
    Resolver(ResolverError),
    Store(StoreError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPartitionKey => {
                write!(f, "partial key object does not resolve to a partition")
            }
            Self::MissingPartitionKey => {
                write!(f, "document carries no partition key; cannot place it")
            }
            Self::Config(err) => write!(f, "{err}"),
            Self::Resolver(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Resolver(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::InvalidPartitionKey | Self::MissingPartitionKey => None,
        }
    }
}

impl From<ConfigError> for RepoError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<ResolverError> for RepoError {
    fn from(value: ResolverError) -> Self {
        Self::Resolver(value)
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// State built once by the init ladder and held for the repository lifetime.
struct Ready {
    partitions: PartitionSet,
    resolver: HashPartitionResolver,
}

/// CRUD/query facade over one logical collection sharded into N partitions.
///
/// Holds shared handles to the store client and provisioner; the partition
/// set and resolver are built lazily on first operation and are immutable
/// afterwards, so a repository is cheap to share across tasks.
pub struct DocumentRepository<C: StoreClient, P: Provisioner> {
    config: RepositoryConfig,
    client: Arc<C>,
    provisioner: Arc<P>,
    extractor: Arc<dyn KeyExtractor>,
    ready: OnceCell<Ready>,
}

impl<C: StoreClient, P: Provisioner> std::fmt::Debug for DocumentRepository<C, P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentRepository")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<C: StoreClient, P: Provisioner> DocumentRepository<C, P> {
    /// Creates a repository from validated configuration and injected
    /// collaborators. No I/O happens here; provisioning runs lazily on the
    /// first operation.
    pub fn new(
        config: RepositoryConfig,
        client: Arc<C>,
        provisioner: Arc<P>,
        extractor: Arc<dyn KeyExtractor>,
    ) -> RepoResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            client,
            provisioner,
            extractor,
            ready: OnceCell::new(),
        })
    }

    /// Runs the init ladder exactly once: database, then partitions, then
    /// resolver. Concurrent first calls are serialized by the cell; a failed
    /// run leaves the cell empty so the next call retries from scratch.
    async fn ready(&self) -> RepoResult<&Ready> {
        self.ready
            .get_or_try_init(|| async {
                let database = &self.config.database;
                info!("event=repo_init module=repo status=start database={database}");

                execute_with_retries(|| self.provisioner.ensure_database(database)).await?;
                info!("event=repo_init module=repo status=ok stage=database_ready database={database}");

                let partitions = PartitionSet::ensure(
                    self.provisioner.as_ref(),
                    database,
                    &self.config.collection_prefix,
                    self.config.partition_count,
                )
                .await?;
                info!(
                    "event=repo_init module=repo status=ok stage=partitions_ready count={}",
                    partitions.len()
                );

                let resolver =
                    HashPartitionResolver::new(partitions.ids().to_vec(), self.extractor.clone())?;
                info!("event=repo_init module=repo status=ok stage=resolver_ready");

                Ok::<_, RepoError>(Ready {
                    partitions,
                    resolver,
                })
            })
            .await
    }

    /// Returns the ordered partition identifiers, provisioning on first use.
    pub async fn partition_ids(&self) -> RepoResult<Vec<PartitionId>> {
        Ok(self.ready().await?.partitions.ids().to_vec())
    }

    /// Resolves a document or partial key object to its target partition.
    ///
    /// `None` means the extractor could not produce a key and callers must
    /// fall back to scatter-gather (or fail, depending on the operation).
    pub async fn resolve_partition(
        &self,
        candidate: &Document,
    ) -> RepoResult<Option<PartitionId>> {
        Ok(self.ready().await?.resolver.resolve(candidate).cloned())
    }

    /// Fetches one document by id.
    ///
    /// When an id-only probe resolves to a partition, only that partition is
    /// read. Otherwise every partition is scanned in index order and the
    /// first hit wins; cross-partition duplicate ids are not detected.
    pub async fn get_by_id(&self, id: &str) -> RepoResult<Option<Document>> {
        let ready = self.ready().await?;
        let probe = Document::probe(id);

        if let Some(partition) = ready.resolver.resolve(&probe) {
            debug!("event=get_by_id module=repo status=ok mode=targeted partition={partition} id={id}");
            let doc = execute_with_retries(|| self.client.read_document(partition, id)).await?;
            return Ok(doc);
        }

        debug!("event=get_by_id module=repo status=start mode=scan id={id}");
        for partition in ready.partitions.ids() {
            if let Some(doc) =
                execute_with_retries(|| self.client.read_document(partition, id)).await?
            {
                debug!("event=get_by_id module=repo status=ok mode=scan partition={partition} id={id}");
                return Ok(Some(doc));
            }
        }
        Ok(None)
    }

    /// Runs `query` against every partition and concatenates the results.
    ///
    /// No de-duplication and no cross-partition ordering: the result is the
    /// union of per-partition result order, partition by partition.
    pub async fn query(&self, query: &DocumentQuery) -> RepoResult<Vec<Document>> {
        let ready = self.ready().await?;
        let mut results = Vec::new();
        for partition in ready.partitions.ids() {
            let mut hits =
                execute_with_retries(|| self.client.query_documents(partition, query)).await?;
            results.append(&mut hits);
        }
        debug!(
            "event=query module=repo status=ok mode=fanout partitions={} hits={}",
            ready.partitions.len(),
            results.len()
        );
        Ok(results)
    }

    /// Runs `query` against the single partition resolved from `key_source`.
    ///
    /// # Errors
    /// - `RepoError::InvalidPartitionKey` when `key_source` does not carry
    ///   the partitioning field(s). This path has no scatter-gather
    ///   fallback: the caller claims to know the key, so not knowing it is
    ///   an error, not an empty result.
    pub async fn query_in_partition(
        &self,
        key_source: &Document,
        query: &DocumentQuery,
    ) -> RepoResult<Vec<Document>> {
        let ready = self.ready().await?;
        let partition = ready
            .resolver
            .resolve(key_source)
            .ok_or(RepoError::InvalidPartitionKey)?;
        debug!("event=query module=repo status=ok mode=targeted partition={partition}");
        let hits = execute_with_retries(|| self.client.query_documents(partition, query)).await?;
        Ok(hits)
    }

    /// Inserts a document into the partition resolved from its own fields.
    ///
    /// Returns the stored document (locator assigned) on success, or
    /// `Ok(None)` only when the config absorbs write failures.
    ///
    /// # Errors
    /// - `RepoError::MissingPartitionKey` when the extractor cannot derive a
    ///   key from `doc`; never absorbed.
    pub async fn insert(&self, doc: &Document) -> RepoResult<Option<Document>> {
        let ready = self.ready().await?;
        let partition = ready
            .resolver
            .resolve(doc)
            .ok_or(RepoError::MissingPartitionKey)?
            .clone();

        match execute_with_retries(|| self.client.create_document(&partition, doc)).await {
            Ok(stored) => {
                debug!(
                    "event=insert module=repo status=ok partition={partition} id={}",
                    stored.id
                );
                Ok(Some(stored))
            }
            Err(err) => self.absorb_write("insert", None, Err(err.into())),
        }
    }

    /// Replaces a document, recovering its physical location when unknown.
    ///
    /// A document fresh from a read carries its locator and is replaced in
    /// place. Otherwise the partition key is resolved and the stored
    /// instance is read back by id to recover the locator first.
    ///
    /// Returns `Ok(false)` when the document does not exist.
    pub async fn update(&self, doc: &Document) -> RepoResult<bool> {
        let result = self.update_inner(doc).await;
        self.absorb_write("update", false, result)
    }

    async fn update_inner(&self, doc: &Document) -> RepoResult<bool> {
        let ready = self.ready().await?;

        let locator = match &doc.self_link {
            Some(locator) => locator.clone(),
            None => {
                let partition = ready
                    .resolver
                    .resolve(doc)
                    .ok_or(RepoError::InvalidPartitionKey)?;
                let stored =
                    match execute_with_retries(|| self.client.read_document(partition, &doc.id))
                        .await?
                    {
                        Some(stored) => stored,
                        None => return Ok(false),
                    };
                stored.self_link.ok_or_else(|| {
                    RepoError::Store(StoreError::Backend(format!(
                        "store returned document `{}` without a locator",
                        doc.id
                    )))
                })?
            }
        };

        match execute_with_retries(|| self.client.replace_document(&locator, doc)).await {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Deletes the document at a known physical location.
    ///
    /// Returns `Ok(false)` when the locator no longer resolves.
    pub async fn delete(&self, locator: &str) -> RepoResult<bool> {
        let result = match execute_with_retries(|| self.client.delete_document(locator)).await {
            Ok(()) => Ok(true),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(err) => Err(err.into()),
        };
        self.absorb_write("delete", false, result)
    }

    /// Deletes one document by id, composing `get_by_id` with `delete`.
    ///
    /// Returns `Ok(false)` when the id is not found anywhere.
    pub async fn delete_by_id(&self, id: &str) -> RepoResult<bool> {
        let result = self.delete_by_id_inner(id).await;
        self.absorb_write("delete_by_id", false, result)
    }

    async fn delete_by_id_inner(&self, id: &str) -> RepoResult<bool> {
        let doc = match self.get_by_id(id).await? {
            Some(doc) => doc,
            None => return Ok(false),
        };
        let locator = doc.self_link.ok_or_else(|| {
            RepoError::Store(StoreError::Backend(format!(
                "store returned document `{id}` without a locator"
            )))
        })?;

        match execute_with_retries(|| self.client.delete_document(&locator)).await {
            Ok(()) => Ok(true),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Applies the opt-in write-failure policy: store errors become the
    /// fallback value with a warning; partition-key and config errors always
    /// propagate.
    fn absorb_write<T>(&self, operation: &str, fallback: T, result: RepoResult<T>) -> RepoResult<T> {
        match result {
            Err(RepoError::Store(err)) if self.config.absorb_write_failures => {
                warn!(
                    "event=write_absorbed module=repo status=error operation={operation} error={err}"
                );
                Ok(fallback)
            }
            other => other,
        }
    }
}
