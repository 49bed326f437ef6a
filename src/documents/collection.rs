//! Persistent vector collection backing the [`DocumentStore`] contract.
//!
//! All entries live in memory and are searched brute-force by cosine
//! distance. Every committed `add` or `reset` rewrites a JSON snapshot
//! (`<base>/<name>.json`) atomically through a temp file.
//!
//! Both operations write the snapshot before changing memory, so a failed
//! write leaves the collection as it was.
//!
//! Reset swaps in a new [`CollectionHandle`] and retires the old one.
//! Queries already holding the old handle finish against its contents; an
//! `add` that started before the reset fails with `StaleGeneration` instead
//! of writing into the discarded collection.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize, Serializer};

use super::embedding::{EmbeddingGenerator, cosine_distance};
use super::store::{DocumentStore, Generation, StoreError, StoreResult};
use super::types::{Chunk, ChunkId, ChunkMetadata, ScoredChunk};

/// One stored chunk with its vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    id: ChunkId,
    content: String,
    metadata: ChunkMetadata,
    embedding: Vec<f32>,
}

/// On-disk snapshot of a collection.
#[derive(Serialize, Deserialize)]
struct PersistedCollection {
    name: String,
    generation: Generation,
    embedding: String,
    dimension: usize,
    entries: Vec<Entry>,
}

/// Borrowing twin of [`PersistedCollection`] used when saving.
#[derive(Serialize)]
struct PersistedCollectionRef<'a> {
    name: &'a str,
    generation: Generation,
    embedding: &'a str,
    dimension: usize,
    entries: EntriesRef<'a>,
}

/// Stored entries followed by a batch not yet committed.
struct EntriesRef<'a> {
    stored: &'a [Entry],
    pending: &'a [Entry],
}

impl Serialize for EntriesRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.stored.iter().chain(self.pending))
    }
}

/// One generation of the collection.
#[derive(Debug)]
struct CollectionHandle {
    generation: Generation,
    retired: AtomicBool,
    entries: RwLock<Vec<Entry>>,
    /// Ids in `entries`; only changed under the write barrier.
    ids: RwLock<HashSet<ChunkId>>,
}

impl CollectionHandle {
    fn new(generation: Generation, entries: Vec<Entry>) -> Self {
        let ids = entries.iter().map(|e| e.id).collect();
        Self {
            generation,
            retired: AtomicBool::new(false),
            entries: RwLock::new(entries),
            ids: RwLock::new(ids),
        }
    }

    fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }
}

/// In-process vector collection with JSON snapshot persistence.
pub struct VectorCollection {
    name: String,
    /// Snapshot path; `None` keeps the collection in memory only.
    snapshot_path: Option<PathBuf>,
    current: RwLock<Arc<CollectionHandle>>,
    embedder: Arc<dyn EmbeddingGenerator>,
    /// Serializes commits (add) against reset.
    write_barrier: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for VectorCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handle = self.current.read();
        f.debug_struct("VectorCollection")
            .field("name", &self.name)
            .field("snapshot_path", &self.snapshot_path)
            .field("generation", &handle.generation)
            .field("entries", &handle.entries.read().len())
            .field("embedding", &self.embedder.label())
            .finish()
    }
}

impl VectorCollection {
    /// Open the named collection under `base_path`, creating it on first use.
    ///
    /// Fails with `EmbeddingSchemeMismatch` if the snapshot was built with a
    /// different embedding scheme than `embedder`.
    pub fn open(
        base_path: impl AsRef<Path>,
        name: &str,
        embedder: Arc<dyn EmbeddingGenerator>,
    ) -> StoreResult<Self> {
        let base_path = base_path.as_ref();
        std::fs::create_dir_all(base_path)?;
        let snapshot_path = base_path.join(format!("{name}.json"));

        let handle = if snapshot_path.exists() {
            let content = std::fs::read_to_string(&snapshot_path)?;
            let persisted: PersistedCollection = serde_json::from_str(&content)?;
            check_scheme(&persisted, embedder.as_ref())?;
            tracing::debug!(
                target: "store",
                "loaded collection {name} generation {} ({} chunks)",
                persisted.generation,
                persisted.entries.len()
            );
            CollectionHandle::new(persisted.generation, persisted.entries)
        } else {
            tracing::debug!(target: "store", "creating collection {name} at {}", snapshot_path.display());
            CollectionHandle::new(Generation::INITIAL, Vec::new())
        };

        Ok(Self {
            name: name.to_string(),
            snapshot_path: Some(snapshot_path),
            current: RwLock::new(Arc::new(handle)),
            embedder,
            write_barrier: tokio::sync::Mutex::new(()),
        })
    }

    /// Create a collection that is never written to disk.
    pub fn in_memory(name: &str, embedder: Arc<dyn EmbeddingGenerator>) -> Self {
        Self {
            name: name.to_string(),
            snapshot_path: None,
            current: RwLock::new(Arc::new(CollectionHandle::new(
                Generation::INITIAL,
                Vec::new(),
            ))),
            embedder,
            write_barrier: tokio::sync::Mutex::new(()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn current_handle(&self) -> Arc<CollectionHandle> {
        self.current.read().clone()
    }

    async fn embed(&self, texts: Vec<String>) -> StoreResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let embedder = self.embedder.clone();
        let expected = texts.len();
        let vectors = tokio::task::spawn_blocking(move || {
            let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
            embedder.generate_embeddings(&refs)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("embedding task failed: {e}")))??;

        if vectors.len() != expected {
            return Err(StoreError::Unavailable(format!(
                "embedder returned {} vectors for {expected} texts",
                vectors.len()
            )));
        }
        Ok(vectors)
    }

    /// Write the handle's entries plus `pending` to the snapshot file, if any.
    ///
    /// The handle itself is not modified.
    async fn persist(
        &self,
        generation: Generation,
        stored: &CollectionHandle,
        pending: &[Entry],
    ) -> StoreResult<()> {
        let Some(path) = self.snapshot_path.clone() else {
            return Ok(());
        };

        let bytes = {
            let entries = stored.entries.read();
            serde_json::to_vec(&PersistedCollectionRef {
                name: &self.name,
                generation,
                embedding: self.embedder.label(),
                dimension: self.embedder.dimension(),
                entries: EntriesRef {
                    stored: &entries,
                    pending,
                },
            })?
        };

        tokio::task::spawn_blocking(move || write_atomically(&path, &bytes))
            .await
            .map_err(|e| StoreError::Unavailable(format!("persist task failed: {e}")))?
    }
}

fn check_scheme(persisted: &PersistedCollection, embedder: &dyn EmbeddingGenerator) -> StoreResult<()> {
    if persisted.embedding != embedder.label() {
        return Err(StoreError::EmbeddingSchemeMismatch {
            stored: persisted.embedding.clone(),
            current: embedder.label().to_string(),
        });
    }
    if persisted.dimension != embedder.dimension() {
        return Err(StoreError::DimensionMismatch {
            expected: persisted.dimension,
            actual: embedder.dimension(),
        });
    }
    Ok(())
}

fn write_atomically(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

fn validate_metadata(metadata: &ChunkMetadata) -> StoreResult<()> {
    if metadata.filename.trim().is_empty() {
        return Err(StoreError::InvalidMetadata(
            "filename must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for VectorCollection {
    async fn add(&self, chunks: Vec<Chunk>) -> StoreResult<Vec<ChunkId>> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let handle = self.current_handle();
        let dimension = self.embedder.dimension();

        for chunk in &chunks {
            validate_metadata(&chunk.metadata)?;
            if let Some(embedding) = &chunk.embedding {
                if embedding.len() != dimension {
                    return Err(StoreError::DimensionMismatch {
                        expected: dimension,
                        actual: embedding.len(),
                    });
                }
            }
        }

        // Embed only chunks that arrived without a vector
        let missing: Vec<String> = chunks
            .iter()
            .filter(|c| c.embedding.is_none())
            .map(|c| c.content.clone())
            .collect();
        let mut computed = self.embed(missing).await?.into_iter();

        let mut new_entries = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let embedding = match chunk.embedding {
                Some(embedding) => embedding,
                None => computed.next().ok_or_else(|| {
                    StoreError::Unavailable("missing computed embedding".to_string())
                })?,
            };
            new_entries.push(Entry {
                id: chunk.id.unwrap_or_else(ChunkId::generate),
                content: chunk.content,
                metadata: chunk.metadata,
                embedding,
            });
        }

        let _barrier = self.write_barrier.lock().await;
        if handle.is_retired() {
            return Err(StoreError::StaleGeneration(handle.generation));
        }

        let ids: Vec<ChunkId> = new_entries.iter().map(|e| e.id).collect();
        {
            let stored = handle.ids.read();
            let mut batch = HashSet::with_capacity(ids.len());
            for id in &ids {
                if stored.contains(id) || !batch.insert(*id) {
                    return Err(StoreError::DuplicateId(*id));
                }
            }
        }

        // Disk first; readers never see a batch that fails to commit
        self.persist(handle.generation, &handle, &new_entries).await?;
        handle.ids.write().extend(ids.iter().copied());
        handle.entries.write().extend(new_entries);

        tracing::debug!(
            target: "store",
            "added {} chunks to {} (generation {})",
            ids.len(),
            self.name,
            handle.generation
        );
        Ok(ids)
    }

    async fn query(&self, text: &str, k: usize) -> StoreResult<Vec<ScoredChunk>> {
        if k == 0 {
            return Err(StoreError::InvalidRequest("k must be at least 1".to_string()));
        }

        let handle = self.current_handle();
        if handle.entries.read().is_empty() {
            return Ok(Vec::new());
        }

        let query_vec = self
            .embed(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Unavailable("no query embedding generated".to_string()))?;

        let entries = handle.entries.read();
        let mut scored: Vec<(usize, f32)> = entries
            .iter()
            .enumerate()
            .map(|(pos, entry)| (pos, cosine_distance(&query_vec, &entry.embedding)))
            .collect();

        // Stable sort keeps insertion order for equal distances
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(pos, distance)| {
                let entry = &entries[pos];
                ScoredChunk {
                    id: entry.id,
                    content: entry.content.clone(),
                    metadata: entry.metadata.clone(),
                    distance,
                }
            })
            .collect())
    }

    async fn list_metadata(&self) -> StoreResult<Vec<ChunkMetadata>> {
        let handle = self.current_handle();
        let entries = handle.entries.read();
        Ok(entries.iter().map(|e| e.metadata.clone()).collect())
    }

    async fn count(&self) -> StoreResult<usize> {
        Ok(self.current_handle().entries.read().len())
    }

    async fn reset(&self) -> StoreResult<Generation> {
        let _barrier = self.write_barrier.lock().await;

        let fresh = Arc::new(CollectionHandle::new(
            self.generation().next(),
            Vec::new(),
        ));
        self.persist(fresh.generation, &fresh, &[]).await?;

        {
            let mut current = self.current.write();
            current.retired.store(true, Ordering::Release);
            *current = fresh.clone();
        }
        tracing::info!(target: "store", "reset collection {} to generation {}", self.name, fresh.generation);
        Ok(fresh.generation)
    }

    fn generation(&self) -> Generation {
        self.current.read().generation
    }

    fn embedding_label(&self) -> String {
        self.embedder.label().to_string()
    }
}
