//! Durable persistence of a vector index and its registry
//!
//! Layout of one store:
//!
//! ```text
//! <root>/<store>/CURRENT                   name of the live generation
//! <root>/<store>/gen-<uuid>/index.bin      vectors (bincode)
//! <root>/<store>/gen-<uuid>/registry.json  slot -> chunk, dimensions, metric
//! ```
//!
//! A save writes a complete new generation and only then repoints `CURRENT`
//! with an atomic rename, so readers see either the old or the new store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::config::IndexConfig;
use crate::error::{Error, Result};
use crate::index::{Metric, VectorIndex};
use crate::types::Chunk;

const CURRENT_FILE: &str = "CURRENT";
const INDEX_FILE: &str = "index.bin";
const REGISTRY_FILE: &str = "registry.json";
const GENERATION_PREFIX: &str = "gen-";

/// On-disk format version of both artifacts
pub const FORMAT_VERSION: u32 = 1;

/// Binary index artifact
#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    format_version: u32,
    metric: Metric,
    dimensions: usize,
    vector_count: usize,
    vectors: Vec<Vec<f32>>,
}

/// One registry entry: the chunk stored in a slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub slot: usize,
    pub text: String,
    pub start: usize,
    pub overlap: usize,
}

/// Side record mapping slots to chunks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registry {
    pub format_version: u32,
    /// Model identifier of the embedding provider that built the index
    pub embedding_model: String,
    pub dimensions: usize,
    pub metric: Metric,
    pub vector_count: usize,
    pub created_at: DateTime<Utc>,
    /// SHA-256 over all chunk texts, in slot order
    pub content_hash: String,
    pub entries: Vec<RegistryEntry>,
}

/// Store metadata returned alongside a loaded index
#[derive(Debug, Clone)]
pub struct StoreManifest {
    pub store: String,
    pub generation: String,
    pub embedding_model: String,
    pub dimensions: usize,
    pub metric: Metric,
    pub vector_count: usize,
    pub created_at: DateTime<Utc>,
    pub content_hash: String,
}

/// A validated index restored from disk
#[derive(Debug)]
pub struct LoadedIndex {
    pub index: VectorIndex,
    pub manifest: StoreManifest,
}

/// Filesystem-backed store of named indexes
#[derive(Debug, Clone)]
pub struct IndexStore {
    root: PathBuf,
}

impl IndexStore {
    /// Create a store rooted at `root` (created lazily on first save)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether a store with this name has a live generation
    pub fn exists(&self, name: &str) -> bool {
        validate_name(name).is_ok() && self.store_dir(name).join(CURRENT_FILE).is_file()
    }

    /// Persist `index` as the new content of store `name`.
    ///
    /// Returns the name of the generation that became live.
    pub fn save(&self, name: &str, index: &VectorIndex, embedding_model: &str) -> Result<String> {
        validate_name(name)?;
        if index.len() != index.registry().len() {
            return Err(Error::internal("index and registry lengths diverged"));
        }

        let store_dir = self.store_dir(name);
        fs::create_dir_all(&store_dir)?;

        let previous = fs::read_to_string(store_dir.join(CURRENT_FILE))
            .ok()
            .map(|raw| raw.trim().to_string());

        let generation = format!("{}{}", GENERATION_PREFIX, Uuid::new_v4().simple());
        let gen_dir = store_dir.join(&generation);
        fs::create_dir(&gen_dir)?;

        let result = self
            .write_generation(&gen_dir, index, embedding_model)
            .and_then(|_| self.swap_current(&store_dir, &generation));

        if let Err(e) = result {
            if let Err(cleanup) = fs::remove_dir_all(&gen_dir) {
                tracing::warn!("Failed to remove partial generation {}: {}", gen_dir.display(), cleanup);
            }
            return Err(e);
        }

        tracing::info!(
            "Saved store '{}' generation {} ({} vectors, dim={}, metric={})",
            name,
            generation,
            index.len(),
            index.dimensions(),
            index.metric()
        );

        self.remove_stale_generations(&store_dir, &generation, previous.as_deref());
        Ok(generation)
    }

    fn write_generation(&self, gen_dir: &Path, index: &VectorIndex, embedding_model: &str) -> Result<()> {
        let index_file = IndexFile {
            format_version: FORMAT_VERSION,
            metric: index.metric(),
            dimensions: index.dimensions(),
            vector_count: index.len(),
            vectors: index.vectors().to_vec(),
        };
        let bytes = bincode::serde::encode_to_vec(&index_file, bincode::config::standard())
            .map_err(|e| Error::internal(format!("failed to encode index: {}", e)))?;
        write_synced(&gen_dir.join(INDEX_FILE), &bytes)?;

        let registry = Registry {
            format_version: FORMAT_VERSION,
            embedding_model: embedding_model.to_string(),
            dimensions: index.dimensions(),
            metric: index.metric(),
            vector_count: index.len(),
            created_at: Utc::now(),
            content_hash: content_hash(index.registry()),
            entries: index
                .registry()
                .iter()
                .enumerate()
                .map(|(slot, chunk)| RegistryEntry {
                    slot,
                    text: chunk.text.clone(),
                    start: chunk.start,
                    overlap: chunk.overlap,
                })
                .collect(),
        };
        let json = serde_json::to_vec_pretty(&registry)?;
        write_synced(&gen_dir.join(REGISTRY_FILE), &json)?;

        sync_dir(gen_dir);
        Ok(())
    }

    /// Point `CURRENT` at `generation` via temp file + rename
    fn swap_current(&self, store_dir: &Path, generation: &str) -> Result<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(store_dir)?;
        writeln!(tmp, "{}", generation)?;
        tmp.as_file().sync_all()?;
        tmp.persist(store_dir.join(CURRENT_FILE))
            .map_err(|e| Error::Io(e.error))?;
        sync_dir(store_dir);
        Ok(())
    }

    /// Delete every generation except `live` and the one it replaced. A
    /// reader that resolved `CURRENT` just before the swap can still finish.
    fn remove_stale_generations(&self, store_dir: &Path, live: &str, previous: Option<&str>) {
        let entries = match fs::read_dir(store_dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Cannot list {}: {}", store_dir.display(), e);
                return;
            }
        };

        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else { continue };
            let keep = file_name == live || Some(file_name) == previous;
            if file_name.starts_with(GENERATION_PREFIX) && !keep {
                if let Err(e) = fs::remove_dir_all(entry.path()) {
                    tracing::warn!("Failed to remove stale generation {}: {}", file_name, e);
                } else {
                    tracing::debug!("Removed stale generation {}", file_name);
                }
            }
        }
    }

    /// Restore store `name`, validating both artifacts against each other
    pub fn load(&self, name: &str, config: &IndexConfig) -> Result<LoadedIndex> {
        validate_name(name)?;
        let store_dir = self.store_dir(name);
        let current_path = store_dir.join(CURRENT_FILE);

        let generation = match fs::read_to_string(&current_path) {
            Ok(raw) => raw.trim().to_string(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::StoreNotFound { store: name.to_string() });
            }
            Err(e) => return Err(e.into()),
        };

        let corrupt = |reason: String| Error::store_corrupt(name, reason);

        let separator = |c: char| c == '/' || c == '\\';
        if !generation.starts_with(GENERATION_PREFIX) || generation.contains(separator) {
            return Err(corrupt(format!("invalid generation pointer '{}'", generation)));
        }
        let gen_dir = store_dir.join(&generation);

        let index_bytes = read_artifact(&gen_dir.join(INDEX_FILE)).map_err(&corrupt)?;
        let (index_file, _): (IndexFile, usize) =
            bincode::serde::decode_from_slice(&index_bytes, bincode::config::standard())
                .map_err(|e| corrupt(format!("unreadable {}: {}", INDEX_FILE, e)))?;

        let registry_bytes = read_artifact(&gen_dir.join(REGISTRY_FILE)).map_err(&corrupt)?;
        let registry: Registry = serde_json::from_slice(&registry_bytes)
            .map_err(|e| corrupt(format!("unreadable {}: {}", REGISTRY_FILE, e)))?;

        validate_artifacts(&index_file, &registry).map_err(&corrupt)?;

        let mut index = VectorIndex::with_metric(index_file.dimensions, index_file.metric, config)
            .map_err(|e| corrupt(e.to_string()))?;
        let chunks = registry
            .entries
            .iter()
            .map(|e| Chunk {
                index: e.slot,
                text: e.text.clone(),
                start: e.start,
                overlap: e.overlap,
            })
            .collect();
        index
            .add(index_file.vectors, chunks)
            .map_err(|e| corrupt(e.to_string()))?;

        tracing::debug!(
            "Loaded store '{}' generation {} ({} vectors)",
            name,
            generation,
            index.len()
        );

        Ok(LoadedIndex {
            index,
            manifest: StoreManifest {
                store: name.to_string(),
                generation,
                embedding_model: registry.embedding_model,
                dimensions: registry.dimensions,
                metric: registry.metric,
                vector_count: registry.vector_count,
                created_at: registry.created_at,
                content_hash: registry.content_hash,
            },
        })
    }

    /// Delete a store and all of its generations
    pub fn remove(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        let dir = self.store_dir(name);
        if !dir.exists() {
            return Err(Error::StoreNotFound { store: name.to_string() });
        }
        fs::remove_dir_all(dir)?;
        Ok(())
    }

    fn store_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

/// Store names become directory names
pub(crate) fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= 128
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "invalid store name '{}': use letters, digits, '-' or '_'",
            name
        )))
    }
}

fn validate_artifacts(index: &IndexFile, registry: &Registry) -> std::result::Result<(), String> {
    if index.format_version != FORMAT_VERSION || registry.format_version != FORMAT_VERSION {
        return Err(format!(
            "unsupported format version (index {}, registry {})",
            index.format_version, registry.format_version
        ));
    }
    if index.vector_count != index.vectors.len() {
        return Err(format!(
            "index records {} vectors but holds {}",
            index.vector_count,
            index.vectors.len()
        ));
    }
    if registry.vector_count != registry.entries.len() {
        return Err(format!(
            "registry records {} vectors but lists {} entries",
            registry.vector_count,
            registry.entries.len()
        ));
    }
    if index.vector_count != registry.entries.len() {
        return Err(format!(
            "index holds {} vectors but registry lists {} entries",
            index.vector_count,
            registry.entries.len()
        ));
    }
    if index.dimensions != registry.dimensions {
        return Err(format!(
            "index dimensionality {} differs from registry {}",
            index.dimensions, registry.dimensions
        ));
    }
    if index.metric != registry.metric {
        return Err(format!(
            "index metric {} differs from registry {}",
            index.metric, registry.metric
        ));
    }
    if let Some(v) = index.vectors.iter().find(|v| v.len() != index.dimensions) {
        return Err(format!(
            "vector of width {} in a {}-dimensional index",
            v.len(),
            index.dimensions
        ));
    }
    if let Some((pos, entry)) = registry
        .entries
        .iter()
        .enumerate()
        .find(|(pos, e)| e.slot != *pos)
    {
        return Err(format!("registry entry {} claims slot {}", pos, entry.slot));
    }
    Ok(())
}

fn read_artifact(path: &Path) -> std::result::Result<Vec<u8>, String> {
    fs::read(path).map_err(|e| format!("cannot read {}: {}", path.display(), e))
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

/// Flush directory entries; not supported on every platform
fn sync_dir(dir: &Path) {
    if let Ok(handle) = File::open(dir) {
        let _ = handle.sync_all();
    }
}

/// SHA-256 over chunk texts in slot order
pub fn content_hash(chunks: &[Chunk]) -> String {
    let mut hasher = Sha256::new();
    for chunk in chunks {
        hasher.update((chunk.text.len() as u64).to_le_bytes());
        hasher.update(chunk.text.as_bytes());
    }
    hex::encode(hasher.finalize())
}
