//! Per-insurer collections on disk and the process-wide loaded set.
//!
//! Layout: `<root>/<collection>/<index_name>.<ext>` next to `metadata.json`.
//! A collection is read from storage at most once per store; later loads hand
//! back the same `Arc`.

use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use insu_core::config::{DataSettings, INDEX_EXTENSIONS};
use insu_core::registry::InsurerRegistry;
use insu_core::types::DocRecord;
use insu_core::{Error, Result};

use crate::faiss::{FlatIndex, VectorIndex};

pub const METADATA_FILE: &str = "metadata.json";

/// A loaded, immutable collection: one index plus its ordinal-keyed metadata.
pub struct Collection {
    name: String,
    index: Box<dyn VectorIndex>,
    metadata: HashMap<String, DocRecord>,
}

impl Collection {
    pub fn new(name: impl Into<String>, index: Box<dyn VectorIndex>, metadata: HashMap<String, DocRecord>) -> Self {
        Self { name: name.into(), index, metadata }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> &dyn VectorIndex {
        self.index.as_ref()
    }

    pub fn metadata(&self) -> &HashMap<String, DocRecord> {
        &self.metadata
    }

    pub fn lookup(&self, doc_id: &str) -> Option<&DocRecord> {
        self.metadata.get(doc_id)
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("dim", &self.index.dim())
            .field("vectors", &self.index.len())
            .field("metadata", &self.metadata.len())
            .finish()
    }
}

pub struct CollectionStore {
    root: PathBuf,
    index_name: String,
    index_extension: String,
    registry: InsurerRegistry,
    loaded: Mutex<Vec<Arc<Collection>>>,
}

impl CollectionStore {
    pub fn new(root: impl Into<PathBuf>, registry: InsurerRegistry) -> Self {
        Self {
            root: root.into(),
            index_name: "faiss".to_string(),
            index_extension: "index".to_string(),
            registry,
            loaded: Mutex::new(Vec::new()),
        }
    }

    pub fn from_settings(data: &DataSettings, registry: InsurerRegistry) -> Self {
        Self::new(data.vector_root(), registry).with_index_file(&data.index_name, &data.index_extension)
    }

    pub fn with_index_file(mut self, index_name: &str, index_extension: &str) -> Self {
        self.index_name = index_name.to_string();
        self.index_extension = index_extension.to_string();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn registry(&self) -> &InsurerRegistry {
        &self.registry
    }

    /// Load `name` (collection id, insurer name or alias), reading storage
    /// only the first time.
    pub fn load(&self, name: &str) -> Result<Arc<Collection>> {
        let collection = self
            .registry
            .lookup(name)
            .map(|i| i.collection)
            .ok_or_else(|| Error::UnknownCollection(name.to_string()))?;

        // Held across the read so concurrent loads of one name hit storage once.
        let mut loaded = self.loaded.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(existing) = loaded.iter().find(|c| c.name() == collection) {
            debug!(collection, "collection already loaded");
            return Ok(Arc::clone(existing));
        }

        let folder = self.collection_dir(collection);
        let (index, metadata) = load_local(&folder, &self.index_name, &self.index_extension)?;
        info!(
            collection,
            dim = index.dim(),
            vectors = index.len(),
            metadata = metadata.len(),
            "loaded collection"
        );
        let loaded_collection = Arc::new(Collection::new(collection, Box::new(index), metadata));
        loaded.push(Arc::clone(&loaded_collection));
        Ok(loaded_collection)
    }

    /// Snapshot of the loaded collections, in load order.
    pub fn loaded(&self) -> Vec<Arc<Collection>> {
        self.loaded.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        let Some(insurer) = self.registry.lookup(name) else {
            return false;
        };
        self.loaded
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .any(|c| c.name() == insurer.collection)
    }

    /// Registered collections that have a directory under the root.
    pub fn available(&self) -> BTreeSet<String> {
        let present: Vec<String> = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir())
            .map(|e| e.file_name().to_string_lossy().to_lowercase())
            .collect();
        self.registry
            .collections()
            .filter(|c| present.iter().any(|p| p == &c.to_lowercase()))
            .map(str::to_string)
            .collect()
    }

    /// Directory for `collection`, matching the name case-insensitively when
    /// the exact spelling is absent.
    fn collection_dir(&self, collection: &str) -> PathBuf {
        let exact = self.root.join(collection);
        if exact.is_dir() {
            return exact;
        }
        let wanted = collection.to_lowercase();
        WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .find(|e| e.file_type().is_dir() && e.file_name().to_string_lossy().to_lowercase() == wanted)
            .map(|e| e.into_path())
            .unwrap_or(exact)
    }
}

/// Read one collection folder: the index file, then `metadata.json`.
pub fn load_local(folder: &Path, index_name: &str, extension: &str) -> Result<(FlatIndex, HashMap<String, DocRecord>)> {
    if !INDEX_EXTENSIONS.contains(&extension) {
        return Err(Error::UnsupportedIndexFormat(format!(
            "extension '{extension}' (expected one of {INDEX_EXTENSIONS:?})"
        )));
    }
    let index_path = folder.join(format!("{index_name}.{extension}"));
    if !index_path.is_file() {
        return Err(Error::IndexFileMissing(index_path));
    }
    let metadata_path = folder.join(METADATA_FILE);
    if !metadata_path.is_file() {
        return Err(Error::MetadataFileMissing(metadata_path));
    }

    let index = FlatIndex::read(&index_path)?;
    let raw = fs::read_to_string(&metadata_path)?;
    let metadata = serde_json::from_str::<Value>(&raw)
        .and_then(normalize_metadata)
        .map_err(|source| Error::InvalidMetadata { path: metadata_path.clone(), source })?;

    if metadata.len() != index.len() {
        warn!(
            folder = %folder.display(),
            vectors = index.len(),
            metadata = metadata.len(),
            "index and metadata sizes differ"
        );
    }
    Ok((index, metadata))
}

/// Arrays become maps keyed by stringified position; objects are kept as is.
pub fn normalize_metadata(value: Value) -> serde_json::Result<HashMap<String, DocRecord>> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, v)| Ok((i.to_string(), serde_json::from_value(v)?)))
            .collect(),
        Value::Object(map) => map.into_iter().map(|(k, v)| Ok((k, serde_json::from_value(v)?))).collect(),
        _ => Err(serde::de::Error::custom("metadata must be a JSON array or object")),
    }
}
