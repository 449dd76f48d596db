#![allow(dead_code)]

use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use insu_core::traits::Embedder;
use insu_core::{Error, Result};

/// Write an `IxFI` (inner product) flat index in FAISS's on-disk layout.
pub fn write_flat_index(path: &Path, dim: usize, rows: &[Vec<f32>]) {
    let mut out = Vec::new();
    out.extend_from_slice(b"IxFI");
    out.extend_from_slice(&(dim as i32).to_le_bytes());
    out.extend_from_slice(&(rows.len() as i64).to_le_bytes());
    out.extend_from_slice(&(1i64 << 20).to_le_bytes());
    out.extend_from_slice(&(1i64 << 20).to_le_bytes());
    out.push(1);
    out.extend_from_slice(&0i32.to_le_bytes());
    out.extend_from_slice(&((dim * rows.len()) as u64).to_le_bytes());
    for row in rows {
        assert_eq!(row.len(), dim, "fixture row has wrong dimension");
        for x in row {
            out.extend_from_slice(&x.to_le_bytes());
        }
    }
    fs::write(path, out).expect("write index");
}

/// Create `<root>/<name>/faiss.index` and `metadata.json`.
pub fn write_collection(root: &Path, name: &str, dim: usize, rows: &[Vec<f32>], metadata: &serde_json::Value) -> PathBuf {
    let dir = root.join(name);
    fs::create_dir_all(&dir).expect("mkdir");
    write_flat_index(&dir.join("faiss.index"), dim, rows);
    fs::write(dir.join("metadata.json"), serde_json::to_vec(metadata).expect("json")).expect("write metadata");
    dir
}

/// Returns a fixed vector and counts calls.
pub struct FixedEmbedder {
    pub vector: Vec<f32>,
    pub calls: Arc<AtomicUsize>,
}

impl FixedEmbedder {
    pub fn new(vector: Vec<f32>) -> Self {
        Self { vector, calls: Arc::new(AtomicUsize::new(0)) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for FixedEmbedder {
    fn embedder_id(&self) -> &str {
        "fixed"
    }

    async fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vector.clone())
    }
}

pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    fn embedder_id(&self) -> &str {
        "failing"
    }

    async fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
        Err(Error::EmbeddingService("503 from upstream".into()))
    }
}

/// Never answers within any reasonable timeout.
pub struct StalledEmbedder;

#[async_trait]
impl Embedder for StalledEmbedder {
    fn embedder_id(&self) -> &str {
        "stalled"
    }

    async fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
        tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        Ok(vec![1.0, 0.0])
    }
}
