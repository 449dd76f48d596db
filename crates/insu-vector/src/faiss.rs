//! Reader for FAISS flat indexes as written by `faiss.write_index`.
//!
//! Layout (little-endian): a fourcc, then the common header
//! `d: i32, ntotal: i64, dummy: i64, dummy: i64, is_trained: u8, metric_type: i32`
//! (`metric_arg: f32` follows when `metric_type > 1`), then the codes as a
//! `u64` float count followed by the floats. `IxMp` wraps a flat index and
//! appends a `u64`-counted `i64` id map.
//!
//! Only exhaustive (flat) indexes are supported; search is a linear scan.

use std::fs;
use std::path::{Path, PathBuf};

use insu_core::{Error, Result};

const METRIC_INNER_PRODUCT: i32 = 0;
const METRIC_L2: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    InnerProduct,
    L2,
}

/// A search hit: index ordinal (or mapped id) and inner-product similarity.
/// `ordinal == -1` means "no result at this rank".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub ordinal: i64,
    pub similarity: f32,
}

/// Read-only nearest-neighbour structure over fixed-dimension vectors.
pub trait VectorIndex: Send + Sync {
    fn dim(&self) -> usize;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Up to `k` neighbours of `query`, most similar first. `query` must have
    /// exactly `dim()` components.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>>;
}

#[derive(Debug, Clone)]
pub struct FlatIndex {
    dim: usize,
    metric: Metric,
    vectors: Vec<f32>,
    ids: Option<Vec<i64>>,
}

impl FlatIndex {
    /// Build from row-major vectors (`vectors.len() == dim * n`).
    pub fn from_vectors(dim: usize, metric: Metric, vectors: Vec<f32>) -> Result<Self> {
        if dim == 0 || vectors.len() % dim != 0 {
            return Err(Error::DimensionMismatch { expected: dim, actual: vectors.len() });
        }
        Ok(Self { dim, metric, vectors, ids: None })
    }

    pub fn read(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let mut reader = ByteReader { buf: &bytes, pos: 0, path: path.to_path_buf() };
        read_index(&mut reader)
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    fn row(&self, i: usize) -> &[f32] {
        &self.vectors[i * self.dim..(i + 1) * self.dim]
    }

    fn similarity(&self, row: &[f32], query: &[f32]) -> f32 {
        match self.metric {
            Metric::InnerProduct => row.iter().zip(query).map(|(a, b)| a * b).sum(),
            // squared distance d between unit vectors relates to their dot product as d = 2 - 2 * ip
            Metric::L2 => {
                let d: f32 = row.iter().zip(query).map(|(a, b)| (a - b) * (a - b)).sum();
                1.0 - d / 2.0
            }
        }
    }
}

impl VectorIndex for FlatIndex {
    fn dim(&self) -> usize {
        self.dim
    }

    fn len(&self) -> usize {
        self.vectors.len() / self.dim
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: query.len() });
        }
        let mut scored: Vec<Neighbor> = (0..self.len())
            .map(|i| Neighbor {
                ordinal: self.ids.as_ref().map_or(i as i64, |ids| ids[i]),
                similarity: self.similarity(self.row(i), query),
            })
            .map(|mut n| {
                // A NaN row must never outrank a real match.
                if n.similarity.is_nan() {
                    n.similarity = f32::NEG_INFINITY;
                }
                n
            })
            .collect();
        scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        scored.truncate(k);
        Ok(scored)
    }
}

struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
    path: PathBuf,
}

impl<'a> ByteReader<'a> {
    fn corrupt(&self, reason: impl Into<String>) -> Error {
        Error::CorruptIndex { path: self.path.clone(), reason: reason.into() }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|&end| end <= self.buf.len());
        match end {
            Some(end) => {
                let buf: &'a [u8] = self.buf;
                let out = &buf[self.pos..end];
                self.pos = end;
                Ok(out)
            }
            None => Err(self.corrupt(format!("unexpected end of file at byte {} (wanted {n} more)", self.pos))),
        }
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    fn i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    fn f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.array()?))
    }

    fn count(&mut self, what: &str) -> Result<usize> {
        let n = self.u64()?;
        usize::try_from(n).map_err(|_| self.corrupt(format!("{what} count {n} does not fit in memory")))
    }

    fn f32_vec(&mut self, n: usize) -> Result<Vec<f32>> {
        let len = n.checked_mul(4).ok_or_else(|| self.corrupt("vector size overflow"))?;
        let bytes = self.take(len)?;
        Ok(bytes.chunks_exact(4).map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect())
    }

    fn i64_vec(&mut self, n: usize) -> Result<Vec<i64>> {
        let len = n.checked_mul(8).ok_or_else(|| self.corrupt("id map size overflow"))?;
        let bytes = self.take(len)?;
        Ok(bytes
            .chunks_exact(8)
            .map(|c| i64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
            .collect())
    }
}

struct Header {
    dim: usize,
    ntotal: usize,
    metric_type: i32,
}

fn read_header(r: &mut ByteReader<'_>) -> Result<Header> {
    let d = r.i32()?;
    let ntotal = r.i64()?;
    let _dummy = r.i64()?;
    let _dummy = r.i64()?;
    let _is_trained = r.u8()?;
    let metric_type = r.i32()?;
    if metric_type > 1 {
        let _metric_arg = r.f32()?;
    }
    let dim = usize::try_from(d).ok().filter(|&d| d > 0).ok_or_else(|| r.corrupt(format!("invalid dimension {d}")))?;
    let ntotal = usize::try_from(ntotal).map_err(|_| r.corrupt(format!("invalid vector count {ntotal}")))?;
    Ok(Header { dim, ntotal, metric_type })
}

fn fourcc_name(tag: [u8; 4]) -> String {
    String::from_utf8_lossy(&tag).into_owned()
}

fn read_index(r: &mut ByteReader<'_>) -> Result<FlatIndex> {
    let tag: [u8; 4] = r.array()?;
    match &tag {
        b"IxFI" | b"IxF2" | b"IxFl" => {
            let header = read_header(r)?;
            let metric = match (&tag, header.metric_type) {
                (b"IxFI", _) => Metric::InnerProduct,
                (b"IxF2", _) => Metric::L2,
                (_, METRIC_INNER_PRODUCT) => Metric::InnerProduct,
                (_, METRIC_L2) => Metric::L2,
                (_, other) => {
                    return Err(Error::UnsupportedIndexFormat(format!(
                        "flat index with metric type {other} in {}",
                        r.path.display()
                    )))
                }
            };
            let floats = r.count("code")?;
            if Some(floats) != header.dim.checked_mul(header.ntotal) {
                return Err(r.corrupt(format!(
                    "expected {} x {} floats, found {floats}",
                    header.ntotal, header.dim
                )));
            }
            let vectors = r.f32_vec(floats)?;
            Ok(FlatIndex { dim: header.dim, metric, vectors, ids: None })
        }
        b"IxMp" => {
            let _outer = read_header(r)?;
            let mut inner = read_index(r)?;
            let n = r.count("id map")?;
            if n != inner.len() {
                return Err(r.corrupt(format!("id map has {n} entries for {} vectors", inner.len())));
            }
            inner.ids = Some(r.i64_vec(n)?);
            Ok(inner)
        }
        _ => Err(Error::UnsupportedIndexFormat(format!(
            "index type '{}' in {} (only flat indexes are supported)",
            fourcc_name(tag),
            r.path.display()
        ))),
    }
}
