//! insu-vector
//!
//! Read-only FAISS flat indexes, the collection store and the multi-collection
//! search engine.

pub mod faiss;
pub mod search;
pub mod store;

pub use faiss::{FlatIndex, Metric, Neighbor, VectorIndex};
pub use search::{
    l2_normalize, pad_embedding, search_collection, search_index_by_query, similarity_to_score, SearchOptions,
    VectorSearchEngine,
};
pub use store::{load_local, normalize_metadata, Collection, CollectionStore, METADATA_FILE};
