mod common;

use serde_json::json;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use insu_core::registry::InsurerRegistry;
use insu_core::types::DocRecord;
use insu_core::{Error, Result};
use insu_vector::{
    search_index_by_query, Collection, CollectionStore, FlatIndex, Metric, Neighbor, SearchOptions, VectorIndex,
    VectorSearchEngine,
};

use common::{write_collection, FailingEmbedder, FixedEmbedder, StalledEmbedder};

const SAMSUNG: &str = "Samsung_YakMu2404103NapHae20250113";
const HANWHA: &str = "HanWha_YakHan20250201";
const MERITZ: &str = "Meritz_YakMu220250113";

fn targets(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Returns canned neighbours regardless of the query.
struct CannedIndex {
    dim: usize,
    hits: Vec<Neighbor>,
}

impl VectorIndex for CannedIndex {
    fn dim(&self) -> usize {
        self.dim
    }

    fn len(&self) -> usize {
        self.hits.len()
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        assert_eq!(query.len(), self.dim);
        Ok(self.hits.iter().copied().take(k).collect())
    }
}

struct BrokenIndex;

impl VectorIndex for BrokenIndex {
    fn dim(&self) -> usize {
        2
    }

    fn len(&self) -> usize {
        0
    }

    fn search(&self, _query: &[f32], _k: usize) -> Result<Vec<Neighbor>> {
        Err(Error::UnsupportedIndexFormat("broken fixture".into()))
    }
}

/// Blocks the search thread longer than the collection timeout used in tests.
struct SlowIndex;

impl VectorIndex for SlowIndex {
    fn dim(&self) -> usize {
        2
    }

    fn len(&self) -> usize {
        1
    }

    fn search(&self, _query: &[f32], _k: usize) -> Result<Vec<Neighbor>> {
        std::thread::sleep(Duration::from_millis(400));
        Ok(vec![Neighbor { ordinal: 0, similarity: 0.9 }])
    }
}

fn canned(name: &str, hits: Vec<Neighbor>, metadata: &[(&str, &str)]) -> Arc<Collection> {
    let metadata: HashMap<String, DocRecord> =
        metadata.iter().map(|(k, v)| (k.to_string(), DocRecord::text_only(*v))).collect();
    Arc::new(Collection::new(name, Box::new(CannedIndex { dim: 2, hits }), metadata))
}

fn engine(embedder: Arc<FixedEmbedder>) -> VectorSearchEngine {
    VectorSearchEngine::new(embedder, SearchOptions::default())
}

#[tokio::test]
async fn empty_loaded_set_returns_exact_fallback_without_embedding() {
    let embedder = Arc::new(FixedEmbedder::new(vec![1.0, 0.0]));
    let report = engine(embedder.clone()).search("질문", &[], &targets(&[SAMSUNG]), 2).await.expect("search");

    let json = serde_json::to_value(&report.results).expect("json");
    assert_eq!(
        json,
        json!([{"collection": "default", "id": "0", "score": 1.0, "metadata": {"text": "로드된 컬렉션이 없습니다."}}])
    );
    assert_eq!(embedder.calls(), 0);
}

#[tokio::test]
async fn untargeted_collections_return_fallback_without_embedding() {
    let embedder = Arc::new(FixedEmbedder::new(vec![1.0, 0.0]));
    let loaded = vec![canned(SAMSUNG, vec![], &[])];
    let report = engine(embedder.clone()).search("질문", &loaded, &targets(&[HANWHA]), 2).await.expect("search");

    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].collection, "default");
    assert_eq!(report.results[0].metadata.text, "지정된 컬렉션을 찾을 수 없습니다.");
    assert_eq!(embedder.calls(), 0);
}

#[tokio::test]
async fn merges_collections_best_first_and_embeds_once() {
    let tmp = TempDir::new().expect("tmp");
    write_collection(
        tmp.path(),
        SAMSUNG,
        2,
        &[vec![1.0, 0.0], vec![0.0, 1.0]],
        &json!([{"header1": "암 진단비", "text": "삼성 암 진단비 약관"}, "삼성 기타"]),
    );
    write_collection(tmp.path(), HANWHA, 2, &[vec![0.6, 0.8]], &json!(["한화 약관"]));
    let store = CollectionStore::new(tmp.path(), InsurerRegistry::builtin());
    store.load(SAMSUNG).expect("load");
    store.load(HANWHA).expect("load");

    let embedder = Arc::new(FixedEmbedder::new(vec![1.0, 0.0]));
    let report = engine(embedder.clone())
        .search("암 보장 비교", &store.loaded(), &targets(&[SAMSUNG, HANWHA]), 2)
        .await
        .expect("search");

    assert!(report.failures.is_empty());
    assert_eq!(embedder.calls(), 1);
    let texts: Vec<&str> = report.results.iter().map(|r| r.metadata.text.as_str()).collect();
    assert_eq!(texts, vec!["삼성 암 진단비 약관", "한화 약관", "삼성 기타"]);
    assert_eq!(report.results[0].metadata.header.as_deref(), Some("암 진단비"));
    assert!(report.results.windows(2).all(|w| w[0].score <= w[1].score));
    assert!(report.results.iter().all(|r| (0.0..=1.0).contains(&r.score)));
    assert!(report.results[0].score.abs() < 1e-6);
}

#[tokio::test]
async fn shorter_query_is_padded_to_index_dimension() {
    let tmp = TempDir::new().expect("tmp");
    write_collection(tmp.path(), MERITZ, 4, &[vec![0.0, 0.0, 1.0, 0.0], vec![1.0, 0.0, 0.0, 0.0]], &json!(["c", "a"]));
    let store = CollectionStore::new(tmp.path(), InsurerRegistry::builtin());
    store.load(MERITZ).expect("load");

    let embedder = Arc::new(FixedEmbedder::new(vec![2.0, 0.0]));
    let report = engine(embedder).search("메리츠", &store.loaded(), &targets(&[MERITZ]), 1).await.expect("search");
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].metadata.text, "a");
    assert_eq!(report.results[0].doc_id, "1");
}

#[tokio::test]
async fn metadata_miss_and_empty_ordinal_become_collection_sentinels() {
    let hits = vec![
        Neighbor { ordinal: 0, similarity: 0.9 },
        Neighbor { ordinal: 5, similarity: 0.5 },
        Neighbor { ordinal: -1, similarity: f32::NEG_INFINITY },
    ];
    let loaded = vec![canned(SAMSUNG, hits, &[("0", "본문")])];
    let embedder = Arc::new(FixedEmbedder::new(vec![1.0, 0.0]));
    let report = engine(embedder).search("삼성", &loaded, &targets(&[SAMSUNG]), 3).await.expect("search");

    assert_eq!(report.results.len(), 3);
    assert!(report.results.iter().all(|r| r.collection == SAMSUNG));
    assert_eq!(report.results[0].metadata.text, "본문");
    assert_eq!(report.results[1].doc_id, "5");
    assert_eq!(report.results[1].metadata.text, "인덱스 5의 메타데이터를 찾을 수 없습니다.");
    assert_eq!(report.results[2].doc_id, "-1");
    assert_eq!(report.results[2].score, 1.0);
}

#[tokio::test]
async fn failing_collection_is_isolated() {
    let good = canned(HANWHA, vec![Neighbor { ordinal: 0, similarity: 0.8 }], &[("0", "한화 약관")]);
    let bad = Arc::new(Collection::new(SAMSUNG, Box::new(BrokenIndex), HashMap::new()));
    let embedder = Arc::new(FixedEmbedder::new(vec![1.0, 0.0]));

    let report = engine(embedder)
        .search("비교", &[bad, good], &targets(&[SAMSUNG, HANWHA]), 2)
        .await
        .expect("search");

    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].metadata.text, "한화 약관");
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].collection, SAMSUNG);
    assert!(report.failures[0].reason.contains("broken fixture"));
}

#[tokio::test]
async fn all_collections_failing_yields_no_results_sentinel() {
    let bad = Arc::new(Collection::new(SAMSUNG, Box::new(BrokenIndex), HashMap::new()));
    let embedder = Arc::new(FixedEmbedder::new(vec![1.0, 0.0]));
    let report = engine(embedder).search("삼성", &[bad], &targets(&[SAMSUNG]), 2).await.expect("search");

    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].collection, "default");
    assert_eq!(report.results[0].metadata.text, "검색 결과를 찾을 수 없습니다.");
    assert_eq!(report.failures.len(), 1);
}

#[tokio::test]
async fn embedding_failure_is_fatal() {
    let loaded = vec![canned(SAMSUNG, vec![], &[])];
    let engine = VectorSearchEngine::new(Arc::new(FailingEmbedder), SearchOptions::default());
    let err = engine.search("삼성", &loaded, &targets(&[SAMSUNG]), 2).await.unwrap_err();
    assert!(matches!(err, Error::EmbeddingService(_)));
}

#[tokio::test]
async fn slow_collection_times_out_and_others_still_merge() {
    let slow = Arc::new(Collection::new(SAMSUNG, Box::new(SlowIndex), HashMap::new()));
    let good = canned(HANWHA, vec![Neighbor { ordinal: 0, similarity: 0.8 }], &[("0", "한화 약관")]);
    let options = SearchOptions { collection_timeout: Duration::from_millis(50), ..SearchOptions::default() };
    let engine = VectorSearchEngine::new(Arc::new(FixedEmbedder::new(vec![1.0, 0.0])), options);

    let report = engine
        .search("비교", &[slow, good], &targets(&[SAMSUNG, HANWHA]), 2)
        .await
        .expect("search");

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].collection, SAMSUNG);
    assert!(report.failures[0].reason.contains("timed out"), "{}", report.failures[0].reason);
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].metadata.text, "한화 약관");
}

#[tokio::test]
async fn only_collection_timing_out_yields_no_results_sentinel() {
    let slow = Arc::new(Collection::new(SAMSUNG, Box::new(SlowIndex), HashMap::new()));
    let options = SearchOptions { collection_timeout: Duration::from_millis(50), ..SearchOptions::default() };
    let engine = VectorSearchEngine::new(Arc::new(FixedEmbedder::new(vec![1.0, 0.0])), options);

    let report = engine.search("삼성", &[slow], &targets(&[SAMSUNG]), 2).await.expect("search");
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].collection, "default");
    assert_eq!(report.results[0].metadata.text, "검색 결과를 찾을 수 없습니다.");
}

#[tokio::test]
async fn embedding_timeout_is_fatal() {
    let loaded = vec![canned(SAMSUNG, vec![], &[])];
    let options = SearchOptions { embed_timeout: Duration::from_millis(50), ..SearchOptions::default() };
    let engine = VectorSearchEngine::new(Arc::new(StalledEmbedder), options);

    let err = engine.search("삼성", &loaded, &targets(&[SAMSUNG]), 2).await.unwrap_err();
    match err {
        Error::EmbeddingService(reason) => assert!(reason.contains("timed out"), "{reason}"),
        other => panic!("expected an embedding failure, got {other:?}"),
    }
}

#[test]
fn similarities_are_clipped_to_one() {
    let index = CannedIndex {
        dim: 2,
        hits: vec![Neighbor { ordinal: 0, similarity: 1.5 }, Neighbor { ordinal: 1, similarity: 0.3 }],
    };
    let hits = search_index_by_query(&index, &[1.0, 0.0], 2).expect("search");
    assert!(hits.iter().all(|h| h.similarity <= 1.0));
    assert_eq!(hits[0].similarity, 1.0);

    // Unnormalized stored vectors overshoot on a real inner-product index too.
    let flat = FlatIndex::from_vectors(2, Metric::InnerProduct, vec![1.5, 0.0]).expect("index");
    let hits = search_index_by_query(&flat, &[3.0, 0.0], 1).expect("search");
    assert_eq!(hits[0].similarity, 1.0);
}
