//! Domain types shared by the retrieval core and the chat layer.

use serde::{Deserialize, Serialize};

/// Collection name used by placeholder results that belong to no collection.
pub const DEFAULT_COLLECTION: &str = "default";

pub const MSG_NO_LOADED_COLLECTIONS: &str = "로드된 컬렉션이 없습니다.";
pub const MSG_NO_TARGET_COLLECTIONS: &str = "지정된 컬렉션을 찾을 수 없습니다.";
pub const MSG_NO_RESULTS: &str = "검색 결과를 찾을 수 없습니다.";

pub fn metadata_miss_message(ordinal: i64) -> String {
    format!("인덱스 {ordinal}의 메타데이터를 찾을 수 없습니다.")
}

/// One metadata entry of a collection.
///
/// Persisted either as an object `{header1?, source?, text}` or as a bare
/// string, which becomes a record holding only `text`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawDocRecord")]
pub struct DocRecord {
    #[serde(rename = "header1", skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub text: String,
}

impl DocRecord {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self { header: None, source: None, text: text.into() }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDocRecord {
    Text(String),
    Full {
        #[serde(default, rename = "header1", alias = "header")]
        header: Option<String>,
        #[serde(default)]
        source: Option<String>,
        #[serde(default)]
        text: String,
    },
}

impl From<RawDocRecord> for DocRecord {
    fn from(raw: RawDocRecord) -> Self {
        match raw {
            RawDocRecord::Text(text) => Self::text_only(text),
            RawDocRecord::Full { header, source, text } => Self { header, source, text },
        }
    }
}

/// One retrieved document hit.
///
/// `score` is a cosine distance in `[0, 1]`: lower is more similar. Merged
/// result lists are ordered ascending by score, so the best hit comes first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub collection: String,
    #[serde(rename = "id")]
    pub doc_id: String,
    pub score: f32,
    pub metadata: DocRecord,
}

impl SearchResult {
    /// Placeholder hit carrying a diagnostic message instead of document text.
    pub fn sentinel(collection: impl Into<String>, doc_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            doc_id: doc_id.into(),
            score: 1.0,
            metadata: DocRecord::text_only(message),
        }
    }

    /// The single-element fallback list returned when nothing can be searched.
    pub fn fallback(message: &str) -> Vec<Self> {
        vec![Self::sentinel(DEFAULT_COLLECTION, "0", message)]
    }

    pub fn is_default_sentinel(&self) -> bool {
        self.collection == DEFAULT_COLLECTION
    }
}

/// A collection whose search failed and was left out of the merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionFailure {
    pub collection: String,
    pub reason: String,
}

/// Merged results plus the per-collection failures that were isolated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchReport {
    pub results: Vec<SearchResult>,
    pub failures: Vec<CollectionFailure>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    /// Numeric code stored in the premium database.
    pub fn code(self) -> u8 {
        match self {
            Sex::Male => 1,
            Sex::Female => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Sex::Male => "남자",
            Sex::Female => "여자",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductType {
    /// 무해지환급형
    #[serde(rename = "nr")]
    NonRefund,
    /// 해지환급형
    #[serde(rename = "r")]
    Refund,
}

impl ProductType {
    pub fn code(self) -> &'static str {
        match self {
            ProductType::NonRefund => "nr",
            ProductType::Refund => "r",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ProductType::NonRefund => "무해지형",
            ProductType::Refund => "해지환급형",
        }
    }
}
