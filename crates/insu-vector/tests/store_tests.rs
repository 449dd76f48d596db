mod common;

use serde_json::json;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

use insu_core::registry::InsurerRegistry;
use insu_core::types::DocRecord;
use insu_core::Error;
use insu_vector::CollectionStore;

use common::write_collection;

const SAMSUNG: &str = "Samsung_YakMu2404103NapHae20250113";
const HANWHA: &str = "HanWha_YakHan20250201";

fn store(tmp: &TempDir) -> CollectionStore {
    CollectionStore::new(tmp.path(), InsurerRegistry::builtin())
}

#[test]
fn load_is_idempotent_and_reads_storage_once() {
    let tmp = TempDir::new().expect("tmp");
    let dir = write_collection(tmp.path(), SAMSUNG, 2, &[vec![1.0, 0.0]], &json!(["제1조"]));
    let store = store(&tmp);

    let first = store.load(SAMSUNG).expect("first load");
    // Storage is gone: a second read would fail.
    fs::remove_dir_all(&dir).expect("rm");
    let second = store.load("삼성화재").expect("second load");

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(store.loaded().len(), 1);
    assert!(store.is_loaded("samsung"));
}

#[test]
fn list_metadata_is_normalized_to_positional_keys() {
    let tmp = TempDir::new().expect("tmp");
    write_collection(tmp.path(), SAMSUNG, 2, &[vec![1.0, 0.0], vec![0.0, 1.0]], &json!(["x", "y"]));
    let collection = store(&tmp).load(SAMSUNG).expect("load");

    assert_eq!(collection.metadata().len(), 2);
    assert_eq!(collection.lookup("0"), Some(&DocRecord::text_only("x")));
    assert_eq!(collection.lookup("1"), Some(&DocRecord::text_only("y")));
    assert_eq!(collection.index().dim(), 2);
}

#[test]
fn unknown_and_missing_collections_fail_with_typed_errors() {
    let tmp = TempDir::new().expect("tmp");
    let store = store(&tmp);

    assert!(matches!(store.load("없는보험사"), Err(Error::UnknownCollection(_))));
    assert!(matches!(store.load(HANWHA), Err(Error::IndexFileMissing(_))));

    let dir = tmp.path().join(HANWHA);
    fs::create_dir_all(&dir).expect("mkdir");
    common::write_flat_index(&dir.join("faiss.index"), 2, &[]);
    assert!(matches!(store.load(HANWHA), Err(Error::MetadataFileMissing(_))));

    fs::write(dir.join("metadata.json"), "{not json").expect("write");
    assert!(matches!(store.load(HANWHA), Err(Error::InvalidMetadata { .. })));
    assert!(!store.is_loaded(HANWHA));
}

#[test]
fn unsupported_extension_is_rejected_before_touching_storage() {
    let tmp = TempDir::new().expect("tmp");
    write_collection(tmp.path(), SAMSUNG, 2, &[vec![1.0, 0.0]], &json!(["a"]));
    let store = store(&tmp).with_index_file("faiss", "pkl");
    assert!(matches!(store.load(SAMSUNG), Err(Error::UnsupportedIndexFormat(_))));
}

#[test]
fn available_lists_registered_directories_only() {
    let tmp = TempDir::new().expect("tmp");
    fs::create_dir_all(tmp.path().join(SAMSUNG)).expect("mkdir");
    fs::create_dir_all(tmp.path().join(HANWHA.to_lowercase())).expect("mkdir");
    fs::create_dir_all(tmp.path().join("scratch")).expect("mkdir");
    fs::write(tmp.path().join("README.txt"), "x").expect("write");

    let available: Vec<String> = store(&tmp).available().into_iter().collect();
    assert_eq!(available, vec![HANWHA.to_string(), SAMSUNG.to_string()]);
}

#[test]
fn directory_name_matches_case_insensitively() {
    let tmp = TempDir::new().expect("tmp");
    write_collection(tmp.path(), &SAMSUNG.to_uppercase(), 1, &[vec![1.0]], &json!({"0": {"text": "본문"}}));
    let collection = store(&tmp).load(SAMSUNG).expect("load");
    assert_eq!(collection.name(), SAMSUNG);
}
