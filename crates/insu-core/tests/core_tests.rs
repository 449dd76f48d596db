use std::path::Path;

use figment::providers::{Format, Serialized, Toml};
use figment::Figment;
use serde_json::json;

use insu_core::config::{resolve_with_base, Config, EmbeddingProviderKind, Settings};
use insu_core::types::{DocRecord, ProductType, SearchResult, Sex, MSG_NO_LOADED_COLLECTIONS};
use insu_core::Error;

fn config_from(toml: &str) -> Config {
    Config::from_figment(Figment::from(Serialized::defaults(Settings::default())).merge(Toml::string(toml)))
}

#[test]
fn defaults_are_valid() {
    let settings = config_from("").settings().expect("defaults");
    assert_eq!(settings.search.top_k, 2);
    assert_eq!(settings.data.index_name, "faiss");
    assert_eq!(settings.data.index_extension, "index");
    assert!(settings.database.is_none());
    assert_eq!(settings.profile.expiry, 20);
    assert_eq!(settings.profile.duration, 100);
}

#[test]
fn toml_overrides_nested_sections() {
    let settings = config_from(
        r#"
        [search]
        top_k = 5

        [embedding]
        provider = "fake"
        fake_dim = 8

        [database]
        host = "db.internal"

        [profile]
        sex = "female"
        product_type = "r"
        "#,
    )
    .settings()
    .expect("settings");
    assert_eq!(settings.search.top_k, 5);
    assert_eq!(settings.search.embed_timeout_secs, 30, "unspecified keys keep defaults");
    assert_eq!(settings.embedding.provider, EmbeddingProviderKind::Fake);
    let db = settings.database.expect("database section");
    assert_eq!(db.host, "db.internal");
    assert_eq!(db.port, 3306);
    assert_eq!(settings.profile.sex, Sex::Female);
    assert_eq!(settings.profile.product_type, ProductType::Refund);
}

#[test]
fn rejects_unsupported_extension_and_zero_top_k() {
    let err = config_from("[data]\nindex_extension = \"pkl\"").settings().unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)), "got {err:?}");
    let err = config_from("[search]\ntop_k = 0").settings().unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)), "got {err:?}");
}

#[test]
fn relative_paths_resolve_against_base() {
    let base = Path::new("/srv/app");
    assert_eq!(resolve_with_base(base, "insu_data"), Path::new("/srv/app/insu_data"));
    assert_eq!(resolve_with_base(base, "/data/insu"), Path::new("/data/insu"));
}

#[test]
fn doc_record_accepts_strings_and_objects() {
    let plain: DocRecord = serde_json::from_value(json!("약관 본문")).expect("string record");
    assert_eq!(plain, DocRecord::text_only("약관 본문"));

    let full: DocRecord =
        serde_json::from_value(json!({"header1": "제1조", "source": "a.pdf", "text": "보장 내용", "page": 3}))
            .expect("object record");
    assert_eq!(full.header.as_deref(), Some("제1조"));
    assert_eq!(full.source.as_deref(), Some("a.pdf"));
    assert_eq!(full.text, "보장 내용");
}

#[test]
fn fallback_serializes_to_the_wire_shape() {
    let value = serde_json::to_value(SearchResult::fallback(MSG_NO_LOADED_COLLECTIONS)).expect("json");
    assert_eq!(
        value,
        json!([{
            "collection": "default",
            "id": "0",
            "score": 1.0,
            "metadata": {"text": "로드된 컬렉션이 없습니다."}
        }])
    );
}
