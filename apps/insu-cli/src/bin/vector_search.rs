use std::collections::BTreeSet;
use std::env;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use insu_core::config::Config;
use insu_core::registry::InsurerRegistry;
use insu_embed::build_embedder;
use insu_route::CollectionResolver;
use insu_vector::{CollectionStore, SearchOptions, VectorSearchEngine};

fn usage(prog: &str) -> ! {
    eprintln!("Usage: {} <query> [--limit N] [--collection NAME]...", prog);
    eprintln!("Example: {} '암 진단비 지급 조건' --limit 3 --collection 삼성화재", prog);
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let prog = args.first().map(String::as_str).unwrap_or("insu-vector-search");
    let Some(query_text) = args.get(1).filter(|a| !a.starts_with('-')) else { usage(prog) };

    let settings = Config::load()?.settings()?;
    let mut limit = settings.search.top_k;
    let mut requested: Vec<String> = Vec::new();
    let mut i = 2;
    while i < args.len() {
        match (args[i].as_str(), args.get(i + 1)) {
            ("--limit", Some(v)) => match v.parse::<usize>() {
                Ok(l) if l > 0 => limit = l,
                _ => {
                    eprintln!("Error: --limit requires a positive number");
                    std::process::exit(1);
                }
            },
            ("--collection", Some(v)) => requested.push(v.clone()),
            _ => usage(prog),
        }
        i += 2;
    }

    let registry = InsurerRegistry::builtin();
    let store = Arc::new(CollectionStore::from_settings(&settings.data, registry.clone()));
    let targets: BTreeSet<String> = if requested.is_empty() {
        CollectionResolver::new(registry.clone()).resolve(query_text, &store.available())?
    } else {
        requested
            .iter()
            .map(|name| {
                registry
                    .lookup(name)
                    .map(|i| i.collection.to_string())
                    .ok_or_else(|| anyhow::anyhow!("unknown collection: {name}"))
            })
            .collect::<anyhow::Result<_>>()?
    };

    for name in &targets {
        if let Err(e) = store.load(name) {
            eprintln!("⚠️  {name}: {e}");
        }
    }

    let embedder = build_embedder(&settings.embedding)?;
    let engine = VectorSearchEngine::new(embedder, SearchOptions::from(&settings.search));
    let report = engine.search(query_text, &store.loaded(), &targets, limit).await?;

    for failure in &report.failures {
        eprintln!("⚠️  {} 검색 실패: {}", failure.collection, failure.reason);
    }
    println!("{}", serde_json::to_string_pretty(&report.results)?);
    Ok(())
}
