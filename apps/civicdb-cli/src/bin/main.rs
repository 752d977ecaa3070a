use std::env;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{bail, Context};
use serde_json::{json, Value};
use tracing::info;
use tracing_subscriber::EnvFilter;

use civicdb_core::config::{expand_path, Config, Settings};
use civicdb_embed::provider_from_settings;
use civicdb_hybrid::CivicAskEngine;
use civicdb_vector::{backfill_embeddings, embed_new_sections, load_dataset, merge_dataset, CorpusSnapshot, SnapshotStore};

const DISCLAIMER: &str = "AI guidance only. This is not legal advice.";
const USAGE: &str = "<ingest [dataset] [--no-embed] | embed [--force] | ask \"<question>\" | status>";

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() { eprintln!("Usage: {} {}", prog, USAGE); process::exit(1); }
    let cmd = args.remove(0);
    (cmd, args)
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {:#}", e); e })?;
    let settings = config.settings()?;
    let snapshot_path = expand_path(&settings.data.snapshot_path);
    let (cmd, args) = parse_args();
    match cmd.as_str() {
        "ingest" => {
            let skip_embed = args.iter().any(|a| a == "--no-embed");
            let dataset = args
                .iter()
                .find(|a| !a.starts_with("--"))
                .map(PathBuf::from)
                .unwrap_or_else(|| expand_path(&settings.data.dataset_path));
            let records = load_dataset(&dataset)?;
            let mut snapshot = CorpusSnapshot::load_or_default(&snapshot_path)?;
            let report = merge_dataset(&mut snapshot, records)
                .with_context(|| format!("Dataset {} conflicts with the corpus", dataset.display()))?;
            snapshot.save(&snapshot_path)?;
            info!(?report, snapshot = %snapshot_path.display(), "ingest complete");
            println!(
                "Ingested {}: {} inserted, {} updated, {} unchanged ({} embeddings invalidated)",
                dataset.display(), report.inserted, report.updated, report.unchanged, report.invalidated
            );
            let provider = if skip_embed { None } else { provider_from_settings(&settings.embedding)? };
            match provider {
                Some(provider) => {
                    let embedded = embed_new_sections(&mut snapshot, provider.as_ref()).await;
                    snapshot.save(&snapshot_path)?;
                    let missing = snapshot.sections.len() - snapshot.embedded_count();
                    println!("Embedded {} sections ({} still without an embedding)", embedded, missing);
                }
                None => println!("Embeddings not computed; run `embed` once a provider is configured"),
            }
        }
        "embed" => {
            let force = args.iter().any(|a| a == "--force");
            let Some(provider) = provider_from_settings(&settings.embedding)? else {
                bail!("No embedding provider configured; set OPENAI_API_KEY or embedding.provider");
            };
            let mut snapshot = CorpusSnapshot::load(&snapshot_path)
                .with_context(|| format!("Run `ingest` first to create {}", snapshot_path.display()))?;
            let outcome = backfill_embeddings(&mut snapshot, provider.as_ref(), force).await;
            // Rows embedded before a failure are kept.
            snapshot.save(&snapshot_path)?;
            let report = outcome?;
            println!("Embedded {} sections ({} already current)", report.embedded, report.skipped);
        }
        "ask" => {
            let question = args.join(" ");
            let question = question.trim();
            if question.is_empty() {
                eprintln!("A question is required.");
                process::exit(1);
            }
            let engine = build_engine(&settings, &snapshot_path)?;
            let result = engine.ask(question).await;
            let mut body = json!({ "disclaimer": DISCLAIMER });
            if let (Value::Object(out), Value::Object(fields)) = (&mut body, serde_json::to_value(&result)?) {
                out.extend(fields);
            }
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        "status" => {
            let snapshot = CorpusSnapshot::load_or_default(&snapshot_path)?;
            println!("Snapshot: {}", snapshot_path.display());
            println!("Sections: {}", snapshot.sections.len());
            println!("Embedded: {}", snapshot.embedded_count());
        }
        _ => { eprintln!("Unknown command: {}", cmd); process::exit(1); }
    }
    Ok(())
}

fn build_engine(settings: &Settings, snapshot_path: &std::path::Path) -> anyhow::Result<CivicAskEngine> {
    let snapshot = CorpusSnapshot::load_or_default(snapshot_path)?;
    let store = Arc::new(SnapshotStore::from_snapshot(&snapshot));
    let provider = provider_from_settings(&settings.embedding)?;
    Ok(CivicAskEngine::new(store.clone(), store, provider, settings.retrieval.clone()))
}
