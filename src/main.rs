//! Apimatch CLI entrypoint: runs one match request and prints the envelope.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use mimalloc::MiMalloc;
use serde_json::Value;

use apimatch::config::Config;
use apimatch::pipeline::{MatchRequest, Pipeline, PipelineSettings};
use apimatch::profile::RankingConfig;
use apimatch::retrieval::{BackendPool, HttpEmbedder, QdrantRetriever, QueryEmbedder};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Match a task description to the best-fitting API in the catalog
#[derive(Parser, Debug)]
#[command(name = "apimatch")]
#[command(about = "Rank catalog APIs for a task and explain the winner", long_about = None)]
struct Args {
    /// Natural-language task description
    query: String,

    /// Intent selecting the weight profile (e.g. latest, popular, reliable)
    #[arg(short, long, default_value = "")]
    intent: String,

    /// Number of results; defaults to APIMATCH_DEFAULT_TOP_K
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// Request id to echo in the response
    #[arg(long)]
    request_id: Option<String>,

    /// Payload filter as field=value (value parsed as JSON when possible)
    #[arg(short, long = "filter", value_parser = parse_filter)]
    filters: Vec<(String, Value)>,
}

fn parse_filter(raw: &str) -> Result<(String, Value), String> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected field=value, got '{raw}'"))?;
    let field = field.trim();
    if field.is_empty() {
        return Err(format!("empty field name in '{raw}'"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((field.to_string(), value))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;
    config.validate()?;

    let ranking = match &config.ranking_config_path {
        Some(path) => RankingConfig::load(path)
            .with_context(|| format!("loading ranking config {}", path.display()))?,
        None => RankingConfig::builtin(),
    };

    tracing::info!(
        qdrant_url = %config.qdrant_url,
        collection = %config.collection,
        profiles = ranking.profiles.len(),
        pool_size = config.pool_size,
        "Apimatch starting"
    );

    let embedder: Arc<dyn QueryEmbedder> = Arc::new(HttpEmbedder::new(
        config.embedding_url.clone(),
        config.embedding_model.clone(),
    ));
    let handles = (0..config.pool_size)
        .map(|_| QdrantRetriever::new(&config.qdrant_url, &config.collection, embedder.clone()))
        .collect::<Result<Vec<_>, _>>()?;

    let pipeline = Pipeline::new(
        BackendPool::new(handles),
        ranking,
        PipelineSettings::from_config(&config),
    );

    let mut request = MatchRequest::new(args.query)
        .with_intent(args.intent)
        .with_top_k(args.top_k.unwrap_or(config.default_top_k));
    if let Some(id) = args.request_id {
        request = request.with_request_id(id);
    }
    for (field, value) in args.filters {
        request = request.with_filter(field, value);
    }

    let envelope = pipeline.run(request).await;
    println!("{}", envelope.to_json()?);

    if !envelope.is_ok() {
        std::process::exit(1);
    }
    Ok(())
}
