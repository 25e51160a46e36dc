use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::RwLock;
use tracing::{info, warn};

use docuquery_core::Config;
use docuquery_index::{build_embedder, VectorIndex};
use docuquery_llm::providers::create_provider;
use docuquery_llm::{AnswerSynthesizer, Message, Role};

use docuquery_server::{build_router, AppState};

fn load_config() -> Config {
    docuquery_core::config::load_dotenv();
    Config::from_env()
}

/// Build and persist the index for a document ahead of serving.
async fn index_document(config: &Config, source: &str) -> anyhow::Result<()> {
    let path: PathBuf = if source.starts_with("http://") || source.starts_with("https://") {
        docuquery_ingest::fetch_document(source, &config.storage.document_path).await?
    } else {
        PathBuf::from(source)
    };

    let bytes =
        std::fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document.pdf");

    let doc = docuquery_ingest::extract_text(&bytes, filename)?;
    let chunks = docuquery_ingest::extract_chunks(&doc);
    info!(
        "Extracted '{}': {} pages, {} chunks",
        filename,
        doc.pages.len(),
        chunks.len()
    );

    let embedder = build_embedder(config).context("embedding provider required to build an index")?;
    let mut index =
        VectorIndex::new(embedder).with_embed_batch_size(config.embedding.batch_size as usize);
    index.build(chunks).await?;

    let artifact = config.storage.artifact_path();
    index.save(&artifact)?;
    info!("Index built and saved to {}", artifact.display());
    Ok(())
}

/// Send one tiny prompt to the configured completion provider.
async fn check_llm(config: &Config) -> anyhow::Result<()> {
    let provider = create_provider(&config.llm, &config.ollama)?;
    let answer = provider
        .complete(
            vec![Message {
                role: Role::User,
                content: "Tell me a short, one-sentence joke.".to_string(),
            }],
            0.7,
            128,
        )
        .await?;
    println!("LLM provider '{}' responded: {}", config.llm.provider, answer.trim());
    Ok(())
}

async fn serve(config: &Config) -> anyhow::Result<()> {
    config.log_summary();

    let index = match build_embedder(config) {
        Ok(embedder) => Some(Arc::new(RwLock::new(
            VectorIndex::new(embedder).with_embed_batch_size(config.embedding.batch_size as usize),
        ))),
        Err(e) => {
            warn!("{} — batch endpoint will return 503", e);
            None
        }
    };

    let synthesizer = Arc::new(AnswerSynthesizer::from_config(&config.llm, &config.ollama));

    if config.api.auth_token.is_none() {
        warn!("API_AUTH_TOKEN not set — batch endpoint will reject all requests");
    }

    let state = Arc::new(AppState {
        index,
        synthesizer,
        auth_token: config.api.auth_token.clone(),
        document_path: config.storage.document_path.clone(),
        artifact_path: config.storage.artifact_path(),
        max_concurrency: config.api.max_concurrency as usize,
    });

    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://localhost:{}", config.server.port);
    axum::serve(listener, app).await?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let config = load_config();
    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("serve") => {
            serve(&config).await?;
        }
        Some("index") => {
            let source = args
                .get(2)
                .context("Usage: docuquery-server index <file-or-url>")?;
            index_document(&config, source).await?;
        }
        Some("chat") => {
            let path = args.get(2).context("Usage: docuquery-server chat <file>")?;
            docuquery_server::chat::run_chat(&config, Path::new(path)).await?;
        }
        Some("check-llm") => {
            check_llm(&config).await?;
        }
        _ => {
            println!("docuquery v0.1.0");
            println!("Usage: docuquery-server <command>");
            println!("  serve                  Start the batch query API");
            println!("  index <file-or-url>    Build and persist the index for a document");
            println!("  chat <file>            Interactive question answering for a document");
            println!("  check-llm              Send a test prompt to the configured LLM");
        }
    }

    Ok(())
}
