//! Document QA server binary
//!
//! Run with: cargo run -p docqa-rag --bin docqa-rag-server

use docqa_rag::config::{ComposerBackend, EmbeddingBackend, RagConfig};
use docqa_rag::server::RagServer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docqa_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                      DocQA RAG Server                     ║
║          Question Answering over Your Documents           ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    // Defaults, then DOCQA_CONFIG, then environment overrides
    let config = RagConfig::load(None)?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Store root: {}", config.storage.root.display());
    tracing::info!(
        "  - Embeddings: {:?} {} ({} dims)",
        config.embeddings.backend,
        config.embeddings.model,
        config.embeddings.dimensions
    );
    tracing::info!("  - Composer: {:?} {}", config.composer.backend, config.composer.model);
    tracing::info!(
        "  - Chunking: {} chars, {} overlap",
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    );

    let uses_ollama = config.embeddings.backend == EmbeddingBackend::Ollama
        || config.composer.backend == ComposerBackend::Ollama;
    if uses_ollama {
        let base_url = &config.capabilities.ollama_base_url;
        tracing::info!("Checking Ollama at {}...", base_url);
        let client = reqwest::Client::new();
        match client.get(format!("{}/api/tags", base_url)).send().await {
            Ok(resp) if resp.status().is_success() => {
                tracing::info!("Ollama is running");
            }
            _ => {
                tracing::warn!("Ollama not available at {}", base_url);
                tracing::warn!("Start it with `ollama serve` and pull the configured models");
            }
        }
    }

    let server = RagServer::new(config)?;

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nEndpoints:");
    println!("  POST /api/stores/:store/ingest   - Upload documents");
    println!("  POST /api/stores/:store/ask      - Ask a question");
    println!("  POST /api/stores/:store/analyze  - Analyse a resume");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
