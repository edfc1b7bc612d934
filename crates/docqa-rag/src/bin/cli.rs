//! Command-line front end for the document QA pipeline
//!
//! ```text
//! docqa ingest report.pdf notes.txt --store reports
//! docqa ask "What were the key findings?" --store reports
//! docqa analyze resume.pdf
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use docqa_rag::generation::PromptProfile;
use docqa_rag::types::{DocumentInput, QueryAnswer};
use docqa_rag::{Pipeline, RagConfig};

/// Ask questions about your documents
#[derive(Parser)]
#[command(name = "docqa")]
#[command(version)]
#[command(about = "Ingest documents into a vector store and ask questions about them")]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (TOML); falls back to DOCQA_CONFIG
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace the store's content with the given documents
    Ingest {
        /// PDF or plain-text files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Store name (defaults to storage.store_name)
        #[arg(short, long)]
        store: Option<String>,
    },
    /// Answer a question from an ingested store
    Ask {
        question: String,

        #[arg(short, long)]
        store: Option<String>,

        /// Print the answer and its sources as JSON
        #[arg(long)]
        json: bool,
    },
    /// Ingest a resume and analyse it
    Analyze {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[arg(short, long)]
        store: Option<String>,

        /// Prompt profile (document_qa or resume_analysis)
        #[arg(short, long, default_value = "resume_analysis")]
        profile: PromptProfile,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("docqa_rag=info"),
        2 => EnvFilter::new("docqa_rag=debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = RagConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    let default_store = config.storage.store_name.clone();
    let pipeline = Pipeline::from_config(config)?;

    match cli.command {
        Commands::Ingest { files, store } => {
            let store = store.unwrap_or(default_store);
            let documents = read_documents(&files).await?;

            match pipeline.ingest(&store, documents).await {
                Ok(report) => {
                    for skipped in &report.skipped {
                        eprintln!("skipped {}: {}", skipped.name, skipped.reason);
                    }
                    if report.persisted {
                        println!(
                            "Indexed {} chunks from {} documents into '{}'",
                            report.chunks_indexed, report.documents_indexed, report.store
                        );
                    } else {
                        println!("No text found; store '{}' left unchanged", report.store);
                    }
                }
                Err(e) => {
                    eprintln!("{}", e.ingest_message());
                    return Err(e.into());
                }
            }
        }
        Commands::Ask {
            question,
            store,
            json,
        } => {
            let store = store.unwrap_or(default_store);
            match pipeline.ask(&store, &question).await {
                Ok(answer) if json => println!("{}", serde_json::to_string_pretty(&answer)?),
                Ok(answer) => print_answer(&answer),
                Err(e) => {
                    eprintln!("{}", e.user_message());
                    return Err(e.into());
                }
            }
        }
        Commands::Analyze {
            files,
            store,
            profile,
        } => {
            let store = store.unwrap_or(default_store);
            let documents = read_documents(&files).await?;
            let analysis = pipeline.analyze(&store, documents, Some(profile)).await?;
            print_answer(&analysis.answer);
        }
    }

    Ok(())
}

async fn read_documents(files: &[PathBuf]) -> anyhow::Result<Vec<DocumentInput>> {
    let mut documents = Vec::with_capacity(files.len());
    for path in files {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        documents.push(DocumentInput::new(display_name(path), bytes));
    }
    Ok(documents)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn print_answer(answer: &QueryAnswer) {
    println!("{}", answer.answer.trim());
    if !answer.sources.is_empty() {
        println!("\nSources:");
        for source in &answer.sources {
            println!("  [{}] ({:.3}) {}", source.slot, source.score, source.snippet.replace('\n', " "));
        }
    }
}
