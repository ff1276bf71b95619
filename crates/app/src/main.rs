use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use pdf_assistant_core::{
    chunk_document, load_document, load_documents_best_effort, Answer, AskOptions,
    AssemblyOptions, ChunkStore, ChunkingConfig, Generator, KnowledgeAssistant, LopdfExtractor,
    MemoryStore, OpenAiGenerator, QdrantStore, Retriever, TrigramEmbedder,
    DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL,
};
use pdf_assistant_core::stores::memory::DEFAULT_MIN_SCORE;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// JSON-persisted in-process index.
    Memory,
    /// Qdrant over its REST API.
    Qdrant,
}

#[derive(Parser)]
#[command(name = "pdf-assistant", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Vector store backend
    #[arg(long, value_enum, default_value = "memory", env = "ASSISTANT_BACKEND")]
    backend: Backend,

    /// Index file used by the memory backend
    #[arg(long, default_value = "assistant_index.json", env = "ASSISTANT_INDEX_PATH")]
    index_path: PathBuf,

    /// Qdrant base URL
    #[arg(long, default_value = "http://localhost:6333", env = "QDRANT_URL")]
    qdrant_url: String,

    /// Qdrant collection
    #[arg(long, default_value = "pdf_assistant_chunks", env = "QDRANT_COLLECTION")]
    qdrant_collection: String,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, default_value = DEFAULT_OPENAI_BASE_URL, env = "OPENAI_BASE_URL")]
    openai_base_url: String,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    /// Chat model used for answers
    #[arg(long, default_value = DEFAULT_OPENAI_MODEL, env = "OPENAI_MODEL")]
    model: String,

    /// Sampling temperature for answers
    #[arg(long, default_value_t = 0.0)]
    temperature: f32,

    /// Lowest similarity a memory-backend match may score
    #[arg(long, default_value_t = DEFAULT_MIN_SCORE)]
    min_score: f32,

    /// Maximum characters per chunk
    #[arg(long, default_value = "800")]
    chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[arg(long, default_value = "100")]
    chunk_overlap: usize,

    /// Matches retrieved per question
    #[arg(long, default_value = "4")]
    top_k: usize,

    /// Token limit for generated answers
    #[arg(long, default_value = "200")]
    max_tokens: u32,

    /// Characters kept from each retrieved chunk
    #[arg(long, default_value = "400")]
    per_chunk_chars: usize,

    /// Chunks sampled when no targeted match is found
    #[arg(long, default_value = "8")]
    fallback_limit: usize,
}

#[derive(Subcommand)]
enum Command {
    /// Extract, chunk and index PDF files or folders of PDFs.
    Ingest {
        /// PDF files or folders searched recursively.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Answer a question from the indexed documents.
    Ask {
        question: String,
        /// Print the assembled context before the answer.
        #[arg(long, default_value_t = false)]
        show_context: bool,
    },
    /// Print the chunk boundaries of a PDF without indexing it.
    Chunks {
        path: PathBuf,
        /// Print each chunk's text too.
        #[arg(long, default_value_t = false)]
        text: bool,
    },
    /// Print how many chunks the store holds.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        backend = ?cli.backend,
        "pdf-assistant boot"
    );

    let chunking = ChunkingConfig::new(cli.chunk_size, cli.chunk_overlap)?;

    if let Command::Chunks { path, text } = &cli.command {
        return print_chunks(path, chunking, *text);
    }

    let embedder = TrigramEmbedder::default();
    let generator = OpenAiGenerator::new(
        cli.openai_api_key.clone(),
        cli.model.clone(),
        &cli.openai_base_url,
    )
    .with_temperature(cli.temperature);

    match cli.backend {
        Backend::Memory => {
            let store = MemoryStore::open(&cli.index_path, embedder)
                .with_context(|| format!("opening index {}", cli.index_path.display()))?
                .with_min_score(cli.min_score);
            if let Some(path) = store.path() {
                info!(path = %path.display(), "memory index opened");
            }
            let assistant = build_assistant(&cli, store, generator, chunking)?;
            execute(&cli.command, &assistant).await?;
        }
        Backend::Qdrant => {
            let store = QdrantStore::new(&cli.qdrant_url, cli.qdrant_collection.clone(), embedder)?;
            store
                .ensure_collection()
                .await
                .with_context(|| format!("preparing collection {}", cli.qdrant_collection))?;
            let assistant = build_assistant(&cli, store, generator, chunking)?;
            execute(&cli.command, &assistant).await?;
        }
    }

    Ok(())
}

fn build_assistant<S, G>(
    cli: &Cli,
    store: S,
    generator: G,
    chunking: ChunkingConfig,
) -> anyhow::Result<KnowledgeAssistant<S, G>>
where
    S: ChunkStore + Retriever + Send + Sync,
    G: Generator + Send + Sync,
{
    Ok(KnowledgeAssistant::new(store, generator)
        .with_chunking(chunking)
        .with_assembly(AssemblyOptions::new(cli.per_chunk_chars, cli.fallback_limit)?)
        .with_ask_options(AskOptions::new(cli.top_k, cli.max_tokens)?))
}

async fn execute<S, G>(command: &Command, assistant: &KnowledgeAssistant<S, G>) -> anyhow::Result<()>
where
    S: ChunkStore + Retriever + Send + Sync,
    G: Generator + Send + Sync,
{
    match command {
        Command::Ingest { paths } => {
            let report = load_documents_best_effort(paths, &LopdfExtractor)?;

            for skipped in &report.skipped_files {
                warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped pdf");
            }

            let mut total = 0;
            for loaded in &report.documents {
                if !loaded.unreadable_pages.is_empty() {
                    warn!(
                        source = %loaded.document.source_id,
                        pages = ?loaded.unreadable_pages,
                        "skipped unreadable pages"
                    );
                }
                let stored = assistant.ingest_document(&loaded.document).await?;
                info!(
                    source = %loaded.document.source_id,
                    pages = loaded.page_count,
                    checksum = %loaded.checksum,
                    chunk_count = stored,
                    "document ingested"
                );
                println!("ingested {stored} chunks from {}", loaded.document.source_id);
                total += stored;
            }

            println!(
                "{total} chunks ingested from {} file(s), {} skipped, store holds {}",
                report.documents.len(),
                report.skipped_files.len(),
                assistant.store().len().await?
            );
        }
        Command::Ask {
            question,
            show_context,
        } => {
            let (answer, context) = assistant.answer_with_context(question).await?;
            if *show_context {
                println!(
                    "context ({}, {} chunks):\n{}\n",
                    context.kind.as_str(),
                    context.included,
                    context.text
                );
            }

            info!(context = answer.context_kind().as_str(), "question answered");
            if let Answer::NoDocuments = answer {
                warn!("no usable context; generator not called");
            }
            println!("{}", answer.text());
        }
        Command::Stats => {
            println!("{} chunks indexed", assistant.store().len().await?);
        }
        Command::Chunks { .. } => {}
    }

    Ok(())
}

fn print_chunks(path: &Path, chunking: ChunkingConfig, with_text: bool) -> anyhow::Result<()> {
    let loaded = load_document(path, &LopdfExtractor)
        .with_context(|| format!("reading {}", path.display()))?;

    let mut count = 0;
    for chunk in chunk_document(&loaded.document, chunking) {
        println!(
            "#{} [{}, {}) len={}",
            chunk.sequence_index,
            chunk.start_offset,
            chunk.end_offset,
            chunk.char_len()
        );
        if with_text {
            println!("{}\n", chunk.text);
        }
        count += 1;
    }

    println!(
        "{count} chunks from {} ({} pages, {} unreadable, chunk_size={}, overlap={})",
        loaded.document.source_id,
        loaded.page_count,
        loaded.unreadable_pages.len(),
        chunking.chunk_size(),
        chunking.overlap()
    );
    Ok(())
}
