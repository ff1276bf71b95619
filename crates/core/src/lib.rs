pub mod chunking;
pub mod context;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod generation;
pub mod ingest;
pub mod models;
pub mod orchestrator;
pub mod prompt;
pub mod stores;
pub mod traits;

pub use chunking::{chunk_document, ChunkingConfig, Chunks};
pub use context::{assemble_context, truncate_chars};
pub use embeddings::{cosine_similarity, Embedder, TrigramEmbedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{AssistantError, GenerationError, IngestError, StoreError};
pub use extractor::{
    document_from_pages, extract_page_texts, LopdfExtractor, PageText, PdfExtractor, PdfText,
};
pub use generation::{OpenAiGenerator, DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL};
pub use ingest::{
    digest_file, discover_pdf_files, load_document, load_documents_best_effort, IngestionReport,
    LoadedDocument, SkippedPdf,
};
pub use models::{
    Answer, AskOptions, AssembledContext, AssemblyOptions, Chunk, ContextKind, Document,
    IngestionOptions, RetrievedMatch, NO_DOCUMENTS_ANSWER, UNKNOWN_ANSWER,
};
pub use orchestrator::KnowledgeAssistant;
pub use prompt::build_prompt;
pub use stores::{MemoryStore, QdrantStore};
pub use traits::{ChunkStore, Generator, Retriever};
