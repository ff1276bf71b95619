use crate::chunking::{chunk_document, ChunkingConfig};
use crate::context::assemble_context;
use crate::prompt::build_prompt;
use crate::traits::{ChunkStore, Generator, Retriever};
use crate::{
    Answer, AskOptions, AssembledContext, AssemblyOptions, AssistantError, Document, StoreError,
    UNKNOWN_ANSWER,
};

/// Owns the store and generator for one knowledge base and runs the
/// ingest and question-answering flows over them.
pub struct KnowledgeAssistant<S, G>
where
    S: ChunkStore + Retriever,
    G: Generator,
{
    store: S,
    generator: G,
    chunking: ChunkingConfig,
    assembly: AssemblyOptions,
    ask: AskOptions,
}

impl<S, G> KnowledgeAssistant<S, G>
where
    S: ChunkStore + Retriever + Send + Sync,
    G: Generator + Send + Sync,
{
    pub fn new(store: S, generator: G) -> Self {
        Self {
            store,
            generator,
            chunking: ChunkingConfig::default(),
            assembly: AssemblyOptions::default(),
            ask: AskOptions::default(),
        }
    }

    pub fn with_chunking(mut self, chunking: ChunkingConfig) -> Self {
        self.chunking = chunking;
        self
    }

    pub fn with_assembly(mut self, assembly: AssemblyOptions) -> Self {
        self.assembly = assembly;
        self
    }

    pub fn with_ask_options(mut self, ask: AskOptions) -> Self {
        self.ask = ask;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Chunks the document, hands the chunks to the store and flushes it, so
    /// each ingested document is durable on its own. Empty text stores
    /// nothing and reports zero.
    pub async fn ingest_document(&self, document: &Document) -> Result<usize, AssistantError> {
        let chunks = chunk_document(document, self.chunking).collect::<Vec<_>>();
        if chunks.is_empty() {
            return Ok(0);
        }
        let stored = self.store.embed_and_store(&chunks).await?;
        self.store.flush().await?;
        Ok(stored)
    }

    /// Runs the targeted search and, only if it finds nothing, the broad one.
    pub async fn retrieve_context(&self, question: &str) -> Result<AssembledContext, StoreError> {
        let matches = self.store.search(question, self.ask.top_k).await?;
        let fallback = if matches.is_empty() {
            self.store.search("", self.assembly.fallback_limit).await?
        } else {
            Vec::new()
        };

        Ok(assemble_context(&matches, &fallback, &self.assembly))
    }

    pub async fn answer(&self, question: &str) -> Result<Answer, AssistantError> {
        Ok(self.answer_with_context(question).await?.0)
    }

    /// Like [`Self::answer`], also returning the context the answer was built on.
    pub async fn answer_with_context(
        &self,
        question: &str,
    ) -> Result<(Answer, AssembledContext), AssistantError> {
        if question.trim().is_empty() {
            return Err(AssistantError::EmptyQuestion);
        }
        if self.store.is_empty().await? {
            return Ok((Answer::NoDocuments, AssembledContext::empty()));
        }

        let context = self.retrieve_context(question).await?;
        let Some(prompt) = build_prompt(question, &context) else {
            return Ok((Answer::NoDocuments, context));
        };

        let generated = self
            .generator
            .generate(&prompt, self.ask.max_tokens)
            .await?;
        let text = match generated.trim() {
            "" => UNKNOWN_ANSWER.to_string(),
            trimmed => trimmed.to_string(),
        };

        let answer = Answer::Generated {
            text,
            context: context.kind,
        };
        Ok((answer, context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::TrigramEmbedder;
    use crate::stores::MemoryStore;
    use crate::{Chunk, ContextKind, GenerationError, RetrievedMatch, NO_DOCUMENTS_ANSWER};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeStore {
        stored: usize,
        targeted: Vec<RetrievedMatch>,
        broad: Vec<RetrievedMatch>,
        searches: Mutex<Vec<(String, usize)>>,
        flushes: Mutex<usize>,
    }

    #[async_trait]
    impl ChunkStore for FakeStore {
        async fn embed_and_store(&self, chunks: &[Chunk<'_>]) -> Result<usize, StoreError> {
            Ok(chunks.len())
        }

        async fn len(&self) -> Result<usize, StoreError> {
            Ok(self.stored)
        }

        async fn flush(&self) -> Result<(), StoreError> {
            *self.flushes.lock().unwrap() += 1;
            Ok(())
        }
    }

    #[async_trait]
    impl Retriever for FakeStore {
        async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedMatch>, StoreError> {
            self.searches.lock().unwrap().push((query.to_string(), k));
            let source = if query.is_empty() {
                &self.broad
            } else {
                &self.targeted
            };
            Ok(source.iter().take(k).cloned().collect())
        }
    }

    #[derive(Default)]
    struct FakeGenerator {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Generator for FakeGenerator {
        async fn generate(&self, prompt: &str, _max_tokens: u32) -> Result<String, GenerationError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }
    }

    fn matches(texts: &[&str]) -> Vec<RetrievedMatch> {
        texts
            .iter()
            .enumerate()
            .map(|(rank, text)| RetrievedMatch {
                text: text.to_string(),
                score: 0.5,
                rank,
                source_id: "manual.pdf".to_string(),
                sequence_index: rank,
            })
            .collect()
    }

    fn generator(reply: &str) -> FakeGenerator {
        FakeGenerator {
            reply: reply.to_string(),
            ..FakeGenerator::default()
        }
    }

    #[tokio::test]
    async fn empty_store_short_circuits() {
        let assistant = KnowledgeAssistant::new(FakeStore::default(), generator("unused"));

        let answer = assistant.answer("what pressure?").await.unwrap();

        assert_eq!(answer, Answer::NoDocuments);
        assert_eq!(answer.text(), NO_DOCUMENTS_ANSWER);
        assert!(assistant.store.searches.lock().unwrap().is_empty());
        assert!(assistant.generator.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn no_context_never_calls_generator() {
        let store = FakeStore {
            stored: 3,
            ..FakeStore::default()
        };
        let assistant = KnowledgeAssistant::new(store, generator("unused"));

        let answer = assistant.answer("what pressure?").await.unwrap();

        assert_eq!(answer, Answer::NoDocuments);
        assert_eq!(
            *assistant.store.searches.lock().unwrap(),
            vec![("what pressure?".to_string(), 4), (String::new(), 8)]
        );
        assert!(assistant.generator.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn targeted_matches_skip_broad_search() {
        let store = FakeStore {
            stored: 3,
            targeted: matches(&["Max pressure is 210 bar."]),
            broad: matches(&["broad sample"]),
            ..FakeStore::default()
        };
        let assistant = KnowledgeAssistant::new(store, generator("  210 bar \n"));

        let answer = assistant.answer("what pressure?").await.unwrap();

        assert_eq!(
            answer,
            Answer::Generated {
                text: "210 bar".to_string(),
                context: ContextKind::Targeted,
            }
        );
        assert_eq!(assistant.store.searches.lock().unwrap().len(), 1);
        let prompts = assistant.generator.prompts.lock().unwrap();
        assert!(prompts[0].contains("Max pressure is 210 bar."));
        assert!(!prompts[0].contains("broad sample"));
    }

    #[tokio::test]
    async fn empty_targeted_search_falls_back_to_summary_prompt() {
        let store = FakeStore {
            stored: 10,
            broad: matches(&["one", "two", "three", "four", "five", "six", "seven", "eight", "nine"]),
            ..FakeStore::default()
        };
        let assistant = KnowledgeAssistant::new(store, generator("A manual."));

        let answer = assistant.answer("what is this about?").await.unwrap();

        assert_eq!(answer.context_kind(), ContextKind::Fallback);
        let prompts = assistant.generator.prompts.lock().unwrap();
        assert!(prompts[0].contains("summarize"));
        assert!(prompts[0].contains("one two three four five six seven eight"));
        assert!(!prompts[0].contains("nine"));
    }

    #[tokio::test]
    async fn blank_targeted_matches_are_still_targeted() {
        let store = FakeStore {
            stored: 2,
            targeted: matches(&["   ", "\n"]),
            broad: matches(&["broad sample"]),
            ..FakeStore::default()
        };
        let assistant = KnowledgeAssistant::new(store, generator("I don't know."));

        let (answer, context) = assistant.answer_with_context("what pressure?").await.unwrap();

        assert_eq!(context.kind, ContextKind::Targeted);
        assert_eq!(context.included, 2);
        assert_eq!(answer.context_kind(), ContextKind::Targeted);
        assert_ne!(answer, Answer::NoDocuments);
        assert_eq!(assistant.store.searches.lock().unwrap().len(), 1);
        assert_eq!(assistant.generator.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn answer_with_context_searches_once() {
        let store = FakeStore {
            stored: 4,
            broad: matches(&["intro", "scope"]),
            ..FakeStore::default()
        };
        let assistant = KnowledgeAssistant::new(store, generator("A manual."));

        let (answer, context) = assistant.answer_with_context("overview?").await.unwrap();

        assert_eq!(context.kind, ContextKind::Fallback);
        assert_eq!(context.text, "intro scope");
        assert_eq!(answer.text(), "A manual.");
        assert_eq!(assistant.store.searches.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn each_ingested_document_is_flushed() {
        let assistant = KnowledgeAssistant::new(FakeStore::default(), generator(""))
            .with_chunking(ChunkingConfig::new(10, 2).unwrap());

        assistant
            .ingest_document(&Document::new("a.pdf", "first document text"))
            .await
            .unwrap();
        assistant
            .ingest_document(&Document::new("b.pdf", "second document text"))
            .await
            .unwrap();
        assistant
            .ingest_document(&Document::new("blank.pdf", "  "))
            .await
            .unwrap();

        assert_eq!(*assistant.store.flushes.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn blank_generation_becomes_unknown() {
        let store = FakeStore {
            stored: 1,
            targeted: matches(&["context"]),
            ..FakeStore::default()
        };
        let assistant = KnowledgeAssistant::new(store, generator("   "));

        let answer = assistant.answer("question").await.unwrap();

        assert_eq!(answer.text(), UNKNOWN_ANSWER);
    }

    #[tokio::test]
    async fn blank_question_is_rejected() {
        let assistant = KnowledgeAssistant::new(FakeStore::default(), generator(""));
        assert!(matches!(
            assistant.answer("  ").await,
            Err(AssistantError::EmptyQuestion)
        ));
    }

    #[tokio::test]
    async fn ingest_and_answer_over_memory_store() {
        let store = MemoryStore::in_memory(TrigramEmbedder::default());
        let assistant = KnowledgeAssistant::new(store, generator("Below 210 bar."))
            .with_chunking(ChunkingConfig::new(60, 10).unwrap());

        let empty = Document::new("scan.pdf", "   ");
        assert_eq!(assistant.ingest_document(&empty).await.unwrap(), 0);

        let document = Document::new(
            "manual.pdf",
            "The hydraulic pump pressure must stay below 210 bar at all times. \
             Replace the air filter every 500 operating hours.",
        );
        let stored = assistant.ingest_document(&document).await.unwrap();
        assert_eq!(stored, 3);
        assert_eq!(assistant.store().len().await.unwrap(), 3);

        let answer = assistant.answer("hydraulic pump pressure").await.unwrap();
        assert_eq!(answer.context_kind(), ContextKind::Targeted);
        assert_eq!(answer.text(), "Below 210 bar.");
    }
}
