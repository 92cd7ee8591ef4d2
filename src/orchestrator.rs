//! Pipeline orchestrator for policy-rag.
//!
//! Builds every component from [`Settings`] around one shared index and
//! exposes the operations the CLI (or any other front end) needs.

use crate::chunking::Chunker;
use crate::config::{Prompts, Settings};
use crate::document::{Document, FileSource};
use crate::embedding::{create_embedder, Embedder, RetryPolicy};
use crate::error::{PolicyRagError, Result};
use crate::index::{SharedIndex, SourceSummary, VectorIndex};
use crate::ingest::{ColdStart, IngestionPipeline};
use crate::rag::{
    Answer, ConversationState, ConversationTurn, LanguageModel, OpenAIChatModel, QaEngine,
    Retriever, Source,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// The main orchestrator for the policy-rag pipeline.
pub struct Orchestrator {
    settings: Settings,
    source: FileSource,
    pipeline: IngestionPipeline,
    engine: Arc<QaEngine>,
}

impl Orchestrator {
    /// Create an orchestrator from settings.
    ///
    /// The index starts empty; call [`start`](Self::start) to load the
    /// snapshot or rebuild it from the configured documents.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let embedder = create_embedder(&settings.embedding)?;

        let llm: Arc<dyn LanguageModel> = Arc::new(OpenAIChatModel::new(
            &settings.rag.model,
            settings.rag.temperature,
            Duration::from_secs(settings.rag.timeout_seconds),
        )?);

        let index = SharedIndex::new(
            VectorIndex::new(settings.index.metric),
            settings.index_path(),
        );

        Self::with_components(settings, prompts, embedder, llm, index)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn LanguageModel>,
        index: SharedIndex,
    ) -> Result<Self> {
        let chunker = Chunker::new(settings.chunking_config())?;
        let retry = RetryPolicy::from_settings(&settings.embedding);

        let pipeline = IngestionPipeline::new(chunker, embedder.clone(), index.clone())
            .with_retry(retry.clone());

        let retriever = Retriever::new(index, embedder)
            .with_k(settings.rag.top_k)
            .with_retry(retry);

        let engine = QaEngine::new(retriever, llm)
            .with_prompts(prompts)
            .with_timeout(Duration::from_secs(settings.rag.timeout_seconds))
            .with_condense_question(settings.rag.condense_question);

        Ok(Self {
            settings,
            source: FileSource::new(),
            pipeline,
            engine: Arc::new(engine),
        })
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get the shared index handle.
    pub fn index(&self) -> &SharedIndex {
        self.pipeline.index()
    }

    /// Load the index snapshot, rebuilding it from the configured documents
    /// if it is missing or corrupt.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<ColdStart> {
        let paths = self.settings.document_paths();
        let source = self.source.clone();
        self.pipeline
            .open_or_rebuild(|| async move { source.load_all(&paths).await })
            .await
    }

    /// Add a document to the knowledge base. Returns the number of chunks added.
    pub async fn ingest(&self, document: &Document) -> Result<usize> {
        self.pipeline.ingest(document).await
    }

    /// Add an uploaded file to the knowledge base.
    pub async fn ingest_upload(&self, name: &str, bytes: &[u8]) -> Result<usize> {
        let document = Document::from_upload(name, bytes)
            .map_err(|e| PolicyRagError::ingestion(name, e))?;
        self.ingest(&document).await
    }

    /// Load every supported file under `paths`, then ingest them in order.
    ///
    /// Returns `(source, chunks added)` per document. Nothing is indexed if a
    /// file cannot be read. Ingestion stops at the first failure and documents
    /// ingested before it stay indexed.
    pub async fn ingest_paths(&self, paths: &[PathBuf]) -> Result<Vec<(String, usize)>> {
        let documents = self.source.load_all(paths).await?;
        let counts = self.pipeline.ingest_all(&documents).await?;
        Ok(documents
            .into_iter()
            .map(|d| d.source)
            .zip(counts)
            .collect())
    }

    /// Replace the knowledge base with one built from `documents` only.
    pub async fn rebuild_index(&self, documents: &[Document]) -> Result<usize> {
        self.pipeline.rebuild(documents, self.settings.index.metric).await
    }

    /// Rebuild the knowledge base from the configured document paths.
    pub async fn rebuild_from_sources(&self) -> Result<usize> {
        let documents = self.source.load_all(&self.settings.document_paths()).await?;
        info!("Rebuilding from {} configured documents", documents.len());
        self.rebuild_index(&documents).await
    }

    /// Return the `limit` passages closest to `query`, without generating an answer.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<Source>> {
        self.engine.retriever().clone().with_k(limit).retrieve(query).await
    }

    /// Per-document summary of the knowledge base.
    pub async fn sources(&self) -> Vec<SourceSummary> {
        self.index().sources().await
    }

    /// Start a new conversation.
    pub fn session(&self) -> Session {
        Session {
            engine: self.engine.clone(),
            conversation: ConversationState::new(),
        }
    }
}

/// One user's conversation with the knowledge base.
pub struct Session {
    engine: Arc<QaEngine>,
    conversation: ConversationState,
}

impl Session {
    /// Ask a question, taking earlier turns of this session into account.
    pub async fn ask(&mut self, question: &str) -> Result<Answer> {
        self.engine.ask(question, &mut self.conversation).await
    }

    /// Forget all earlier turns.
    pub fn reset_conversation(&mut self) {
        self.conversation.reset();
    }

    pub fn history(&self) -> &[ConversationTurn] {
        self.conversation.history()
    }
}
