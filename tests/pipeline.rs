//! End-to-end tests for ingestion, retrieval and conversation.

use async_trait::async_trait;
use policy_rag::chunking::{Chunker, ChunkingConfig};
use policy_rag::document::Document;
use policy_rag::embedding::{Embedder, RetryPolicy};
use policy_rag::index::{Metric, SharedIndex, VectorIndex};
use policy_rag::ingest::{ColdStart, IngestionPipeline};
use policy_rag::rag::{
    ConversationState, ConversationTurn, LanguageModel, Prompt, QaEngine, Retriever,
    NO_KNOWLEDGE_BASE_ANSWER,
};
use policy_rag::{PolicyRagError, Result};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const KEYWORDS: &[&str] = &["leave", "encryption", "expenses", "badge", "overtime"];

/// One dimension per keyword plus a constant so no vector is zero.
struct KeywordEmbedder {
    delay: Option<Duration>,
    fail_batches: AtomicBool,
}

impl KeywordEmbedder {
    fn new() -> Self {
        Self {
            delay: None,
            fail_batches: AtomicBool::new(false),
        }
    }

    fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new()
        }
    }

    fn vector(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let mut v: Vec<f32> = KEYWORDS
            .iter()
            .map(|k| lower.matches(k).count() as f32)
            .collect();
        v.push(0.1);
        v
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(Self::vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_batches.load(Ordering::SeqCst) {
            return Err(PolicyRagError::EmbeddingService {
                message: "upstream rejected the batch".to_string(),
                retryable: false,
            });
        }
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        KEYWORDS.len() + 1
    }
}

/// Records prompts; replies with scripted answers, then a default.
#[derive(Default)]
struct RecordingModel {
    replies: Mutex<Vec<Result<String>>>,
    prompts: Mutex<Vec<(Prompt, usize)>>,
}

impl RecordingModel {
    fn replying(mut replies: Vec<Result<String>>) -> Arc<Self> {
        replies.reverse();
        Arc::new(Self {
            replies: Mutex::new(replies),
            ..Default::default()
        })
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    fn last_prompt(&self) -> Option<(Prompt, usize)> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl LanguageModel for RecordingModel {
    async fn generate(&self, prompt: &Prompt, history: &[ConversationTurn]) -> Result<String> {
        self.prompts.lock().unwrap().push((prompt.clone(), history.len()));
        let next = self.replies.lock().unwrap().pop();
        next.unwrap_or_else(|| Ok("noted".to_string()))
    }
}

fn filler(len: usize) -> String {
    "lorem ipsum dolor sit amet ".chars().cycle().take(len).collect()
}

/// Three pages; with 100/20 chunking this gives five chunks.
///
/// Chunk 0 holds the leave rule (20..44), chunk 2 the overtime rate (181..213),
/// chunk 3 the overtime approval rule (261..293) and chunk 4 the badge rule
/// (354..370). Each sentence lies inside exactly one chunk; chunk 1 is filler.
fn handbook() -> Document {
    let page1 = format!("{}{}{}", filler(20), "Annual leave is 25 days.", filler(106));
    let page2 = format!(
        "{}{}{}{}",
        filler(30),
        "Overtime is paid at 150 percent.",
        filler(48),
        "Overtime needs manager approval."
    );
    let page3 = format!("{}{}{}", filler(60), "Wear your badge.", filler(24));
    Document::from_pages("handbook.pdf", &[page1, page2, page3])
}

fn chunker() -> Chunker {
    Chunker::new(ChunkingConfig {
        chunk_size: 100,
        overlap: 20,
    })
    .unwrap()
}

fn persistent_pipeline(path: &Path, embedder: Arc<dyn Embedder>) -> IngestionPipeline {
    IngestionPipeline::new(
        chunker(),
        embedder,
        SharedIndex::new(VectorIndex::new(Metric::Cosine), path),
    )
    .with_retry(RetryPolicy::no_retries(Duration::from_secs(5)))
}

fn engine(index: &SharedIndex, embedder: Arc<dyn Embedder>, llm: Arc<RecordingModel>) -> QaEngine {
    QaEngine::new(Retriever::new(index.clone(), embedder), llm)
}

#[tokio::test]
async fn ingest_then_answer_from_the_right_chunk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.sqlite");
    let embedder: Arc<dyn Embedder> = Arc::new(KeywordEmbedder::new());
    let pipeline = persistent_pipeline(&path, embedder.clone());

    let added = pipeline.ingest(&handbook()).await.unwrap();
    assert_eq!(added, 5);

    let llm = RecordingModel::replying(vec![Ok("Overtime is paid at 150 percent.".to_string())]);
    let retriever = Retriever::new(pipeline.index().clone(), embedder.clone()).with_k(2);
    let engine = QaEngine::new(retriever, llm.clone());
    let mut conversation = ConversationState::new();

    let answer = engine.ask("How is overtime paid?", &mut conversation).await.unwrap();

    assert_eq!(answer.answer, "Overtime is paid at 150 percent.");
    let chunks: Vec<usize> = answer.sources.iter().map(|s| s.metadata.chunk_index).collect();
    assert_eq!(chunks, vec![2, 3]);
    assert_eq!(answer.sources[0].metadata.page, 2);
    assert!(answer.sources[0].text.contains("Overtime is paid at 150 percent."));
    // Leave, badge and filler chunks share nothing with the question.
    assert!(answer
        .sources
        .iter()
        .all(|s| s.text.to_lowercase().contains("overtime")));
    for unrelated in ["Annual leave", "Wear your badge"] {
        assert!(answer.sources.iter().all(|s| !s.text.contains(unrelated)));
    }

    let (prompt, history) = llm.last_prompt().unwrap();
    assert!(prompt.user.contains("Overtime is paid at 150 percent."));
    assert_eq!(history, 0);
    assert_eq!(conversation.len(), 1);

    // The snapshot holds the same index after a restart.
    let reopened = persistent_pipeline(&path, embedder.clone());
    let outcome = reopened
        .open_or_rebuild(|| async { Ok(Vec::new()) })
        .await
        .unwrap();
    assert_eq!(outcome, ColdStart::Loaded(5));

    let hits = reopened.index().search(&KeywordEmbedder::vector("overtime"), 1).await.unwrap();
    assert_eq!(hits[0].entry.metadata.chunk_index, 2);
}

#[tokio::test]
async fn failed_ingestion_leaves_snapshot_and_index_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.sqlite");
    let embedder = Arc::new(KeywordEmbedder::new());
    let pipeline = persistent_pipeline(&path, embedder.clone());

    pipeline.ingest(&handbook()).await.unwrap();
    let snapshot_before = std::fs::read(&path).unwrap();
    let len_before = pipeline.index().len().await;

    embedder.fail_batches.store(true, Ordering::SeqCst);
    let err = pipeline
        .ingest(&Document::new("badges.txt", "Visitors wear a badge."))
        .await
        .unwrap_err();

    match &err {
        PolicyRagError::Ingestion { document, source } => {
            assert_eq!(document, "badges.txt");
            assert!(matches!(**source, PolicyRagError::EmbeddingService { retryable: false, .. }));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(std::fs::read(&path).unwrap(), snapshot_before);
    assert_eq!(pipeline.index().len().await, len_before);
    assert_eq!(VectorIndex::load(&path).unwrap().len(), len_before);
}

/// Returns vectors of the wrong width, so the insert fails after embedding.
struct WideEmbedder;

#[async_trait]
impl Embedder for WideEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0; 9])
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![1.0; 9]).collect())
    }

    fn dimensions(&self) -> usize {
        9
    }
}

#[tokio::test]
async fn rejected_insert_leaves_snapshot_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.sqlite");
    persistent_pipeline(&path, Arc::new(KeywordEmbedder::new()))
        .ingest(&handbook())
        .await
        .unwrap();
    let snapshot_before = std::fs::read(&path).unwrap();

    let pipeline = persistent_pipeline(&path, Arc::new(WideEmbedder));
    pipeline.open_or_rebuild(|| async { Ok(Vec::new()) }).await.unwrap();

    let err = pipeline.ingest(&Document::new("wide.txt", "some text")).await.unwrap_err();
    assert!(matches!(
        err,
        PolicyRagError::Ingestion { ref source, .. }
            if matches!(**source, PolicyRagError::DimensionMismatch { expected: 6, actual: 9 })
    ));
    assert_eq!(std::fs::read(&path).unwrap(), snapshot_before);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_ingests_are_serialised() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.sqlite");
    let embedder: Arc<dyn Embedder> = Arc::new(KeywordEmbedder::slow(Duration::from_millis(5)));
    let pipeline = Arc::new(persistent_pipeline(&path, embedder.clone()));

    // Keep readers busy while writers run.
    pipeline.ingest(&Document::new("seed.txt", "Leave requests go to HR.")).await.unwrap();
    let stop = Arc::new(AtomicBool::new(false));
    let searches = Arc::new(AtomicUsize::new(0));
    let reader = {
        let index = pipeline.index().clone();
        let stop = stop.clone();
        let searches = searches.clone();
        tokio::spawn(async move {
            while !stop.load(Ordering::SeqCst) {
                let hits = index.search(&KeywordEmbedder::vector("leave"), 3).await.unwrap();
                assert!(!hits.is_empty());
                searches.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
            }
        })
    };

    let mut tasks = Vec::new();
    for n in 0..8 {
        let pipeline = pipeline.clone();
        tasks.push(tokio::spawn(async move {
            let text = format!("{} {}", filler(150 + n * 37), "Expenses need receipts.");
            let document = Document::new(format!("policy-{}.txt", n), text);
            pipeline.ingest(&document).await.unwrap()
        }));
    }

    let mut added = 1;
    for task in tasks {
        added += task.await.unwrap();
    }
    stop.store(true, Ordering::SeqCst);
    reader.await.unwrap();

    assert!(searches.load(Ordering::SeqCst) > 0);
    assert_eq!(pipeline.index().len().await, added);

    let saved = VectorIndex::load(&path).unwrap();
    assert_eq!(saved.len(), added);

    // Dense ids, and each document's chunks are contiguous and in order.
    let entries = saved.entries();
    assert!(entries.iter().enumerate().all(|(i, e)| e.id == i as u64));
    for pair in entries.windows(2) {
        let (a, b) = (&pair[0].metadata, &pair[1].metadata);
        if a.source == b.source {
            assert_eq!(b.chunk_index, a.chunk_index + 1);
        } else {
            assert_eq!(b.chunk_index, 0, "{} interleaved with {}", a.source, b.source);
        }
    }
    let sources = saved.sources();
    assert_eq!(sources.len(), 9);
}

#[tokio::test]
async fn conversation_history_tracks_successful_turns_only() {
    let embedder: Arc<dyn Embedder> = Arc::new(KeywordEmbedder::new());
    let index = SharedIndex::in_memory(VectorIndex::new(Metric::Cosine));
    let pipeline = IngestionPipeline::new(chunker(), embedder.clone(), index.clone());
    pipeline.ingest(&handbook()).await.unwrap();

    let llm = RecordingModel::replying(vec![
        Ok("a1".to_string()),
        Ok("standalone 2".to_string()),
        Ok("a2".to_string()),
        Ok("standalone 3".to_string()),
        Ok("a3".to_string()),
        Ok("standalone 4".to_string()),
        Err(PolicyRagError::generation("model overloaded")),
    ]);
    let engine = engine(&index, embedder, llm.clone());
    let mut conversation = ConversationState::new();

    for question in ["Overtime?", "Rate?", "Weekends?"] {
        engine.ask(question, &mut conversation).await.unwrap();
    }
    assert_eq!(conversation.len(), 3);
    let answers: Vec<&str> = conversation.history().iter().map(|t| t.answer.as_str()).collect();
    assert_eq!(answers, vec!["a1", "a2", "a3"]);

    // The answer call sees every earlier turn.
    let (_, history_seen) = llm.last_prompt().unwrap();
    assert_eq!(history_seen, 2);

    let before = conversation.clone();
    let err = engine.ask("Holidays?", &mut conversation).await.unwrap_err();
    assert!(matches!(err, PolicyRagError::AnswerGeneration { .. }));
    assert_eq!(conversation, before);

    // New documents arriving mid-conversation do not disturb the history.
    pipeline
        .ingest(&Document::new("it.txt", "Laptops need disk encryption."))
        .await
        .unwrap();
    engine.ask("And laptops?", &mut conversation).await.unwrap();
    assert_eq!(conversation.len(), 4);

    conversation.reset();
    assert!(conversation.is_empty());
}

#[tokio::test]
async fn empty_knowledge_base_gets_canned_answer() {
    let embedder: Arc<dyn Embedder> = Arc::new(KeywordEmbedder::new());
    let index = SharedIndex::in_memory(VectorIndex::new(Metric::Cosine));
    let llm = RecordingModel::replying(vec![]);
    let engine = engine(&index, embedder, llm.clone());
    let mut conversation = ConversationState::new();

    let answer = engine.ask("What is the leave policy?", &mut conversation).await.unwrap();

    assert!(answer.is_canned());
    assert_eq!(answer.answer, NO_KNOWLEDGE_BASE_ANSWER);
    assert!(answer.sources.is_empty());
    assert!(conversation.is_empty());
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn corrupt_snapshot_is_rebuilt_from_sources() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.sqlite");
    std::fs::write(&path, b"\x00\x01 not an index").unwrap();

    let pipeline = persistent_pipeline(&path, Arc::new(KeywordEmbedder::new()));
    let outcome = pipeline
        .open_or_rebuild(|| async { Ok(vec![handbook()]) })
        .await
        .unwrap();

    assert_eq!(outcome, ColdStart::Rebuilt(5));
    assert_eq!(VectorIndex::load(&path).unwrap().len(), 5);
}
