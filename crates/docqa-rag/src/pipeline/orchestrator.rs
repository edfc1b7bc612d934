//! Pipeline orchestrator: the ingest and query flows
//!
//! The pipeline holds no per-request state. Everything a query needs is read
//! back from the persisted store, so ingest and query only meet on disk.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::generation::{PromptBuilder, PromptProfile};
use crate::index::{store::validate_name, IndexStore, StoreLocks, VectorIndex};
use crate::ingestion::{DocumentExtractor, TextChunker};
use crate::providers::{self, deadline, AnswerComposer, EmbeddingProvider};
use crate::retrieval::{RetrievalSession, Retriever};
use crate::types::{AnswerSource, Chunk, DocumentInput, IngestReport, QueryAnswer};

use super::flow::{FlowTracker, IngestStage, QueryStage};

/// Result of the resume-analysis flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub report: IngestReport,
    pub answer: QueryAnswer,
}

/// Document QA pipeline
pub struct Pipeline {
    config: RagConfig,
    chunker: TextChunker,
    store: IndexStore,
    locks: Arc<StoreLocks>,
    embedder: Arc<dyn EmbeddingProvider>,
    composer: Arc<dyn AnswerComposer>,
    retriever: Retriever,
}

impl Pipeline {
    /// Create a pipeline over explicit capability providers
    pub fn new(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        composer: Arc<dyn AnswerComposer>,
    ) -> Result<Self> {
        config.validate()?;
        let chunker = TextChunker::from_config(&config.chunking)?;
        let store = IndexStore::new(config.storage.root.clone());
        let locks = Arc::new(StoreLocks::new());

        if embedder.dimensions() != config.embeddings.dimensions {
            tracing::warn!(
                "Embedding provider '{}' reports {} dims, configuration says {}",
                embedder.name(),
                embedder.dimensions(),
                config.embeddings.dimensions
            );
        }

        let retriever = Retriever::new(
            store.clone(),
            locks.clone(),
            embedder.clone(),
            config.index.clone(),
            config.retrieval.top_k,
            config.capabilities.timeout(),
        );

        Ok(Self {
            config,
            chunker,
            store,
            locks,
            embedder,
            composer,
            retriever,
        })
    }

    /// Create a pipeline with the backends selected in `config`
    pub fn from_config(config: RagConfig) -> Result<Self> {
        let embedder = providers::build_embedder(&config)?;
        let composer = providers::build_composer(&config)?;
        Self::new(config, embedder, composer)
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    fn timeout(&self) -> Duration {
        self.config.capabilities.timeout()
    }

    /// Ingest flow: extract, chunk, embed, index and persist `documents` as
    /// the new content of `store`.
    ///
    /// On failure nothing is written and the previous content stays live.
    pub async fn ingest(&self, store: &str, documents: Vec<DocumentInput>) -> Result<IngestReport> {
        let mut flow = FlowTracker::<IngestStage>::new(store);
        let outcome = self.run_ingest(store, documents, &mut flow).await;
        if let Err(e) = &outcome {
            flow.fail(e);
        }
        flow.finish();
        outcome.map(|(report, _)| report)
    }

    async fn run_ingest(
        &self,
        store: &str,
        documents: Vec<DocumentInput>,
        flow: &mut FlowTracker<IngestStage>,
    ) -> Result<(IngestReport, String)> {
        validate_name(store)?;

        flow.advance(IngestStage::Extracting);
        let batch = tokio::task::spawn_blocking(move || DocumentExtractor::extract_batch(&documents))
            .await
            .map_err(|e| Error::internal(format!("extraction task failed: {}", e)))??;

        flow.advance(IngestStage::Chunking);
        let chunks = self.chunker.chunk(&batch.text);

        let mut report = IngestReport {
            store: store.to_string(),
            chunks_indexed: 0,
            documents_indexed: batch.documents,
            skipped: batch.skipped,
            persisted: false,
        };

        if chunks.is_empty() {
            flow.advance(IngestStage::NothingIndexed);
            tracing::warn!("No text extracted for store '{}', nothing persisted", store);
            return Ok((report, batch.text));
        }

        flow.advance(IngestStage::Embedding);
        let vectors = self.embed_chunks(&chunks).await?;

        flow.advance(IngestStage::Indexing);
        let chunk_count = chunks.len();
        self.persist(store, vectors, chunks).await?;
        flow.advance(IngestStage::Persisted);

        report.chunks_indexed = chunk_count;
        report.persisted = true;
        tracing::info!(
            "Ingested {} documents into '{}' ({} chunks, {} skipped)",
            report.documents_indexed,
            store,
            report.chunks_indexed,
            report.skipped.len()
        );
        Ok((report, batch.text))
    }

    async fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.config.embeddings.batch_size) {
            vectors.extend(deadline::embed_many(self.embedder.as_ref(), batch, self.timeout()).await?);
            tracing::debug!("Embedded {}/{} chunks", vectors.len(), texts.len());
        }
        Ok(vectors)
    }

    /// Build the index and save it under the store's write lock on a blocking
    /// task. The task owns the guard, so dropping the caller's future does not
    /// interrupt the write.
    async fn persist(&self, store: &str, vectors: Vec<Vec<f32>>, chunks: Vec<Chunk>) -> Result<String> {
        let guard = self.locks.lock_for(store).write_owned().await;
        let index_store = self.store.clone();
        let name = store.to_string();
        let model = self.embedder.model_id().to_string();
        let dimensions = self.embedder.dimensions();
        let index_config = self.config.index.clone();

        let saved = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            let mut index = VectorIndex::with_metric(dimensions, index_config.metric, &index_config)?;
            index.add(vectors, chunks)?;
            index_store.save(&name, &index, &model)
        })
        .await;
        self.locks.release(store);

        saved.map_err(|e| Error::internal(format!("persist task failed: {}", e)))?
    }

    /// Query flow: retrieve the most similar chunks of `store` and compose
    /// an answer with the configured prompt profile.
    pub async fn ask(&self, store: &str, question: &str) -> Result<QueryAnswer> {
        let mut flow = FlowTracker::<QueryStage>::new(store);
        flow.advance(QueryStage::Retrieving);

        let outcome = match self.retriever.open(store).await {
            Ok(session) => {
                self.answer(&session, self.config.composer.profile, question, question, &mut flow)
                    .await
            }
            Err(e) => Err(e),
        };

        if let Err(e) = &outcome {
            flow.fail(e);
        }
        flow.finish();
        outcome
    }

    /// Answer several questions against one load of `store`.
    ///
    /// The outer error covers loading; each question then succeeds or fails
    /// on its own.
    pub async fn ask_batch(&self, store: &str, questions: &[String]) -> Result<Vec<Result<QueryAnswer>>> {
        let session = self.retriever.open(store).await?;
        let profile = self.config.composer.profile;

        let mut answers = Vec::with_capacity(questions.len());
        for question in questions {
            let mut flow = FlowTracker::<QueryStage>::new(store);
            flow.advance(QueryStage::Retrieving);
            let outcome = self.answer(&session, profile, question, question, &mut flow).await;
            if let Err(e) = &outcome {
                flow.fail(e);
            }
            flow.finish();
            answers.push(outcome);
        }
        Ok(answers)
    }

    /// Resume flow: ingest `documents`, then use their own text as the
    /// retrieval query and compose with `profile` (or the configured one).
    pub async fn analyze(
        &self,
        store: &str,
        documents: Vec<DocumentInput>,
        profile: Option<PromptProfile>,
    ) -> Result<Analysis> {
        let profile = profile.unwrap_or(self.config.composer.profile);

        let mut ingest_flow = FlowTracker::<IngestStage>::new(store);
        let ingested = self.run_ingest(store, documents, &mut ingest_flow).await;
        if let Err(e) = &ingested {
            ingest_flow.fail(e);
        }
        ingest_flow.finish();
        let (report, text) = ingested?;

        if !report.persisted {
            return Err(Error::InvalidInput("no text found in the uploaded documents".into()));
        }

        // The leading window stands in for the whole document as the query
        let query: String = text.chars().take(self.chunker.chunk_size()).collect();

        let mut flow = FlowTracker::<QueryStage>::new(store);
        flow.advance(QueryStage::Retrieving);
        let outcome = match self.retriever.open(store).await {
            Ok(session) => {
                self.answer(&session, profile, &query, profile.default_question(), &mut flow)
                    .await
            }
            Err(e) => Err(e),
        };
        if let Err(e) = &outcome {
            flow.fail(e);
        }
        flow.finish();

        Ok(Analysis {
            report,
            answer: outcome?,
        })
    }

    /// Retrieve with `query`, then compose an answer to `question`
    async fn answer(
        &self,
        session: &RetrievalSession,
        profile: PromptProfile,
        query: &str,
        question: &str,
        flow: &mut FlowTracker<QueryStage>,
    ) -> Result<QueryAnswer> {
        let retrieved = session.retrieve(query).await?;

        flow.advance(QueryStage::Composing);
        let prompt = PromptBuilder::build_prompt(profile, &retrieved, question);
        let answer = deadline::compose(self.composer.as_ref(), &prompt, self.timeout()).await?;

        flow.advance(QueryStage::Answered);
        Ok(QueryAnswer {
            answer,
            sources: retrieved.hits.iter().map(AnswerSource::from_hit).collect(),
            profile,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingBackend;
    use crate::error::CapabilityFault;
    use crate::ingestion::extractor::tests::build_pdf;
    use crate::providers::HashEmbedder;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;

    const DIMS: usize = 128;
    const ALICE: &str = "Alice works at Acme as a data engineer.";

    /// Records every prompt and answers with a fixed reply
    #[derive(Default)]
    struct RecordingComposer {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AnswerComposer for RecordingComposer {
        async fn compose(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().push(prompt.to_string());
            Ok("Alice works at Acme.".to_string())
        }

        fn name(&self) -> &str {
            "recording"
        }

        fn model(&self) -> &str {
            "recording-1"
        }
    }

    struct FailingComposer {
        fault: CapabilityFault,
    }

    #[async_trait]
    impl AnswerComposer for FailingComposer {
        async fn compose(&self, _prompt: &str) -> Result<String> {
            Err(Error::composer(self.fault, "simulated failure"))
        }

        fn name(&self) -> &str {
            "failing"
        }

        fn model(&self) -> &str {
            "failing-1"
        }
    }

    struct StalledComposer;

    #[async_trait]
    impl AnswerComposer for StalledComposer {
        async fn compose(&self, _prompt: &str) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(String::new())
        }

        fn name(&self) -> &str {
            "stalled"
        }

        fn model(&self) -> &str {
            "stalled-1"
        }
    }

    /// Hash embedder that can be switched into a rate-limited state
    struct SwitchableEmbedder {
        inner: HashEmbedder,
        failing: AtomicBool,
    }

    impl SwitchableEmbedder {
        fn new() -> Self {
            Self {
                inner: HashEmbedder::new(DIMS).unwrap(),
                failing: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for SwitchableEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(Error::embedding(CapabilityFault::RateLimited, "quota exceeded"));
            }
            Ok(self.inner.embed_text(text))
        }

        fn dimensions(&self) -> usize {
            DIMS
        }

        fn model_id(&self) -> &str {
            self.inner.model_id()
        }

        fn name(&self) -> &str {
            "switchable"
        }
    }

    fn test_config(dir: &TempDir) -> RagConfig {
        let mut config = RagConfig::default();
        config.storage.root = dir.path().to_path_buf();
        config.embeddings.backend = EmbeddingBackend::Hash;
        config.embeddings.dimensions = DIMS;
        config.embeddings.batch_size = 8;
        config.capabilities.timeout_secs = 5;
        config
    }

    fn pipeline_with(
        dir: &TempDir,
        embedder: Arc<dyn EmbeddingProvider>,
        composer: Arc<dyn AnswerComposer>,
    ) -> Pipeline {
        Pipeline::new(test_config(dir), embedder, composer).unwrap()
    }

    fn pipeline(dir: &TempDir) -> (Pipeline, Arc<RecordingComposer>) {
        let composer = Arc::new(RecordingComposer::default());
        let pipeline = pipeline_with(
            dir,
            Arc::new(HashEmbedder::new(DIMS).unwrap()),
            composer.clone(),
        );
        (pipeline, composer)
    }

    fn long_text() -> String {
        (0..60)
            .map(|i| format!("Paragraph {} talks about topic number {} in some detail.", i, i))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    #[tokio::test]
    async fn test_alice_scenario() {
        let dir = TempDir::new().unwrap();
        let (pipeline, composer) = pipeline(&dir);

        let report = pipeline
            .ingest("alice", vec![DocumentInput::text("alice.txt", ALICE)])
            .await
            .unwrap();
        assert_eq!(report.chunks_indexed, 1);
        assert!(report.persisted);

        let retrieved = pipeline
            .retriever()
            .retrieve("alice", "Where does Alice work?")
            .await
            .unwrap();
        assert_eq!(retrieved.len(), 1);
        assert_eq!(retrieved.hits[0].chunk.text, ALICE);

        let answer = pipeline.ask("alice", "Where does Alice work?").await.unwrap();
        assert_eq!(answer.answer, "Alice works at Acme.");
        assert_eq!(answer.sources.len(), 1);
        assert_eq!(answer.profile, PromptProfile::DocumentQa);

        let prompts = composer.prompts.lock();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains(ALICE));
        assert!(prompts[0].contains("Where does Alice work?"));
    }

    #[tokio::test]
    async fn test_alice_scenario_from_pdf() {
        let dir = TempDir::new().unwrap();
        let (pipeline, _) = pipeline(&dir);

        let pdf = build_pdf(&[ALICE]);
        let report = pipeline
            .ingest("alice", vec![DocumentInput::new("alice.pdf", pdf)])
            .await
            .unwrap();
        assert_eq!(report.chunks_indexed, 1);

        let loaded = pipeline
            .store()
            .load("alice", &pipeline.config().index)
            .unwrap();
        assert_eq!(loaded.index.registry()[0].text, ALICE);
    }

    #[tokio::test]
    async fn test_ask_before_ingest() {
        let dir = TempDir::new().unwrap();
        let (pipeline, composer) = pipeline(&dir);

        let err = pipeline.ask("demo", "What is in the documents?").await.unwrap_err();
        assert!(matches!(err, Error::IndexUnavailable { .. }));
        assert_eq!(err.user_message(), "please ingest documents first");
        assert!(composer.prompts.lock().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_document_is_skipped() {
        let dir = TempDir::new().unwrap();
        let (pipeline, _) = pipeline(&dir);

        let report = pipeline
            .ingest(
                "mixed",
                vec![
                    DocumentInput::new("broken.pdf", b"%PDF-1.4 not really".to_vec()),
                    DocumentInput::text("good.txt", ALICE),
                ],
            )
            .await
            .unwrap();

        assert_eq!(report.chunks_indexed, 1);
        assert_eq!(report.documents_indexed, 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].name, "broken.pdf");
    }

    #[tokio::test]
    async fn test_all_documents_corrupt() {
        let dir = TempDir::new().unwrap();
        let (pipeline, _) = pipeline(&dir);

        let err = pipeline
            .ingest("broken", vec![DocumentInput::new("a.pdf", b"garbage".to_vec())])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoDocumentsExtracted { .. }));
        assert!(!pipeline.store().exists("broken"));
    }

    #[tokio::test]
    async fn test_embedding_failure_keeps_previous_store() {
        let dir = TempDir::new().unwrap();
        let embedder = Arc::new(SwitchableEmbedder::new());
        let pipeline = pipeline_with(&dir, embedder.clone(), Arc::new(RecordingComposer::default()));

        pipeline
            .ingest("demo", vec![DocumentInput::text("alice.txt", ALICE)])
            .await
            .unwrap();

        embedder.failing.store(true, Ordering::SeqCst);
        let err = pipeline
            .ingest("demo", vec![DocumentInput::text("long.txt", long_text())])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::EmbeddingUnavailable {
                fault: CapabilityFault::RateLimited,
                ..
            }
        ));
        assert_eq!(err.ingest_message(), "no index produced, nothing persisted");

        let loaded = pipeline.store().load("demo", &pipeline.config().index).unwrap();
        assert_eq!(loaded.index.len(), 1);
        assert_eq!(loaded.index.registry()[0].text, ALICE);
    }

    #[tokio::test]
    async fn test_reingest_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let (pipeline, _) = pipeline(&dir);
        let docs = || vec![DocumentInput::text("long.txt", long_text())];

        let first = pipeline.ingest("demo", docs()).await.unwrap();
        let hash_first = pipeline
            .store()
            .load("demo", &pipeline.config().index)
            .unwrap()
            .manifest
            .content_hash;

        let second = pipeline.ingest("demo", docs()).await.unwrap();
        let loaded = pipeline.store().load("demo", &pipeline.config().index).unwrap();

        assert!(first.chunks_indexed > 1);
        assert_eq!(first.chunks_indexed, second.chunks_indexed);
        assert_eq!(loaded.index.len(), second.chunks_indexed);
        assert_eq!(loaded.manifest.content_hash, hash_first);
    }

    #[tokio::test]
    async fn test_composer_failure_is_retryable() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline_with(
            &dir,
            Arc::new(HashEmbedder::new(DIMS).unwrap()),
            Arc::new(FailingComposer {
                fault: CapabilityFault::Unavailable,
            }),
        );
        pipeline
            .ingest("demo", vec![DocumentInput::text("alice.txt", ALICE)])
            .await
            .unwrap();

        let err = pipeline.ask("demo", "Where does Alice work?").await.unwrap_err();
        assert!(matches!(err, Error::Composer { .. }));
        assert_eq!(err.user_message(), "ask again later");
    }

    #[tokio::test]
    async fn test_composer_timeout() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        config.capabilities.timeout_secs = 1;
        let pipeline = Pipeline::new(
            config,
            Arc::new(HashEmbedder::new(DIMS).unwrap()),
            Arc::new(StalledComposer),
        )
        .unwrap();
        pipeline
            .ingest("demo", vec![DocumentInput::text("alice.txt", ALICE)])
            .await
            .unwrap();

        let err = pipeline.ask("demo", "Where does Alice work?").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Composer {
                fault: CapabilityFault::Unavailable,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_empty_text_persists_nothing() {
        let dir = TempDir::new().unwrap();
        let (pipeline, _) = pipeline(&dir);

        let report = pipeline
            .ingest("blank", vec![DocumentInput::text("blank.txt", "   \n\n  ")])
            .await
            .unwrap();
        assert_eq!(report.chunks_indexed, 0);
        assert!(!report.persisted);
        assert!(!pipeline.store().exists("blank"));
    }

    #[tokio::test]
    async fn test_invalid_store_name_rejected_before_work() {
        let dir = TempDir::new().unwrap();
        let (pipeline, _) = pipeline(&dir);

        let err = pipeline
            .ingest("../escape", vec![DocumentInput::text("a.txt", ALICE)])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_ask_batch_loads_once() {
        let dir = TempDir::new().unwrap();
        let (pipeline, composer) = pipeline(&dir);
        pipeline
            .ingest("demo", vec![DocumentInput::text("long.txt", long_text())])
            .await
            .unwrap();

        let questions = vec![
            "What does paragraph 3 discuss?".to_string(),
            "   ".to_string(),
            "Summarize".to_string(),
        ];
        let answers = pipeline.ask_batch("demo", &questions).await.unwrap();

        assert_eq!(answers.len(), 3);
        assert!(answers[0].is_ok());
        assert!(matches!(answers[1], Err(Error::InvalidInput(_))));
        assert_eq!(answers[2].as_ref().unwrap().sources.len(), 4);
        assert_eq!(composer.prompts.lock().len(), 2);

        assert!(pipeline.ask_batch("missing", &questions).await.is_err());
    }

    #[tokio::test]
    async fn test_analyze_uses_resume_profile() {
        let dir = TempDir::new().unwrap();
        let (pipeline, composer) = pipeline(&dir);

        let resume = "Jane Doe\n\nSkills: Rust, Kubernetes, PostgreSQL.\n\nExperience: five years building data pipelines.";
        let analysis = pipeline
            .analyze(
                "resume",
                vec![DocumentInput::text("resume.txt", resume)],
                Some(PromptProfile::ResumeAnalysis),
            )
            .await
            .unwrap();

        assert!(analysis.report.persisted);
        assert_eq!(analysis.answer.profile, PromptProfile::ResumeAnalysis);

        let prompts = composer.prompts.lock();
        assert!(prompts[0].contains("career advisor"));
        assert!(prompts[0].contains("Analyse this resume."));
        assert!(prompts[0].contains("Kubernetes"));
    }

    #[tokio::test]
    async fn test_analyze_without_text() {
        let dir = TempDir::new().unwrap();
        let (pipeline, _) = pipeline(&dir);

        let err = pipeline
            .analyze("resume", vec![DocumentInput::text("empty.txt", "")], None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(ref msg) if msg.contains("no text found")));
    }

    #[tokio::test]
    async fn test_concurrent_ingests_leave_consistent_store() {
        let dir = TempDir::new().unwrap();
        let (pipeline, _) = pipeline(&dir);
        let pipeline = Arc::new(pipeline);

        let mut handles = Vec::new();
        for i in 0..4 {
            let pipeline = pipeline.clone();
            handles.push(tokio::spawn(async move {
                let text = format!("{}\n\nDocument number {}.", long_text(), i);
                pipeline
                    .ingest("shared", vec![DocumentInput::text("doc.txt", text)])
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let loaded = pipeline.store().load("shared", &pipeline.config().index).unwrap();
        assert_eq!(loaded.index.len(), loaded.manifest.vector_count);
        assert!(pipeline.ask("shared", "topic number 7").await.is_ok());
    }

    #[tokio::test]
    async fn test_store_built_with_other_width() {
        let dir = TempDir::new().unwrap();
        let (pipeline, _) = pipeline(&dir);
        pipeline
            .ingest("demo", vec![DocumentInput::text("alice.txt", ALICE)])
            .await
            .unwrap();

        let mut config = test_config(&dir);
        config.embeddings.dimensions = 32;
        let narrow = Pipeline::new(
            config,
            Arc::new(HashEmbedder::new(32).unwrap()),
            Arc::new(RecordingComposer::default()),
        )
        .unwrap();

        let err = narrow.ask("demo", "Where does Alice work?").await.unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }

    #[tokio::test]
    async fn test_ingest_past_exact_threshold_builds_graph() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        config.chunking.chunk_size = 200;
        config.chunking.chunk_overlap = 40;
        config.index.exact_search_threshold = 8;
        let pipeline = Pipeline::new(
            config,
            Arc::new(HashEmbedder::new(DIMS).unwrap()),
            Arc::new(RecordingComposer::default()),
        )
        .unwrap();

        let report = pipeline
            .ingest("large", vec![DocumentInput::text("long.txt", long_text())])
            .await
            .unwrap();
        assert!(report.chunks_indexed > 8);
        assert!(pipeline.locks.is_empty());

        let loaded = pipeline.store().load("large", &pipeline.config().index).unwrap();
        assert_eq!(loaded.index.len(), report.chunks_indexed);

        let retrieved = pipeline
            .retriever()
            .retrieve("large", "topic number 7")
            .await
            .unwrap();
        assert!(!retrieved.is_empty());
        assert!(pipeline.ask("large", "topic number 7").await.is_ok());
        assert!(pipeline.locks.is_empty());
    }
}
