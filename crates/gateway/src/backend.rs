//! Workspace backend
//!
//! The single entry point the UI layer talks to. Wraps the entity store, the
//! ingestion simulator and the answer pipeline behind one async API.

use chrono::Utc;
use paperdesk_common::{
    config::AppConfig,
    db::{models::*, seed::Fixtures, EntityStore, MemoryStore},
    errors::{AppError, Result},
    metrics, new_id,
};
use paperdesk_context::{AskRequest, AskSession, ChunkStream, IntentDetector, IntentHint};
use paperdesk_ingestion::{
    IngestAccepted, IngestListener, IngestProgress, IngestRequest, IngestSubscription,
    IngestionSimulator,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument};
use validator::Validate;

pub struct WorkspaceBackend {
    config: Arc<AppConfig>,
    store: Arc<dyn EntityStore>,
    ingestion: IngestionSimulator,
    intents: IntentDetector,
}

impl WorkspaceBackend {
    /// Build a backend over a fresh in-memory store.
    ///
    /// Must be called inside a Tokio runtime when
    /// `ingestion.cancel_when_unobserved` is enabled.
    pub fn new(config: AppConfig) -> Result<Self> {
        let store = if config.store.seed_fixtures {
            MemoryStore::with_fixtures(Fixtures::sample(Utc::now()))
        } else {
            MemoryStore::new()
        };
        Self::with_store(config, Arc::new(store))
    }

    pub fn with_store(config: AppConfig, store: Arc<dyn EntityStore>) -> Result<Self> {
        let ingestion = IngestionSimulator::new(Arc::clone(&store), config.ingestion.clone());
        let intents = IntentDetector::new()?;

        info!(
            seeded = config.store.seed_fixtures,
            token_latency_ms = config.stream.token_latency_ms,
            "Workspace backend ready"
        );

        Ok(Self {
            config: Arc::new(config),
            store,
            ingestion,
            intents,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    // ========================================================================
    // Papers
    // ========================================================================

    pub async fn list_papers(&self) -> Result<Vec<Paper>> {
        self.store.list_papers().await
    }

    pub async fn get_paper(&self, paper_id: &str) -> Result<Option<Paper>> {
        self.store.get_paper(paper_id).await
    }

    /// Accept an upload or URL; progress arrives through the ingest listeners
    pub async fn ingest_paper(&self, request: IngestRequest) -> Result<IngestAccepted> {
        self.ingestion.ingest(request).await
    }

    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe_to_ingest(&self, paper_id: &str, listener: IngestListener) -> IngestSubscription {
        self.ingestion.subscribe(paper_id, listener)
    }

    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe_to_ingest_channel(
        &self,
        paper_id: &str,
    ) -> (IngestSubscription, mpsc::UnboundedReceiver<IngestProgress>) {
        self.ingestion.subscribe_channel(paper_id)
    }

    /// Abort a pending ingestion; false when nothing was pending
    pub async fn cancel_ingest(&self, paper_id: &str) -> Result<bool> {
        self.ingestion.cancel(paper_id).await
    }

    // ========================================================================
    // Chats
    // ========================================================================

    pub async fn list_chats(&self) -> Result<Vec<Chat>> {
        self.store.list_chats().await
    }

    pub async fn get_chat(&self, chat_id: &str) -> Result<Option<Chat>> {
        self.store.get_chat(chat_id).await
    }

    pub async fn create_chat(&self, payload: NewChat) -> Result<Chat> {
        self.store.create_chat(payload).await
    }

    pub async fn update_chat(&self, chat_id: &str, patch: ChatPatch) -> Result<Chat> {
        self.store.update_chat(chat_id, patch).await
    }

    pub async fn delete_chat(&self, chat_id: &str) -> Result<()> {
        self.store.delete_chat(chat_id).await
    }

    pub async fn duplicate_chat(&self, chat_id: &str) -> Result<Chat> {
        self.store.duplicate_chat(chat_id).await
    }

    // ========================================================================
    // Messages
    // ========================================================================

    pub async fn list_messages(&self, chat_id: &str) -> Result<Vec<Message>> {
        self.store.list_messages(chat_id).await
    }

    pub async fn append_message(&self, message: Message) -> Result<Message> {
        self.store.append_message(message).await
    }

    /// Answer a question and stream it back.
    ///
    /// The complete assistant message, citations included, is stored before
    /// the stream is returned; cancelling the stream leaves it in place.
    #[instrument(skip(self, request), fields(chat_id = %request.chat_id, mode = %request.mode))]
    pub async fn ask(&self, request: AskRequest) -> Result<ChunkStream> {
        request.validate()?;

        let papers = self.store.papers_by_ids(&request.paper_ids).await?;
        let session = AskSession::synthesize(&request, &papers);

        let message = Message::new(
            new_id("msg"),
            request.chat_id.clone(),
            Role::Assistant,
            session.final_answer.clone(),
            Utc::now(),
        )
        .with_citations(session.citations.clone());
        let stored = self.store.append_message(message).await?;

        metrics::record_ask(request.mode.as_str(), session.citations.len());
        info!(
            message_id = %stored.id,
            requested = request.paper_ids.len(),
            resolved = papers.len(),
            "Answer synthesized"
        );

        Ok(ChunkStream::new(session, self.config.stream.token_latency()))
    }

    // ========================================================================
    // Insights
    // ========================================================================

    pub async fn get_facts(&self, paper_id: &str) -> Result<Option<ResearchFacts>> {
        self.store.get_facts(paper_id).await
    }

    pub async fn get_repro_card(&self, paper_id: &str) -> Result<Option<ReproCard>> {
        self.store.get_repro_card(paper_id).await
    }

    pub async fn get_gaps(&self, paper_id: &str) -> Result<Vec<GapInsight>> {
        self.store.get_gaps(paper_id).await
    }

    // ========================================================================
    // Folders, drafts and composer hints
    // ========================================================================

    pub async fn list_folders(&self) -> Result<Vec<ChatFolder>> {
        self.store.list_folders().await
    }

    pub async fn create_folder(&self, name: &str) -> Result<ChatFolder> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation {
                message: "folder name must not be empty".into(),
                field: Some("name".into()),
            });
        }
        self.store.create_folder(name.to_string()).await
    }

    pub async fn save_draft(&self, chat_id: &str, text: String) -> Result<ChatDraft> {
        self.store.save_draft(chat_id, text).await
    }

    pub async fn get_draft(&self, chat_id: &str) -> Result<Option<ChatDraft>> {
        self.store.get_draft(chat_id).await
    }

    pub fn detect_intents(&self, prompt: &str) -> Vec<IntentHint> {
        self.intents.detect(prompt)
    }

    /// Drop pending ingestion timers; nothing further is emitted
    pub fn shutdown(&self) {
        self.ingestion.shutdown();
        debug!("Workspace backend shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use paperdesk_context::StreamChunk;
    use std::time::Duration;
    use tokio_test::assert_err;

    fn backend() -> WorkspaceBackend {
        WorkspaceBackend::new(AppConfig::default()).unwrap()
    }

    fn instant_backend() -> WorkspaceBackend {
        WorkspaceBackend::new(AppConfig::instant()).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_ask_persists_before_first_chunk() {
        let backend = backend();
        let before = backend.list_messages("chat-1").await.unwrap().len();

        let request = AskRequest::new("chat-1", "What datasets?")
            .with_papers(vec!["paper-1".into(), "missing".into()]);
        let mut stream = backend.ask(request).await.unwrap();

        // Nothing polled yet, the message is already there
        let messages = backend.list_messages("chat-1").await.unwrap();
        assert_eq!(messages.len(), before + 1);
        let stored = messages.last().unwrap();
        assert_eq!(stored.role, Role::Assistant);
        assert_eq!(stored.citations.as_ref().map(Vec::len), Some(1));

        let mut text = String::new();
        let mut sources = None;
        while let Some(chunk) = stream.next().await {
            match chunk {
                StreamChunk::Token(token) => text.push_str(&token),
                StreamChunk::Sources(payload) => sources = Some(payload.citations),
                StreamChunk::Final(data) => assert!(data.is_empty()),
                StreamChunk::Error(e) => panic!("unexpected error chunk: {}", e.message),
            }
        }
        assert_eq!(text, stored.content);
        assert_eq!(sources.as_ref(), stored.citations.as_ref());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_stream_keeps_message() {
        let backend = backend();
        let mut stream = backend
            .ask(AskRequest::new("chat-2", "Summarize").with_mode(ChatMode::Reviewer))
            .await
            .unwrap();

        assert!(matches!(stream.next().await, Some(StreamChunk::Token(_))));
        stream.cancel();
        assert!(stream.next().await.is_none());

        let messages = backend.list_messages("chat-2").await.unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].content.ends_with("Add a paper to ground the discussion."));
        assert_eq!(messages[0].citations.as_deref(), Some(&[][..]));
    }

    #[tokio::test]
    async fn test_ask_validates_chat_id() {
        let backend = instant_backend();
        let err = assert_err!(backend.ask(AskRequest::new("", "hi")).await);
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_ask_bumps_chat_updated_at() {
        let backend = instant_backend();
        let before = backend.get_chat("chat-2").await.unwrap().unwrap().updated_at;

        let stream = backend.ask(AskRequest::new("chat-2", "again")).await.unwrap();
        drop(stream);

        let after = backend.get_chat("chat-2").await.unwrap().unwrap().updated_at;
        assert!(after > before);
        assert_eq!(backend.list_chats().await.unwrap()[0].id, "chat-2");
    }

    #[tokio::test]
    async fn test_concurrent_asks_append_every_message() {
        let backend = Arc::new(instant_backend());
        let asks = (0..8).map(|i| {
            let backend = Arc::clone(&backend);
            tokio::spawn(async move {
                let request = AskRequest::new("chat-1", format!("question {}", i))
                    .with_papers(vec!["paper-1".into()]);
                backend.ask(request).await.map(|_| ())
            })
        });
        for result in futures::future::join_all(asks).await {
            result.unwrap().unwrap();
        }

        let messages = backend.list_messages("chat-1").await.unwrap();
        assert_eq!(messages.len(), 3 + 8);
        assert!(messages
            .windows(2)
            .all(|pair| pair[0].created_at <= pair[1].created_at));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ingest_then_ask_over_new_paper() {
        let backend = backend();
        let (_sub, mut rx) = backend.subscribe_to_ingest_channel("paper-new");

        let accepted = backend
            .ingest_paper(
                IngestRequest::new("mixtures.pdf", IngestSource::Upload).with_paper_id("paper-new"),
            )
            .await
            .unwrap();
        assert_eq!(accepted.paper_id, "paper-new");

        tokio::time::sleep(Duration::from_millis(1700)).await;
        let mut statuses = Vec::new();
        while let Ok(event) = rx.try_recv() {
            statuses.push(event.status);
        }
        assert_eq!(
            statuses,
            vec![PaperStatus::Queued, PaperStatus::Processing, PaperStatus::Indexed]
        );
        assert_eq!(backend.list_papers().await.unwrap()[0].id, "paper-new");

        let chat = backend
            .create_chat(NewChat {
                paper_ids: Some(vec!["paper-new".into()]),
                ..NewChat::default()
            })
            .await
            .unwrap();
        let chunks: Vec<StreamChunk> = backend
            .ask(AskRequest::new(chat.id.clone(), "Explain").with_papers(chat.paper_ids.clone()))
            .await
            .unwrap()
            .collect()
            .await;
        match &chunks[chunks.len() - 2] {
            StreamChunk::Sources(payload) => {
                assert_eq!(payload.citations[0].paper_id, "paper-new");
                assert!(payload.citations[0].snippet.contains("mixtures.pdf (mock)"));
            }
            other => panic!("expected sources, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_ingest() {
        let backend = backend();
        let accepted = backend
            .ingest_paper(IngestRequest::new("abandoned.pdf", IngestSource::Url))
            .await
            .unwrap();

        assert!(backend.cancel_ingest(&accepted.paper_id).await.unwrap());
        tokio::time::sleep(Duration::from_millis(2000)).await;
        let paper = backend.get_paper(&accepted.paper_id).await.unwrap().unwrap();
        assert_eq!(paper.status, PaperStatus::Error);
    }

    #[tokio::test]
    async fn test_chat_lifecycle() {
        let backend = instant_backend();

        let chat = backend.create_chat(NewChat::default()).await.unwrap();
        assert_eq!(chat.name, Chat::DEFAULT_NAME);

        let folder = backend.create_folder("  Surveys ").await.unwrap();
        assert_eq!(folder.name, "Surveys");
        assert!(backend.create_folder("   ").await.is_err());

        let updated = backend
            .update_chat(
                &chat.id,
                ChatPatch {
                    name: Some("Mixture notes".into()),
                    folder_id: Some(Some(folder.id.clone())),
                    ..ChatPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.folder_id.as_deref(), Some(folder.id.as_str()));

        backend.save_draft(&chat.id, "half a thought".into()).await.unwrap();
        assert_eq!(
            backend.get_draft(&chat.id).await.unwrap().map(|d| d.text),
            Some("half a thought".to_string())
        );

        let copy = backend.duplicate_chat("chat-1").await.unwrap();
        assert_eq!(backend.list_messages(&copy.id).await.unwrap().len(), 3);

        backend.delete_chat(&chat.id).await.unwrap();
        assert!(backend.get_chat(&chat.id).await.unwrap().is_none());
        assert!(backend.get_draft(&chat.id).await.unwrap().is_none());

        let err = backend
            .update_chat("chat-missing", ChatPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ChatNotFound { .. }));
    }

    #[tokio::test]
    async fn test_insights_and_intents() {
        let backend = instant_backend();

        assert!(backend.get_facts("paper-1").await.unwrap().is_some());
        assert!(backend.get_repro_card("paper-2").await.unwrap().is_some());
        assert_eq!(backend.get_gaps("paper-2").await.unwrap().len(), 1);
        assert!(backend.get_gaps("paper-404").await.unwrap().is_empty());

        let hints = backend.detect_intents("Any licence or reproducibility concern?");
        let ids: Vec<&str> = hints.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["license-0", "gaps-1", "repro-2"]);
    }

    #[tokio::test]
    async fn test_unseeded_backend() {
        let mut config = AppConfig::instant();
        config.store.seed_fixtures = false;
        let backend = WorkspaceBackend::new(config).unwrap();
        assert!(backend.list_papers().await.unwrap().is_empty());
        assert!(backend.list_chats().await.unwrap().is_empty());
    }
}
