//! Entity store for PaperDesk
//!
//! Provides:
//! - Entity models
//! - The `EntityStore` abstraction every collaborator depends on
//! - An in-memory implementation guarded by a single lock
//! - Seed fixtures for the sample library

pub mod models;
mod memory;
pub mod seed;

pub use memory::MemoryStore;

use crate::errors::Result;
use async_trait::async_trait;
use models::*;

/// In-place mutation applied to a paper under the store's write lock
pub type PaperMutation = Box<dyn FnOnce(&mut Paper) + Send>;

/// Data access for every persisted entity.
///
/// Implementations own all mutable state; callers only go through these
/// operations. Each call is atomic with respect to every other call.
#[async_trait]
pub trait EntityStore: Send + Sync {
    // ------------------------------------------------------------------
    // Papers
    // ------------------------------------------------------------------

    /// All papers, most recently added first
    async fn list_papers(&self) -> Result<Vec<Paper>>;

    async fn get_paper(&self, id: &str) -> Result<Option<Paper>>;

    /// Insert or replace a paper
    async fn insert_paper(&self, paper: Paper) -> Result<Paper>;

    /// Apply a mutation to an existing paper and return the result
    async fn update_paper(&self, id: &str, mutation: PaperMutation) -> Result<Paper>;

    /// Resolve ids in input order, skipping unknown ones
    async fn papers_by_ids(&self, ids: &[PaperId]) -> Result<Vec<Paper>>;

    // ------------------------------------------------------------------
    // Chats
    // ------------------------------------------------------------------

    /// All chats, most recently updated first
    async fn list_chats(&self) -> Result<Vec<Chat>>;

    async fn get_chat(&self, id: &str) -> Result<Option<Chat>>;

    async fn create_chat(&self, payload: NewChat) -> Result<Chat>;

    async fn update_chat(&self, id: &str, patch: ChatPatch) -> Result<Chat>;

    /// Remove a chat with its messages and draft; unknown ids are ignored
    async fn delete_chat(&self, id: &str) -> Result<()>;

    /// Copy a chat and all of its messages under fresh ids
    async fn duplicate_chat(&self, id: &str) -> Result<Chat>;

    // ------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------

    /// Messages of a chat, oldest first
    async fn list_messages(&self, chat_id: &str) -> Result<Vec<Message>>;

    /// Store a message and bump its chat's `updated_at`
    async fn append_message(&self, message: Message) -> Result<Message>;

    // ------------------------------------------------------------------
    // Folders and drafts
    // ------------------------------------------------------------------

    async fn list_folders(&self) -> Result<Vec<ChatFolder>>;

    async fn create_folder(&self, name: String) -> Result<ChatFolder>;

    async fn save_draft(&self, chat_id: &str, text: String) -> Result<ChatDraft>;

    async fn get_draft(&self, chat_id: &str) -> Result<Option<ChatDraft>>;

    // ------------------------------------------------------------------
    // Insights
    // ------------------------------------------------------------------

    async fn get_facts(&self, paper_id: &str) -> Result<Option<ResearchFacts>>;

    async fn put_facts(&self, paper_id: &str, facts: ResearchFacts) -> Result<()>;

    async fn get_repro_card(&self, paper_id: &str) -> Result<Option<ReproCard>>;

    async fn put_repro_card(&self, paper_id: &str, card: ReproCard) -> Result<()>;

    /// Gaps for a paper; empty when none are stored
    async fn get_gaps(&self, paper_id: &str) -> Result<Vec<GapInsight>>;

    async fn put_gaps(&self, paper_id: &str, gaps: Vec<GapInsight>) -> Result<()>;
}
