//! In-memory entity store
//!
//! All maps live behind one `RwLock`, so every operation observes and
//! produces a consistent snapshot.

use super::models::*;
use super::seed::Fixtures;
use super::{EntityStore, PaperMutation};
use crate::errors::{AppError, Result};
use crate::new_id;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Default)]
struct StoreState {
    papers: HashMap<PaperId, Paper>,
    chats: HashMap<ChatId, Chat>,
    messages: HashMap<ChatId, Vec<Message>>,
    folders: Vec<ChatFolder>,
    drafts: HashMap<ChatId, ChatDraft>,
    facts: HashMap<PaperId, ResearchFacts>,
    repro_cards: HashMap<PaperId, ReproCard>,
    gaps: HashMap<PaperId, Vec<GapInsight>>,
}

/// Process-local implementation of [`EntityStore`]
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store preloaded with the given fixtures
    pub fn with_fixtures(fixtures: Fixtures) -> Self {
        let mut state = StoreState::default();

        for paper in fixtures.papers {
            state.papers.insert(paper.id.clone(), paper);
        }
        for chat in fixtures.chats {
            state.messages.entry(chat.id.clone()).or_default();
            state.chats.insert(chat.id.clone(), chat);
        }
        for message in fixtures.messages {
            state
                .messages
                .entry(message.chat_id.clone())
                .or_default()
                .push(message);
        }
        state.facts.extend(fixtures.facts);
        state.repro_cards.extend(fixtures.repro_cards);
        state.gaps.extend(fixtures.gaps);

        info!(
            papers = state.papers.len(),
            chats = state.chats.len(),
            "Entity store seeded"
        );

        Self {
            state: RwLock::new(state),
        }
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    // ========================================================================
    // Paper Operations
    // ========================================================================

    async fn list_papers(&self) -> Result<Vec<Paper>> {
        let state = self.state.read().await;
        let mut papers: Vec<Paper> = state.papers.values().cloned().collect();
        papers.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        Ok(papers)
    }

    async fn get_paper(&self, id: &str) -> Result<Option<Paper>> {
        Ok(self.state.read().await.papers.get(id).cloned())
    }

    async fn insert_paper(&self, paper: Paper) -> Result<Paper> {
        let mut state = self.state.write().await;
        state.papers.insert(paper.id.clone(), paper.clone());
        debug!(paper_id = %paper.id, status = %paper.status, "Paper stored");
        Ok(paper)
    }

    async fn update_paper(&self, id: &str, mutation: PaperMutation) -> Result<Paper> {
        let mut state = self.state.write().await;
        let paper = state
            .papers
            .get_mut(id)
            .ok_or_else(|| AppError::PaperNotFound { id: id.to_string() })?;
        mutation(paper);
        Ok(paper.clone())
    }

    async fn papers_by_ids(&self, ids: &[PaperId]) -> Result<Vec<Paper>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.papers.get(id).cloned())
            .collect())
    }

    // ========================================================================
    // Chat Operations
    // ========================================================================

    async fn list_chats(&self) -> Result<Vec<Chat>> {
        let state = self.state.read().await;
        let mut chats: Vec<Chat> = state.chats.values().cloned().collect();
        chats.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(chats)
    }

    async fn get_chat(&self, id: &str) -> Result<Option<Chat>> {
        Ok(self.state.read().await.chats.get(id).cloned())
    }

    async fn create_chat(&self, payload: NewChat) -> Result<Chat> {
        let chat = Chat::new(new_id("chat"), payload, Utc::now());

        let mut state = self.state.write().await;
        state.chats.insert(chat.id.clone(), chat.clone());
        state.messages.insert(chat.id.clone(), Vec::new());

        info!(chat_id = %chat.id, mode = %chat.mode, "Chat created");
        Ok(chat)
    }

    async fn update_chat(&self, id: &str, patch: ChatPatch) -> Result<Chat> {
        let mut state = self.state.write().await;
        let chat = state
            .chats
            .get_mut(id)
            .ok_or_else(|| AppError::ChatNotFound { id: id.to_string() })?;
        chat.apply(patch, Utc::now());
        Ok(chat.clone())
    }

    async fn delete_chat(&self, id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let existed = state.chats.remove(id).is_some();
        state.messages.remove(id);
        state.drafts.remove(id);

        if existed {
            info!(chat_id = %id, "Chat deleted");
        }
        Ok(())
    }

    async fn duplicate_chat(&self, id: &str) -> Result<Chat> {
        let mut state = self.state.write().await;
        let source = state
            .chats
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::ChatNotFound { id: id.to_string() })?;

        let now = Utc::now();
        let copy = Chat {
            id: new_id("chat"),
            name: format!("{} (copy)", source.name),
            created_at: now,
            updated_at: now,
            ..source
        };

        let messages: Vec<Message> = state
            .messages
            .get(id)
            .map(|list| {
                list.iter()
                    .map(|message| Message {
                        id: new_id("msg"),
                        chat_id: copy.id.clone(),
                        ..message.clone()
                    })
                    .collect()
            })
            .unwrap_or_default();

        info!(
            source_chat_id = %id,
            chat_id = %copy.id,
            messages = messages.len(),
            "Chat duplicated"
        );

        state.messages.insert(copy.id.clone(), messages);
        state.chats.insert(copy.id.clone(), copy.clone());
        Ok(copy)
    }

    // ========================================================================
    // Message Operations
    // ========================================================================

    async fn list_messages(&self, chat_id: &str) -> Result<Vec<Message>> {
        let state = self.state.read().await;
        let mut messages = state.messages.get(chat_id).cloned().unwrap_or_default();
        // Stable sort: insertion order breaks timestamp ties
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(messages)
    }

    async fn append_message(&self, message: Message) -> Result<Message> {
        let mut state = self.state.write().await;
        state
            .messages
            .entry(message.chat_id.clone())
            .or_default()
            .push(message.clone());

        if let Some(chat) = state.chats.get_mut(&message.chat_id) {
            chat.touch(message.created_at);
        }

        debug!(
            chat_id = %message.chat_id,
            message_id = %message.id,
            role = ?message.role,
            "Message appended"
        );
        Ok(message)
    }

    // ========================================================================
    // Folder & Draft Operations
    // ========================================================================

    async fn list_folders(&self) -> Result<Vec<ChatFolder>> {
        Ok(self.state.read().await.folders.clone())
    }

    async fn create_folder(&self, name: String) -> Result<ChatFolder> {
        let now = Utc::now();
        let folder = ChatFolder {
            id: new_id("folder"),
            name,
            created_at: now,
            updated_at: now,
        };
        self.state.write().await.folders.push(folder.clone());
        Ok(folder)
    }

    async fn save_draft(&self, chat_id: &str, text: String) -> Result<ChatDraft> {
        let draft = ChatDraft {
            chat_id: chat_id.to_string(),
            text,
            updated_at: Utc::now(),
        };
        self.state
            .write()
            .await
            .drafts
            .insert(draft.chat_id.clone(), draft.clone());
        Ok(draft)
    }

    async fn get_draft(&self, chat_id: &str) -> Result<Option<ChatDraft>> {
        Ok(self.state.read().await.drafts.get(chat_id).cloned())
    }

    // ========================================================================
    // Insight Operations
    // ========================================================================

    async fn get_facts(&self, paper_id: &str) -> Result<Option<ResearchFacts>> {
        Ok(self.state.read().await.facts.get(paper_id).cloned())
    }

    async fn put_facts(&self, paper_id: &str, facts: ResearchFacts) -> Result<()> {
        self.state.write().await.facts.insert(paper_id.to_string(), facts);
        Ok(())
    }

    async fn get_repro_card(&self, paper_id: &str) -> Result<Option<ReproCard>> {
        Ok(self.state.read().await.repro_cards.get(paper_id).cloned())
    }

    async fn put_repro_card(&self, paper_id: &str, card: ReproCard) -> Result<()> {
        self.state
            .write()
            .await
            .repro_cards
            .insert(paper_id.to_string(), card);
        Ok(())
    }

    async fn get_gaps(&self, paper_id: &str) -> Result<Vec<GapInsight>> {
        Ok(self
            .state
            .read()
            .await
            .gaps
            .get(paper_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn put_gaps(&self, paper_id: &str, gaps: Vec<GapInsight>) -> Result<()> {
        self.state.write().await.gaps.insert(paper_id.to_string(), gaps);
        Ok(())
    }
}
