//! Message entity

use super::chat::ChatId;
use super::citation::Citation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type MessageId = String;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,

    pub chat_id: ChatId,

    pub role: Role,

    pub content: String,

    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<MessageId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<Citation>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_draft: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speculative: Option<bool>,
}

impl Message {
    pub fn new(
        id: MessageId,
        chat_id: ChatId,
        role: Role,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            chat_id,
            role,
            content: content.into(),
            created_at,
            parent_id: None,
            citations: None,
            is_draft: None,
            speculative: None,
        }
    }

    pub fn with_citations(mut self, citations: Vec<Citation>) -> Self {
        self.citations = Some(citations);
        self
    }
}
