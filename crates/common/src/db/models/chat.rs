//! Chat entity and its write payloads

use super::paper::PaperId;
use crate::errors::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub type ChatId = String;

/// Conversational style; selects the answer template
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatMode {
    #[default]
    Qa,
    Explainer,
    Reviewer,
    Ideation,
}

impl ChatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatMode::Qa => "qa",
            ChatMode::Explainer => "explainer",
            ChatMode::Reviewer => "reviewer",
            ChatMode::Ideation => "ideation",
        }
    }
}

impl std::fmt::Display for ChatMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "qa" => Ok(ChatMode::Qa),
            "explainer" => Ok(ChatMode::Explainer),
            "reviewer" => Ok(ChatMode::Reviewer),
            "ideation" => Ok(ChatMode::Ideation),
            other => Err(AppError::InvalidMode {
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: ChatId,

    pub name: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Attached papers, in attachment order
    pub paper_ids: Vec<PaperId>,

    pub mode: ChatMode,

    #[serde(default)]
    pub folder_id: Option<String>,
}

/// Payload for creating a chat; missing fields take defaults
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChat {
    pub name: Option<String>,
    pub paper_ids: Option<Vec<PaperId>>,
    pub mode: Option<ChatMode>,
}

/// Partial update of a chat
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPatch {
    pub name: Option<String>,
    pub paper_ids: Option<Vec<PaperId>>,
    pub mode: Option<ChatMode>,
    /// `Some(None)` moves the chat out of its folder
    #[serde(default, with = "double_option")]
    pub folder_id: Option<Option<String>>,
}

impl Chat {
    pub const DEFAULT_NAME: &'static str = "Untitled chat";

    pub fn new(id: ChatId, payload: NewChat, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: payload.name.unwrap_or_else(|| Self::DEFAULT_NAME.to_string()),
            created_at: now,
            updated_at: now,
            paper_ids: payload.paper_ids.unwrap_or_default(),
            mode: payload.mode.unwrap_or_default(),
            folder_id: None,
        }
    }

    /// Merge a patch and bump `updated_at`
    pub fn apply(&mut self, patch: ChatPatch, now: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(paper_ids) = patch.paper_ids {
            self.paper_ids = paper_ids;
        }
        if let Some(mode) = patch.mode {
            self.mode = mode;
        }
        if let Some(folder_id) = patch.folder_id {
            self.folder_id = folder_id;
        }
        self.updated_at = now;
    }

    /// Move `updated_at` forward to `at`, never backwards
    pub fn touch(&mut self, at: DateTime<Utc>) {
        if at > self.updated_at {
            self.updated_at = at;
        }
    }
}

// Distinguishes an absent field from an explicit null.
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("reviewer".parse::<ChatMode>().unwrap(), ChatMode::Reviewer);
        let err = "poet".parse::<ChatMode>().unwrap_err();
        assert!(matches!(err, AppError::InvalidMode { ref value } if value == "poet"));
    }

    #[test]
    fn test_new_chat_defaults() {
        let chat = Chat::new("chat-1".into(), NewChat::default(), Utc::now());
        assert_eq!(chat.name, "Untitled chat");
        assert_eq!(chat.mode, ChatMode::Qa);
        assert!(chat.paper_ids.is_empty());
        assert_eq!(chat.created_at, chat.updated_at);
    }

    #[test]
    fn test_patch_clears_folder() {
        let now = Utc::now();
        let mut chat = Chat::new("chat-1".into(), NewChat::default(), now);
        chat.folder_id = Some("folder-1".into());

        let patch: ChatPatch = serde_json::from_str(r#"{"folderId": null}"#).unwrap();
        chat.apply(patch, now);
        assert_eq!(chat.folder_id, None);

        let patch: ChatPatch = serde_json::from_str(r#"{"name": "Renamed"}"#).unwrap();
        chat.folder_id = Some("folder-2".into());
        chat.apply(patch, now);
        assert_eq!(chat.name, "Renamed");
        assert_eq!(chat.folder_id.as_deref(), Some("folder-2"));
    }

    #[test]
    fn test_touch_is_monotonic() {
        let now = Utc::now();
        let mut chat = Chat::new("chat-1".into(), NewChat::default(), now);
        chat.touch(now - chrono::Duration::minutes(5));
        assert_eq!(chat.updated_at, now);
        chat.touch(now + chrono::Duration::minutes(5));
        assert!(chat.updated_at > now);
    }
}
