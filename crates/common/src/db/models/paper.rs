//! Paper entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type PaperId = String;

/// Processing status of a paper in the library
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaperStatus {
    Queued,
    Processing,
    Indexed,
    Error,
}

impl PaperStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaperStatus::Queued => "queued",
            PaperStatus::Processing => "processing",
            PaperStatus::Indexed => "indexed",
            PaperStatus::Error => "error",
        }
    }

    /// Check if the paper will not change status again
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaperStatus::Indexed | PaperStatus::Error)
    }
}

impl std::fmt::Display for PaperStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an ingested paper came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestSource {
    Upload,
    Url,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paper {
    pub id: PaperId,

    pub title: String,

    pub authors: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arxiv_id: Option<String>,

    pub status: PaperStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb_url: Option<String>,

    pub added_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_in_kb: Option<u32>,
}

impl Paper {
    /// A freshly accepted upload with no metadata yet
    pub fn pending(id: PaperId, title: impl Into<String>, added_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: title.into(),
            authors: Vec::new(),
            venue: None,
            year: None,
            doi: None,
            arxiv_id: None,
            status: PaperStatus::Processing,
            pages: None,
            thumb_url: None,
            added_at,
            size_in_kb: None,
        }
    }
}
