//! Answer Synthesizer - Builds the mock answer for one question
//!
//! Provides:
//! - Mode-specific answer templates
//! - One citation per resolved paper

use paperdesk_common::db::models::{ChatId, ChatMode, Citation, Paper, PaperId};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A question asked inside a chat
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AskRequest {
    #[validate(length(min = 1, message = "chat id must not be empty"))]
    pub chat_id: ChatId,

    pub question: String,

    /// Papers to ground the answer in; unknown ids are ignored
    #[serde(default)]
    pub paper_ids: Vec<PaperId>,

    #[serde(default)]
    pub mode: ChatMode,
}

impl AskRequest {
    pub fn new(chat_id: impl Into<ChatId>, question: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            question: question.into(),
            paper_ids: Vec::new(),
            mode: ChatMode::default(),
        }
    }

    pub fn with_papers(mut self, paper_ids: Vec<PaperId>) -> Self {
        self.paper_ids = paper_ids;
        self
    }

    pub fn with_mode(mut self, mode: ChatMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Fully synthesized answer, ready to persist and stream
#[derive(Debug, Clone, PartialEq)]
pub struct AskSession {
    pub mode: ChatMode,
    pub final_answer: String,
    pub citations: Vec<Citation>,
}

/// Opening sentence for each chat mode
pub fn base_answer(mode: ChatMode) -> &'static str {
    match mode {
        ChatMode::Reviewer => "The paper demonstrates strong empirical results but requires more detail on reproducibility. Key datasets and evaluation metrics are summarised below.",
        ChatMode::Ideation => "Here are some follow-up project directions and dataset considerations inspired by the attached papers.",
        ChatMode::Explainer => "Let me unpack the methodology and its implications.",
        ChatMode::Qa => "Summary of relevant findings:",
    }
}

impl AskSession {
    /// Build the answer for `request` from the papers that resolved.
    ///
    /// `papers` must already be in request order with unknown ids dropped.
    pub fn synthesize(request: &AskRequest, papers: &[Paper]) -> Self {
        let base = base_answer(request.mode);

        let final_answer = if papers.is_empty() {
            format!("{} Add a paper to ground the discussion.", base)
        } else {
            let titles: Vec<&str> = papers.iter().map(|p| p.title.as_str()).collect();
            format!("{} Focusing on: {}.", base, titles.join("; "))
        };

        let citations = papers
            .iter()
            .zip(0u32..)
            .map(|(paper, index)| Citation {
                reference: index + 1,
                paper_id: paper.id.clone(),
                page: 2 + 3 * index,
                snippet: format!(
                    "Key methodological insight from {} around {} evaluation.",
                    paper.title,
                    paper
                        .year
                        .map_or_else(|| "recent".to_string(), |y| y.to_string())
                ),
                speculative: None,
            })
            .collect();

        Self {
            mode: request.mode,
            final_answer,
            citations,
        }
    }
}
