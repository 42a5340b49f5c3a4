//! Entity models
//!
//! Plain data types owned by the entity store. Field names serialize in
//! camelCase, the shape the UI layer consumes.

mod chat;
mod citation;
mod folder;
mod insights;
mod message;
mod paper;

pub use chat::{Chat, ChatId, ChatMode, ChatPatch, NewChat};
pub use citation::Citation;
pub use folder::{ChatDraft, ChatFolder};
pub use insights::{GapInsight, GapLabel, ReportedMetric, ReproCard, ResearchFacts};
pub use message::{Message, MessageId, Role};
pub use paper::{IngestSource, Paper, PaperId, PaperStatus};
