//! PaperDesk Context Engine
//!
//! The answer side of a chat:
//! - Mode-specific answer synthesis with citations
//! - Paced chunk streaming with explicit cancellation
//! - Keyword intent hints for the composer

pub mod intent;
pub mod session;
pub mod stream;

pub use intent::{IntentDetector, IntentHint};
pub use session::{AskRequest, AskSession};
pub use stream::{ChunkStream, ErrorPayload, SourcePayload, StreamChunk, StreamState};
