//! PaperDesk Gateway
//!
//! Exposes [`WorkspaceBackend`], the facade the UI layer calls for papers,
//! chats, messages, streamed answers and ingestion progress.

pub mod backend;

pub use backend::WorkspaceBackend;
