//! PaperDesk Ingestion Simulator
//!
//! Simulates the upload pipeline of the paper library:
//! - `scheduler`: keyed deferred tasks with cancellation
//! - `subscribers`: per-paper progress listeners
//! - `simulator`: the timed queued → processing → indexed walk

pub mod scheduler;
pub mod simulator;
pub mod subscribers;

pub use scheduler::{TaskHandle, TaskScheduler};
pub use simulator::{IngestAccepted, IngestRequest, IngestionSimulator};
pub use subscribers::{
    IngestListener, IngestProgress, IngestSubscription, SubscriberRegistry, WeakSubscriberRegistry,
};
