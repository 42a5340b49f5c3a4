//! Ingestion simulator
//!
//! Accepts a paper, then walks it through queued → processing → indexed on
//! timers owned by a [`TaskScheduler`], notifying the paper's listeners at
//! each step.

use crate::scheduler::TaskScheduler;
use crate::subscribers::{IngestListener, IngestProgress, IngestSubscription, SubscriberRegistry};
use chrono::{Datelike, Utc};
use paperdesk_common::config::IngestionConfig;
use paperdesk_common::db::models::{IngestSource, Paper, PaperId, PaperStatus};
use paperdesk_common::db::EntityStore;
use paperdesk_common::errors::{AppError, Result};
use paperdesk_common::{metrics, new_id};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

const CANCELLED_MESSAGE: &str = "ingestion cancelled";
const MOCK_AUTHOR: &str = "Mock Author";

/// Request to add a paper to the library
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    /// File name or URL shown as the initial title
    #[validate(length(min = 1, max = 1000))]
    pub name: String,

    pub source: IngestSource,

    /// Client-chosen id, so listeners can register before the first event
    #[serde(default)]
    #[validate(length(min = 1, max = 128))]
    pub paper_id: Option<PaperId>,
}

impl IngestRequest {
    pub fn new(name: impl Into<String>, source: IngestSource) -> Self {
        Self {
            name: name.into(),
            source,
            paper_id: None,
        }
    }

    pub fn with_paper_id(mut self, paper_id: impl Into<PaperId>) -> Self {
        self.paper_id = Some(paper_id.into());
        self
    }
}

/// Response returned as soon as the paper is accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestAccepted {
    pub paper_id: PaperId,
    pub status: PaperStatus,
}

/// Last emitted progress per paper still in flight
type ProgressTable = Arc<Mutex<HashMap<PaperId, u8>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone)]
pub struct IngestionSimulator {
    store: Arc<dyn EntityStore>,
    registry: SubscriberRegistry,
    scheduler: TaskScheduler,
    config: IngestionConfig,
    progress: ProgressTable,
    reaper: Option<AbortHandle>,
}

impl IngestionSimulator {
    /// Create a simulator writing to `store`.
    ///
    /// With `cancel_when_unobserved` set this spawns a background task and
    /// must run inside a Tokio runtime.
    pub fn new(store: Arc<dyn EntityStore>, config: IngestionConfig) -> Self {
        let scheduler = TaskScheduler::new();
        let progress: ProgressTable = Arc::default();

        if !config.cancel_when_unobserved {
            return Self {
                store,
                registry: SubscriberRegistry::new(),
                scheduler,
                config,
                progress,
                reaper: None,
            };
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<PaperId>();
        let registry = SubscriberRegistry::with_unobserved_notifier(tx);
        let reaper = {
            let store = Arc::clone(&store);
            let registry = registry.downgrade();
            let scheduler = scheduler.clone();
            let progress = Arc::clone(&progress);
            tokio::spawn(async move {
                while let Some(paper_id) = rx.recv().await {
                    let Some(registry) = registry.upgrade() else {
                        break;
                    };
                    // A listener may have joined since the notice was queued
                    if registry.listener_count(&paper_id) > 0 || scheduler.pending(&paper_id) == 0 {
                        continue;
                    }
                    match abort_pending(store.as_ref(), &scheduler, &progress, &paper_id).await {
                        Ok(Some(event)) => {
                            warn!(paper_id = %paper_id, "Ingestion cancelled after last listener left");
                            registry.emit(&event);
                        }
                        Ok(None) => {}
                        Err(e) => e.log(),
                    }
                }
            })
            .abort_handle()
        };

        Self {
            store,
            registry,
            scheduler,
            config,
            progress,
            reaper: Some(reaper),
        }
    }

    /// Accept a paper and start the timed pipeline.
    ///
    /// The `queued` event is emitted before this returns; the paper itself is
    /// stored with status `processing`.
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestAccepted> {
        request.validate()?;

        let paper_id = match request.paper_id {
            Some(id) => {
                if self.store.get_paper(&id).await?.is_some() {
                    return Err(AppError::Duplicate {
                        message: format!("paper {} already exists", id),
                    });
                }
                id
            }
            None => new_id("paper"),
        };

        let paper = Paper::pending(paper_id.clone(), request.name.clone(), Utc::now());
        self.store.insert_paper(paper).await?;

        info!(paper_id = %paper_id, source = ?request.source, "Ingestion accepted");

        self.emit(IngestProgress::new(paper_id.clone(), PaperStatus::Queued, 0));

        let processing = {
            let sim = self.clone();
            let event = IngestProgress::new(
                paper_id.clone(),
                PaperStatus::Processing,
                self.config.processing_progress,
            );
            async move {
                sim.emit(event);
            }
        };
        self.scheduler
            .schedule(&paper_id, self.config.processing_delay(), processing);

        let finalize = {
            let sim = self.clone();
            let paper_id = paper_id.clone();
            let name = request.name;
            async move {
                sim.finalize(paper_id, name).await;
            }
        };
        self.scheduler
            .schedule(&paper_id, self.config.indexed_delay(), finalize);

        Ok(IngestAccepted {
            paper_id,
            status: PaperStatus::Processing,
        })
    }

    async fn finalize(&self, paper_id: PaperId, name: String) {
        let now = Utc::now();
        let result = self
            .store
            .update_paper(
                &paper_id,
                Box::new(move |paper: &mut Paper| {
                    paper.status = PaperStatus::Indexed;
                    paper.title = format!("{} (mock)", name);
                    paper.authors = vec![MOCK_AUTHOR.to_string()];
                    paper.year = Some(now.year());
                    paper.added_at = now;
                }),
            )
            .await;

        match result {
            Ok(paper) => {
                info!(paper_id = %paper.id, title = %paper.title, "Paper indexed");
                self.emit(IngestProgress::new(paper_id.clone(), PaperStatus::Indexed, 100));
                lock(&self.progress).remove(&paper_id);
            }
            Err(e) => {
                warn!(paper_id = %paper_id, error = %e, "Paper disappeared before indexing");
                lock(&self.progress).remove(&paper_id);
            }
        }
    }

    fn emit(&self, event: IngestProgress) {
        lock(&self.progress).insert(event.paper_id.clone(), event.progress);
        self.registry.emit(&event);
    }

    /// Register a progress listener for a paper
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, paper_id: &str, listener: IngestListener) -> IngestSubscription {
        self.registry.subscribe(paper_id, listener)
    }

    /// Register a listener that forwards progress into a channel
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe_channel(
        &self,
        paper_id: &str,
    ) -> (IngestSubscription, mpsc::UnboundedReceiver<IngestProgress>) {
        self.registry.subscribe_channel(paper_id)
    }

    /// Stop a pending ingestion and mark the paper as failed.
    ///
    /// Returns false when nothing was pending (already indexed or unknown).
    #[instrument(skip(self))]
    pub async fn cancel(&self, paper_id: &str) -> Result<bool> {
        match abort_pending(self.store.as_ref(), &self.scheduler, &self.progress, paper_id).await? {
            Some(event) => {
                warn!(paper_id, "Ingestion cancelled");
                self.registry.emit(&event);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Timed transitions still pending for a paper
    pub fn pending(&self, paper_id: &str) -> usize {
        self.scheduler.pending(paper_id)
    }

    /// Drop every pending timer without emitting anything
    pub fn shutdown(&self) {
        let dropped = self.scheduler.cancel_all();
        if let Some(reaper) = &self.reaper {
            reaper.abort();
        }
        lock(&self.progress).clear();
        debug!(dropped, "Ingestion simulator shut down");
    }
}

/// Cancel a paper's pending transitions and mark it failed.
///
/// Yields the error event to emit, or `None` when nothing was cancelled.
async fn abort_pending(
    store: &dyn EntityStore,
    scheduler: &TaskScheduler,
    progress: &ProgressTable,
    paper_id: &str,
) -> Result<Option<IngestProgress>> {
    if scheduler.cancel(paper_id) == 0 {
        return Ok(None);
    }

    // The finalize task may have completed concurrently; never overwrite indexed
    let paper = store
        .update_paper(
            paper_id,
            Box::new(|paper: &mut Paper| {
                if !paper.status.is_terminal() {
                    paper.status = PaperStatus::Error;
                }
            }),
        )
        .await?;
    let last = lock(progress).remove(paper_id).unwrap_or(0);

    if paper.status != PaperStatus::Error {
        return Ok(None);
    }

    metrics::record_ingestion_cancelled();
    Ok(Some(IngestProgress::failed(paper_id, last, CANCELLED_MESSAGE)))
}
