//! PaperDesk demo runner
//!
//! Boots the workspace backend with the configured pacing, ingests one paper
//! while following its progress, then streams an answer grounded in it.
//! Handles:
//! - Environment and layered configuration
//! - Structured logging
//! - Prometheus metrics recorder

use anyhow::Context;
use futures::StreamExt;
use metrics_exporter_prometheus::PrometheusBuilder;
use paperdesk_common::{
    config::AppConfig,
    db::models::{IngestSource, NewChat, PaperStatus},
    metrics,
};
use paperdesk_context::{AskRequest, StreamChunk};
use paperdesk_gateway::WorkspaceBackend;
use paperdesk_ingestion::IngestRequest;
use std::io::Write;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("failed to load configuration")?;

    init_tracing(&config);

    info!(
        service = %config.observability.service_name,
        "Starting PaperDesk v{}",
        paperdesk_common::VERSION
    );

    // Initialize metrics
    let prometheus = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install metrics recorder")?;
    metrics::register_metrics();

    let backend = WorkspaceBackend::new(config)?;

    tokio::select! {
        result = run_demo(&backend) => result?,
        _ = shutdown_signal() => warn!("Demo interrupted"),
    }

    backend.shutdown();
    info!(metrics = %prometheus.render(), "Shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if config.observability.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run_demo(backend: &WorkspaceBackend) -> anyhow::Result<()> {
    let paper_id = paperdesk_common::new_id("paper");
    let (subscription, mut progress) = backend.subscribe_to_ingest_channel(&paper_id);

    backend
        .ingest_paper(
            IngestRequest::new("chinchilla-scaling.pdf", IngestSource::Upload)
                .with_paper_id(&paper_id),
        )
        .await?;

    while let Some(event) = progress.recv().await {
        info!(paper_id = %event.paper_id, status = %event.status, progress = event.progress, "Ingest progress");
        if event.status.is_terminal() {
            break;
        }
    }
    subscription.unsubscribe();

    let paper = backend
        .get_paper(&paper_id)
        .await?
        .context("ingested paper missing from the library")?;
    if paper.status != PaperStatus::Indexed {
        anyhow::bail!("ingestion ended in status {}", paper.status);
    }

    let hints = backend.detect_intents("Which datasets and hardware did they use?");
    info!(hints = %serde_json::to_string(&hints)?, "Composer hints");

    let chat = backend
        .create_chat(NewChat {
            name: Some("Scaling notes".into()),
            paper_ids: Some(vec![paper_id.clone(), "paper-1".into()]),
            mode: None,
        })
        .await?;

    let request = AskRequest::new(chat.id.clone(), "Which datasets did they use?")
        .with_papers(chat.paper_ids.clone());
    let mut stream = backend.ask(request).await?;

    let mut stdout = std::io::stdout();
    while let Some(chunk) = stream.next().await {
        match chunk {
            StreamChunk::Token(token) => {
                write!(stdout, "{}", token)?;
                stdout.flush()?;
            }
            StreamChunk::Sources(payload) => {
                writeln!(stdout)?;
                for citation in &payload.citations {
                    writeln!(stdout, "[{}] {} p.{}", citation.reference, citation.snippet, citation.page)?;
                }
            }
            StreamChunk::Final(_) => info!(chat_id = %chat.id, "Answer complete"),
            StreamChunk::Error(error) => anyhow::bail!("stream failed: {}", error.message),
        }
    }

    Ok(())
}

/// Ctrl+C handler
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
