//! Ferry CLI: run one query through the routing pipeline.
//!
//! Builds the full service graph (settings → gateway → cache → classifier
//! → router → supervisor → units → orchestrator) with explicit ownership,
//! streams status events to stderr, and prints the final answer.
//!
//! Without a gateway API key (`FERRY_GATEWAY_API_KEY`) the deterministic
//! mock gateway is used, which exercises the full pipeline offline.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Parser;
use mimalloc::MiMalloc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ferry_agents::standard_registry;
use ferry_cache::{InMemoryCacheStore, SemanticCache};
use ferry_core::ids::ThreadId;
use ferry_core::query::{Attachment, Query};
use ferry_gateway::{Gateway, MockGateway, OpenAiGateway};
use ferry_routing::{Classifier, Router, Supervisor};
use ferry_runtime::{ConversationStore, InMemoryConversationStore, Orchestrator};
use ferry_settings::FerrySettings;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Debug, Parser)]
#[command(name = "ferry", about = "Route one support query to its processing unit")]
struct Args {
    /// The query text.
    query: String,

    /// Conversation thread ID to continue.
    #[arg(long)]
    thread: Option<String>,

    /// Attachment file name (metadata only; requires --mime).
    #[arg(long, requires = "mime")]
    attachment: Option<String>,

    /// Attachment MIME type.
    #[arg(long)]
    mime: Option<String>,

    /// Explicit language hint (e.g. pt-BR).
    #[arg(long)]
    language: Option<String>,

    /// Settings file path (default: ~/.ferry/settings.json).
    #[arg(long)]
    settings: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ferry=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let settings = match &args.settings {
        Some(path) => ferry_settings::load_settings_from_path(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => ferry_settings::load_settings().context("loading settings")?,
    };
    ferry_settings::init_settings(settings.clone());
    let settings = Arc::new(settings);

    let orchestrator = build_orchestrator(&settings);

    // Stream stage transitions to stderr while the request runs.
    let mut events = orchestrator.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            eprintln!("[{}] {}", event.stage().as_str(), event.request_id());
            if event.is_terminal() {
                break;
            }
        }
    });

    let mut query = Query::text(args.query);
    if let Some(thread) = args.thread {
        query = query.with_thread(ThreadId::new(thread));
    }
    if let (Some(filename), Some(mime)) = (args.attachment, args.mime) {
        query = query.with_attachment(Attachment::new(filename, mime));
    }
    if let Some(language) = args.language {
        query = query.with_language(language);
    }

    let exit = match orchestrator.handle(query).await {
        Ok(outcome) => {
            let rendered = serde_json::to_string_pretty(&serde_json::json!({
                "requestId": outcome.request_id,
                "unit": outcome.verdict.unit,
                "escalated": outcome.verdict.escalated,
                "confidence": outcome.verdict.confidence,
                "durationMs": outcome.duration_ms,
                "answer": outcome.result.payload,
            }))?;
            println!("{rendered}");
            0
        }
        Err(e) => {
            warn!(error = %e, "request failed");
            eprintln!("error: {}", e.user_message());
            1
        }
    };

    let _ = printer.await;
    std::process::exit(exit);
}

/// Construct the service graph with explicit ownership; everything is
/// torn down when the process exits.
fn build_orchestrator(settings: &Arc<FerrySettings>) -> Orchestrator {
    let gateway: Arc<dyn Gateway> = match OpenAiGateway::new(settings.gateway.clone()) {
        Ok(gw) => {
            info!(base_url = %settings.gateway.base_url, "using HTTP gateway");
            Arc::new(gw)
        }
        Err(e) => {
            warn!(error = %e, "falling back to the deterministic mock gateway");
            Arc::new(MockGateway::new(settings.gateway.embedding_dimensions))
        }
    };

    let cache = Arc::new(SemanticCache::new(
        Arc::new(InMemoryCacheStore::new(settings.cache.capacity)),
        settings.cache,
    ));
    let classifier = Arc::new(Classifier::new(Arc::clone(&gateway), Arc::clone(settings)));
    let router = Arc::new(Router::new(
        cache,
        classifier,
        Arc::clone(&gateway),
        Arc::clone(settings),
    ));
    let supervisor = Arc::new(Supervisor::new(Arc::clone(&router), Arc::clone(settings)));
    let registry = Arc::new(standard_registry(gateway));
    let conversations: Arc<dyn ConversationStore> = Arc::new(InMemoryConversationStore::new());

    Orchestrator::new(router, supervisor, registry, conversations, Arc::clone(settings))
}
