use concierge_ai::{AnalysisPipeline, CompletionClient, LlmBackend, OpenAiBackend};
use concierge_conversation::InMemorySessionStore;
use concierge_server::{config::ServerConfig, routes, state::AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!("Loaded configuration");

    let backend =
        OpenAiBackend::new(config.llm.backend_config()).expect("failed to build completion backend");
    let provider = backend.provider();

    let mut client = CompletionClient::new(Arc::new(backend));
    if let Some(fallback) = &config.llm.fallback_message {
        client = client.with_fallback(fallback);
    }
    tracing::info!(
        ?provider,
        model = client.model(),
        failure_policy = ?config.llm.failure_policy,
        "Completion backend ready"
    );
    let pipeline = Arc::new(AnalysisPipeline::new(client).with_policy(config.llm.failure_policy));

    let sessions = Arc::new(InMemorySessionStore::new());
    let app_state = Arc::new(AppState::new(pipeline, sessions, config.session));

    // Spawn periodic idle-session cleanup task
    app_state.spawn_idle_sweeper();

    let app = routes::router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
