//! Shared application state.

use crate::config::SessionConfig;
use chrono::{Duration as ChronoDuration, Utc};
use concierge_ai::AnalysisPipeline;
use concierge_conversation::{ChatService, SessionStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Shared application state.
pub struct AppState {
    /// Artifact pipeline shared by every request.
    pub pipeline: Arc<AnalysisPipeline>,
    /// Chat turns over the same pipeline.
    pub chat: ChatService,
    /// Conversation storage.
    pub sessions: Arc<dyn SessionStore>,
    /// Session configuration.
    pub session_config: SessionConfig,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(
        pipeline: Arc<AnalysisPipeline>,
        sessions: Arc<dyn SessionStore>,
        session_config: SessionConfig,
    ) -> Self {
        let chat =
            ChatService::new(pipeline.clone()).with_replay_turns(session_config.replay_window());
        Self {
            pipeline,
            chat,
            sessions,
            session_config,
        }
    }

    /// Spawns the periodic sweep of idle conversations.
    pub fn spawn_idle_sweeper(&self) -> JoinHandle<()> {
        let sessions = self.sessions.clone();
        let idle = ChronoDuration::minutes(self.session_config.idle_minutes_signed());
        let every = Duration::from_secs(self.session_config.cleanup_interval_seconds.max(1));

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                match sessions.remove_idle(Utc::now() - idle).await {
                    Ok(count) if count > 0 => {
                        tracing::debug!(removed_conversations = count, "Periodic session cleanup");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to clean up idle conversations");
                    }
                }
            }
        })
    }
}
