//! Application state: the explicitly constructed context handed to every handler.
//!
//! This module owns:
//!   - the store handle (MongoDB, or in-memory when MONGODB_URI is unset)
//!   - the optional LLM gateway (absent without GROQ_API_KEY)
//!   - the prompts struct and the roadmap (from TOML or defaults)
//!   - process settings
//!
//! Built once in `main`, released with [`AppState::shutdown`] after the server drains.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::config::{load_mentor_config_from_env, Prompts, Settings};
use crate::llm::{GatewayError, LlmGateway};
use crate::seeds::default_roadmap;
use crate::store::{MemoryStore, MongoStore, Store, StoreError};

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub llm: Option<LlmGateway>,
    pub prompts: Prompts,
    pub roadmap: Vec<String>,
    pub settings: Settings,
}

impl AppState {
    /// Assemble state from explicit parts. An empty roadmap falls back to the default.
    pub fn new(
        store: Arc<dyn Store>,
        llm: Option<LlmGateway>,
        prompts: Prompts,
        roadmap: Vec<String>,
        settings: Settings,
    ) -> Self {
        let roadmap = if roadmap.is_empty() { default_roadmap() } else { roadmap };
        Self { store, llm, prompts, roadmap, settings }
    }

    /// Build state from env: load config, connect the store, init the gateway.
    #[instrument(level = "info", skip_all)]
    pub async fn init(settings: Settings) -> Result<Self, StoreError> {
        let cfg = load_mentor_config_from_env().unwrap_or_default();

        let store: Arc<dyn Store> = match &settings.mongodb_uri {
            Some(uri) => Arc::new(MongoStore::connect(uri).await?),
            None => {
                warn!(target: "dsa_mentor", "MONGODB_URI not set; using in-memory store (data is lost on restart)");
                Arc::new(MemoryStore::new())
            }
        };

        let llm = LlmGateway::from_env(settings.llm_timeout);
        if let Some(gw) = &llm {
            info!(target: "dsa_mentor", base_url = %gw.base_url, model = %gw.model, "LLM gateway enabled.");
        } else {
            warn!(target: "dsa_mentor", "LLM gateway disabled (no GROQ_API_KEY). Lessons and doubts will fail; quizzes use fallback sets.");
        }

        let roadmap = cfg.roadmap.unwrap_or_default();
        let state = Self::new(store, llm, cfg.prompts, roadmap, settings);
        info!(target: "dsa_mentor", topics = state.roadmap.len(), "Roadmap loaded");
        Ok(state)
    }

    /// The gateway, or `NotConfigured`.
    pub fn llm(&self) -> Result<&LlmGateway, GatewayError> {
        self.llm.as_ref().ok_or(GatewayError::NotConfigured)
    }

    pub async fn shutdown(&self) {
        self.store.shutdown().await;
    }
}
