//! AI DSA Mentor · Backend
//!
//! - Axum HTTP API (auth, daily lesson, quiz, doubts, progress)
//! - Optional Groq (OpenAI-compatible) LLM gateway
//! - MongoDB persistence, in-memory store when no URI is configured
//!
//! Important env variables:
//!   PORT                  : u16 (default 8000)
//!   MONGODB_URI           : enables MongoDB persistence if present
//!   CORS_ORIGINS          : comma-separated allowed frontend origins
//!   SESSION_LIFETIME_SECS : bearer token lifetime (default 86400)
//!   BCRYPT_COST           : password hashing cost
//!   GROQ_API_KEY          : enables the LLM gateway if present
//!   GROQ_BASE_URL         : default "https://api.groq.com/openai/v1"
//!   GROQ_MODEL            : model name for all completions
//!   LLM_TIMEOUT_SECS      : per-request upstream timeout (default 60)
//!   MENTOR_CONFIG_PATH    : path to TOML config (prompts + optional roadmap)
//!   LOG_LEVEL             : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT            : "pretty" (default) or "json"

mod auth;
mod config;
mod domain;
mod error;
mod llm;
mod logic;
mod protocol;
mod quiz;
mod routes;
mod seeds;
mod state;
mod store;
mod telemetry;
mod util;

use std::{net::SocketAddr, sync::Arc};
use tokio::{net::TcpListener, signal};
use tracing::info;

use crate::config::Settings;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  dotenvy::dotenv().ok();
  telemetry::init_tracing();

  let settings = Settings::from_env();
  let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));

  // Store, LLM gateway, prompts and roadmap.
  let state = Arc::new(AppState::init(settings).await?);

  let app = build_router(state.clone());

  let listener = TcpListener::bind(addr).await?;
  info!(target: "dsa_mentor", %addr, "HTTP server listening");
  axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

  state.shutdown().await;
  info!(target: "dsa_mentor", "Shut down cleanly");
  Ok(())
}

async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = signal::ctrl_c().await {
      tracing::error!(target: "dsa_mentor", error = %e, "Failed to install Ctrl+C handler");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
      Ok(mut s) => {
        s.recv().await;
      }
      Err(e) => {
        tracing::error!(target: "dsa_mentor", error = %e, "Failed to install SIGTERM handler");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {},
    _ = terminate => {},
  }
  info!(target: "dsa_mentor", "Shutdown signal received");
}
