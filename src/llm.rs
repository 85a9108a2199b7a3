//! Minimal chat-completion gateway (Groq's OpenAI-compatible API by default).
//!
//! One request per call, no retries. Each purpose (lesson, quiz, doubt) has a
//! fixed temperature and token budget. Failures come back as [`GatewayError`];
//! the caller decides what to serve instead.
//!
//! NOTE: We never log the API key or prompt contents, only sizes and timings.

use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::config::Prompts;
use crate::util::{fill_template, trunc_for_log};

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";

/// What a completion is for. Decides sampling parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Purpose {
  Lesson,
  Quiz,
  Doubt,
}

impl Purpose {
  pub fn temperature(self) -> f32 {
    match self {
      Purpose::Lesson => 0.7,
      Purpose::Quiz => 0.5,
      Purpose::Doubt => 0.7,
    }
  }

  pub fn max_tokens(self) -> u32 {
    match self {
      Purpose::Lesson => 2000,
      Purpose::Quiz => 3000,
      Purpose::Doubt => 1000,
    }
  }
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
  #[error("LLM gateway is not configured (GROQ_API_KEY missing)")]
  NotConfigured,
  #[error("LLM request failed: {0}")]
  Transport(#[from] reqwest::Error),
  #[error("LLM rejected credentials (HTTP {status}): {message}")]
  Auth { status: u16, message: String },
  #[error("LLM quota or rate limit exceeded: {message}")]
  RateLimited { message: String },
  #[error("LLM HTTP {status}: {message}")]
  Api { status: u16, message: String },
  #[error("LLM returned an unusable response: {0}")]
  Malformed(String),
}

#[derive(Clone)]
pub struct LlmGateway {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl LlmGateway {
  /// Construct the gateway if we find GROQ_API_KEY; otherwise return None.
  pub fn from_env(timeout: Duration) -> Option<Self> {
    let api_key = std::env::var("GROQ_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url = std::env::var("GROQ_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
    let model = std::env::var("GROQ_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());
    match Self::new(api_key, base_url, model, timeout) {
      Ok(gw) => Some(gw),
      Err(e) => {
        error!(target: "dsa_mentor", error = %e, "Failed to build HTTP client for LLM gateway");
        None
      }
    }
  }

  pub fn new(api_key: String, base_url: String, model: String, timeout: Duration) -> Result<Self, GatewayError> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    Ok(Self { client, api_key, base_url: base_url.trim_end_matches('/').to_string(), model })
  }

  /// Single chat completion with a system + user prompt pair.
  #[instrument(level = "info", skip(self, system, user), fields(model = %self.model))]
  pub async fn complete(&self, purpose: Purpose, system: &str, user: &str) -> Result<String, GatewayError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: &self.model,
      messages: [
        ChatMessageReq { role: "system", content: system },
        ChatMessageReq { role: "user", content: user },
      ],
      temperature: purpose.temperature(),
      max_tokens: purpose.max_tokens(),
    };

    let start = Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, "dsa-mentor-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await?;

    let status = res.status();
    if !status.is_success() {
      let body = res.text().await.unwrap_or_default();
      let message = extract_api_error(&body).unwrap_or_else(|| trunc_for_log(&body, 300));
      error!(elapsed = ?start.elapsed(), %status, "LLM call failed");
      return Err(classify_status(status, message));
    }

    let body: ChatCompletionResponse = res
      .json()
      .await
      .map_err(|e| GatewayError::Malformed(format!("undecodable body: {e}")))?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "LLM usage");
    }
    let text = body
      .choices
      .into_iter()
      .next()
      .and_then(|c| c.message.content)
      .map(|t| t.trim().to_string())
      .filter(|t| !t.is_empty())
      .ok_or_else(|| GatewayError::Malformed("no message content in response".into()))?;

    info!(elapsed = ?start.elapsed(), response_len = text.len(), "LLM response received");
    Ok(text)
  }

  // --- Domain helpers ---

  /// Markdown lesson for `topic`.
  #[instrument(level = "info", skip(self, prompts))]
  pub async fn generate_lesson(&self, prompts: &Prompts, topic: &str) -> Result<String, GatewayError> {
    let user = fill_template(&prompts.lesson_user_template, &[("topic", topic)]);
    self.complete(Purpose::Lesson, &prompts.lesson_system, &user).await
  }

  /// Raw quiz text; feed it to `quiz::normalize_quiz`.
  #[instrument(level = "info", skip(self, prompts))]
  pub async fn generate_quiz(&self, prompts: &Prompts, topic: &str, count: usize) -> Result<String, GatewayError> {
    let count = count.to_string();
    let user = fill_template(&prompts.quiz_user_template, &[("topic", topic), ("count", &count)]);
    self.complete(Purpose::Quiz, &prompts.quiz_system, &user).await
  }

  /// Answer a student question, optionally scoped to a topic.
  #[instrument(level = "info", skip(self, prompts, doubt), fields(doubt_len = doubt.len()))]
  pub async fn answer_doubt(&self, prompts: &Prompts, doubt: &str, topic: &str) -> Result<String, GatewayError> {
    let user = doubt_user_message(prompts, doubt, topic);
    self.complete(Purpose::Doubt, &prompts.doubt_system, &user).await
  }
}

fn doubt_user_message(prompts: &Prompts, doubt: &str, topic: &str) -> String {
  let topic = topic.trim();
  let context = if topic.is_empty() { String::new() } else { format!(" related to {topic}") };
  fill_template(&prompts.doubt_user_template, &[("context", &context), ("doubt", doubt)])
}

fn classify_status(status: StatusCode, message: String) -> GatewayError {
  match status {
    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::Auth { status: status.as_u16(), message },
    StatusCode::TOO_MANY_REQUESTS => GatewayError::RateLimited { message },
    _ => GatewayError::Api { status: status.as_u16(), message },
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
  model: &'a str,
  messages: [ChatMessageReq<'a>; 2],
  temperature: f32,
  max_tokens: u32,
}
#[derive(Serialize)]
struct ChatMessageReq<'a> { role: &'static str, content: &'a str }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  #[serde(default)] choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from an OpenAI-style error body.
fn extract_api_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::{Arc, Mutex};

  use axum::{extract::State, http::StatusCode as AxStatus, routing::post, Json, Router};
  use serde_json::{json, Value};

  type Seen = Arc<Mutex<Vec<(Option<String>, Value)>>>;

  /// Fake completion endpoint on an ephemeral port. Records each request and
  /// answers with the given status and body.
  async fn fake_server(status: u16, reply: Value) -> (String, Seen) {
    let seen: Seen = Arc::default();
    let app = Router::new()
      .route(
        "/v1/chat/completions",
        post(
          move |State(seen): State<Seen>, headers: axum::http::HeaderMap, Json(body): Json<Value>| {
            let reply = reply.clone();
            async move {
              let auth = headers.get("authorization").and_then(|v| v.to_str().ok()).map(str::to_string);
              seen.lock().unwrap().push((auth, body));
              (AxStatus::from_u16(status).unwrap(), Json(reply))
            }
          },
        ),
      )
      .with_state(seen.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/v1"), seen)
  }

  fn gateway(base_url: String) -> LlmGateway {
    LlmGateway::new("test-key".into(), base_url, "test-model".into(), Duration::from_secs(5)).unwrap()
  }

  fn ok_reply(content: &str) -> Value {
    json!({
      "choices": [{ "message": { "role": "assistant", "content": content } }],
      "usage": { "prompt_tokens": 10, "completion_tokens": 20, "total_tokens": 30 }
    })
  }

  #[tokio::test]
  async fn lesson_request_carries_purpose_parameters() {
    let (url, seen) = fake_server(200, ok_reply("  # Heaps\nA heap is...  ")).await;
    let gw = gateway(url);
    let text = gw.generate_lesson(&Prompts::default(), "Heaps and Priority Queues").await.unwrap();
    assert_eq!(text, "# Heaps\nA heap is...");

    let seen = seen.lock().unwrap();
    let (auth, body) = &seen[0];
    assert_eq!(auth.as_deref(), Some("Bearer test-key"));
    assert_eq!(body["model"], "test-model");
    assert_eq!(body["max_tokens"], 2000);
    assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "system");
    assert_eq!(messages[1]["role"], "user");
    assert!(messages[1]["content"].as_str().unwrap().contains("'Heaps and Priority Queues'"));
  }

  #[tokio::test]
  async fn quiz_and_doubt_use_their_own_budgets() {
    let (url, seen) = fake_server(200, ok_reply("[]")).await;
    let gw = gateway(url);
    gw.generate_quiz(&Prompts::default(), "Graphs", 10).await.unwrap();
    gw.answer_doubt(&Prompts::default(), "Why BFS?", "Graphs").await.unwrap();
    gw.answer_doubt(&Prompts::default(), "What is O(n)?", "").await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].1["max_tokens"], 3000);
    assert!((seen[0].1["temperature"].as_f64().unwrap() - 0.5).abs() < 1e-6);
    assert!(seen[0].1["messages"][1]["content"].as_str().unwrap().contains("exactly 10 multiple-choice"));
    assert_eq!(seen[1].1["max_tokens"], 1000);
    assert_eq!(seen[1].1["messages"][1]["content"], "Student question related to Graphs: Why BFS?");
    assert_eq!(seen[2].1["messages"][1]["content"], "Student question: What is O(n)?");
  }

  #[tokio::test]
  async fn placeholders_in_user_text_stay_literal() {
    let (url, seen) = fake_server(200, ok_reply("ok")).await;
    let gw = gateway(url);
    gw.generate_quiz(&Prompts::default(), "{count}", 10).await.unwrap();
    gw.answer_doubt(&Prompts::default(), "Why?", "{doubt}").await.unwrap();

    let seen = seen.lock().unwrap();
    assert!(seen[0].1["messages"][1]["content"].as_str().unwrap().contains("'{count}'"));
    assert_eq!(seen[1].1["messages"][1]["content"], "Student question related to {doubt}: Why?");
  }

  #[tokio::test]
  async fn status_codes_map_to_typed_errors() {
    let err_body = json!({ "error": { "message": "Invalid API Key" } });
    let (url, _) = fake_server(401, err_body.clone()).await;
    match gateway(url).complete(Purpose::Doubt, "s", "u").await {
      Err(GatewayError::Auth { status, message }) => {
        assert_eq!(status, 401);
        assert_eq!(message, "Invalid API Key");
      }
      other => panic!("expected auth error, got {other:?}"),
    }

    let (url, _) = fake_server(429, err_body.clone()).await;
    assert!(matches!(gateway(url).complete(Purpose::Doubt, "s", "u").await, Err(GatewayError::RateLimited { .. })));

    let (url, _) = fake_server(503, json!("overloaded")).await;
    match gateway(url).complete(Purpose::Doubt, "s", "u").await {
      Err(GatewayError::Api { status, message }) => {
        assert_eq!(status, 503);
        assert_eq!(message, "\"overloaded\"");
      }
      other => panic!("expected api error, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn empty_choices_are_malformed() {
    let (url, _) = fake_server(200, json!({ "choices": [] })).await;
    assert!(matches!(gateway(url).complete(Purpose::Lesson, "s", "u").await, Err(GatewayError::Malformed(_))));

    let (url, _) = fake_server(200, json!({ "choices": [{ "message": { "content": null } }] })).await;
    assert!(matches!(gateway(url).complete(Purpose::Lesson, "s", "u").await, Err(GatewayError::Malformed(_))));
  }

  #[tokio::test]
  async fn unreachable_host_is_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let gw = gateway(format!("http://{addr}/v1"));
    assert!(matches!(gw.complete(Purpose::Quiz, "s", "u").await, Err(GatewayError::Transport(_))));
  }
}
