//! Configuration: environment settings plus an optional TOML file with prompt
//! overrides and a custom roadmap.
//!
//! See `MentorConfig` and `Prompts` for the TOML schema.

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info, warn};

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_DATABASE: &str = "ai_dsa_mentor";
pub const DEFAULT_CORS_ORIGINS: [&str; 3] = [
  "http://localhost:5173",
  "http://127.0.0.1:5173",
  "https://ai-dsa-mentor-seven.vercel.app",
];

/// Process settings read from the environment at startup.
#[derive(Clone, Debug)]
pub struct Settings {
  pub port: u16,
  /// Absent means the in-memory store is used.
  pub mongodb_uri: Option<String>,
  pub cors_origins: Vec<String>,
  pub session_lifetime: Duration,
  pub bcrypt_cost: u32,
  pub llm_timeout: Duration,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      port: DEFAULT_PORT,
      mongodb_uri: None,
      cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
      session_lifetime: Duration::from_secs(3600 * 24),
      bcrypt_cost: bcrypt::DEFAULT_COST,
      llm_timeout: Duration::from_secs(60),
    }
  }
}

impl Settings {
  pub fn from_env() -> Self {
    let defaults = Self::default();

    let mongodb_uri = std::env::var("MONGODB_URI").ok().filter(|s| !s.trim().is_empty());
    let cors_origins = match std::env::var("CORS_ORIGINS") {
      Ok(list) => list
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect(),
      Err(_) => defaults.cors_origins,
    };

    Self {
      port: env_parse("PORT").unwrap_or(defaults.port),
      mongodb_uri,
      cors_origins,
      session_lifetime: env_parse("SESSION_LIFETIME_SECS")
        .map(Duration::from_secs)
        .unwrap_or(defaults.session_lifetime),
      bcrypt_cost: env_parse("BCRYPT_COST").unwrap_or(defaults.bcrypt_cost),
      llm_timeout: env_parse("LLM_TIMEOUT_SECS")
        .map(Duration::from_secs)
        .unwrap_or(defaults.llm_timeout),
    }
  }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
  let raw = std::env::var(key).ok()?;
  match raw.trim().parse::<T>() {
    Ok(v) => Some(v),
    Err(_) => {
      warn!(target: "dsa_mentor", %key, value = %raw, "Ignoring unparsable environment value");
      None
    }
  }
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct MentorConfig {
  #[serde(default)]
  pub prompts: Prompts,
  /// Replaces the built-in roadmap when present and non-empty.
  #[serde(default)]
  pub roadmap: Option<Vec<String>>,
}

/// Prompts sent to the LLM gateway. Any field may be overridden in TOML.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub lesson_system: String,
  /// Placeholders: `{topic}`.
  pub lesson_user_template: String,
  pub quiz_system: String,
  /// Placeholders: `{topic}`, `{count}`.
  pub quiz_user_template: String,
  pub doubt_system: String,
  /// Placeholders: `{context}` (" related to <topic>" or empty), `{doubt}`.
  pub doubt_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      lesson_system: "You are an expert Java and Data Structures & Algorithms tutor. Create comprehensive, professional, and beginner-friendly lessons. Always use Java code examples. Format output with clear sections using markdown.".into(),
      lesson_user_template: r#"Create a detailed, professional lesson on '{topic}' focusing on Java implementation. Include these sections using markdown headers:

1. Overview - Clear explanation of the concept
2. Key Concepts - Main principles and ideas
3. Java Implementation - How to implement in Java with built-in classes
4. Code Example - Complete, runnable Java code with detailed comments
5. Time and Space Complexity - Big O analysis
6. Real-World Use Cases - Practical applications
7. Common Pitfalls - What to avoid when coding
8. Study Tips - How to master this topic

Make it engaging, professional, and suitable for intermediate Java developers. Use proper markdown formatting with code blocks for Java code."#.into(),
      quiz_system: "You are an expert Java and DSA quiz creator. Generate ONLY valid JSON with no additional text or explanation.".into(),
      quiz_user_template: r#"Create a JSON array with exactly {count} multiple-choice questions about '{topic}'.

IMPORTANT: Return ONLY valid JSON, nothing else. No markdown, no explanations.

Format exactly like this (must be valid JSON):
[
  {
    "question": "What does this do?",
    "options": ["Option A", "Option B", "Option C", "Option D"],
    "correct": "A",
    "explanation": "This is correct because..."
  }
]

Requirements:
- "question": Clear question about {topic} in Java
- "options": Exactly 4 options as strings
- "correct": One letter: A, B, C, or D
- "explanation": Why the correct answer is right

Create {count} questions now. Return ONLY the JSON array, nothing else."#.into(),
      doubt_system: "You are a helpful DSA tutor. Answer student questions clearly and concisely with examples when helpful.".into(),
      doubt_user_template: "Student question{context}: {doubt}".into(),
    }
  }
}

/// Parse a TOML document into `MentorConfig`.
pub fn parse_mentor_config(s: &str) -> Result<MentorConfig, toml::de::Error> {
  toml::from_str::<MentorConfig>(s)
}

/// Attempt to load `MentorConfig` from MENTOR_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_mentor_config_from_env() -> Option<MentorConfig> {
  let path = std::env::var("MENTOR_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_mentor_config(&s) {
      Ok(cfg) => {
        info!(target: "dsa_mentor", %path, "Loaded mentor config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "dsa_mentor", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "dsa_mentor", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn partial_prompt_overrides_keep_defaults() {
    let cfg = parse_mentor_config(
      r#"
roadmap = ["Bit Manipulation", "Tries"]

[prompts]
doubt_system = "Answer like a pirate."
"#,
    )
    .unwrap();
    assert_eq!(cfg.prompts.doubt_system, "Answer like a pirate.");
    assert_eq!(cfg.prompts.doubt_user_template, Prompts::default().doubt_user_template);
    assert_eq!(cfg.roadmap.unwrap(), vec!["Bit Manipulation", "Tries"]);
  }

  #[test]
  fn empty_document_is_all_defaults() {
    let cfg = parse_mentor_config("").unwrap();
    assert!(cfg.roadmap.is_none());
    assert!(cfg.prompts.quiz_user_template.contains("exactly {count} multiple-choice"));
  }

  #[test]
  fn bad_types_are_rejected() {
    assert!(parse_mentor_config("roadmap = 3").is_err());
  }
}
