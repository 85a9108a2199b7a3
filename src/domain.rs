//! Domain models used by the backend: lessons, quiz questions, progress records,
//! user accounts and login sessions.

use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

/// A generated lesson. Produced per request, never persisted.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LessonContent {
  pub topic: String,
  /// Markdown body.
  pub content: String,
}

/// Which of the four options is correct.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AnswerKey {
  A,
  B,
  C,
  D,
}

impl AnswerKey {
  /// Parse the exact marker letters the quiz prompt asks for.
  pub fn from_marker(marker: &str) -> Option<Self> {
    match marker {
      "A" => Some(AnswerKey::A),
      "B" => Some(AnswerKey::B),
      "C" => Some(AnswerKey::C),
      "D" => Some(AnswerKey::D),
      _ => None,
    }
  }
}

/// One multiple-choice question. Always exactly four options.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuizQuestion {
  pub question: String,
  pub options: [String; 4],
  pub correct: AnswerKey,
  pub explanation: String,
}

/// Learning status of one topic for one user.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
  #[default]
  NotStarted,
  InProgress,
  Completed,
}

/// Persisted per-(user, topic) progress. Stored in the `progress` collection.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProgressRecord {
  #[serde(rename = "_id")]
  pub id: ObjectId,
  pub user_id: ObjectId,
  pub topic: String,
  #[serde(default)]
  pub status: ProgressStatus,
  #[serde(default)]
  pub mcq_score: f64,
  #[serde(default)]
  pub date_completed: Option<DateTime>,
  pub last_updated: DateTime,
}

impl ProgressRecord {
  pub fn new(user_id: ObjectId, topic: &str) -> Self {
    Self {
      id: ObjectId::new(),
      user_id,
      topic: topic.to_string(),
      status: ProgressStatus::NotStarted,
      mcq_score: 0.0,
      date_completed: None,
      last_updated: DateTime::now(),
    }
  }

  /// In-place update. Completing a topic stamps `date_completed`; every update
  /// bumps `last_updated`.
  pub fn apply_update(&mut self, status: ProgressStatus, score: f64, now: DateTime) {
    self.status = status;
    self.mcq_score = score;
    if status == ProgressStatus::Completed {
      self.date_completed = Some(now);
    }
    self.last_updated = now;
  }
}

/// Account record. Stored in the `users` collection, email is unique.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct User {
  #[serde(rename = "_id")]
  pub id: ObjectId,
  pub email: String,
  pub hashed_password: String,
  #[serde(default = "default_true")]
  pub is_active: bool,
  #[serde(default)]
  pub is_superuser: bool,
  #[serde(default)]
  pub is_verified: bool,
}

fn default_true() -> bool { true }

/// Opaque bearer token issued at login. Stored in the `sessions` collection.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Session {
  pub token: String,
  pub user_id: ObjectId,
  pub expires_at: DateTime,
}

impl Session {
  pub fn is_expired(&self, now: DateTime) -> bool {
    self.expires_at <= now
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn completing_stamps_date_and_last_updated() {
    let mut rec = ProgressRecord::new(ObjectId::new(), "Recursion Fundamentals");
    assert_eq!(rec.status, ProgressStatus::NotStarted);
    assert!(rec.date_completed.is_none());

    let t1 = DateTime::from_millis(1_000);
    rec.apply_update(ProgressStatus::InProgress, 40.0, t1);
    assert!(rec.date_completed.is_none());
    assert_eq!(rec.last_updated, t1);

    let t2 = DateTime::from_millis(2_000);
    rec.apply_update(ProgressStatus::Completed, 90.0, t2);
    assert_eq!(rec.date_completed, Some(t2));
    assert_eq!(rec.mcq_score, 90.0);
  }

  #[test]
  fn status_uses_snake_case_on_the_wire() {
    let s = serde_json::to_string(&ProgressStatus::InProgress).unwrap();
    assert_eq!(s, "\"in_progress\"");
    let parsed: ProgressStatus = serde_json::from_str("\"not_started\"").unwrap();
    assert_eq!(parsed, ProgressStatus::NotStarted);
  }

  #[test]
  fn answer_key_accepts_only_upper_letters() {
    assert_eq!(AnswerKey::from_marker("C"), Some(AnswerKey::C));
    assert_eq!(AnswerKey::from_marker("c"), None);
    assert_eq!(AnswerKey::from_marker("E"), None);
  }
}
