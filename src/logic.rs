//! Core behaviors behind the HTTP handlers.
//!
//! This includes:
//!   - Picking the daily topic from the roadmap and generating its lesson
//!   - Building a quiz (gateway + normalizer, never fails)
//!   - Answering doubts
//!   - Listing and updating per-topic progress

use std::collections::HashSet;

use bson::DateTime;
use tracing::{error, info, instrument, warn};

use crate::domain::{LessonContent, ProgressStatus, User};
use crate::error::ApiError;
use crate::protocol::{ProgressOut, ProgressUpdateIn};
use crate::quiz::{normalize_quiz, NormalizedQuiz};
use crate::state::AppState;

/// Questions requested per quiz.
pub const QUIZ_SIZE: usize = 10;

/// First roadmap topic not yet completed; the first topic once everything is done.
pub fn next_topic<'a>(roadmap: &'a [String], completed: &HashSet<&str>) -> Option<&'a str> {
  roadmap
    .iter()
    .find(|t| !completed.contains(t.as_str()))
    .or_else(|| roadmap.first())
    .map(String::as_str)
}

#[instrument(level = "info", skip(state, user), fields(user_id = %user.id))]
pub async fn daily_lesson(state: &AppState, user: &User) -> Result<LessonContent, ApiError> {
  let records = state.store.list_progress(user.id).await?;
  let completed: HashSet<&str> = records
    .iter()
    .filter(|r| r.status == ProgressStatus::Completed)
    .map(|r| r.topic.as_str())
    .collect();
  let topic = next_topic(&state.roadmap, &completed)
    .ok_or_else(|| ApiError::Internal("roadmap is empty".into()))?
    .to_string();

  // The record exists before generation so the topic shows up in progress even if the model fails.
  state.store.find_or_create_progress(user.id, &topic).await?;

  let content = state
    .llm()?
    .generate_lesson(&state.prompts, &topic)
    .await
    .inspect_err(|e| error!(target: "dsa_mentor", %topic, error = %e, "Lesson generation failed"))?;
  info!(target: "dsa_mentor", %topic, content_len = content.len(), completed = completed.len(), "Daily lesson served");
  Ok(LessonContent { topic, content })
}

/// Always returns valid questions: model output when usable, otherwise a fallback set.
#[instrument(level = "info", skip(state))]
pub async fn quiz_for_topic(state: &AppState, topic: &str) -> NormalizedQuiz {
  let raw = match state.llm() {
    Ok(gw) => gw.generate_quiz(&state.prompts, topic, QUIZ_SIZE).await,
    Err(e) => Err(e),
  };
  let quiz = match raw {
    Ok(raw) => normalize_quiz(&raw, topic),
    Err(e) => {
      warn!(target: "quiz", %topic, error = %e, "Quiz generation failed; generic fallback");
      NormalizedQuiz::generic()
    }
  };
  info!(target: "quiz", %topic, count = quiz.questions.len(), source = ?quiz.source, "Quiz served");
  quiz
}

#[instrument(level = "info", skip(state, doubt), fields(doubt_len = doubt.len()))]
pub async fn answer_doubt(state: &AppState, doubt: &str, topic: &str) -> Result<String, ApiError> {
  let answer = state
    .llm()?
    .answer_doubt(&state.prompts, doubt, topic)
    .await
    .inspect_err(|e| error!(target: "dsa_mentor", error = %e, "Doubt answering failed"))?;
  Ok(answer)
}

#[instrument(level = "info", skip(state, user), fields(user_id = %user.id))]
pub async fn progress_overview(state: &AppState, user: &User) -> Result<Vec<ProgressOut>, ApiError> {
  let records = state.store.list_progress(user.id).await?;
  Ok(records.iter().map(ProgressOut::from).collect())
}

/// Update an existing record. Records are only created by the daily lesson flow.
#[instrument(level = "info", skip(state, user, update), fields(user_id = %user.id, topic = %update.topic, status = ?update.status))]
pub async fn update_progress(state: &AppState, user: &User, update: ProgressUpdateIn) -> Result<(), ApiError> {
  let mut record = state
    .store
    .find_progress(user.id, &update.topic)
    .await?
    .ok_or_else(|| ApiError::not_found("No progress record found"))?;

  record.apply_update(update.status, update.score, DateTime::now());
  state.store.save_progress(&record).await?;
  info!(target: "progress", topic = %record.topic, status = ?record.status, score = record.mcq_score, "Progress updated");
  Ok(())
}
