//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented; secrets (passwords, tokens, prompts) are never recorded.

use std::sync::Arc;
use axum::{extract::State, http::StatusCode, Json};
use tracing::{info, instrument};

use crate::auth::{self, CurrentUser};
use crate::domain::{LessonContent, QuizQuestion};
use crate::error::ApiError;
use crate::logic;
use crate::protocol::*;
use crate::routes::extract::{ApiForm, ApiJson, ApiQuery};
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> Json<HealthOut> { Json(HealthOut { status: "ok" }) }

// --- auth ---

#[instrument(level = "info", skip_all)]
pub async fn http_register(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<RegisterIn>,
) -> Result<(StatusCode, Json<UserRead>), ApiError> {
  let user = auth::register(&state, &body.email, &body.password).await?;
  Ok((StatusCode::CREATED, Json(UserRead::from(&user))))
}

#[instrument(level = "info", skip_all)]
pub async fn http_login(
  State(state): State<Arc<AppState>>,
  ApiForm(form): ApiForm<LoginForm>,
) -> Result<Json<TokenOut>, ApiError> {
  let access_token = auth::login(&state, &form.username, &form.password).await?;
  Ok(Json(TokenOut { access_token, token_type: "bearer" }))
}

#[instrument(level = "info", skip_all, fields(user_id = %current.user.id))]
pub async fn http_logout(
  State(state): State<Arc<AppState>>,
  current: CurrentUser,
) -> Result<StatusCode, ApiError> {
  auth::logout(&state, &current).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[instrument(level = "info", skip_all, fields(user_id = %current.user.id))]
pub async fn http_get_me(current: CurrentUser) -> Json<UserRead> {
  Json(UserRead::from(&current.user))
}

#[instrument(level = "info", skip_all, fields(user_id = %current.user.id))]
pub async fn http_patch_me(
  State(state): State<Arc<AppState>>,
  current: CurrentUser,
  ApiJson(body): ApiJson<UserUpdateIn>,
) -> Result<Json<UserRead>, ApiError> {
  let user = auth::update_user(&state, current.user, body).await?;
  Ok(Json(UserRead::from(&user)))
}

// --- learning ---

#[instrument(level = "info", skip_all, fields(user_id = %current.user.id))]
pub async fn http_daily(
  State(state): State<Arc<AppState>>,
  current: CurrentUser,
) -> Result<Json<LessonContent>, ApiError> {
  let lesson = logic::daily_lesson(&state, &current.user).await?;
  Ok(Json(lesson))
}

#[instrument(level = "info", skip(state), fields(topic = %q.topic))]
pub async fn http_mcqs(
  State(state): State<Arc<AppState>>,
  ApiQuery(q): ApiQuery<McqQuery>,
) -> Json<Vec<QuizQuestion>> {
  let quiz = logic::quiz_for_topic(&state, &q.topic).await;
  info!(target: "quiz", topic = %q.topic, source = ?quiz.source, "HTTP mcqs served");
  Json(quiz.questions)
}

#[instrument(level = "info", skip_all, fields(doubt_len = body.doubt.len(), topic = %body.topic))]
pub async fn http_post_doubt(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<DoubtIn>,
) -> Result<Json<DoubtOut>, ApiError> {
  let answer = logic::answer_doubt(&state, &body.doubt, &body.topic).await?;
  Ok(Json(DoubtOut { answer }))
}

// --- progress ---

#[instrument(level = "info", skip_all, fields(user_id = %current.user.id))]
pub async fn http_get_progress(
  State(state): State<Arc<AppState>>,
  current: CurrentUser,
) -> Result<Json<Vec<ProgressOut>>, ApiError> {
  Ok(Json(logic::progress_overview(&state, &current.user).await?))
}

#[instrument(level = "info", skip_all, fields(user_id = %current.user.id, topic = %body.topic))]
pub async fn http_post_progress(
  State(state): State<Arc<AppState>>,
  current: CurrentUser,
  ApiJson(body): ApiJson<ProgressUpdateIn>,
) -> Result<Json<MessageOut>, ApiError> {
  logic::update_progress(&state, &current.user, body).await?;
  Ok(Json(MessageOut { message: "Updated" }))
}
