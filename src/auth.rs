//! Accounts and bearer-token authentication.
//!
//! Passwords are bcrypt-hashed on the blocking pool. Login issues an opaque
//! random token stored in the `sessions` collection with an expiry; every
//! authenticated request resolves it back to an active user.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode};
use bson::{oid::ObjectId, DateTime};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::{Session, User};
use crate::error::ApiError;
use crate::protocol::UserUpdateIn;
use crate::state::AppState;
use crate::store::StoreError;
use crate::util::normalize_email;

pub const MIN_PASSWORD_LEN: usize = 3;

/// The authenticated caller, resolved from `Authorization: Bearer <token>`.
#[derive(Clone, Debug)]
pub struct CurrentUser {
  pub user: User,
  pub token: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
    let token = bearer_token(&parts.headers).ok_or(ApiError::Unauthorized)?;
    let user = authenticate(state, token).await?;
    Ok(CurrentUser { user, token: token.to_string() })
  }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
  let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
  let (scheme, token) = value.trim().split_once(' ')?;
  let token = token.trim();
  (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Resolve a token to an active user. Expired sessions are removed on sight.
#[instrument(level = "debug", skip_all)]
pub async fn authenticate(state: &AppState, token: &str) -> Result<User, ApiError> {
  let session = state.store.find_session(token).await?.ok_or(ApiError::Unauthorized)?;
  if session.is_expired(DateTime::now()) {
    state.store.delete_session(token).await?;
    return Err(ApiError::Unauthorized);
  }
  match state.store.find_user_by_id(session.user_id).await? {
    Some(user) if user.is_active => Ok(user),
    _ => Err(ApiError::Unauthorized),
  }
}

/// 64 hex chars from two v4 UUIDs.
pub fn new_token() -> String {
  format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

fn validate_email(email: &str) -> Result<(), ApiError> {
  let valid = match email.split_once('@') {
    Some((local, domain)) => {
      !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
    }
    None => false,
  };
  if valid {
    Ok(())
  } else {
    Err(ApiError::Client(StatusCode::UNPROCESSABLE_ENTITY, "value is not a valid email address".into()))
  }
}

fn validate_password(password: &str, code: &str) -> Result<(), ApiError> {
  if password.chars().count() < MIN_PASSWORD_LEN {
    return Err(ApiError::bad_request(code));
  }
  Ok(())
}

pub async fn hash_password(password: String, cost: u32) -> Result<String, ApiError> {
  tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
    .await
    .map_err(|e| ApiError::Internal(format!("hash task failed: {e}")))?
    .map_err(|e| ApiError::Internal(format!("bcrypt: {e}")))
}

pub async fn verify_password(password: String, hashed: String) -> bool {
  tokio::task::spawn_blocking(move || bcrypt::verify(password, &hashed).unwrap_or(false))
    .await
    .unwrap_or(false)
}

#[instrument(level = "info", skip_all)]
pub async fn register(state: &AppState, email: &str, password: &str) -> Result<User, ApiError> {
  let email = normalize_email(email);
  validate_email(&email)?;
  validate_password(password, "REGISTER_INVALID_PASSWORD")?;

  let user = User {
    id: ObjectId::new(),
    email,
    hashed_password: hash_password(password.to_string(), state.settings.bcrypt_cost).await?,
    is_active: true,
    is_superuser: false,
    is_verified: false,
  };
  match state.store.insert_user(&user).await {
    Ok(()) => {
      info!(target: "auth", user_id = %user.id, "User registered");
      Ok(user)
    }
    Err(StoreError::Duplicate(_)) => Err(ApiError::bad_request("REGISTER_USER_ALREADY_EXISTS")),
    Err(e) => Err(e.into()),
  }
}

/// Check credentials and open a session. Returns the bearer token.
#[instrument(level = "info", skip_all)]
pub async fn login(state: &AppState, username: &str, password: &str) -> Result<String, ApiError> {
  let bad = || ApiError::bad_request("LOGIN_BAD_CREDENTIALS");
  let email = normalize_email(username);

  let user = state.store.find_user_by_email(&email).await?.ok_or_else(bad)?;
  if !verify_password(password.to_string(), user.hashed_password.clone()).await {
    warn!(target: "auth", user_id = %user.id, "Login rejected: bad password");
    return Err(bad());
  }
  if !user.is_active {
    warn!(target: "auth", user_id = %user.id, "Login rejected: inactive user");
    return Err(bad());
  }

  let lifetime = state.settings.session_lifetime;
  let session = Session {
    token: new_token(),
    user_id: user.id,
    expires_at: DateTime::now().saturating_add_duration(lifetime),
  };
  state.store.insert_session(&session).await?;
  info!(target: "auth", user_id = %user.id, lifetime_secs = lifetime.as_secs(), "Session opened");
  Ok(session.token)
}

pub async fn logout(state: &AppState, current: &CurrentUser) -> Result<(), ApiError> {
  state.store.delete_session(&current.token).await?;
  info!(target: "auth", user_id = %current.user.id, "Session closed");
  Ok(())
}

/// Partial self-update of email and/or password.
#[instrument(level = "info", skip_all, fields(user_id = %user.id))]
pub async fn update_user(state: &AppState, mut user: User, update: UserUpdateIn) -> Result<User, ApiError> {
  if let Some(email) = update.email {
    let email = normalize_email(&email);
    validate_email(&email)?;
    user.email = email;
  }
  if let Some(password) = update.password {
    validate_password(&password, "UPDATE_USER_INVALID_PASSWORD")?;
    user.hashed_password = hash_password(password, state.settings.bcrypt_cost).await?;
  }
  match state.store.save_user(&user).await {
    Ok(()) => Ok(user),
    Err(StoreError::Duplicate(_)) => Err(ApiError::bad_request("UPDATE_USER_EMAIL_ALREADY_EXISTS")),
    Err(e) => Err(e.into()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::http::HeaderValue;

  #[test]
  fn bearer_token_parsing() {
    let mut h = HeaderMap::new();
    assert_eq!(bearer_token(&h), None);
    h.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
    assert_eq!(bearer_token(&h), Some("abc123"));
    h.insert(AUTHORIZATION, HeaderValue::from_static("bearer   xyz "));
    assert_eq!(bearer_token(&h), Some("xyz"));
    h.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
    assert_eq!(bearer_token(&h), None);
    h.insert(AUTHORIZATION, HeaderValue::from_static("Bearer"));
    assert_eq!(bearer_token(&h), None);
  }

  #[test]
  fn tokens_are_long_and_unique() {
    let a = new_token();
    let b = new_token();
    assert_eq!(a.len(), 64);
    assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    assert_ne!(a, b);
  }

  #[test]
  fn email_validation() {
    assert!(validate_email("dev@example.com").is_ok());
    assert!(validate_email("dev@localhost").is_err());
    assert!(validate_email("no-at-sign").is_err());
    assert!(validate_email("a@b@c.com").is_err());
    assert!(validate_email("@example.com").is_err());
  }

  #[tokio::test]
  async fn password_hash_round_trip() {
    let h = hash_password("s3cret".into(), 4).await.unwrap();
    assert!(verify_password("s3cret".into(), h.clone()).await);
    assert!(!verify_password("wrong".into(), h).await);
  }
}
