//! Persistence: users, login sessions and per-(user, topic) progress records.
//!
//! `MongoStore` is the production backend; `MemoryStore` keeps everything in
//! process and is used when no MONGODB_URI is configured (and in tests).

use async_trait::async_trait;
use bson::oid::ObjectId;

use crate::domain::{ProgressRecord, Session, User};

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("duplicate {0}")]
  Duplicate(&'static str),
  #[error("{0}")]
  Inconsistent(String),
  // Froms
  #[error("{0}")]
  MongoDB(#[from] mongodb::error::Error),
  #[error("{0}")]
  BsonSerialization(#[from] bson::ser::Error),
}

#[async_trait]
pub trait Store: Send + Sync {
  // --- progress ---
  async fn find_progress(&self, user_id: ObjectId, topic: &str) -> Result<Option<ProgressRecord>, StoreError>;
  async fn list_progress(&self, user_id: ObjectId) -> Result<Vec<ProgressRecord>, StoreError>;
  async fn insert_progress(&self, record: &ProgressRecord) -> Result<(), StoreError>;
  /// Replace the stored record with the same `_id`.
  async fn save_progress(&self, record: &ProgressRecord) -> Result<(), StoreError>;

  /// Keyed upsert: the existing record for (user, topic), or a fresh
  /// `not_started` one that is inserted first.
  async fn find_or_create_progress(&self, user_id: ObjectId, topic: &str) -> Result<ProgressRecord, StoreError> {
    if let Some(existing) = self.find_progress(user_id, topic).await? {
      return Ok(existing);
    }
    let fresh = ProgressRecord::new(user_id, topic);
    self.insert_progress(&fresh).await?;
    Ok(fresh)
  }

  // --- users ---
  /// Fails with `StoreError::Duplicate("email")` when the email is taken.
  async fn insert_user(&self, user: &User) -> Result<(), StoreError>;
  async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
  async fn find_user_by_id(&self, id: ObjectId) -> Result<Option<User>, StoreError>;
  async fn save_user(&self, user: &User) -> Result<(), StoreError>;

  // --- sessions ---
  async fn insert_session(&self, session: &Session) -> Result<(), StoreError>;
  async fn find_session(&self, token: &str) -> Result<Option<Session>, StoreError>;
  async fn delete_session(&self, token: &str) -> Result<(), StoreError>;

  /// Release connections. Called once after the server stops.
  async fn shutdown(&self) {}
}
