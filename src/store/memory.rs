use std::collections::HashMap;

use async_trait::async_trait;
use bson::oid::ObjectId;
use tokio::sync::RwLock;
use tracing::instrument;

use super::{Store, StoreError};
use crate::domain::{ProgressRecord, Session, User};

/// Process-local store. Progress keeps insertion order, like a collection scan.
#[derive(Default)]
pub struct MemoryStore {
  users: RwLock<HashMap<ObjectId, User>>,
  progress: RwLock<Vec<ProgressRecord>>,
  sessions: RwLock<HashMap<String, Session>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl Store for MemoryStore {
  async fn find_progress(&self, user_id: ObjectId, topic: &str) -> Result<Option<ProgressRecord>, StoreError> {
    let progress = self.progress.read().await;
    Ok(progress.iter().find(|r| r.user_id == user_id && r.topic == topic).cloned())
  }

  async fn list_progress(&self, user_id: ObjectId) -> Result<Vec<ProgressRecord>, StoreError> {
    let progress = self.progress.read().await;
    Ok(progress.iter().filter(|r| r.user_id == user_id).cloned().collect())
  }

  async fn insert_progress(&self, record: &ProgressRecord) -> Result<(), StoreError> {
    let mut progress = self.progress.write().await;
    if progress.iter().any(|r| r.id == record.id) {
      return Err(StoreError::Duplicate("_id"));
    }
    progress.push(record.clone());
    Ok(())
  }

  async fn save_progress(&self, record: &ProgressRecord) -> Result<(), StoreError> {
    let mut progress = self.progress.write().await;
    match progress.iter_mut().find(|r| r.id == record.id) {
      Some(slot) => *slot = record.clone(),
      None => progress.push(record.clone()),
    }
    Ok(())
  }

  /// Atomic under the write lock, so concurrent first visits create one record.
  #[instrument(level = "debug", skip(self))]
  async fn find_or_create_progress(&self, user_id: ObjectId, topic: &str) -> Result<ProgressRecord, StoreError> {
    let mut progress = self.progress.write().await;
    if let Some(existing) = progress.iter().find(|r| r.user_id == user_id && r.topic == topic) {
      return Ok(existing.clone());
    }
    let fresh = ProgressRecord::new(user_id, topic);
    progress.push(fresh.clone());
    Ok(fresh)
  }

  async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
    let mut users = self.users.write().await;
    if users.values().any(|u| u.email == user.email) {
      return Err(StoreError::Duplicate("email"));
    }
    users.insert(user.id, user.clone());
    Ok(())
  }

  async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
    let users = self.users.read().await;
    Ok(users.values().find(|u| u.email == email).cloned())
  }

  async fn find_user_by_id(&self, id: ObjectId) -> Result<Option<User>, StoreError> {
    Ok(self.users.read().await.get(&id).cloned())
  }

  async fn save_user(&self, user: &User) -> Result<(), StoreError> {
    let mut users = self.users.write().await;
    if users.values().any(|u| u.id != user.id && u.email == user.email) {
      return Err(StoreError::Duplicate("email"));
    }
    users.insert(user.id, user.clone());
    Ok(())
  }

  async fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
    self.sessions.write().await.insert(session.token.clone(), session.clone());
    Ok(())
  }

  async fn find_session(&self, token: &str) -> Result<Option<Session>, StoreError> {
    Ok(self.sessions.read().await.get(token).cloned())
  }

  async fn delete_session(&self, token: &str) -> Result<(), StoreError> {
    self.sessions.write().await.remove(token);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Arc;

  use bson::DateTime;

  use crate::domain::ProgressStatus;

  fn user(email: &str) -> User {
    User {
      id: ObjectId::new(),
      email: email.into(),
      hashed_password: "x".into(),
      is_active: true,
      is_superuser: false,
      is_verified: false,
    }
  }

  #[tokio::test]
  async fn find_or_create_is_idempotent_per_key() {
    let store = MemoryStore::new();
    let alice = ObjectId::new();
    let bob = ObjectId::new();

    let a1 = store.find_or_create_progress(alice, "Searching Algorithms").await.unwrap();
    let a2 = store.find_or_create_progress(alice, "Searching Algorithms").await.unwrap();
    let b1 = store.find_or_create_progress(bob, "Searching Algorithms").await.unwrap();
    assert_eq!(a1.id, a2.id);
    assert_ne!(a1.id, b1.id);
    assert_eq!(store.list_progress(alice).await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn concurrent_first_visits_create_one_record() {
    let store = Arc::new(MemoryStore::new());
    let uid = ObjectId::new();
    let mut handles = Vec::new();
    for _ in 0..16 {
      let store = store.clone();
      handles.push(tokio::spawn(async move { store.find_or_create_progress(uid, "Greedy Algorithms").await.unwrap().id }));
    }
    let mut ids = Vec::new();
    for h in handles {
      ids.push(h.await.unwrap());
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);
    assert_eq!(store.list_progress(uid).await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn save_mutates_in_place() {
    let store = MemoryStore::new();
    let uid = ObjectId::new();
    let mut rec = store.find_or_create_progress(uid, "Heaps and Priority Queues").await.unwrap();
    rec.apply_update(ProgressStatus::Completed, 80.0, DateTime::now());
    store.save_progress(&rec).await.unwrap();

    let all = store.list_progress(uid).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].status, ProgressStatus::Completed);
    assert_eq!(all[0].mcq_score, 80.0);
  }

  #[tokio::test]
  async fn duplicate_emails_are_rejected() {
    let store = MemoryStore::new();
    store.insert_user(&user("a@example.com")).await.unwrap();
    let err = store.insert_user(&user("a@example.com")).await.unwrap_err();
    assert!(matches!(err, StoreError::Duplicate("email")));

    let mut b = user("b@example.com");
    store.insert_user(&b).await.unwrap();
    b.email = "a@example.com".into();
    assert!(matches!(store.save_user(&b).await, Err(StoreError::Duplicate("email"))));
  }

  #[tokio::test]
  async fn sessions_round_trip() {
    let store = MemoryStore::new();
    let s = Session { token: "t1".into(), user_id: ObjectId::new(), expires_at: DateTime::now() };
    store.insert_session(&s).await.unwrap();
    assert_eq!(store.find_session("t1").await.unwrap(), Some(s));
    store.delete_session("t1").await.unwrap();
    assert!(store.find_session("t1").await.unwrap().is_none());
  }
}
