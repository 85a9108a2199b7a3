use std::time::Duration;

use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use futures_util::TryStreamExt;
use mongodb::{
  error::{ErrorKind, WriteFailure},
  options::{ClientOptions, IndexOptions, ReturnDocument},
  Client, Collection, IndexModel,
};
use tracing::{debug, info, instrument};

use super::{Store, StoreError};
use crate::config::DEFAULT_DATABASE;
use crate::domain::{ProgressRecord, Session, User};

const DUPLICATE_KEY: i32 = 11000;

#[derive(Clone)]
pub struct MongoStore {
  client: Client,
  users: Collection<User>,
  progress: Collection<ProgressRecord>,
  sessions: Collection<Session>,
}

impl MongoStore {
  /// Connect, ping, and make sure the indexes exist. The database comes from
  /// the URI path, falling back to `ai_dsa_mentor`.
  #[instrument(level = "info", skip_all, err(Debug))]
  pub async fn connect(uri: &str) -> Result<Self, StoreError> {
    let mut client_options = ClientOptions::parse(uri).await?;
    client_options.app_name = Some(env!("CARGO_CRATE_NAME").to_string());
    let client = Client::with_options(client_options)?;

    let db = client.default_database().unwrap_or_else(|| client.database(DEFAULT_DATABASE));
    db.run_command(doc! { "ping": 1 }).await?;
    info!(target: "dsa_mentor", database = %db.name(), "Connected to MongoDB");

    let store = Self {
      users: db.collection::<User>("users"),
      progress: db.collection::<ProgressRecord>("progress"),
      sessions: db.collection::<Session>("sessions"),
      client,
    };
    store.ensure_indexes().await?;
    Ok(store)
  }

  async fn ensure_indexes(&self) -> Result<(), StoreError> {
    self
      .users
      .create_index(
        IndexModel::builder()
          .keys(doc! { "email": 1 })
          .options(IndexOptions::builder().unique(true).build())
          .build(),
      )
      .await?;
    self
      .progress
      .create_index(
        IndexModel::builder()
          .keys(doc! { "user_id": 1, "topic": 1 })
          .options(IndexOptions::builder().unique(true).build())
          .build(),
      )
      .await?;
    self
      .sessions
      .create_index(
        IndexModel::builder()
          .keys(doc! { "token": 1 })
          .options(IndexOptions::builder().unique(true).build())
          .build(),
      )
      .await?;
    // Expired sessions are also rejected on lookup; the TTL index only reclaims space.
    self
      .sessions
      .create_index(
        IndexModel::builder()
          .keys(doc! { "expires_at": 1 })
          .options(IndexOptions::builder().expire_after(Duration::from_secs(0)).build())
          .build(),
      )
      .await?;
    Ok(())
  }
}

fn is_duplicate_key(e: &mongodb::error::Error) -> bool {
  match e.kind.as_ref() {
    ErrorKind::Write(WriteFailure::WriteError(we)) => we.code == DUPLICATE_KEY,
    // findAndModify reports the unique-index clash as a command error.
    ErrorKind::Command(ce) => ce.code == DUPLICATE_KEY,
    _ => false,
  }
}

fn map_write_err(e: mongodb::error::Error, what: &'static str) -> StoreError {
  if is_duplicate_key(&e) {
    StoreError::Duplicate(what)
  } else {
    StoreError::MongoDB(e)
  }
}

#[async_trait]
impl Store for MongoStore {
  async fn find_progress(&self, user_id: ObjectId, topic: &str) -> Result<Option<ProgressRecord>, StoreError> {
    Ok(self.progress.find_one(doc! { "user_id": user_id, "topic": topic }).await?)
  }

  async fn list_progress(&self, user_id: ObjectId) -> Result<Vec<ProgressRecord>, StoreError> {
    let records = self
      .progress
      .find(doc! { "user_id": user_id })
      .sort(doc! { "_id": 1 })
      .await?
      .try_collect()
      .await?;
    Ok(records)
  }

  async fn insert_progress(&self, record: &ProgressRecord) -> Result<(), StoreError> {
    self.progress.insert_one(record).await.map_err(|e| map_write_err(e, "_id"))?;
    Ok(())
  }

  async fn save_progress(&self, record: &ProgressRecord) -> Result<(), StoreError> {
    self
      .progress
      .replace_one(doc! { "_id": record.id }, record)
      .upsert(true)
      .await?;
    Ok(())
  }

  /// `$setOnInsert` upsert keyed on (user_id, topic). The unique index makes
  /// a concurrent loser fail with a duplicate key; it then reads the winner's record.
  #[instrument(level = "debug", skip(self))]
  async fn find_or_create_progress(&self, user_id: ObjectId, topic: &str) -> Result<ProgressRecord, StoreError> {
    let mut on_insert = bson::to_document(&ProgressRecord::new(user_id, topic))?;
    on_insert.remove("user_id");
    on_insert.remove("topic");

    let upserted = self
      .progress
      .find_one_and_update(doc! { "user_id": user_id, "topic": topic }, doc! { "$setOnInsert": on_insert })
      .upsert(true)
      .return_document(ReturnDocument::After)
      .await;
    let found = match upserted {
      Ok(found) => found,
      Err(e) if is_duplicate_key(&e) => {
        debug!(target: "progress", %topic, "Concurrent progress insert lost the race; re-reading");
        self.find_progress(user_id, topic).await?
      }
      Err(e) => return Err(e.into()),
    };
    found.ok_or_else(|| StoreError::Inconsistent(format!("upsert for topic '{topic}' returned no document")))
  }

  async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
    self.users.insert_one(user).await.map_err(|e| map_write_err(e, "email"))?;
    Ok(())
  }

  async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
    Ok(self.users.find_one(doc! { "email": email }).await?)
  }

  async fn find_user_by_id(&self, id: ObjectId) -> Result<Option<User>, StoreError> {
    Ok(self.users.find_one(doc! { "_id": id }).await?)
  }

  async fn save_user(&self, user: &User) -> Result<(), StoreError> {
    self
      .users
      .replace_one(doc! { "_id": user.id }, user)
      .await
      .map_err(|e| map_write_err(e, "email"))?;
    Ok(())
  }

  async fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
    self.sessions.insert_one(session).await.map_err(|e| map_write_err(e, "token"))?;
    Ok(())
  }

  async fn find_session(&self, token: &str) -> Result<Option<Session>, StoreError> {
    Ok(self.sessions.find_one(doc! { "token": token }).await?)
  }

  async fn delete_session(&self, token: &str) -> Result<(), StoreError> {
    self.sessions.delete_one(doc! { "token": token }).await?;
    Ok(())
  }

  async fn shutdown(&self) {
    info!(target: "dsa_mentor", "Closing MongoDB client");
    self.client.clone().shutdown().await;
  }
}
