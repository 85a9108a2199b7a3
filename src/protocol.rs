//! Public HTTP request/response DTOs (serde ready).
//! Field names follow what the web client already sends and reads.

use serde::{Deserialize, Serialize};

use crate::domain::{ProgressRecord, ProgressStatus, User};

#[derive(Serialize)]
pub struct HealthOut {
    pub status: &'static str,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorOut {
    pub detail: String,
}

//
// Auth
//

#[derive(Deserialize)]
pub struct RegisterIn {
    pub email: String,
    pub password: String,
}

/// OAuth2 password-flow form; `username` carries the email.
#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct TokenOut {
    pub access_token: String,
    pub token_type: &'static str,
}

#[derive(Serialize, Debug)]
pub struct UserRead {
    pub id: String,
    pub email: String,
    pub is_active: bool,
    pub is_superuser: bool,
    pub is_verified: bool,
}

impl From<&User> for UserRead {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.to_hex(),
            email: u.email.clone(),
            is_active: u.is_active,
            is_superuser: u.is_superuser,
            is_verified: u.is_verified,
        }
    }
}

#[derive(Deserialize, Default)]
pub struct UserUpdateIn {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

//
// Learning
//

#[derive(Debug, Deserialize)]
pub struct McqQuery {
    pub topic: String,
}

#[derive(Deserialize)]
pub struct DoubtIn {
    pub doubt: String,
    #[serde(default)]
    pub topic: String,
}

#[derive(Serialize)]
pub struct DoubtOut {
    pub answer: String,
}

//
// Progress
//

#[derive(Serialize, Debug, PartialEq)]
pub struct ProgressOut {
    pub topic: String,
    pub status: ProgressStatus,
    pub score: f64,
    /// RFC 3339, or null while the topic is not completed.
    pub completed: Option<String>,
}

impl From<&ProgressRecord> for ProgressOut {
    fn from(r: &ProgressRecord) -> Self {
        Self {
            topic: r.topic.clone(),
            status: r.status,
            score: r.mcq_score,
            completed: r.date_completed.and_then(|d| d.try_to_rfc3339_string().ok()),
        }
    }
}

#[derive(Deserialize)]
pub struct ProgressUpdateIn {
    pub topic: String,
    pub status: ProgressStatus,
    #[serde(default)]
    pub score: f64,
}

#[derive(Serialize)]
pub struct MessageOut {
    pub message: &'static str,
}
