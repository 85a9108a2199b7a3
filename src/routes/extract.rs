//! Body and query extractors whose rejections share the `{"detail": ...}` error shape.

use axum::extract::rejection::{FormRejection, JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::StatusCode;

use crate::error::ApiError;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequest)]
#[from_request(via(axum::Form), rejection(ApiError))]
pub struct ApiForm<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rej: JsonRejection) -> Self {
        ApiError::Client(rej.status(), rej.body_text())
    }
}

impl From<FormRejection> for ApiError {
    fn from(rej: FormRejection) -> Self {
        ApiError::Client(rej.status(), rej.body_text())
    }
}

// A missing or mistyped query field is a validation failure, not a syntax one.
impl From<QueryRejection> for ApiError {
    fn from(rej: QueryRejection) -> Self {
        ApiError::Client(StatusCode::UNPROCESSABLE_ENTITY, rej.body_text())
    }
}
