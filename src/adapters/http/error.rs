//! HTTP error responses.
//!
//! Unlike the realtime path, HTTP callers get structured feedback: every
//! domain error maps to a status code and a `{code, message}` JSON body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};

/// A domain error carried to an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0.code {
            ErrorCode::ServerNotFound
            | ErrorCode::ChannelNotFound
            | ErrorCode::MessageNotFound
            | ErrorCode::ConversationNotFound
            | ErrorCode::UserNotFound => StatusCode::NOT_FOUND,

            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,

            ErrorCode::ValidationFailed
            | ErrorCode::LastTextChannel
            | ErrorCode::AlreadyAdmin
            | ErrorCode::NotAdmin
            | ErrorCode::TargetIsAdmin
            | ErrorCode::TargetIsSelf
            | ErrorCode::InviteInvalid => StatusCode::BAD_REQUEST,

            ErrorCode::DatabaseError | ErrorCode::StorageError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        ApiError(e)
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(code = %self.0.code, message = %self.0.message, "Request failed");
        }
        let body = Json(serde_json::json!({
            "code": self.0.code.to_string(),
            "message": self.0.message,
        }));
        (status, body).into_response()
    }
}
