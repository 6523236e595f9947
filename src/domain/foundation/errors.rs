//! Error types for the domain layer.

use thiserror::Error;

/// Errors that occur during value object construction.
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' must be between {min} and {max} characters, got {actual}")]
    LengthOutOfRange {
        field: String,
        min: usize,
        max: usize,
        actual: usize,
    },

    #[error("Field '{field}' has invalid value: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ValidationError {
    /// Creates an empty field validation error.
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField {
            field: field.into(),
        }
    }

    /// Creates a length-out-of-range validation error.
    pub fn length_out_of_range(
        field: impl Into<String>,
        min: usize,
        max: usize,
        actual: usize,
    ) -> Self {
        ValidationError::LengthOutOfRange {
            field: field.into(),
            min,
            max,
            actual,
        }
    }

    /// Creates an invalid value validation error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Error codes organized by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Validation
    ValidationFailed,

    // Not found
    ServerNotFound,
    ChannelNotFound,
    MessageNotFound,
    ConversationNotFound,
    UserNotFound,

    // State
    LastTextChannel,
    AlreadyAdmin,
    NotAdmin,
    TargetIsAdmin,
    TargetIsSelf,
    InviteInvalid,

    // Authorization
    Unauthorized,
    Forbidden,

    // Infrastructure
    DatabaseError,
    StorageError,
    InternalError,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::ServerNotFound => "SERVER_NOT_FOUND",
            ErrorCode::ChannelNotFound => "CHANNEL_NOT_FOUND",
            ErrorCode::MessageNotFound => "MESSAGE_NOT_FOUND",
            ErrorCode::ConversationNotFound => "CONVERSATION_NOT_FOUND",
            ErrorCode::UserNotFound => "USER_NOT_FOUND",
            ErrorCode::LastTextChannel => "LAST_TEXT_CHANNEL",
            ErrorCode::AlreadyAdmin => "ALREADY_ADMIN",
            ErrorCode::NotAdmin => "NOT_ADMIN",
            ErrorCode::TargetIsAdmin => "TARGET_IS_ADMIN",
            ErrorCode::TargetIsSelf => "TARGET_IS_SELF",
            ErrorCode::InviteInvalid => "INVITE_INVALID",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::StorageError => "STORAGE_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{}", s)
    }
}

/// A categorized domain error with a human-readable message.
#[derive(Debug, Clone, Error)]
#[error("{code}: {message}")]
pub struct DomainError {
    pub code: ErrorCode,
    pub message: String,
}

impl DomainError {
    /// Creates a new domain error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Shorthand for a database failure.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }
}

impl From<ValidationError> for DomainError {
    fn from(e: ValidationError) -> Self {
        DomainError::new(ErrorCode::ValidationFailed, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_displays_screaming_snake() {
        assert_eq!(ErrorCode::LastTextChannel.to_string(), "LAST_TEXT_CHANNEL");
        assert_eq!(ErrorCode::Forbidden.to_string(), "FORBIDDEN");
    }

    #[test]
    fn domain_error_formats_code_and_message() {
        let e = DomainError::new(ErrorCode::ChannelNotFound, "no such channel");
        assert_eq!(e.to_string(), "CHANNEL_NOT_FOUND: no such channel");
    }

    #[test]
    fn validation_error_converts_to_domain_error() {
        let e: DomainError = ValidationError::empty_field("content").into();
        assert_eq!(e.code, ErrorCode::ValidationFailed);
    }
}
