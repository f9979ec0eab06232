//! Core error types for terriyaki-core.
//!
//! Every domain failure is a [`CoreError`] variant. Outer layers map errors
//! onto the coarse [`ErrorCode`] categories through [`CoreError::code`]
//! instead of matching on individual variants.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::message::InvitationStatus;

/// User-visible error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    Forbidden,
    Conflict,
    ValidationError,
    UpstreamUnavailable,
    Unauthorized,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::UpstreamUnavailable => "UPSTREAM_UNAVAILABLE",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Core error type for terriyaki-core.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Grind not found: {0}")]
    GrindNotFound(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// The user never joined the grind.
    #[error("No participation record for user {user_id} in grind {grind_id}")]
    RecordNotFound { user_id: String, grind_id: String },

    #[error("Message not found: {0}")]
    MessageNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    /// A participant identifier could not be resolved, or the user is not
    /// part of the grind.
    #[error("Participant not found: {0}")]
    ParticipantNotFound(String),

    #[error("Problem not found: {0}")]
    ProblemNotFound(String),

    #[error("No ongoing grind for user {0}")]
    NoOngoingGrind(String),

    #[error("No task scheduled today for user {user_id} in grind {grind_id}")]
    NoTaskToday { user_id: String, grind_id: String },

    #[error("User {actor} is not allowed to {action}")]
    Forbidden { actor: String, action: String },

    #[error("User {user_id} already participates in grind {grind_id}")]
    ParticipantAlreadyExists { user_id: String, grind_id: String },

    #[error("User {user_id} already quit grind {grind_id}")]
    AlreadyQuitted { user_id: String, grind_id: String },

    #[error("Invitation {id} is already {status}")]
    InvitationNotPending { id: String, status: InvitationStatus },

    #[error("Email already registered: {0}")]
    EmailTaken(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The problem source failed or did not answer in time.
    #[error("Problem source unavailable: {0}")]
    ProblemSourceUnavailable(String),

    #[error("Unauthorized: missing or invalid access token")]
    Unauthorized,

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Category exposed to callers outside the core.
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::GrindNotFound(_)
            | CoreError::TaskNotFound(_)
            | CoreError::RecordNotFound { .. }
            | CoreError::MessageNotFound(_)
            | CoreError::UserNotFound(_)
            | CoreError::ParticipantNotFound(_)
            | CoreError::ProblemNotFound(_)
            | CoreError::NoOngoingGrind(_)
            | CoreError::NoTaskToday { .. } => ErrorCode::NotFound,
            CoreError::Forbidden { .. } => ErrorCode::Forbidden,
            CoreError::ParticipantAlreadyExists { .. }
            | CoreError::AlreadyQuitted { .. }
            | CoreError::InvitationNotPending { .. }
            | CoreError::EmailTaken(_) => ErrorCode::Conflict,
            CoreError::Validation(_) => ErrorCode::ValidationError,
            CoreError::ProblemSourceUnavailable(_) => ErrorCode::UpstreamUnavailable,
            CoreError::Unauthorized => ErrorCode::Unauthorized,
            CoreError::Database(_)
            | CoreError::Config(_)
            | CoreError::Io(_)
            | CoreError::Json(_) => ErrorCode::Internal,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code() == ErrorCode::NotFound
    }
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("sender and receiver must be different users")]
    SameSenderReceiver,

    /// Empty collection
    #[error("Empty collection: {0}")]
    EmptyCollection(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    #[error("Message {0} is not an invitation")]
    NotAnInvitation(String),
}

impl ValidationError {
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        ValidationError::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, _msg) => {
                if failure.code == rusqlite::ErrorCode::DatabaseLocked
                    || failure.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
