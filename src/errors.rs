use rocket::http::Status;
use rocket::response::{self, Responder, Response};
use rocket::Request;
use sea_orm::DbErr;
use std::io::Cursor;

/// Application-wide error type. Write-boundary rejections get their
/// own variants so callers can tell "the user typed garbage" apart
/// from "the database fell over".
#[derive(Debug)]
pub enum AppError {
    /// Database error
    Database(DbErr),
    /// No valid session (401 Unauthorized)
    Unauthorized,
    /// Resource missing or owned by someone else (404 Not Found)
    NotFound,
    /// Malformed request (400 Bad Request)
    BadRequest(String),
    /// Due date/time that does not parse. Surfaced to the caller,
    /// never silently defaulted.
    InvalidTemporalValue(String),
    /// Status label outside {To do, In progress, Completed}.
    UnknownStatusLabel(String),
    /// Priority label outside {Low, Medium, High}.
    UnknownPriorityLabel(String),
    /// A user row with no settings row. Registration creates both in
    /// one transaction, so this is a caller bug, not a user error.
    MissingSettings(i32),
    /// Internal error (500 Internal Server Error)
    Internal(String),
}

impl<'r> Responder<'r, 'static> for AppError {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let (status, message) = match &self {
            AppError::Unauthorized => (Status::Unauthorized, "Unauthorized".to_string()),
            AppError::NotFound => (Status::NotFound, "Not Found".to_string()),
            AppError::BadRequest(msg) => (Status::BadRequest, msg.clone()),
            AppError::InvalidTemporalValue(value) => (
                Status::BadRequest,
                format!("Invalid due date/time: {}", value),
            ),
            AppError::UnknownStatusLabel(label) => {
                (Status::BadRequest, format!("Unknown status: {}", label))
            }
            AppError::UnknownPriorityLabel(label) => {
                (Status::BadRequest, format!("Unknown priority: {}", label))
            }
            AppError::MissingSettings(user_id) => (
                Status::InternalServerError,
                format!("No settings row for user {}", user_id),
            ),
            AppError::Database(_) => (Status::InternalServerError, "Database Error".to_string()),
            AppError::Internal(msg) => (Status::InternalServerError, msg.clone()),
        };

        Response::build()
            .status(status)
            .sized_body(message.len(), Cursor::new(message))
            .ok()
    }
}

impl From<DbErr> for AppError {
    fn from(e: DbErr) -> Self {
        AppError::Database(e)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Database(e) => write!(f, "Database error: {}", e),
            AppError::Unauthorized => write!(f, "Unauthorized"),
            AppError::NotFound => write!(f, "Not found"),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::InvalidTemporalValue(value) => {
                write!(f, "Invalid due date/time: {}", value)
            }
            AppError::UnknownStatusLabel(label) => write!(f, "Unknown status: {}", label),
            AppError::UnknownPriorityLabel(label) => write!(f, "Unknown priority: {}", label),
            AppError::MissingSettings(user_id) => {
                write!(f, "No settings row for user {}", user_id)
            }
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
