use serde::Serialize;
use std::fmt;

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub enum CoreError {
    NotFound(String),
    DatabaseError(String),
    DecodeError(String),
    Forbidden(String),
    Conflict(String),
    BadRequest(String),
    InternalServerError(String),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::NotFound(ref message) => write!(f, "{}", message),
            CoreError::DatabaseError(ref message) => write!(f, "{}", message),
            CoreError::DecodeError(ref message) => write!(f, "{}", message),
            CoreError::Forbidden(ref message) => write!(f, "{}", message),
            CoreError::Conflict(ref message) => write!(f, "{}", message),
            CoreError::BadRequest(ref message) => write!(f, "{}", message),
            CoreError::InternalServerError(ref message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for CoreError {}

impl CoreError {
    /// A point lookup matched no row. The message carries type and key.
    pub fn not_found(type_name: &str, key: impl fmt::Display) -> CoreError {
        CoreError::NotFound(format!("no such entity [{}][{}]", type_name, key))
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(e: rusqlite::Error) -> CoreError {
        match e {
            rusqlite::Error::QueryReturnedNoRows => {
                CoreError::NotFound("query returned no rows".to_string())
            }
            _ => CoreError::DatabaseError(e.to_string()),
        }
    }
}

impl From<r2d2::Error> for CoreError {
    fn from(e: r2d2::Error) -> CoreError {
        CoreError::DatabaseError(format!("failed to get connection from pool: {}", e))
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> CoreError {
        CoreError::DecodeError(e.to_string())
    }
}
