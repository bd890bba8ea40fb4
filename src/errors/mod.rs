// Defines the application error types and result aliases using the thiserror crate.
use thiserror::Error;

pub mod response;
pub mod validation;

pub use validation::{ValidationError, ValidationResult};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("User {0} already exists")]
    Duplicate(String),

    #[error("User {0} not found")]
    NotFound(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Admin authentication error: {0}")]
    AdminAuth(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Password hashing error: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("File error: {0}")]
    File(#[from] std::io::Error),

    #[error("Chart error: {0}")]
    Chart(String),

    #[error("Background task failed: {0}")]
    Blocking(#[from] tokio::task::JoinError),
}

// Duplicate and missing users surface as their own variants so handlers can
// redirect with a notice instead of failing the request.
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(name) => AppError::Duplicate(name),
            StoreError::NotFound(name) => AppError::NotFound(name),
            other => AppError::Store(other),
        }
    }
}

// Custom result type
pub type AppResult<T> = Result<T, AppError>;
