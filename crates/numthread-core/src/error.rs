use crate::validation::ValidationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NumthreadError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Username already exists")]
    UsernameTaken,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Discussion not found")]
    DiscussionNotFound,

    #[error("Operation not found")]
    OperationNotFound,

    #[error("Parent operation not found")]
    ParentNotFound,

    #[error("Parent operation does not belong to the specified discussion")]
    ParentMismatch,

    #[error("Cannot divide by zero")]
    DivisionByZero,

    #[error("Result is not a finite number")]
    NonFiniteResult,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Token generation failed: {0}")]
    TokenGeneration(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, NumthreadError>;
