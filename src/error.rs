use thiserror::Error;

/// Failures from the score store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("score store lock poisoned")]
    Poisoned,
}

/// Failures from the identity provider
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    #[error("password must be at least {min} characters")]
    WeakPassword { min: usize },

    #[error("an account already exists for {0}")]
    EmailInUse(String),

    #[error("wrong email or password")]
    InvalidCredentials,

    #[error("identity lock poisoned")]
    Poisoned,
}
