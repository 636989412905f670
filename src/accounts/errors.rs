use thiserror::Error;

use crate::users::repo::RepoError;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("validation failed: {0}")]
    Validation(&'static str),
    #[error("user not found")]
    NotFound,
    #[error("user is blocked")]
    Blocked,
    #[error("invalid password")]
    InvalidPassword,
    #[error("email already exists")]
    Conflict,
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<RepoError> for AccountError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => AccountError::NotFound,
            RepoError::DuplicateKey => AccountError::Conflict,
            other => AccountError::Internal(other.into()),
        }
    }
}
