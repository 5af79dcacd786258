use axum::http::StatusCode;
use thiserror::Error;

/// Everything a register or login attempt can fail with.
///
/// All variants except `Internal` are recovered by redisplaying the form.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("{}", .0.join("; "))]
    ValidationFailure(Vec<String>),
    #[error("An account with this email is already registered")]
    DuplicateAccount,
    #[error("No such account found")]
    AccountNotFound,
    #[error("Invalid email or password")]
    InvalidPassword,
    #[error("Missing login submission")]
    MissingInput,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AccountError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::ValidationFailure(_) => StatusCode::BAD_REQUEST,
            Self::DuplicateAccount => StatusCode::CONFLICT,
            Self::AccountNotFound | Self::InvalidPassword => StatusCode::UNAUTHORIZED,
            Self::MissingInput => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Messages shown next to the redisplayed form.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        match self {
            Self::ValidationFailure(messages) => messages.clone(),
            Self::Internal(_) => vec!["Something went wrong, please try again".to_string()],
            other => vec![other.to_string()],
        }
    }
}
