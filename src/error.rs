use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Failures surfaced by the auth endpoints.
///
/// Token lookup misses are deliberately ambiguous: `InvalidOrExpired` does
/// not reveal whether a code was wrong, expired, or already consumed.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(&'static str),

    #[error("Email is already registered")]
    Conflict,

    #[error("User not found")]
    UnknownUser,

    #[error("User not found")]
    NotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid or expired {0}")]
    InvalidOrExpired(&'static str),

    #[error("Unauthorized - invalid or missing session")]
    Unauthenticated,

    #[error("Admin access required")]
    Forbidden,

    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, (*msg).to_string()),
            Self::Conflict => (StatusCode::CONFLICT, self.to_string()),
            // Login and check-auth report a missing user as 400, matching
            // the public contract of the original API.
            Self::UnknownUser => (StatusCode::BAD_REQUEST, self.to_string()),
            Self::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            Self::InvalidCredentials => (StatusCode::BAD_REQUEST, self.to_string()),
            Self::InvalidOrExpired(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            Self::Unauthenticated => (StatusCode::UNAUTHORIZED, self.to_string()),
            Self::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
            Self::Database(e) => {
                tracing::error!(error = %e, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred".to_string(),
                )
            }
            Self::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred".to_string(),
                )
            }
        };

        (
            status,
            Json(ErrorBody {
                success: false,
                message,
            }),
        )
            .into_response()
    }
}

impl AuthError {
    /// Translate a unique-violation on the users email index into `Conflict`.
    ///
    /// Signup relies on the database constraint, not the pre-insert lookup,
    /// so concurrent signups with the same email cannot both succeed.
    pub fn from_insert(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db) = e {
            if db.code().as_deref() == Some("23505") {
                return Self::Conflict;
            }
        }
        Self::Database(e)
    }
}
