use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// StoreError
///
/// Failures raised by the Entity Store. These surface unchanged to the
/// Query/Command Surface, which decides how to present them.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced row does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// A foreign-key or uniqueness rule rejected the write.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// Anything else the database driver reported.
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Classifies driver errors so that `?` inside the Postgres repository yields
/// `ConstraintViolation` for foreign-key and unique violations.
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_foreign_key_violation() || db_err.is_unique_violation() {
                return StoreError::ConstraintViolation(db_err.message().to_string());
            }
        }
        StoreError::Database(err)
    }
}

/// AppError
///
/// The request-level error taxonomy. Every JSON handler returns
/// `Result<_, AppError>`; the `IntoResponse` impl maps each variant to its
/// HTTP status code.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ConstraintViolation(_) => StatusCode::CONFLICT,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message safe to show a client. Internal failures are redacted.
    pub fn reason(&self) -> String {
        match self {
            AppError::NotFound(msg)
            | AppError::ConstraintViolation(msg)
            | AppError::Validation(msg) => msg.clone(),
            AppError::Unauthenticated(_) => "Authentication required".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => AppError::NotFound(err.to_string()),
            StoreError::ConstraintViolation(msg) => AppError::ConstraintViolation(msg),
            StoreError::Database(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Internal(detail) => tracing::error!("internal error: {}", detail),
            AppError::Unauthenticated(detail) => tracing::warn!("unauthenticated: {}", detail),
            AppError::ConstraintViolation(detail) => {
                tracing::warn!("constraint violation: {}", detail)
            }
            AppError::NotFound(_) | AppError::Validation(_) => {
                tracing::debug!("request rejected: {}", self)
            }
        }

        let body = Json(json!({
            "error": true,
            "reason": self.reason(),
        }));

        (self.status(), body).into_response()
    }
}
