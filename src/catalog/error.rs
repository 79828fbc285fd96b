use axum::{http::StatusCode, response::IntoResponse, Json};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Course code '{code}' already exists for language {language_id}")]
    DuplicateCourseCode { language_id: Uuid, code: String },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Prerequisites not completed: {completed} of {required} prerequisite course(s) done")]
    PrerequisitesNotMet { required: usize, completed: usize },
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl CatalogError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidFilter(_) | Self::Validation(_) | Self::PrerequisitesNotMet { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::DuplicateCourseCode { .. } => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used as the `error` field of the response envelope.
    pub fn summary(&self) -> &'static str {
        match self {
            Self::InvalidFilter(_) => "Invalid filter",
            Self::Validation(_) => "Validation failed",
            Self::DuplicateCourseCode { .. } => "Duplicate course code",
            Self::NotFound(_) => "Not found",
            Self::PrerequisitesNotMet { .. } => "Prerequisites not completed",
            Self::StoreUnavailable(_) => "Store unavailable",
        }
    }
}

impl From<diesel::result::Error> for CatalogError {
    fn from(err: diesel::result::Error) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}

impl From<diesel::r2d2::PoolError> for CatalogError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        Self::StoreUnavailable(format!("connection pool: {err}"))
    }
}

impl From<tokio::task::JoinError> for CatalogError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::StoreUnavailable(format!("worker task failed: {err}"))
    }
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        (
            status,
            Json(serde_json::json!({
                "error": self.summary(),
                "details": self.to_string(),
                "success": false
            })),
        )
            .into_response()
    }
}
