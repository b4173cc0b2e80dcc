use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use services::{
    CatalogError, ErrorKind, RatingServiceError, SessionServiceError, SubjectServiceError,
    TrackerError,
};
use thiserror::Error;

/// Error returned by every handler.
///
/// Serialized as `{"kind": "<KIND>", "error": "<reason>"}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Caller identity missing or unreadable (401)
    #[error("{0}")]
    Unauthorized(String),

    /// Request body or query could not be turned into a domain value (422)
    #[error("{0}")]
    Invalid(String),

    /// Classified failure from the services layer
    #[error("{message}")]
    Service { kind: ErrorKind, message: String },
}

impl ApiError {
    fn service(kind: ErrorKind, err: &impl std::fmt::Display) -> Self {
        ApiError::Service {
            kind,
            message: err.to_string(),
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Service { kind, .. } => match kind {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Forbidden => StatusCode::FORBIDDEN,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::InvalidState => StatusCode::BAD_REQUEST,
                ErrorKind::Invalid => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn kind_tag(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Invalid(_) => ErrorKind::Invalid.as_str(),
            ApiError::Service { kind, .. } => kind.as_str(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }

        let body = Json(json!({
            "kind": self.kind_tag(),
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}

impl From<TrackerError> for ApiError {
    fn from(err: TrackerError) -> Self {
        ApiError::service(err.kind(), &err)
    }
}

impl From<SessionServiceError> for ApiError {
    fn from(err: SessionServiceError) -> Self {
        ApiError::service(err.kind(), &err)
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError::service(err.kind(), &err)
    }
}

impl From<SubjectServiceError> for ApiError {
    fn from(err: SubjectServiceError) -> Self {
        ApiError::service(err.kind(), &err)
    }
}

impl From<RatingServiceError> for ApiError {
    fn from(err: RatingServiceError) -> Self {
        ApiError::service(err.kind(), &err)
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rating_core::model::SessionId;

    #[test]
    fn service_kinds_map_to_statuses() {
        let completed = ApiError::from(TrackerError::SessionCompleted(SessionId::new(4)));
        assert_eq!(completed.status(), StatusCode::BAD_REQUEST);
        assert_eq!(completed.kind_tag(), "INVALID_STATE");

        let forbidden = ApiError::from(TrackerError::Forbidden(SessionId::new(4)));
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn unauthorized_is_401() {
        let err = ApiError::Unauthorized("missing x-subject-id header".into());
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }
}
