use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use rating_core::model::SubjectId;
use services::Caller;

use super::error::ApiError;

/// Header carrying the caller's subject id.
pub const SUBJECT_HEADER: &str = "x-subject-id";

/// Extracts the calling subject from [`SUBJECT_HEADER`].
#[derive(Debug, Clone, Copy)]
pub struct CurrentSubject(pub Caller);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentSubject
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(SUBJECT_HEADER)
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {SUBJECT_HEADER} header")))?;
        let id = raw
            .to_str()
            .ok()
            .and_then(|v| v.parse::<SubjectId>().ok())
            .ok_or_else(|| ApiError::Unauthorized(format!("invalid {SUBJECT_HEADER} header")))?;
        Ok(Self(Caller::new(id)))
    }
}
