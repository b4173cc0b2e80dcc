use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use rating_core::model::{Subject, SubjectDraft, SubjectId};
use serde::{Deserialize, Serialize};

use super::{ApiResult, CurrentSubject};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSubject {
    pub name: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubjectResponse {
    pub id: SubjectId,
    pub name: String,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Subject> for SubjectResponse {
    fn from(s: Subject) -> Self {
        Self {
            id: s.id,
            name: s.name,
            age: s.age,
            gender: s.gender,
            created_at: s.created_at,
        }
    }
}

/// POST /subjects
///
/// Open registration: the returned id is what clients send as `x-subject-id`.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<CreateSubject>,
) -> ApiResult<(StatusCode, Json<SubjectResponse>)> {
    let subject = state
        .services
        .subjects()
        .register(SubjectDraft {
            name: body.name,
            age: body.age,
            gender: body.gender,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(subject.into())))
}

/// GET /subjects/me
pub async fn me(
    State(state): State<AppState>,
    CurrentSubject(caller): CurrentSubject,
) -> ApiResult<Json<SubjectResponse>> {
    let subject = state.services.subjects().me(caller).await?;
    Ok(Json(subject.into()))
}

/// GET /subjects/:id
pub async fn get_subject(
    State(state): State<AppState>,
    CurrentSubject(_caller): CurrentSubject,
    Path(id): Path<u64>,
) -> ApiResult<Json<SubjectResponse>> {
    let subject = state.services.subjects().get(SubjectId::new(id)).await?;
    Ok(Json(subject.into()))
}

pub fn subject_routes() -> Router<AppState> {
    Router::new()
        .route("/subjects", post(register))
        .route("/subjects/me", get(me))
        .route("/subjects/:id", get(get_subject))
}
