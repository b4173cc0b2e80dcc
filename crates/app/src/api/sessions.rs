use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
};
use chrono::{DateTime, Utc};
use rating_core::model::{
    AssignmentId, DisplayPosition, ImageDescriptor, ImageId, Session, SessionId, SessionKind,
    SubjectId,
};
use serde::{Deserialize, Serialize};
use services::{SessionProgress, SessionServiceError};
use storage::repository::AssignedImage;

use super::{ApiResult, CurrentSubject};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSession {
    pub subject_id: u64,
    pub session_type: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: SessionId,
    pub subject_id: SubjectId,
    pub session_type: &'static str,
    pub is_completed: bool,
    pub last_seen_position: u32,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl From<Session> for SessionResponse {
    fn from(s: Session) -> Self {
        Self {
            id: s.id(),
            subject_id: s.subject_id(),
            session_type: s.kind().as_str(),
            is_completed: s.is_completed(),
            last_seen_position: s.last_seen_position(),
            started_at: s.started_at(),
            ended_at: s.ended_at(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ImageInfo {
    pub id: ImageId,
    pub file_name: String,
    pub file_path: Option<String>,
}

impl From<ImageDescriptor> for ImageInfo {
    fn from(d: ImageDescriptor) -> Self {
        Self {
            id: d.id,
            file_name: d.file_name,
            file_path: d.file_path,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AssignmentResponse {
    pub id: AssignmentId,
    pub session_id: SessionId,
    pub image_id: ImageId,
    pub display_order: DisplayPosition,
    pub is_training: bool,
    pub image: ImageInfo,
}

impl From<AssignedImage> for AssignmentResponse {
    fn from(a: AssignedImage) -> Self {
        Self {
            id: a.assignment.id,
            session_id: a.assignment.session_id,
            image_id: a.assignment.image_id,
            display_order: a.assignment.position,
            is_training: a.assignment.is_training,
            image: a.image.into(),
        }
    }
}

fn assignment_list(assigned: Vec<AssignedImage>) -> Vec<AssignmentResponse> {
    assigned.into_iter().map(AssignmentResponse::from).collect()
}

/// POST /sessions
pub async fn create_session(
    State(state): State<AppState>,
    CurrentSubject(caller): CurrentSubject,
    Json(body): Json<CreateSession>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    let kind = SessionKind::parse(&body.session_type).map_err(SessionServiceError::from)?;
    let session = state
        .services
        .sessions()
        .create_session(caller, SubjectId::new(body.subject_id), kind)
        .await?;
    Ok((StatusCode::CREATED, Json(session.into())))
}

/// GET /sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    CurrentSubject(caller): CurrentSubject,
) -> ApiResult<Json<Vec<SessionResponse>>> {
    let sessions = state.services.sessions().list_sessions(caller).await?;
    Ok(Json(sessions.into_iter().map(SessionResponse::from).collect()))
}

/// GET /sessions/:id
pub async fn get_session(
    State(state): State<AppState>,
    CurrentSubject(caller): CurrentSubject,
    Path(id): Path<u64>,
) -> ApiResult<Json<SessionResponse>> {
    let session = state
        .services
        .sessions()
        .get_session(caller, SessionId::new(id))
        .await?;
    Ok(Json(session.into()))
}

/// PATCH /sessions/:id/complete
pub async fn complete_session(
    State(state): State<AppState>,
    CurrentSubject(caller): CurrentSubject,
    Path(id): Path<u64>,
) -> ApiResult<Json<SessionResponse>> {
    let session = state
        .services
        .sessions()
        .complete_session(caller, SessionId::new(id))
        .await?;
    Ok(Json(session.into()))
}

/// POST /sessions/:id/assign_images
///
/// An empty list samples a batch from the catalog.
pub async fn assign_images(
    State(state): State<AppState>,
    CurrentSubject(caller): CurrentSubject,
    Path(id): Path<u64>,
    Json(image_ids): Json<Vec<u64>>,
) -> ApiResult<(StatusCode, Json<Vec<AssignmentResponse>>)> {
    let image_ids = image_ids.into_iter().map(ImageId::new).collect();
    let assigned = state
        .services
        .sessions()
        .assign_images(caller, SessionId::new(id), image_ids)
        .await?;
    Ok((StatusCode::CREATED, Json(assignment_list(assigned))))
}

/// GET /sessions/:id/images
pub async fn list_assignments(
    State(state): State<AppState>,
    CurrentSubject(caller): CurrentSubject,
    Path(id): Path<u64>,
) -> ApiResult<Json<Vec<AssignmentResponse>>> {
    let assigned = state
        .services
        .sessions()
        .list_assignments(caller, SessionId::new(id))
        .await?;
    Ok(Json(assignment_list(assigned)))
}

/// GET /sessions/:id/progress
pub async fn progress(
    State(state): State<AppState>,
    CurrentSubject(caller): CurrentSubject,
    Path(id): Path<u64>,
) -> ApiResult<Json<SessionProgress>> {
    let progress = state
        .services
        .sessions()
        .progress(caller, SessionId::new(id))
        .await?;
    Ok(Json(progress))
}

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(create_session).get(list_sessions))
        .route("/sessions/:id", get(get_session))
        .route("/sessions/:id/complete", patch(complete_session))
        .route("/sessions/:id/assign_images", post(assign_images))
        .route("/sessions/:id/images", get(list_assignments))
        .route("/sessions/:id/progress", get(progress))
}
