use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use rating_core::model::{
    AssignmentId, DisplayPosition, ImageId, QuestionId, Rating, RatingId, SessionId, SubjectId,
};
use serde::Serialize;

use super::flow::submit_rating;
use super::{ApiResult, CurrentSubject};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct RatingResponse {
    pub id: RatingId,
    pub session_image_id: AssignmentId,
    pub session_id: SessionId,
    pub question_id: QuestionId,
    pub subject_id: SubjectId,
    pub image_id: ImageId,
    pub display_order: DisplayPosition,
    pub rating_value: Option<f64>,
    pub text_answer: Option<String>,
    pub response_time: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl From<Rating> for RatingResponse {
    fn from(r: Rating) -> Self {
        Self {
            id: r.id,
            session_image_id: r.assignment_id,
            session_id: r.session_id,
            question_id: r.question_id,
            subject_id: r.subject_id,
            image_id: r.image_id,
            display_order: r.position,
            rating_value: r.value,
            text_answer: r.text,
            response_time: r.response_time,
            created_at: r.created_at,
        }
    }
}

/// GET /ratings/:id
pub async fn get_rating(
    State(state): State<AppState>,
    CurrentSubject(caller): CurrentSubject,
    Path(id): Path<u64>,
) -> ApiResult<Json<RatingResponse>> {
    let rating = state
        .services
        .ratings()
        .get_rating(caller, RatingId::new(id))
        .await?;
    Ok(Json(rating.into()))
}

/// GET /session_images/:id/ratings
pub async fn ratings_for_assignment(
    State(state): State<AppState>,
    CurrentSubject(caller): CurrentSubject,
    Path(id): Path<u64>,
) -> ApiResult<Json<Vec<RatingResponse>>> {
    let ratings = state
        .services
        .ratings()
        .list_for_assignment(caller, AssignmentId::new(id))
        .await?;
    Ok(Json(ratings.into_iter().map(RatingResponse::from).collect()))
}

pub fn rating_routes() -> Router<AppState> {
    Router::new()
        .route("/ratings", post(submit_rating))
        .route("/ratings/:id", get(get_rating))
        .route("/session_images/:id/ratings", get(ratings_for_assignment))
}
