//! Rating flow: fetch the next image, submit answers for it.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use rating_core::model::{
    Answer, AnswerPayload, AssignmentId, DisplayPosition, QuestionId, RatingId, SessionId,
};
use serde::{Deserialize, Serialize};
use services::{AnswerReceipt, NextImage, TrackerError};

use super::sessions::ImageInfo;
use super::{ApiError, ApiResult, CurrentSubject};
use crate::AppState;

const COMPLETE_MESSAGE: &str = "No more images. Session completed.";

#[derive(Debug, Deserialize)]
pub struct NextImageQuery {
    pub session_id: u64,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NextImageResponse {
    Pending {
        session_image_id: AssignmentId,
        image_info: ImageInfo,
        display_order: DisplayPosition,
    },
    Complete {
        message: &'static str,
    },
}

impl From<NextImage> for NextImageResponse {
    fn from(next: NextImage) -> Self {
        match next {
            NextImage::Pending(p) => NextImageResponse::Pending {
                session_image_id: p.assignment_id,
                image_info: p.image.into(),
                display_order: p.position,
            },
            NextImage::Complete => NextImageResponse::Complete {
                message: COMPLETE_MESSAGE,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AnswerBody {
    pub question_id: u64,
    #[serde(default)]
    pub rating_value: Option<f64>,
    #[serde(default)]
    pub text_answer: Option<String>,
    #[serde(default)]
    pub response_time: Option<f64>,
}

impl From<AnswerBody> for Answer {
    fn from(a: AnswerBody) -> Self {
        Answer {
            question_id: QuestionId::new(a.question_id),
            value: a.rating_value,
            text: a.text_answer,
            response_time: a.response_time,
        }
    }
}

/// Body of `POST /flow/submit_rating` and `POST /ratings`.
///
/// Either the flat single-answer fields or `answers` must be present.
#[derive(Debug, Deserialize)]
pub struct SubmitRating {
    #[serde(default)]
    pub session_id: Option<u64>,
    pub session_image_id: u64,
    #[serde(default)]
    pub question_id: Option<u64>,
    #[serde(default)]
    pub rating_value: Option<f64>,
    #[serde(default)]
    pub text_answer: Option<String>,
    #[serde(default)]
    pub response_time: Option<f64>,
    #[serde(default)]
    pub answers: Option<Vec<AnswerBody>>,
}

impl SubmitRating {
    fn payload(self) -> ApiResult<AnswerPayload> {
        let payload = match (self.answers, self.question_id) {
            (Some(answers), _) => AnswerPayload::new(answers.into_iter().map(Answer::from).collect()),
            (None, Some(question_id)) => AnswerPayload::single(Answer {
                question_id: QuestionId::new(question_id),
                value: self.rating_value,
                text: self.text_answer,
                response_time: self.response_time,
            }),
            (None, None) => {
                return Err(ApiError::Invalid(
                    "either question_id or answers is required".into(),
                ));
            }
        };
        Ok(payload.map_err(TrackerError::from)?)
    }
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub session_image_id: AssignmentId,
    pub rating_ids: Vec<RatingId>,
    pub last_seen_position: u32,
    pub advanced: bool,
}

impl From<AnswerReceipt> for SubmitResponse {
    fn from(receipt: AnswerReceipt) -> Self {
        Self {
            status: "ok",
            message: receipt.hint(),
            session_image_id: receipt.assignment_id,
            rating_ids: receipt.rating_ids,
            last_seen_position: receipt.last_seen_position,
            advanced: receipt.advanced,
        }
    }
}

/// GET /flow/next_image?session_id=
///
/// Read-only; repeated calls return the same image until it is answered.
pub async fn next_image(
    State(state): State<AppState>,
    CurrentSubject(caller): CurrentSubject,
    Query(query): Query<NextImageQuery>,
) -> ApiResult<Json<NextImageResponse>> {
    let next = state
        .services
        .tracker()
        .next_pending_assignment(caller, SessionId::new(query.session_id))
        .await?;
    Ok(Json(next.into()))
}

/// POST /flow/submit_rating
pub async fn submit_rating(
    State(state): State<AppState>,
    CurrentSubject(caller): CurrentSubject,
    Json(body): Json<SubmitRating>,
) -> ApiResult<Json<SubmitResponse>> {
    let assignment_id = AssignmentId::new(body.session_image_id);
    let session_id = body.session_id.map(SessionId::new);
    let payload = body.payload()?;

    let tracker = state.services.tracker();
    let receipt = match session_id {
        Some(session_id) => {
            tracker
                .record_answer_and_advance(caller, session_id, assignment_id, payload)
                .await?
        }
        None => {
            tracker
                .record_answer_for_assignment(caller, assignment_id, payload)
                .await?
        }
    };
    Ok(Json(receipt.into()))
}

pub fn flow_routes() -> Router<AppState> {
    Router::new()
        .route("/flow/next_image", get(next_image))
        .route("/flow/submit_rating", post(submit_rating))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(json: serde_json::Value) -> SubmitRating {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn flat_fields_become_single_answer() {
        let payload = body(serde_json::json!({
            "session_image_id": 3,
            "question_id": 1,
            "rating_value": 4.0
        }))
        .payload()
        .unwrap();
        assert_eq!(payload.answers().len(), 1);
        assert_eq!(payload.answers()[0].value, Some(4.0));
    }

    #[test]
    fn answers_list_wins_over_flat_fields() {
        let payload = body(serde_json::json!({
            "session_image_id": 3,
            "question_id": 9,
            "answers": [
                {"question_id": 1, "rating_value": 2.0},
                {"question_id": 2, "text_answer": "blurry"}
            ]
        }))
        .payload()
        .unwrap();
        let ids: Vec<_> = payload.answers().iter().map(|a| a.question_id.value()).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn missing_question_is_invalid() {
        let err = body(serde_json::json!({"session_image_id": 3}))
            .payload()
            .unwrap_err();
        assert!(matches!(err, ApiError::Invalid(_)));
    }

    #[test]
    fn complete_serializes_with_status_tag() {
        let json = serde_json::to_value(NextImageResponse::from(NextImage::Complete)).unwrap();
        assert_eq!(json["status"], "complete");
        assert_eq!(json["message"], COMPLETE_MESSAGE);
    }
}
