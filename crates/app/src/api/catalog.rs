use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use rating_core::model::{
    Image, ImageDraft, ImageId, Question, QuestionDraft, QuestionId, QuestionKind,
};
use serde::{Deserialize, Serialize};
use services::{CatalogError, MAX_PAGE_SIZE};

use super::{ApiResult, CurrentSubject};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateImage {
    pub file_name: String,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListImagesQuery {
    #[serde(default)]
    pub skip: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    MAX_PAGE_SIZE
}

#[derive(Debug, Serialize)]
pub struct ImageResponse {
    pub id: ImageId,
    pub file_name: String,
    pub file_path: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Image> for ImageResponse {
    fn from(i: Image) -> Self {
        Self {
            id: i.id,
            file_name: i.file_name,
            file_path: i.file_path,
            description: i.description,
            created_at: i.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateQuestion {
    pub text: String,
    pub question_type: String,
    #[serde(default)]
    pub min_scale: Option<i32>,
    #[serde(default)]
    pub max_scale: Option<i32>,
    #[serde(default)]
    pub step: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct QuestionResponse {
    pub id: QuestionId,
    pub text: String,
    pub question_type: &'static str,
    pub min_scale: Option<i32>,
    pub max_scale: Option<i32>,
    pub step: Option<u32>,
    pub created_at: DateTime<Utc>,
}

impl From<Question> for QuestionResponse {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            question_type: q.kind.as_str(),
            min_scale: q.scale.map(|s| s.min()),
            max_scale: q.scale.map(|s| s.max()),
            step: q.scale.map(|s| s.step()),
            text: q.text,
            created_at: q.created_at,
        }
    }
}

/// POST /images
pub async fn add_image(
    State(state): State<AppState>,
    CurrentSubject(_caller): CurrentSubject,
    Json(body): Json<CreateImage>,
) -> ApiResult<(StatusCode, Json<ImageResponse>)> {
    let image = state
        .services
        .catalog()
        .add_image(ImageDraft {
            file_name: body.file_name,
            file_path: body.file_path,
            description: body.description,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(image.into())))
}

/// GET /images?skip&limit
pub async fn list_images(
    State(state): State<AppState>,
    CurrentSubject(_caller): CurrentSubject,
    Query(query): Query<ListImagesQuery>,
) -> ApiResult<Json<Vec<ImageResponse>>> {
    let images = state
        .services
        .catalog()
        .list_images(query.skip, query.limit)
        .await?;
    Ok(Json(images.into_iter().map(ImageResponse::from).collect()))
}

/// GET /images/:id
pub async fn get_image(
    State(state): State<AppState>,
    CurrentSubject(_caller): CurrentSubject,
    Path(id): Path<u64>,
) -> ApiResult<Json<ImageResponse>> {
    let image = state.services.catalog().get_image(ImageId::new(id)).await?;
    Ok(Json(image.into()))
}

/// POST /questions
pub async fn add_question(
    State(state): State<AppState>,
    CurrentSubject(_caller): CurrentSubject,
    Json(body): Json<CreateQuestion>,
) -> ApiResult<(StatusCode, Json<QuestionResponse>)> {
    let kind = QuestionKind::parse(&body.question_type).map_err(CatalogError::from)?;
    let question = state
        .services
        .catalog()
        .add_question(QuestionDraft {
            text: body.text,
            kind,
            min_scale: body.min_scale,
            max_scale: body.max_scale,
            step: body.step,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(question.into())))
}

/// GET /questions
pub async fn list_questions(
    State(state): State<AppState>,
    CurrentSubject(_caller): CurrentSubject,
) -> ApiResult<Json<Vec<QuestionResponse>>> {
    let questions = state.services.catalog().list_questions().await?;
    Ok(Json(questions.into_iter().map(QuestionResponse::from).collect()))
}

/// GET /questions/:id
pub async fn get_question(
    State(state): State<AppState>,
    CurrentSubject(_caller): CurrentSubject,
    Path(id): Path<u64>,
) -> ApiResult<Json<QuestionResponse>> {
    let question = state
        .services
        .catalog()
        .get_question(QuestionId::new(id))
        .await?;
    Ok(Json(question.into()))
}

pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/images", post(add_image).get(list_images))
        .route("/images/:id", get(get_image))
        .route("/questions", post(add_question).get(list_questions))
        .route("/questions/:id", get(get_question))
}
