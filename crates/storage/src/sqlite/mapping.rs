use chrono::{DateTime, Utc};
use rating_core::model::{
    Assignment, AssignmentId, DisplayPosition, Image, ImageDescriptor, ImageId, LikertScale,
    Question, QuestionId, QuestionKind, Rating, RatingId, Session, SessionId, SessionKind,
    Subject, SubjectId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::{AssignedImage, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Classify a driver error: constraint violations become domain-level
/// `Conflict`/`NotFound`, everything else is a connection problem.
pub(crate) fn db_err(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::RowNotFound => StorageError::NotFound,
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => StorageError::NotFound,
        _ => StorageError::Connection(e.to_string()),
    }
}

/// Row ids are positive `i64`s, so a larger id cannot name a stored row.
pub(crate) fn lookup_id(v: u64) -> Option<i64> {
    i64::try_from(v).ok()
}

/// Like [`lookup_id`] for paths that must fail: an unrepresentable id is `NotFound`.
pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    lookup_id(v).ok_or_else(|| {
        tracing::debug!(field, id = v, "id outside the stored range");
        StorageError::NotFound
    })
}

pub(crate) fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn i32_from_i64(field: &'static str, v: i64) -> Result<i32, StorageError> {
    i32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn row_id(row: &SqliteRow, column: &'static str) -> Result<u64, StorageError> {
    i64_to_u64(column, row.try_get::<i64, _>(column).map_err(ser)?)
}

fn position(row: &SqliteRow, column: &'static str) -> Result<DisplayPosition, StorageError> {
    let raw = u32_from_i64(column, row.try_get::<i64, _>(column).map_err(ser)?)?;
    DisplayPosition::new(raw).map_err(ser)
}

pub(crate) fn map_subject_row(row: &SqliteRow) -> Result<Subject, StorageError> {
    let age = row
        .try_get::<Option<i64>, _>("age")
        .map_err(ser)?
        .map(|a| u32_from_i64("age", a))
        .transpose()?;
    Ok(Subject {
        id: SubjectId::new(row_id(row, "id")?),
        name: row.try_get("name").map_err(ser)?,
        age,
        gender: row.try_get("gender").map_err(ser)?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

pub(crate) fn map_image_row(row: &SqliteRow) -> Result<Image, StorageError> {
    Ok(Image {
        id: ImageId::new(row_id(row, "id")?),
        file_name: row.try_get("file_name").map_err(ser)?,
        file_path: row.try_get("file_path").map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

pub(crate) fn map_question_row(row: &SqliteRow) -> Result<Question, StorageError> {
    let kind_str: String = row.try_get("kind").map_err(ser)?;
    let kind = QuestionKind::parse(&kind_str).map_err(ser)?;

    let min = row.try_get::<Option<i64>, _>("min_scale").map_err(ser)?;
    let max = row.try_get::<Option<i64>, _>("max_scale").map_err(ser)?;
    let step = row.try_get::<Option<i64>, _>("step").map_err(ser)?;
    let scale = match (kind, min, max) {
        (QuestionKind::Likert, Some(min), Some(max)) => {
            let step = step.map(|s| u32_from_i64("step", s)).transpose()?;
            Some(
                LikertScale::new(
                    i32_from_i64("min_scale", min)?,
                    i32_from_i64("max_scale", max)?,
                    step.unwrap_or(1),
                )
                .map_err(ser)?,
            )
        }
        _ => None,
    };

    Ok(Question {
        id: QuestionId::new(row_id(row, "id")?),
        text: row.try_get("text").map_err(ser)?,
        kind,
        scale,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

pub(crate) fn map_session_row(row: &SqliteRow) -> Result<Session, StorageError> {
    let kind_str: String = row.try_get("kind").map_err(ser)?;
    let ended_at: Option<DateTime<Utc>> = row.try_get("ended_at").map_err(ser)?;
    Session::from_persisted(
        SessionId::new(row_id(row, "id")?),
        SubjectId::new(row_id(row, "subject_id")?),
        SessionKind::parse(&kind_str).map_err(ser)?,
        row.try_get::<bool, _>("is_completed").map_err(ser)?,
        u32_from_i64(
            "last_seen_position",
            row.try_get::<i64, _>("last_seen_position").map_err(ser)?,
        )?,
        row.try_get("started_at").map_err(ser)?,
        ended_at,
    )
    .map_err(ser)
}

pub(crate) fn map_assignment_row(row: &SqliteRow) -> Result<Assignment, StorageError> {
    Ok(Assignment {
        id: AssignmentId::new(row_id(row, "id")?),
        session_id: SessionId::new(row_id(row, "session_id")?),
        image_id: ImageId::new(row_id(row, "image_id")?),
        position: position(row, "display_order")?,
        is_training: row.try_get::<bool, _>("is_training").map_err(ser)?,
    })
}

/// Expects the assignment columns plus `file_name` and `file_path` from the
/// joined image row.
pub(crate) fn map_assigned_image_row(row: &SqliteRow) -> Result<AssignedImage, StorageError> {
    let assignment = map_assignment_row(row)?;
    let image = ImageDescriptor {
        id: assignment.image_id,
        file_name: row.try_get("file_name").map_err(ser)?,
        file_path: row.try_get("file_path").map_err(ser)?,
    };
    Ok(AssignedImage { assignment, image })
}

pub(crate) fn map_rating_row(row: &SqliteRow) -> Result<Rating, StorageError> {
    Ok(Rating {
        id: RatingId::new(row_id(row, "id")?),
        assignment_id: AssignmentId::new(row_id(row, "session_image_id")?),
        session_id: SessionId::new(row_id(row, "session_id")?),
        question_id: QuestionId::new(row_id(row, "question_id")?),
        subject_id: SubjectId::new(row_id(row, "subject_id")?),
        image_id: ImageId::new(row_id(row, "image_id")?),
        position: position(row, "display_order")?,
        value: row.try_get("rating_value").map_err(ser)?,
        text: row.try_get("text_answer").map_err(ser)?,
        response_time: row.try_get("response_time").map_err(ser)?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}
