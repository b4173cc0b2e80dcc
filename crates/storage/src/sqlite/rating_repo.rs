use rating_core::model::{AssignmentId, QuestionId, Rating, RatingId};
use sqlx::Row;

use super::{
    SqliteRepository,
    mapping::{db_err, i64_to_u64, id_i64, lookup_id, map_rating_row, ser},
};
use crate::repository::{RatingBatch, RatingRepository, RecordOutcome, StorageError};

const RATING_COLUMNS: &str = "id, session_image_id, session_id, question_id, subject_id, \
     image_id, display_order, rating_value, text_answer, response_time, created_at";

#[async_trait::async_trait]
impl RatingRepository for SqliteRepository {
    async fn record_answers(&self, batch: RatingBatch) -> Result<RecordOutcome, StorageError> {
        let session_id = id_i64("session_id", batch.session_id.value())?;
        let assignment_id = id_i64("session_image_id", batch.assignment_id.value())?;
        let subject_id = id_i64("subject_id", batch.subject_id.value())?;
        let image_id = id_i64("image_id", batch.image_id.value())?;
        let position = i64::from(batch.position.value());

        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // Lock the session row while it is still open. A completed session takes no answers.
        let open = sqlx::query("UPDATE sessions SET id = id WHERE id = ?1 AND is_completed = 0")
            .bind(session_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?
            .rows_affected()
            > 0;
        if !open {
            let exists = sqlx::query("SELECT 1 FROM sessions WHERE id = ?1")
                .bind(session_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_err)?
                .is_some();
            return Err(if exists {
                StorageError::SessionCompleted
            } else {
                StorageError::NotFound
            });
        }

        // Dropping `tx` on an early return rolls back every insert so far.
        let mut rating_ids = Vec::with_capacity(batch.answers.len());
        for answer in &batch.answers {
            let res = sqlx::query(
                r"
                    INSERT INTO ratings (
                        session_image_id, session_id, question_id, subject_id, image_id,
                        display_order, rating_value, text_answer, response_time, created_at
                    )
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                ",
            )
            .bind(assignment_id)
            .bind(session_id)
            .bind(id_i64("question_id", answer.question_id.value())?)
            .bind(subject_id)
            .bind(image_id)
            .bind(position)
            .bind(answer.value)
            .bind(answer.text.as_deref())
            .bind(answer.response_time)
            .bind(batch.recorded_at)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

            rating_ids.push(RatingId::new(i64_to_u64("rating_id", res.last_insert_rowid())?));
        }

        let advanced = sqlx::query(
            r"
                UPDATE sessions
                SET last_seen_position = ?1
                WHERE id = ?2 AND last_seen_position < ?1
            ",
        )
        .bind(position)
        .bind(session_id)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?
        .rows_affected()
            > 0;

        let row = sqlx::query("SELECT last_seen_position FROM sessions WHERE id = ?1")
            .bind(session_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?
            .ok_or(StorageError::NotFound)?;
        let last_seen: i64 = row.try_get("last_seen_position").map_err(ser)?;

        tx.commit().await.map_err(db_err)?;

        tracing::debug!(
            session_id,
            session_image_id = assignment_id,
            answers = rating_ids.len(),
            advanced,
            "ratings stored"
        );

        Ok(RecordOutcome {
            rating_ids,
            last_seen_position: u32::try_from(last_seen).map_err(ser)?,
            advanced,
        })
    }

    async fn rating_exists(
        &self,
        assignment_id: AssignmentId,
        question_id: QuestionId,
    ) -> Result<bool, StorageError> {
        let (Some(assignment_key), Some(question_key)) =
            (lookup_id(assignment_id.value()), lookup_id(question_id.value()))
        else {
            return Ok(false);
        };
        let row = sqlx::query(
            r"
                SELECT 1 FROM ratings
                WHERE session_image_id = ?1 AND question_id = ?2
            ",
        )
        .bind(assignment_key)
        .bind(question_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.is_some())
    }

    async fn get_rating(&self, id: RatingId) -> Result<Option<Rating>, StorageError> {
        let Some(key) = lookup_id(id.value()) else {
            return Ok(None);
        };
        let sql = format!("SELECT {RATING_COLUMNS} FROM ratings WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(map_rating_row).transpose()
    }

    async fn ratings_for_assignment(
        &self,
        assignment_id: AssignmentId,
    ) -> Result<Vec<Rating>, StorageError> {
        let Some(key) = lookup_id(assignment_id.value()) else {
            return Ok(Vec::new());
        };
        let sql = format!(
            "SELECT {RATING_COLUMNS} FROM ratings WHERE session_image_id = ?1 ORDER BY id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(key)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter().map(map_rating_row).collect()
    }
}
