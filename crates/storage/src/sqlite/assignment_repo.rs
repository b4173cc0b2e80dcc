use rating_core::model::{Assignment, AssignmentId, PlannedAssignment, SessionId};

use super::{
    SqliteRepository,
    mapping::{db_err, i64_to_u64, id_i64, lookup_id, map_assigned_image_row, map_assignment_row},
};
use crate::repository::{AssignedImage, AssignmentRepository, StorageError};

#[async_trait::async_trait]
impl AssignmentRepository for SqliteRepository {
    async fn insert_assignments(
        &self,
        session_id: SessionId,
        planned: Vec<PlannedAssignment>,
    ) -> Result<Vec<Assignment>, StorageError> {
        if planned.iter().any(|p| p.session_id != session_id) {
            return Err(StorageError::Conflict);
        }
        let sid = id_i64("session_id", session_id.value())?;

        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // Take the write lock before checking for an existing assignment set.
        let touched = sqlx::query("UPDATE sessions SET id = id WHERE id = ?1")
            .bind(sid)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        if touched.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        let already = sqlx::query("SELECT 1 FROM session_images WHERE session_id = ?1 LIMIT 1")
            .bind(sid)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
        if already.is_some() {
            return Err(StorageError::Conflict);
        }

        let mut created = Vec::with_capacity(planned.len());
        for plan in planned {
            let res = sqlx::query(
                r"
                    INSERT INTO session_images (session_id, image_id, display_order, is_training)
                    VALUES (?1, ?2, ?3, ?4)
                ",
            )
            .bind(sid)
            .bind(id_i64("image_id", plan.image_id.value())?)
            .bind(i64::from(plan.position.value()))
            .bind(plan.is_training)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

            let id = i64_to_u64("session_image_id", res.last_insert_rowid())?;
            created.push(plan.assign_id(AssignmentId::new(id)));
        }

        tx.commit().await.map_err(db_err)?;
        Ok(created)
    }

    async fn get_assignment(&self, id: AssignmentId) -> Result<Option<Assignment>, StorageError> {
        let Some(key) = lookup_id(id.value()) else {
            return Ok(None);
        };
        let row = sqlx::query(
            r"
                SELECT id, session_id, image_id, display_order, is_training
                FROM session_images
                WHERE id = ?1
            ",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_assignment_row).transpose()
    }

    async fn next_after(
        &self,
        session_id: SessionId,
        after: u32,
    ) -> Result<Option<AssignedImage>, StorageError> {
        let Some(key) = lookup_id(session_id.value()) else {
            return Ok(None);
        };
        let row = sqlx::query(
            r"
                SELECT
                    si.id, si.session_id, si.image_id, si.display_order, si.is_training,
                    i.file_name, i.file_path
                FROM session_images si
                JOIN images i ON i.id = si.image_id
                WHERE si.session_id = ?1 AND si.display_order > ?2
                ORDER BY si.display_order ASC
                LIMIT 1
            ",
        )
        .bind(key)
        .bind(i64::from(after))
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_assigned_image_row).transpose()
    }

    async fn assignments_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<AssignedImage>, StorageError> {
        let Some(key) = lookup_id(session_id.value()) else {
            return Ok(Vec::new());
        };
        let rows = sqlx::query(
            r"
                SELECT
                    si.id, si.session_id, si.image_id, si.display_order, si.is_training,
                    i.file_name, i.file_path
                FROM session_images si
                JOIN images i ON i.id = si.image_id
                WHERE si.session_id = ?1
                ORDER BY si.display_order ASC
            ",
        )
        .bind(key)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_assigned_image_row).collect()
    }
}
