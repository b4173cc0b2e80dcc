use chrono::{DateTime, Utc};
use rating_core::model::{Session, SessionId, SessionKind, SubjectId};

use super::{
    SqliteRepository,
    mapping::{db_err, i64_to_u64, id_i64, lookup_id, map_session_row},
};
use crate::repository::{SessionRepository, StorageError};

const SESSION_COLUMNS: &str =
    "id, subject_id, kind, is_completed, last_seen_position, started_at, ended_at";

#[async_trait::async_trait]
impl SessionRepository for SqliteRepository {
    async fn insert_session(
        &self,
        subject_id: SubjectId,
        kind: SessionKind,
        started_at: DateTime<Utc>,
    ) -> Result<Session, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO sessions (subject_id, kind, is_completed, last_seen_position, started_at)
                VALUES (?1, ?2, 0, 0, ?3)
            ",
        )
        .bind(id_i64("subject_id", subject_id.value())?)
        .bind(kind.as_str())
        .bind(started_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        let id = i64_to_u64("session_id", res.last_insert_rowid())?;
        Ok(Session::start(
            SessionId::new(id),
            subject_id,
            kind,
            started_at,
        ))
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<Session>, StorageError> {
        let Some(key) = lookup_id(id.value()) else {
            return Ok(None);
        };
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(map_session_row).transpose()
    }

    async fn sessions_for_subject(
        &self,
        subject_id: SubjectId,
    ) -> Result<Vec<Session>, StorageError> {
        let Some(key) = lookup_id(subject_id.value()) else {
            return Ok(Vec::new());
        };
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE subject_id = ?1 ORDER BY id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(key)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter().map(map_session_row).collect()
    }

    async fn advance_if_greater(
        &self,
        id: SessionId,
        position: u32,
    ) -> Result<bool, StorageError> {
        let session_id = id_i64("session_id", id.value())?;
        let res = sqlx::query(
            r"
                UPDATE sessions
                SET last_seen_position = ?1
                WHERE id = ?2 AND last_seen_position < ?1
            ",
        )
        .bind(i64::from(position))
        .bind(session_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if res.rows_affected() > 0 {
            return Ok(true);
        }
        self.ensure_session_exists(session_id).await?;
        Ok(false)
    }

    async fn mark_complete(&self, id: SessionId, at: DateTime<Utc>) -> Result<bool, StorageError> {
        let session_id = id_i64("session_id", id.value())?;
        let res = sqlx::query(
            r"
                UPDATE sessions
                SET is_completed = 1,
                    ended_at = CASE WHEN started_at > ?1 THEN started_at ELSE ?1 END
                WHERE id = ?2 AND is_completed = 0
            ",
        )
        .bind(at)
        .bind(session_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if res.rows_affected() > 0 {
            return Ok(true);
        }
        self.ensure_session_exists(session_id).await?;
        Ok(false)
    }
}

impl SqliteRepository {
    async fn ensure_session_exists(&self, session_id: i64) -> Result<(), StorageError> {
        sqlx::query("SELECT 1 FROM sessions WHERE id = ?1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }
}
