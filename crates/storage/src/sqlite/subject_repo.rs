use rating_core::model::{Subject, SubjectId, ValidatedSubject};

use super::{
    SqliteRepository,
    mapping::{db_err, i64_to_u64, lookup_id, map_subject_row},
};
use crate::repository::{StorageError, SubjectRepository};

#[async_trait::async_trait]
impl SubjectRepository for SqliteRepository {
    async fn insert_subject(&self, subject: ValidatedSubject) -> Result<Subject, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO subjects (name, age, gender, created_at)
                VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(subject.name.as_str())
        .bind(subject.age.map(i64::from))
        .bind(subject.gender.as_deref())
        .bind(subject.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        let id = i64_to_u64("subject_id", res.last_insert_rowid())?;
        Ok(subject.assign_id(SubjectId::new(id)))
    }

    async fn get_subject(&self, id: SubjectId) -> Result<Option<Subject>, StorageError> {
        let Some(key) = lookup_id(id.value()) else {
            return Ok(None);
        };
        let row = sqlx::query(
            r"
                SELECT id, name, age, gender, created_at
                FROM subjects
                WHERE id = ?1
            ",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_subject_row).transpose()
    }
}
