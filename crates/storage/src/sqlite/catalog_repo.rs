use rating_core::model::{Image, ImageId, Question, QuestionId, ValidatedImage, ValidatedQuestion};
use sqlx::{QueryBuilder, Row, Sqlite};

use super::{
    SqliteRepository,
    mapping::{db_err, i64_to_u64, lookup_id, map_image_row, map_question_row, ser},
};
use crate::repository::{ImageRepository, QuestionRepository, StorageError};

#[async_trait::async_trait]
impl ImageRepository for SqliteRepository {
    async fn insert_image(&self, image: ValidatedImage) -> Result<Image, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO images (file_name, file_path, description, created_at)
                VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(image.file_name.as_str())
        .bind(image.file_path.as_deref())
        .bind(image.description.as_deref())
        .bind(image.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        let id = i64_to_u64("image_id", res.last_insert_rowid())?;
        Ok(image.assign_id(ImageId::new(id)))
    }

    async fn get_image(&self, id: ImageId) -> Result<Option<Image>, StorageError> {
        let Some(key) = lookup_id(id.value()) else {
            return Ok(None);
        };
        let row = sqlx::query(
            r"
                SELECT id, file_name, file_path, description, created_at
                FROM images
                WHERE id = ?1
            ",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_image_row).transpose()
    }

    async fn list_images(&self, offset: u32, limit: u32) -> Result<Vec<Image>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, file_name, file_path, description, created_at
                FROM images
                ORDER BY id ASC
                LIMIT ?1 OFFSET ?2
            ",
        )
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_image_row).collect()
    }

    async fn existing_image_ids(&self, ids: &[ImageId]) -> Result<Vec<ImageId>, StorageError> {
        let keys: Vec<i64> = ids.iter().filter_map(|id| lookup_id(id.value())).collect();
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("SELECT id FROM images WHERE id IN (");
        let mut separated = qb.separated(", ");
        for key in keys {
            separated.push_bind(key);
        }
        separated.push_unseparated(") ORDER BY id ASC");

        let rows = qb.build().fetch_all(&self.pool).await.map_err(db_err)?;
        rows.iter()
            .map(|row| {
                let raw: i64 = row.try_get("id").map_err(ser)?;
                Ok(ImageId::new(i64_to_u64("image_id", raw)?))
            })
            .collect()
    }

    async fn all_image_ids(&self) -> Result<Vec<ImageId>, StorageError> {
        let rows = sqlx::query("SELECT id FROM images ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter()
            .map(|row| {
                let raw: i64 = row.try_get("id").map_err(ser)?;
                Ok(ImageId::new(i64_to_u64("image_id", raw)?))
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn insert_question(
        &self,
        question: ValidatedQuestion,
    ) -> Result<Question, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO questions (text, kind, min_scale, max_scale, step, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(question.text.as_str())
        .bind(question.kind.as_str())
        .bind(question.scale.map(|s| i64::from(s.min())))
        .bind(question.scale.map(|s| i64::from(s.max())))
        .bind(question.scale.map(|s| i64::from(s.step())))
        .bind(question.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        let id = i64_to_u64("question_id", res.last_insert_rowid())?;
        Ok(question.assign_id(QuestionId::new(id)))
    }

    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StorageError> {
        let Some(key) = lookup_id(id.value()) else {
            return Ok(None);
        };
        let row = sqlx::query(
            r"
                SELECT id, text, kind, min_scale, max_scale, step, created_at
                FROM questions
                WHERE id = ?1
            ",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_question_row).transpose()
    }

    async fn list_questions(&self) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, text, kind, min_scale, max_scale, step, created_at
                FROM questions
                ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_question_row).collect()
    }
}
