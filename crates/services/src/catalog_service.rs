use std::sync::Arc;

use rating_core::model::{Image, ImageDraft, ImageId, Question, QuestionDraft, QuestionId};
use storage::repository::{ImageRepository, QuestionRepository, Storage};

use crate::Clock;
use crate::error::CatalogError;

/// Largest page `list_images` will return.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Orchestrates the image and question catalogs.
#[derive(Clone)]
pub struct CatalogService {
    clock: Clock,
    images: Arc<dyn ImageRepository>,
    questions: Arc<dyn QuestionRepository>,
}

impl CatalogService {
    #[must_use]
    pub fn new(
        clock: Clock,
        images: Arc<dyn ImageRepository>,
        questions: Arc<dyn QuestionRepository>,
    ) -> Self {
        Self {
            clock,
            images,
            questions,
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage) -> Self {
        Self::new(
            clock,
            Arc::clone(&storage.images),
            Arc::clone(&storage.questions),
        )
    }

    /// Register an image that already exists on the file server.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Image` for validation failures.
    /// Returns `CatalogError::Storage` if persistence fails.
    pub async fn add_image(&self, draft: ImageDraft) -> Result<Image, CatalogError> {
        let validated = draft.validate(self.clock.now())?;
        let image = self.images.insert_image(validated).await?;
        tracing::info!(image_id = %image.id, file_name = %image.file_name, "image added");
        Ok(image)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::ImageNotFound` when the image does not exist.
    pub async fn get_image(&self, id: ImageId) -> Result<Image, CatalogError> {
        self.images
            .get_image(id)
            .await?
            .ok_or(CatalogError::ImageNotFound(id))
    }

    /// Page through images ordered by id. `limit` is clamped to `1..=MAX_PAGE_SIZE`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if repository access fails.
    pub async fn list_images(&self, skip: u32, limit: u32) -> Result<Vec<Image>, CatalogError> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        Ok(self.images.list_images(skip, limit).await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Question` for validation failures.
    /// Returns `CatalogError::Storage` if persistence fails.
    pub async fn add_question(&self, draft: QuestionDraft) -> Result<Question, CatalogError> {
        let validated = draft.validate(self.clock.now())?;
        let question = self.questions.insert_question(validated).await?;
        tracing::info!(question_id = %question.id, kind = %question.kind, "question added");
        Ok(question)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::QuestionNotFound` when the question does not exist.
    pub async fn get_question(&self, id: QuestionId) -> Result<Question, CatalogError> {
        self.questions
            .get_question(id)
            .await?
            .ok_or(CatalogError::QuestionNotFound(id))
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if repository access fails.
    pub async fn list_questions(&self) -> Result<Vec<Question>, CatalogError> {
        Ok(self.questions.list_questions().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use rating_core::model::QuestionKind;
    use rating_core::time::fixed_clock;

    fn service() -> CatalogService {
        CatalogService::from_storage(fixed_clock(), &Storage::in_memory())
    }

    #[tokio::test]
    async fn page_size_is_clamped() {
        let svc = service();
        for n in 1..=3 {
            svc.add_image(ImageDraft {
                file_name: format!("{n}.jpg"),
                file_path: Some(format!("images/{n}.jpg")),
                description: None,
            })
            .await
            .unwrap();
        }
        assert_eq!(svc.list_images(0, 0).await.unwrap().len(), 1);
        assert_eq!(svc.list_images(1, 1000).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn invalid_question_is_rejected() {
        let svc = service();
        let err = svc
            .add_question(QuestionDraft {
                text: "Quality".into(),
                kind: QuestionKind::Likert,
                min_scale: Some(5),
                max_scale: Some(5),
                step: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);
        assert!(svc.list_questions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_image_is_not_found() {
        let err = service().get_image(ImageId::new(3)).await.unwrap_err();
        assert!(matches!(err, CatalogError::ImageNotFound(id) if id == ImageId::new(3)));
    }
}
