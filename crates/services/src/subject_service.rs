use std::sync::Arc;

use rating_core::model::{Subject, SubjectDraft, SubjectId};
use storage::repository::{Storage, SubjectRepository};

use crate::Clock;
use crate::caller::Caller;
use crate::error::SubjectServiceError;

/// Participant registration and lookup.
#[derive(Clone)]
pub struct SubjectService {
    clock: Clock,
    subjects: Arc<dyn SubjectRepository>,
}

impl SubjectService {
    #[must_use]
    pub fn new(clock: Clock, subjects: Arc<dyn SubjectRepository>) -> Self {
        Self { clock, subjects }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage) -> Self {
        Self::new(clock, Arc::clone(&storage.subjects))
    }

    /// # Errors
    ///
    /// Returns `SubjectServiceError::Subject` for validation failures.
    /// Returns `SubjectServiceError::Storage` if persistence fails.
    pub async fn register(&self, draft: SubjectDraft) -> Result<Subject, SubjectServiceError> {
        let validated = draft.validate(self.clock.now())?;
        let subject = self.subjects.insert_subject(validated).await?;
        tracing::info!(subject_id = %subject.id, "subject registered");
        Ok(subject)
    }

    /// # Errors
    ///
    /// Returns `SubjectServiceError::NotFound` when the subject does not exist.
    pub async fn get(&self, id: SubjectId) -> Result<Subject, SubjectServiceError> {
        self.subjects
            .get_subject(id)
            .await?
            .ok_or(SubjectServiceError::NotFound(id))
    }

    /// The subject behind the caller identity.
    ///
    /// # Errors
    ///
    /// Returns `SubjectServiceError::NotFound` when the caller's subject is gone.
    pub async fn me(&self, caller: Caller) -> Result<Subject, SubjectServiceError> {
        self.get(caller.subject_id()).await
    }
}
