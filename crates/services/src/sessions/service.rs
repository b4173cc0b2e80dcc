use std::collections::BTreeSet;
use std::sync::Arc;

use rating_core::model::{ImageId, Session, SessionId, SessionKind, SubjectId, plan_assignments};
use storage::repository::{
    AssignedImage, AssignmentRepository, ImageRepository, SessionRepository, Storage,
    StorageError, SubjectRepository,
};

use super::plan::ImageOrder;
use super::progress::SessionProgress;
use crate::Clock;
use crate::caller::Caller;
use crate::error::SessionServiceError;

/// Images picked from the catalog when an assignment request names none.
pub const DEFAULT_ASSIGN_BATCH: usize = 10;

/// Session lifecycle: creation, image assignment, manual completion and progress.
#[derive(Clone)]
pub struct SessionService {
    clock: Clock,
    subjects: Arc<dyn SubjectRepository>,
    images: Arc<dyn ImageRepository>,
    sessions: Arc<dyn SessionRepository>,
    assignments: Arc<dyn AssignmentRepository>,
    default_batch: usize,
    shuffle: bool,
}

impl SessionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        subjects: Arc<dyn SubjectRepository>,
        images: Arc<dyn ImageRepository>,
        sessions: Arc<dyn SessionRepository>,
        assignments: Arc<dyn AssignmentRepository>,
    ) -> Self {
        Self {
            clock,
            subjects,
            images,
            sessions,
            assignments,
            default_batch: DEFAULT_ASSIGN_BATCH,
            shuffle: true,
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage) -> Self {
        Self::new(
            clock,
            Arc::clone(&storage.subjects),
            Arc::clone(&storage.images),
            Arc::clone(&storage.sessions),
            Arc::clone(&storage.assignments),
        )
    }

    #[must_use]
    pub fn with_default_batch(mut self, batch: usize) -> Self {
        self.default_batch = batch.max(1);
        self
    }

    /// Enable or disable shuffling of assigned images.
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Start a session for the calling subject.
    ///
    /// # Errors
    ///
    /// Returns `SessionServiceError::NotCaller` when `subject_id` is not the
    /// caller, `SessionServiceError::SubjectNotFound` when the subject is gone.
    pub async fn create_session(
        &self,
        caller: Caller,
        subject_id: SubjectId,
        kind: SessionKind,
    ) -> Result<Session, SessionServiceError> {
        if caller.subject_id() != subject_id {
            return Err(SessionServiceError::NotCaller);
        }
        if self.subjects.get_subject(subject_id).await?.is_none() {
            return Err(SessionServiceError::SubjectNotFound(subject_id));
        }

        let session = self
            .sessions
            .insert_session(subject_id, kind, self.clock.now())
            .await
            .map_err(|e| match e {
                StorageError::NotFound => SessionServiceError::SubjectNotFound(subject_id),
                other => other.into(),
            })?;
        tracing::info!(
            session_id = %session.id(),
            %subject_id,
            kind = %kind,
            "session started"
        );
        Ok(session)
    }

    /// # Errors
    ///
    /// Returns `SessionServiceError::SessionNotFound` or
    /// `SessionServiceError::Forbidden`.
    pub async fn get_session(
        &self,
        caller: Caller,
        session_id: SessionId,
    ) -> Result<Session, SessionServiceError> {
        self.owned_session(caller, session_id).await
    }

    /// Sessions started by the caller, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `SessionServiceError::Storage` if repository access fails.
    pub async fn list_sessions(&self, caller: Caller) -> Result<Vec<Session>, SessionServiceError> {
        Ok(self.sessions.sessions_for_subject(caller.subject_id()).await?)
    }

    /// Mark a session complete regardless of its cursor. Completing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `SessionServiceError::SessionNotFound` or
    /// `SessionServiceError::Forbidden`.
    pub async fn complete_session(
        &self,
        caller: Caller,
        session_id: SessionId,
    ) -> Result<Session, SessionServiceError> {
        self.owned_session(caller, session_id).await?;
        if self.sessions.mark_complete(session_id, self.clock.now()).await? {
            tracing::info!(%session_id, "session completed manually");
        }
        self.owned_session(caller, session_id).await
    }

    /// Attach an ordered set of images to a session.
    ///
    /// An empty `image_ids` picks up to the default batch at random from the
    /// catalog. The chosen images are shuffled and numbered from 1.
    ///
    /// # Errors
    ///
    /// Returns `SessionServiceError::AlreadyAssigned` when the session already
    /// has images, `SessionServiceError::MissingImages` for unknown ids,
    /// `SessionServiceError::SessionCompleted` for finished sessions and
    /// `SessionServiceError::EmptyCatalog` when there is nothing to pick from.
    pub async fn assign_images(
        &self,
        caller: Caller,
        session_id: SessionId,
        image_ids: Vec<ImageId>,
    ) -> Result<Vec<AssignedImage>, SessionServiceError> {
        let session = self.owned_session(caller, session_id).await?;
        if session.is_completed() {
            return Err(SessionServiceError::SessionCompleted(session_id));
        }
        if !self
            .assignments
            .assignments_for_session(session_id)
            .await?
            .is_empty()
        {
            return Err(SessionServiceError::AlreadyAssigned(session_id));
        }

        let order = ImageOrder::new(self.shuffle);
        let chosen = if image_ids.is_empty() {
            let catalog = self.images.all_image_ids().await?;
            if catalog.is_empty() {
                return Err(SessionServiceError::EmptyCatalog);
            }
            order.sample(catalog, self.default_batch)
        } else {
            self.ensure_images_exist(&image_ids).await?;
            order.arrange(image_ids)
        };

        let plan = plan_assignments(&session, &chosen)?;
        self.assignments
            .insert_assignments(session_id, plan)
            .await
            .map_err(|e| match e {
                StorageError::Conflict => SessionServiceError::AlreadyAssigned(session_id),
                other => other.into(),
            })?;
        tracing::info!(%session_id, images = chosen.len(), "images assigned");

        Ok(self.assignments.assignments_for_session(session_id).await?)
    }

    /// # Errors
    ///
    /// Returns `SessionServiceError::SessionNotFound` or
    /// `SessionServiceError::Forbidden`.
    pub async fn list_assignments(
        &self,
        caller: Caller,
        session_id: SessionId,
    ) -> Result<Vec<AssignedImage>, SessionServiceError> {
        self.owned_session(caller, session_id).await?;
        Ok(self.assignments.assignments_for_session(session_id).await?)
    }

    /// # Errors
    ///
    /// Returns `SessionServiceError::SessionNotFound` or
    /// `SessionServiceError::Forbidden`.
    pub async fn progress(
        &self,
        caller: Caller,
        session_id: SessionId,
    ) -> Result<SessionProgress, SessionServiceError> {
        let session = self.owned_session(caller, session_id).await?;
        let assigned = self.assignments.assignments_for_session(session_id).await?;
        Ok(SessionProgress::from_assignments(
            &assigned,
            session.last_seen_position(),
            session.is_completed(),
        ))
    }

    async fn ensure_images_exist(&self, requested: &[ImageId]) -> Result<(), SessionServiceError> {
        let found: BTreeSet<ImageId> = self
            .images
            .existing_image_ids(requested)
            .await?
            .into_iter()
            .collect();
        let mut missing: Vec<ImageId> = requested
            .iter()
            .copied()
            .filter(|id| !found.contains(id))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        missing.sort();
        missing.dedup();
        Err(SessionServiceError::MissingImages(missing))
    }

    async fn owned_session(
        &self,
        caller: Caller,
        session_id: SessionId,
    ) -> Result<Session, SessionServiceError> {
        let session = self
            .sessions
            .get_session(session_id)
            .await?
            .ok_or(SessionServiceError::SessionNotFound(session_id))?;
        if !caller.owns(&session) {
            tracing::warn!(%session_id, caller = %caller.subject_id(), "session access denied");
            return Err(SessionServiceError::Forbidden(session_id));
        }
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use rating_core::model::{ImageDraft, SubjectDraft};
    use rating_core::time::{fixed_clock, fixed_now};

    async fn setup(images: u64) -> (Storage, SessionService, Caller) {
        let storage = Storage::in_memory();
        let subject = storage
            .subjects
            .insert_subject(
                SubjectDraft {
                    name: "P1".into(),
                    age: Some(25),
                    gender: None,
                }
                .validate(fixed_now())
                .unwrap(),
            )
            .await
            .unwrap();
        for n in 1..=images {
            storage
                .images
                .insert_image(
                    ImageDraft {
                        file_name: format!("{n}.jpg"),
                        file_path: None,
                        description: None,
                    }
                    .validate(fixed_now())
                    .unwrap(),
                )
                .await
                .unwrap();
        }
        let service = SessionService::from_storage(fixed_clock(), &storage);
        (storage, service, Caller::new(subject.id))
    }

    #[tokio::test]
    async fn sessions_are_created_only_for_the_caller() {
        let (_storage, service, caller) = setup(0).await;
        let err = service
            .create_session(caller, SubjectId::new(42), SessionKind::Real)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let session = service
            .create_session(caller, caller.subject_id(), SessionKind::Training)
            .await
            .unwrap();
        assert_eq!(session.kind(), SessionKind::Training);
        assert_eq!(session.last_seen_position(), 0);
        assert_eq!(service.list_sessions(caller).await.unwrap(), vec![session]);
    }

    #[tokio::test]
    async fn empty_selection_samples_default_batch() {
        let (_storage, service, caller) = setup(15).await;
        let session = service
            .create_session(caller, caller.subject_id(), SessionKind::Real)
            .await
            .unwrap();

        let assigned = service
            .assign_images(caller, session.id(), Vec::new())
            .await
            .unwrap();
        let positions: Vec<u32> = assigned
            .iter()
            .map(|a| a.assignment.position.value())
            .collect();
        assert_eq!(positions, (1..=10).collect::<Vec<_>>());
        assert!(assigned.iter().all(|a| !a.assignment.is_training));
    }

    #[tokio::test]
    async fn explicit_selection_keeps_order_without_shuffle() {
        let (_storage, service, caller) = setup(3).await;
        let service = service.with_shuffle(false);
        let session = service
            .create_session(caller, caller.subject_id(), SessionKind::Training)
            .await
            .unwrap();
        let picked = vec![ImageId::new(3), ImageId::new(1)];

        let assigned = service
            .assign_images(caller, session.id(), picked.clone())
            .await
            .unwrap();
        let order: Vec<ImageId> = assigned.iter().map(|a| a.image.id).collect();
        assert_eq!(order, picked);
        assert!(assigned.iter().all(|a| a.assignment.is_training));

        let err = service
            .assign_images(caller, session.id(), vec![ImageId::new(2)])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn unknown_images_are_listed() {
        let (_storage, service, caller) = setup(2).await;
        let session = service
            .create_session(caller, caller.subject_id(), SessionKind::Real)
            .await
            .unwrap();
        let err = service
            .assign_images(
                caller,
                session.id(),
                vec![ImageId::new(1), ImageId::new(8), ImageId::new(5)],
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SessionServiceError::MissingImages(ref ids) if ids == &[ImageId::new(5), ImageId::new(8)]
        ));
    }

    #[tokio::test]
    async fn manual_completion_is_idempotent() {
        let (storage, service, caller) = setup(1).await;
        let session = service
            .create_session(caller, caller.subject_id(), SessionKind::Real)
            .await
            .unwrap();
        service
            .assign_images(caller, session.id(), Vec::new())
            .await
            .unwrap();
        storage
            .sessions
            .advance_if_greater(session.id(), 1)
            .await
            .unwrap();

        let done = service.complete_session(caller, session.id()).await.unwrap();
        assert!(done.is_completed());
        let again = service.complete_session(caller, session.id()).await.unwrap();
        assert_eq!(done, again);

        let progress = service.progress(caller, session.id()).await.unwrap();
        assert_eq!(
            progress,
            SessionProgress {
                total: 1,
                answered: 1,
                remaining: 0,
                last_seen_position: 1,
                is_complete: true,
            }
        );
    }

    #[tokio::test]
    async fn completed_session_cannot_take_images() {
        let (_storage, service, caller) = setup(1).await;
        let session = service
            .create_session(caller, caller.subject_id(), SessionKind::Real)
            .await
            .unwrap();
        service.complete_session(caller, session.id()).await.unwrap();
        let err = service
            .assign_images(caller, session.id(), Vec::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }
}
