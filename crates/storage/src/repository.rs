use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rating_core::model::{
    Answer, Assignment, AssignmentId, DisplayPosition, Image, ImageDescriptor, ImageId,
    PlannedAssignment, Question, QuestionId, Rating, RatingId, Session, SessionId, SessionKind,
    Subject, SubjectId, ValidatedImage, ValidatedQuestion, ValidatedSubject,
};
use std::sync::Arc;
use thiserror::Error;

pub use crate::memory::InMemoryRepository;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    /// The session was already complete when the write ran.
    #[error("session is complete")]
    SessionCompleted,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── RECORDS ──────────────────────────────────────────────────────────────────
//

/// An assignment joined with the image it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignedImage {
    pub assignment: Assignment,
    pub image: ImageDescriptor,
}

/// Everything needed to persist the answers for one assignment.
///
/// Subject and image are carried along so rating rows can be denormalized
/// without a second lookup inside the write transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingBatch {
    pub session_id: SessionId,
    pub assignment_id: AssignmentId,
    pub subject_id: SubjectId,
    pub image_id: ImageId,
    pub position: DisplayPosition,
    pub answers: Vec<Answer>,
    pub recorded_at: DateTime<Utc>,
}

impl RatingBatch {
    #[must_use]
    pub fn new(
        session: &Session,
        assignment: &Assignment,
        answers: Vec<Answer>,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id: session.id(),
            assignment_id: assignment.id,
            subject_id: session.subject_id(),
            image_id: assignment.image_id,
            position: assignment.position,
            answers,
            recorded_at,
        }
    }
}

/// Result of an atomic record-and-advance write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    pub rating_ids: Vec<RatingId>,
    pub last_seen_position: u32,
    pub advanced: bool,
}

//
// ─── REPOSITORY CONTRACTS ─────────────────────────────────────────────────────
//

#[async_trait]
pub trait SubjectRepository: Send + Sync {
    /// Persist a new subject and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the subject cannot be stored.
    async fn insert_subject(&self, subject: ValidatedSubject) -> Result<Subject, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn get_subject(&self, id: SubjectId) -> Result<Option<Subject>, StorageError>;
}

#[async_trait]
pub trait ImageRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the image cannot be stored.
    async fn insert_image(&self, image: ValidatedImage) -> Result<Image, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn get_image(&self, id: ImageId) -> Result<Option<Image>, StorageError>;

    /// Images ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn list_images(&self, offset: u32, limit: u32) -> Result<Vec<Image>, StorageError>;

    /// The subset of `ids` that exist, in ascending id order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn existing_image_ids(&self, ids: &[ImageId]) -> Result<Vec<ImageId>, StorageError>;

    /// Every image id in the catalog.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn all_image_ids(&self) -> Result<Vec<ImageId>, StorageError>;
}

#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn insert_question(
        &self,
        question: ValidatedQuestion,
    ) -> Result<Question, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn list_questions(&self) -> Result<Vec<Question>, StorageError>;
}

/// Session rows: read, create, and the two monotonic mutations.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the subject does not exist.
    async fn insert_session(
        &self,
        subject_id: SubjectId,
        kind: SessionKind,
        started_at: DateTime<Utc>,
    ) -> Result<Session, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn get_session(&self, id: SessionId) -> Result<Option<Session>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn sessions_for_subject(
        &self,
        subject_id: SubjectId,
    ) -> Result<Vec<Session>, StorageError>;

    /// Set `last_seen_position = position` only when it is currently lower.
    ///
    /// Returns whether the row changed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the session does not exist.
    async fn advance_if_greater(
        &self,
        id: SessionId,
        position: u32,
    ) -> Result<bool, StorageError>;

    /// Flip the completion flag and stamp `ended_at`, once.
    ///
    /// Returns `true` only for the call that performed the transition.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the session does not exist.
    async fn mark_complete(&self, id: SessionId, at: DateTime<Utc>) -> Result<bool, StorageError>;
}

/// Ordered session-image assignments. Read-only once created.
#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    /// Insert a whole assignment set for a session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the session already has assignments,
    /// `StorageError::NotFound` if the session or an image is missing.
    async fn insert_assignments(
        &self,
        session_id: SessionId,
        planned: Vec<PlannedAssignment>,
    ) -> Result<Vec<Assignment>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn get_assignment(&self, id: AssignmentId) -> Result<Option<Assignment>, StorageError>;

    /// The assignment with the smallest position strictly greater than `after`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn next_after(
        &self,
        session_id: SessionId,
        after: u32,
    ) -> Result<Option<AssignedImage>, StorageError>;

    /// All assignments of a session in display order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn assignments_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<AssignedImage>, StorageError>;
}

/// Insert-only rating store with a uniqueness guarantee on (assignment, question).
#[async_trait]
pub trait RatingRepository: Send + Sync {
    /// Insert every answer of the batch and advance the session cursor, atomically.
    ///
    /// The cursor moves to `batch.position` only if that is greater than the
    /// stored value. Nothing is written if the session is complete or any
    /// answer collides with an existing rating.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when a rating for the same
    /// (assignment, question) already exists and
    /// `StorageError::SessionCompleted` when the session is already complete.
    async fn record_answers(&self, batch: RatingBatch) -> Result<RecordOutcome, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn rating_exists(
        &self,
        assignment_id: AssignmentId,
        question_id: QuestionId,
    ) -> Result<bool, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn get_rating(&self, id: RatingId) -> Result<Option<Rating>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn ratings_for_assignment(
        &self,
        assignment_id: AssignmentId,
    ) -> Result<Vec<Rating>, StorageError>;
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub subjects: Arc<dyn SubjectRepository>,
    pub images: Arc<dyn ImageRepository>,
    pub questions: Arc<dyn QuestionRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub assignments: Arc<dyn AssignmentRepository>,
    pub ratings: Arc<dyn RatingRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_backend(InMemoryRepository::new())
    }

    /// Wire every repository to the same backend value.
    pub fn from_backend<R>(repo: R) -> Self
    where
        R: SubjectRepository
            + ImageRepository
            + QuestionRepository
            + SessionRepository
            + AssignmentRepository
            + RatingRepository
            + Clone
            + 'static,
    {
        Self {
            subjects: Arc::new(repo.clone()),
            images: Arc::new(repo.clone()),
            questions: Arc::new(repo.clone()),
            sessions: Arc::new(repo.clone()),
            assignments: Arc::new(repo.clone()),
            ratings: Arc::new(repo),
        }
    }
}
