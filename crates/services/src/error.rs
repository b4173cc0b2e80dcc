//! Shared error types for the services crate.

use std::fmt;

use thiserror::Error;

use rating_core::model::{
    AnswerError, AssignmentError, AssignmentId, ImageError, ImageId, QuestionError, QuestionId,
    RatingId, SessionError as SessionModelError, SessionId, SubjectError, SubjectId,
};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Stable classification every service error maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    Conflict,
    InvalidState,
    Invalid,
    Internal,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::InvalidState => "INVALID_STATE",
            ErrorKind::Invalid => "INVALID",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn storage_kind(err: &StorageError) -> ErrorKind {
    match err {
        StorageError::NotFound => ErrorKind::NotFound,
        StorageError::Conflict => ErrorKind::Conflict,
        StorageError::SessionCompleted => ErrorKind::InvalidState,
        _ => ErrorKind::Internal,
    }
}

/// Errors emitted by `ProgressTracker`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TrackerError {
    #[error("session {0} not found")]
    SessionNotFound(SessionId),
    #[error("session image {0} not found")]
    AssignmentNotFound(AssignmentId),
    #[error("session image {assignment_id} does not belong to session {session_id}")]
    AssignmentNotInSession {
        assignment_id: AssignmentId,
        session_id: SessionId,
    },
    #[error("session {0} belongs to another subject")]
    Forbidden(SessionId),
    #[error("session {0} is already completed")]
    SessionCompleted(SessionId),
    #[error("question {0} not found")]
    QuestionNotFound(QuestionId),
    #[error(transparent)]
    Answer(#[from] AnswerError),
    #[error("question {question_id} was already answered for session image {assignment_id}")]
    Duplicate {
        assignment_id: AssignmentId,
        question_id: QuestionId,
    },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl TrackerError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            TrackerError::SessionNotFound(_)
            | TrackerError::AssignmentNotFound(_)
            | TrackerError::AssignmentNotInSession { .. }
            | TrackerError::QuestionNotFound(_) => ErrorKind::NotFound,
            TrackerError::Forbidden(_) => ErrorKind::Forbidden,
            TrackerError::SessionCompleted(_) => ErrorKind::InvalidState,
            TrackerError::Answer(_) => ErrorKind::Invalid,
            TrackerError::Duplicate { .. } => ErrorKind::Conflict,
            TrackerError::Storage(e) => storage_kind(e),
        }
    }
}

/// Errors emitted by `SessionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionServiceError {
    #[error("subject {0} not found")]
    SubjectNotFound(SubjectId),
    #[error("session {0} not found")]
    SessionNotFound(SessionId),
    #[error("session {0} belongs to another subject")]
    Forbidden(SessionId),
    #[error("sessions can only be created for the calling subject")]
    NotCaller,
    #[error("session {0} is already completed")]
    SessionCompleted(SessionId),
    #[error("session {0} already has images assigned")]
    AlreadyAssigned(SessionId),
    #[error("images not found: {0:?}")]
    MissingImages(Vec<ImageId>),
    #[error("the image catalog is empty")]
    EmptyCatalog,
    #[error(transparent)]
    Session(#[from] SessionModelError),
    #[error(transparent)]
    Assignment(#[from] AssignmentError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SessionServiceError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionServiceError::SubjectNotFound(_)
            | SessionServiceError::SessionNotFound(_)
            | SessionServiceError::MissingImages(_) => ErrorKind::NotFound,
            SessionServiceError::Forbidden(_) | SessionServiceError::NotCaller => {
                ErrorKind::Forbidden
            }
            SessionServiceError::SessionCompleted(_) | SessionServiceError::EmptyCatalog => {
                ErrorKind::InvalidState
            }
            SessionServiceError::AlreadyAssigned(_) => ErrorKind::Conflict,
            SessionServiceError::Session(_) | SessionServiceError::Assignment(_) => {
                ErrorKind::Invalid
            }
            SessionServiceError::Storage(e) => storage_kind(e),
        }
    }
}

/// Errors emitted by `CatalogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("image {0} not found")]
    ImageNotFound(ImageId),
    #[error("question {0} not found")]
    QuestionNotFound(QuestionId),
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl CatalogError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::ImageNotFound(_) | CatalogError::QuestionNotFound(_) => {
                ErrorKind::NotFound
            }
            CatalogError::Image(_) | CatalogError::Question(_) => ErrorKind::Invalid,
            CatalogError::Storage(e) => storage_kind(e),
        }
    }
}

/// Errors emitted by `SubjectService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SubjectServiceError {
    #[error("subject {0} not found")]
    NotFound(SubjectId),
    #[error(transparent)]
    Subject(#[from] SubjectError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SubjectServiceError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            SubjectServiceError::NotFound(_) => ErrorKind::NotFound,
            SubjectServiceError::Subject(_) => ErrorKind::Invalid,
            SubjectServiceError::Storage(e) => storage_kind(e),
        }
    }
}

/// Errors emitted by `RatingService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RatingServiceError {
    #[error("rating {0} not found")]
    NotFound(RatingId),
    #[error("session image {0} not found")]
    AssignmentNotFound(AssignmentId),
    #[error("rating belongs to another subject's session {0}")]
    Forbidden(SessionId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl RatingServiceError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            RatingServiceError::NotFound(_) | RatingServiceError::AssignmentNotFound(_) => {
                ErrorKind::NotFound
            }
            RatingServiceError::Forbidden(_) => ErrorKind::Forbidden,
            RatingServiceError::Storage(e) => storage_kind(e),
        }
    }
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
