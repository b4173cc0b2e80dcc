use std::sync::Arc;

use rating_core::model::{
    Answer, AnswerPayload, Assignment, AssignmentId, QuestionId, Session, SessionId,
    SessionState,
};
use storage::repository::{
    AssignmentRepository, QuestionRepository, RatingBatch, RatingRepository, SessionRepository,
    Storage, StorageError,
};

use super::view::{AnswerReceipt, NextImage, PendingImage};
use crate::Clock;
use crate::caller::Caller;
use crate::error::TrackerError;

/// Drives a subject through a session's assigned images in display order.
///
/// The session row carries the cursor (`last_seen_position`); this service only
/// moves it forward after answers are stored and flips completion once the
/// cursor has passed the last assignment.
#[derive(Clone)]
pub struct ProgressTracker {
    clock: Clock,
    sessions: Arc<dyn SessionRepository>,
    assignments: Arc<dyn AssignmentRepository>,
    questions: Arc<dyn QuestionRepository>,
    ratings: Arc<dyn RatingRepository>,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(
        clock: Clock,
        sessions: Arc<dyn SessionRepository>,
        assignments: Arc<dyn AssignmentRepository>,
        questions: Arc<dyn QuestionRepository>,
        ratings: Arc<dyn RatingRepository>,
    ) -> Self {
        Self {
            clock,
            sessions,
            assignments,
            questions,
            ratings,
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage) -> Self {
        Self::new(
            clock,
            Arc::clone(&storage.sessions),
            Arc::clone(&storage.assignments),
            Arc::clone(&storage.questions),
            Arc::clone(&storage.ratings),
        )
    }

    /// Return the first assignment past the cursor, or complete the session.
    ///
    /// Never moves the cursor, so repeated calls return the same image until an
    /// answer is recorded.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::SessionNotFound` or `TrackerError::Forbidden` when
    /// the session is missing or owned by someone else, and
    /// `TrackerError::Storage` for repository failures.
    pub async fn next_pending_assignment(
        &self,
        caller: Caller,
        session_id: SessionId,
    ) -> Result<NextImage, TrackerError> {
        let session = self.owned_session(caller, session_id).await?;
        let last_seen = match session.state() {
            SessionState::Complete => {
                tracing::debug!(%session_id, "session already complete");
                return Ok(NextImage::Complete);
            }
            SessionState::Active { last_seen } => last_seen,
        };

        if let Some(next) = self.assignments.next_after(session_id, last_seen).await? {
            tracing::debug!(
                %session_id,
                last_seen,
                position = %next.assignment.position,
                "next image selected"
            );
            return Ok(NextImage::Pending(PendingImage::from(next)));
        }

        if self.sessions.mark_complete(session_id, self.clock.now()).await? {
            tracing::info!(%session_id, last_seen, "session completed");
        }
        Ok(NextImage::Complete)
    }

    /// Store answers for one assignment and move the cursor up to its position.
    ///
    /// The cursor never moves backwards: answering an earlier position after a
    /// later one stores the rating but leaves `last_seen_position` alone.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError` when the assignment, session or a question is
    /// missing, the session is owned by someone else or already complete, an
    /// answer does not fit its question, or an answer was already recorded.
    pub async fn record_answer_and_advance(
        &self,
        caller: Caller,
        session_id: SessionId,
        assignment_id: AssignmentId,
        payload: AnswerPayload,
    ) -> Result<AnswerReceipt, TrackerError> {
        let assignment = self.assignment(assignment_id).await?;
        if assignment.session_id != session_id {
            return Err(TrackerError::AssignmentNotInSession {
                assignment_id,
                session_id,
            });
        }
        self.record(caller, assignment, payload).await
    }

    /// Same as [`ProgressTracker::record_answer_and_advance`] with the session
    /// taken from the assignment itself.
    ///
    /// # Errors
    ///
    /// See [`ProgressTracker::record_answer_and_advance`].
    pub async fn record_answer_for_assignment(
        &self,
        caller: Caller,
        assignment_id: AssignmentId,
        payload: AnswerPayload,
    ) -> Result<AnswerReceipt, TrackerError> {
        let assignment = self.assignment(assignment_id).await?;
        self.record(caller, assignment, payload).await
    }

    async fn record(
        &self,
        caller: Caller,
        assignment: Assignment,
        payload: AnswerPayload,
    ) -> Result<AnswerReceipt, TrackerError> {
        let session = self.owned_session(caller, assignment.session_id).await?;
        if session.is_completed() {
            return Err(TrackerError::SessionCompleted(session.id()));
        }

        for answer in payload.answers() {
            self.check_answer(answer).await?;
        }
        for answer in payload.answers() {
            if self
                .ratings
                .rating_exists(assignment.id, answer.question_id)
                .await?
            {
                tracing::warn!(
                    session_id = %session.id(),
                    assignment_id = %assignment.id,
                    question_id = %answer.question_id,
                    "duplicate answer rejected"
                );
                return Err(TrackerError::Duplicate {
                    assignment_id: assignment.id,
                    question_id: answer.question_id,
                });
            }
        }

        let question_ids: Vec<QuestionId> =
            payload.answers().iter().map(|a| a.question_id).collect();
        let batch = RatingBatch::new(
            &session,
            &assignment,
            payload.into_answers(),
            self.clock.now(),
        );
        let outcome = match self.ratings.record_answers(batch).await {
            Ok(outcome) => outcome,
            Err(StorageError::Conflict) => {
                let question_id = self.colliding_question(&assignment, &question_ids).await?;
                tracing::warn!(
                    session_id = %session.id(),
                    assignment_id = %assignment.id,
                    %question_id,
                    "concurrent duplicate answer rejected"
                );
                return Err(TrackerError::Duplicate {
                    assignment_id: assignment.id,
                    question_id,
                });
            }
            Err(StorageError::SessionCompleted) => {
                tracing::warn!(
                    session_id = %session.id(),
                    assignment_id = %assignment.id,
                    "session completed before the answer was stored"
                );
                return Err(TrackerError::SessionCompleted(session.id()));
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            session_id = %session.id(),
            assignment_id = %assignment.id,
            position = %assignment.position,
            last_seen = outcome.last_seen_position,
            advanced = outcome.advanced,
            "answer recorded"
        );
        Ok(AnswerReceipt::new(assignment.id, outcome))
    }

    async fn assignment(&self, id: AssignmentId) -> Result<Assignment, TrackerError> {
        self.assignments
            .get_assignment(id)
            .await?
            .ok_or(TrackerError::AssignmentNotFound(id))
    }

    async fn owned_session(
        &self,
        caller: Caller,
        session_id: SessionId,
    ) -> Result<Session, TrackerError> {
        let session = self
            .sessions
            .get_session(session_id)
            .await?
            .ok_or(TrackerError::SessionNotFound(session_id))?;
        if !caller.owns(&session) {
            tracing::warn!(
                %session_id,
                caller = %caller.subject_id(),
                "session access denied"
            );
            return Err(TrackerError::Forbidden(session_id));
        }
        Ok(session)
    }

    /// The first of `question_ids` that already has a stored answer for `assignment`.
    async fn colliding_question(
        &self,
        assignment: &Assignment,
        question_ids: &[QuestionId],
    ) -> Result<QuestionId, TrackerError> {
        for &question_id in question_ids {
            if self.ratings.rating_exists(assignment.id, question_id).await? {
                return Ok(question_id);
            }
        }
        question_ids
            .first()
            .copied()
            .ok_or(TrackerError::Storage(StorageError::Conflict))
    }

    async fn check_answer(&self, answer: &Answer) -> Result<(), TrackerError> {
        let question = self
            .questions
            .get_question(answer.question_id)
            .await?
            .ok_or(TrackerError::QuestionNotFound(answer.question_id))?;
        question.check_answer(answer)?;
        Ok(())
    }
}
