use std::sync::Arc;

use rating_core::model::{AssignmentId, Rating, RatingId, SessionId};
use storage::repository::{AssignmentRepository, RatingRepository, SessionRepository, Storage};

use crate::caller::Caller;
use crate::error::RatingServiceError;

/// Read access to stored ratings, scoped to the caller's own sessions.
#[derive(Clone)]
pub struct RatingService {
    sessions: Arc<dyn SessionRepository>,
    assignments: Arc<dyn AssignmentRepository>,
    ratings: Arc<dyn RatingRepository>,
}

impl RatingService {
    #[must_use]
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        assignments: Arc<dyn AssignmentRepository>,
        ratings: Arc<dyn RatingRepository>,
    ) -> Self {
        Self {
            sessions,
            assignments,
            ratings,
        }
    }

    #[must_use]
    pub fn from_storage(storage: &Storage) -> Self {
        Self::new(
            Arc::clone(&storage.sessions),
            Arc::clone(&storage.assignments),
            Arc::clone(&storage.ratings),
        )
    }

    /// # Errors
    ///
    /// Returns `RatingServiceError::NotFound` for unknown ids and
    /// `RatingServiceError::Forbidden` for ratings in another subject's session.
    pub async fn get_rating(
        &self,
        caller: Caller,
        id: RatingId,
    ) -> Result<Rating, RatingServiceError> {
        let rating = self
            .ratings
            .get_rating(id)
            .await?
            .ok_or(RatingServiceError::NotFound(id))?;
        self.ensure_owner(caller, rating.session_id).await?;
        Ok(rating)
    }

    /// # Errors
    ///
    /// Returns `RatingServiceError::AssignmentNotFound` for unknown assignments and
    /// `RatingServiceError::Forbidden` for another subject's session.
    pub async fn list_for_assignment(
        &self,
        caller: Caller,
        assignment_id: AssignmentId,
    ) -> Result<Vec<Rating>, RatingServiceError> {
        let assignment = self
            .assignments
            .get_assignment(assignment_id)
            .await?
            .ok_or(RatingServiceError::AssignmentNotFound(assignment_id))?;
        self.ensure_owner(caller, assignment.session_id).await?;
        Ok(self.ratings.ratings_for_assignment(assignment_id).await?)
    }

    async fn ensure_owner(
        &self,
        caller: Caller,
        session_id: SessionId,
    ) -> Result<(), RatingServiceError> {
        let owned = self
            .sessions
            .get_session(session_id)
            .await?
            .is_some_and(|s| caller.owns(&s));
        if owned {
            Ok(())
        } else {
            tracing::warn!(%session_id, caller = %caller.subject_id(), "rating access denied");
            Err(RatingServiceError::Forbidden(session_id))
        }
    }
}
