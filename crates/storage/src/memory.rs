use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rating_core::model::{
    Assignment, AssignmentId, Image, ImageId, PlannedAssignment, Question, QuestionId, Rating,
    RatingId, Session, SessionId, SessionKind, Subject, SubjectId, ValidatedImage,
    ValidatedQuestion, ValidatedSubject,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::repository::{
    AssignedImage, AssignmentRepository, ImageRepository, QuestionRepository, RatingBatch,
    RatingRepository, RecordOutcome, SessionRepository, StorageError, SubjectRepository,
};

#[derive(Default)]
struct Counters {
    subject: u64,
    image: u64,
    question: u64,
    session: u64,
    assignment: u64,
    rating: u64,
}

fn bump(counter: &mut u64) -> u64 {
    *counter += 1;
    *counter
}

#[derive(Default)]
struct Tables {
    ids: Counters,
    subjects: BTreeMap<SubjectId, Subject>,
    images: BTreeMap<ImageId, Image>,
    questions: BTreeMap<QuestionId, Question>,
    sessions: BTreeMap<SessionId, Session>,
    assignments: BTreeMap<AssignmentId, Assignment>,
    ratings: BTreeMap<RatingId, Rating>,
}

impl Tables {
    fn join_image(&self, assignment: &Assignment) -> Result<AssignedImage, StorageError> {
        let image = self.images.get(&assignment.image_id).ok_or_else(|| {
            StorageError::Serialization(format!(
                "assignment {} references missing image {}",
                assignment.id, assignment.image_id
            ))
        })?;
        Ok(AssignedImage {
            assignment: assignment.clone(),
            image: image.descriptor(),
        })
    }

    fn has_rating(&self, assignment_id: AssignmentId, question_id: QuestionId) -> bool {
        self.ratings
            .values()
            .any(|r| r.assignment_id == assignment_id && r.question_id == question_id)
    }
}

/// In-memory repository for tests and prototyping.
///
/// A single mutex guards every table, so each trait call is one atomic unit,
/// matching what a transaction gives the `SQLite` backend.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StorageError> {
        self.tables
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl SubjectRepository for InMemoryRepository {
    async fn insert_subject(&self, subject: ValidatedSubject) -> Result<Subject, StorageError> {
        let mut guard = self.lock()?;
        let id = SubjectId::new(bump(&mut guard.ids.subject));
        let subject = subject.assign_id(id);
        guard.subjects.insert(id, subject.clone());
        Ok(subject)
    }

    async fn get_subject(&self, id: SubjectId) -> Result<Option<Subject>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.subjects.get(&id).cloned())
    }
}

#[async_trait]
impl ImageRepository for InMemoryRepository {
    async fn insert_image(&self, image: ValidatedImage) -> Result<Image, StorageError> {
        let mut guard = self.lock()?;
        let id = ImageId::new(bump(&mut guard.ids.image));
        let image = image.assign_id(id);
        guard.images.insert(id, image.clone());
        Ok(image)
    }

    async fn get_image(&self, id: ImageId) -> Result<Option<Image>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.images.get(&id).cloned())
    }

    async fn list_images(&self, offset: u32, limit: u32) -> Result<Vec<Image>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .images
            .values()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn existing_image_ids(&self, ids: &[ImageId]) -> Result<Vec<ImageId>, StorageError> {
        let guard = self.lock()?;
        let found: BTreeSet<ImageId> = ids
            .iter()
            .copied()
            .filter(|id| guard.images.contains_key(id))
            .collect();
        Ok(found.into_iter().collect())
    }

    async fn all_image_ids(&self) -> Result<Vec<ImageId>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.images.keys().copied().collect())
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn insert_question(
        &self,
        question: ValidatedQuestion,
    ) -> Result<Question, StorageError> {
        let mut guard = self.lock()?;
        let id = QuestionId::new(bump(&mut guard.ids.question));
        let question = question.assign_id(id);
        guard.questions.insert(id, question.clone());
        Ok(question)
    }

    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.questions.get(&id).cloned())
    }

    async fn list_questions(&self) -> Result<Vec<Question>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.questions.values().cloned().collect())
    }
}

#[async_trait]
impl SessionRepository for InMemoryRepository {
    async fn insert_session(
        &self,
        subject_id: SubjectId,
        kind: SessionKind,
        started_at: DateTime<Utc>,
    ) -> Result<Session, StorageError> {
        let mut guard = self.lock()?;
        if !guard.subjects.contains_key(&subject_id) {
            return Err(StorageError::NotFound);
        }
        let id = SessionId::new(bump(&mut guard.ids.session));
        let session = Session::start(id, subject_id, kind, started_at);
        guard.sessions.insert(id, session.clone());
        Ok(session)
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<Session>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.sessions.get(&id).cloned())
    }

    async fn sessions_for_subject(
        &self,
        subject_id: SubjectId,
    ) -> Result<Vec<Session>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .sessions
            .values()
            .filter(|s| s.is_owned_by(subject_id))
            .cloned()
            .collect())
    }

    async fn advance_if_greater(
        &self,
        id: SessionId,
        position: u32,
    ) -> Result<bool, StorageError> {
        let mut guard = self.lock()?;
        let session = guard.sessions.get_mut(&id).ok_or(StorageError::NotFound)?;
        Ok(session.advance_to(position))
    }

    async fn mark_complete(&self, id: SessionId, at: DateTime<Utc>) -> Result<bool, StorageError> {
        let mut guard = self.lock()?;
        let session = guard.sessions.get_mut(&id).ok_or(StorageError::NotFound)?;
        Ok(session.mark_complete(at))
    }
}

#[async_trait]
impl AssignmentRepository for InMemoryRepository {
    async fn insert_assignments(
        &self,
        session_id: SessionId,
        planned: Vec<PlannedAssignment>,
    ) -> Result<Vec<Assignment>, StorageError> {
        let mut guard = self.lock()?;
        if !guard.sessions.contains_key(&session_id) {
            return Err(StorageError::NotFound);
        }
        if guard
            .assignments
            .values()
            .any(|a| a.session_id == session_id)
        {
            return Err(StorageError::Conflict);
        }
        if planned.iter().any(|p| p.session_id != session_id) {
            return Err(StorageError::Conflict);
        }
        if planned.iter().any(|p| !guard.images.contains_key(&p.image_id)) {
            return Err(StorageError::NotFound);
        }
        let positions: BTreeSet<u32> = planned.iter().map(|p| p.position.value()).collect();
        if positions.len() != planned.len() {
            return Err(StorageError::Conflict);
        }

        let mut created = Vec::with_capacity(planned.len());
        for plan in planned {
            let id = AssignmentId::new(bump(&mut guard.ids.assignment));
            let assignment = plan.assign_id(id);
            guard.assignments.insert(id, assignment.clone());
            created.push(assignment);
        }
        Ok(created)
    }

    async fn get_assignment(&self, id: AssignmentId) -> Result<Option<Assignment>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.assignments.get(&id).cloned())
    }

    async fn next_after(
        &self,
        session_id: SessionId,
        after: u32,
    ) -> Result<Option<AssignedImage>, StorageError> {
        let guard = self.lock()?;
        guard
            .assignments
            .values()
            .filter(|a| a.session_id == session_id && a.position.value() > after)
            .min_by_key(|a| a.position)
            .map(|a| guard.join_image(a))
            .transpose()
    }

    async fn assignments_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<AssignedImage>, StorageError> {
        let guard = self.lock()?;
        let mut rows: Vec<&Assignment> = guard
            .assignments
            .values()
            .filter(|a| a.session_id == session_id)
            .collect();
        rows.sort_by_key(|a| a.position);
        rows.into_iter().map(|a| guard.join_image(a)).collect()
    }
}

#[async_trait]
impl RatingRepository for InMemoryRepository {
    async fn record_answers(&self, batch: RatingBatch) -> Result<RecordOutcome, StorageError> {
        let mut guard = self.lock()?;
        let completed = guard
            .sessions
            .get(&batch.session_id)
            .ok_or(StorageError::NotFound)?
            .is_completed();
        if !guard.assignments.contains_key(&batch.assignment_id) {
            return Err(StorageError::NotFound);
        }
        if completed {
            return Err(StorageError::SessionCompleted);
        }
        for answer in &batch.answers {
            if !guard.questions.contains_key(&answer.question_id) {
                return Err(StorageError::NotFound);
            }
            if guard.has_rating(batch.assignment_id, answer.question_id) {
                return Err(StorageError::Conflict);
            }
        }

        let mut rating_ids = Vec::with_capacity(batch.answers.len());
        for answer in batch.answers {
            let id = RatingId::new(bump(&mut guard.ids.rating));
            guard.ratings.insert(
                id,
                Rating {
                    id,
                    assignment_id: batch.assignment_id,
                    session_id: batch.session_id,
                    question_id: answer.question_id,
                    subject_id: batch.subject_id,
                    image_id: batch.image_id,
                    position: batch.position,
                    value: answer.value,
                    text: answer.text,
                    response_time: answer.response_time,
                    created_at: batch.recorded_at,
                },
            );
            rating_ids.push(id);
        }

        let session = guard
            .sessions
            .get_mut(&batch.session_id)
            .ok_or(StorageError::NotFound)?;
        let advanced = session.advance_to(batch.position.value());
        Ok(RecordOutcome {
            rating_ids,
            last_seen_position: session.last_seen_position(),
            advanced,
        })
    }

    async fn rating_exists(
        &self,
        assignment_id: AssignmentId,
        question_id: QuestionId,
    ) -> Result<bool, StorageError> {
        let guard = self.lock()?;
        Ok(guard.has_rating(assignment_id, question_id))
    }

    async fn get_rating(&self, id: RatingId) -> Result<Option<Rating>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.ratings.get(&id).cloned())
    }

    async fn ratings_for_assignment(
        &self,
        assignment_id: AssignmentId,
    ) -> Result<Vec<Rating>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .ratings
            .values()
            .filter(|r| r.assignment_id == assignment_id)
            .cloned()
            .collect())
    }
}
