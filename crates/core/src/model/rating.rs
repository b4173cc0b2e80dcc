use chrono::{DateTime, Utc};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::assignment::DisplayPosition;
use crate::model::ids::{AssignmentId, ImageId, QuestionId, RatingId, SessionId, SubjectId};

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum AnswerError {
    #[error("answer payload is empty")]
    EmptyPayload,

    #[error("question {0} is answered more than once in the payload")]
    DuplicateQuestion(QuestionId),

    #[error("response time must be a finite, non-negative number of seconds")]
    InvalidResponseTime,

    #[error("rating value must be a finite number")]
    NonFiniteValue,

    #[error("question {0} needs a rating value")]
    MissingValue(QuestionId),

    #[error("question {0} needs a text answer")]
    MissingText(QuestionId),

    #[error(
        "value {value} for question {question_id} is outside {min}..={max} (step {step})"
    )]
    OutOfScale {
        question_id: QuestionId,
        value: f64,
        min: i32,
        max: i32,
        step: u32,
    },
}

//
// ─── ANSWERS ──────────────────────────────────────────────────────────────────
//

/// A single answer to one question about one image.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub question_id: QuestionId,
    pub value: Option<f64>,
    pub text: Option<String>,
    pub response_time: Option<f64>,
}

/// Non-empty set of answers for one assignment, at most one per question.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerPayload {
    answers: Vec<Answer>,
}

impl AnswerPayload {
    /// # Errors
    ///
    /// Returns `AnswerError` for an empty payload, a repeated question, or
    /// non-finite numbers.
    pub fn new(answers: Vec<Answer>) -> Result<Self, AnswerError> {
        if answers.is_empty() {
            return Err(AnswerError::EmptyPayload);
        }
        let mut seen = HashSet::with_capacity(answers.len());
        for answer in &answers {
            if !seen.insert(answer.question_id) {
                return Err(AnswerError::DuplicateQuestion(answer.question_id));
            }
            if answer.value.is_some_and(|v| !v.is_finite()) {
                return Err(AnswerError::NonFiniteValue);
            }
            if answer
                .response_time
                .is_some_and(|t| !t.is_finite() || t < 0.0)
            {
                return Err(AnswerError::InvalidResponseTime);
            }
        }
        Ok(Self { answers })
    }

    /// Convenience for the common single-question case.
    ///
    /// # Errors
    ///
    /// Same as [`AnswerPayload::new`].
    pub fn single(answer: Answer) -> Result<Self, AnswerError> {
        Self::new(vec![answer])
    }

    #[must_use]
    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    #[must_use]
    pub fn into_answers(self) -> Vec<Answer> {
        self.answers
    }
}

//
// ─── RATINGS ──────────────────────────────────────────────────────────────────
//

/// A persisted answer, denormalized with subject and image for analysis exports.
#[derive(Debug, Clone, PartialEq)]
pub struct Rating {
    pub id: RatingId,
    pub assignment_id: AssignmentId,
    pub session_id: SessionId,
    pub question_id: QuestionId,
    pub subject_id: SubjectId,
    pub image_id: ImageId,
    pub position: DisplayPosition,
    pub value: Option<f64>,
    pub text: Option<String>,
    pub response_time: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(q: u64) -> Answer {
        Answer {
            question_id: QuestionId::new(q),
            value: Some(3.0),
            text: None,
            response_time: Some(1.5),
        }
    }

    #[test]
    fn payload_rejects_repeated_question() {
        let err = AnswerPayload::new(vec![answer(2), answer(2)]).unwrap_err();
        assert_eq!(err, AnswerError::DuplicateQuestion(QuestionId::new(2)));
    }

    #[test]
    fn payload_rejects_negative_response_time() {
        let mut a = answer(1);
        a.response_time = Some(-0.1);
        assert_eq!(
            AnswerPayload::single(a).unwrap_err(),
            AnswerError::InvalidResponseTime
        );
    }

    #[test]
    fn payload_must_not_be_empty() {
        assert_eq!(
            AnswerPayload::new(Vec::new()).unwrap_err(),
            AnswerError::EmptyPayload
        );
    }
}
