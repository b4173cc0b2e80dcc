use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

use crate::model::ids::QuestionId;
use crate::model::rating::{Answer, AnswerError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("unknown question type: {0}")]
    UnknownKind(String),

    #[error("likert questions need both min_scale and max_scale")]
    MissingScale,

    #[error("min_scale ({min}) must be below max_scale ({max})")]
    InvalidScale { min: i32, max: i32 },

    #[error("step must be > 0")]
    InvalidStep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestionKind {
    Likert,
    Text,
}

impl QuestionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKind::Likert => "likert",
            QuestionKind::Text => "text",
        }
    }

    /// # Errors
    ///
    /// Returns `QuestionError::UnknownKind` for unrecognized tags.
    pub fn parse(raw: &str) -> Result<Self, QuestionError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "likert" => Ok(Self::Likert),
            "text" => Ok(Self::Text),
            _ => Err(QuestionError::UnknownKind(raw.to_owned())),
        }
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive answer range with a step grid anchored at `min`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikertScale {
    min: i32,
    max: i32,
    step: u32,
}

impl LikertScale {
    /// # Errors
    ///
    /// Returns `QuestionError` if `min >= max` or `step == 0`.
    pub fn new(min: i32, max: i32, step: u32) -> Result<Self, QuestionError> {
        if min >= max {
            return Err(QuestionError::InvalidScale { min, max });
        }
        if step == 0 {
            return Err(QuestionError::InvalidStep);
        }
        Ok(Self { min, max, step })
    }

    #[must_use]
    pub fn min(&self) -> i32 {
        self.min
    }

    #[must_use]
    pub fn max(&self) -> i32 {
        self.max
    }

    #[must_use]
    pub fn step(&self) -> u32 {
        self.step
    }

    fn admits(&self, value: f64) -> bool {
        if value < f64::from(self.min) || value > f64::from(self.max) {
            return false;
        }
        let steps = (value - f64::from(self.min)) / f64::from(self.step);
        (steps - steps.round()).abs() < 1e-9
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub text: String,
    pub kind: QuestionKind,
    pub min_scale: Option<i32>,
    pub max_scale: Option<i32>,
    pub step: Option<u32>,
}

impl QuestionDraft {
    /// # Errors
    ///
    /// Returns `QuestionError` for blank text or an unusable scale.
    pub fn validate(self, now: DateTime<Utc>) -> Result<ValidatedQuestion, QuestionError> {
        let text = self.text.trim().to_owned();
        if text.is_empty() {
            return Err(QuestionError::EmptyText);
        }
        let scale = match self.kind {
            QuestionKind::Likert => {
                let (Some(min), Some(max)) = (self.min_scale, self.max_scale) else {
                    return Err(QuestionError::MissingScale);
                };
                Some(LikertScale::new(min, max, self.step.unwrap_or(1))?)
            }
            QuestionKind::Text => None,
        };
        Ok(ValidatedQuestion {
            text,
            kind: self.kind,
            scale,
            created_at: now,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuestion {
    pub text: String,
    pub kind: QuestionKind,
    pub scale: Option<LikertScale>,
    pub created_at: DateTime<Utc>,
}

impl ValidatedQuestion {
    #[must_use]
    pub fn assign_id(self, id: QuestionId) -> Question {
        Question {
            id,
            text: self.text,
            kind: self.kind,
            scale: self.scale,
            created_at: self.created_at,
        }
    }
}

/// A question shown alongside each image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    pub kind: QuestionKind,
    pub scale: Option<LikertScale>,
    pub created_at: DateTime<Utc>,
}

impl Question {
    /// Check that an answer is meaningful for this question.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError` when a Likert value is missing, off-scale or off-grid,
    /// or when a text question gets no text.
    pub fn check_answer(&self, answer: &Answer) -> Result<(), AnswerError> {
        match (self.kind, self.scale) {
            (QuestionKind::Likert, Some(scale)) => {
                let value = answer.value.ok_or(AnswerError::MissingValue(self.id))?;
                if !scale.admits(value) {
                    return Err(AnswerError::OutOfScale {
                        question_id: self.id,
                        value,
                        min: scale.min,
                        max: scale.max,
                        step: scale.step,
                    });
                }
                Ok(())
            }
            (QuestionKind::Text, _) | (QuestionKind::Likert, None) => {
                let has_text = answer.text.as_deref().is_some_and(|t| !t.trim().is_empty());
                if has_text || answer.value.is_some() {
                    Ok(())
                } else {
                    Err(AnswerError::MissingText(self.id))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn likert(min: i32, max: i32, step: Option<u32>) -> Result<Question, QuestionError> {
        QuestionDraft {
            text: "How good is the image?".into(),
            kind: QuestionKind::Likert,
            min_scale: Some(min),
            max_scale: Some(max),
            step,
        }
        .validate(fixed_now())
        .map(|q| q.assign_id(QuestionId::new(1)))
    }

    fn value(v: f64) -> Answer {
        Answer {
            question_id: QuestionId::new(1),
            value: Some(v),
            text: None,
            response_time: None,
        }
    }

    #[test]
    fn likert_requires_ordered_scale() {
        assert_eq!(
            likert(5, 1, None).unwrap_err(),
            QuestionError::InvalidScale { min: 5, max: 1 }
        );
        assert_eq!(likert(1, 5, Some(0)).unwrap_err(), QuestionError::InvalidStep);
    }

    #[test]
    fn likert_answers_must_sit_on_grid() {
        let q = likert(0, 10, Some(2)).unwrap();
        assert!(q.check_answer(&value(4.0)).is_ok());
        assert!(matches!(
            q.check_answer(&value(3.0)),
            Err(AnswerError::OutOfScale { .. })
        ));
        assert!(matches!(
            q.check_answer(&value(12.0)),
            Err(AnswerError::OutOfScale { .. })
        ));
    }

    #[test]
    fn text_question_needs_text() {
        let q = QuestionDraft {
            text: "Describe artifacts".into(),
            kind: QuestionKind::Text,
            min_scale: None,
            max_scale: None,
            step: None,
        }
        .validate(fixed_now())
        .unwrap()
        .assign_id(QuestionId::new(2));

        let blank = Answer {
            question_id: q.id,
            value: None,
            text: Some("  ".into()),
            response_time: None,
        };
        assert_eq!(
            q.check_answer(&blank).unwrap_err(),
            AnswerError::MissingText(QuestionId::new(2))
        );
    }
}
