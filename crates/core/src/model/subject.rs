use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::SubjectId;

const MAX_NAME_CHARS: usize = 50;
const MAX_GENDER_CHARS: usize = 20;
const MAX_AGE: u32 = 150;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SubjectError {
    #[error("subject name cannot be empty")]
    EmptyName,

    #[error("subject name is longer than {MAX_NAME_CHARS} characters")]
    NameTooLong,

    #[error("gender is longer than {MAX_GENDER_CHARS} characters")]
    GenderTooLong,

    #[error("age {0} is out of range")]
    InvalidAge(u32),
}

/// Registration input for a participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectDraft {
    pub name: String,
    pub age: Option<u32>,
    pub gender: Option<String>,
}

impl SubjectDraft {
    /// Validate the draft and stamp it with the registration time.
    ///
    /// # Errors
    ///
    /// Returns `SubjectError` if the name is empty or any field is out of range.
    pub fn validate(self, now: DateTime<Utc>) -> Result<ValidatedSubject, SubjectError> {
        let name = self.name.trim().to_owned();
        if name.is_empty() {
            return Err(SubjectError::EmptyName);
        }
        if name.chars().count() > MAX_NAME_CHARS {
            return Err(SubjectError::NameTooLong);
        }
        if let Some(age) = self.age.filter(|age| *age > MAX_AGE) {
            return Err(SubjectError::InvalidAge(age));
        }
        let gender = self
            .gender
            .map(|g| g.trim().to_owned())
            .filter(|g| !g.is_empty());
        if gender
            .as_deref()
            .is_some_and(|g| g.chars().count() > MAX_GENDER_CHARS)
        {
            return Err(SubjectError::GenderTooLong);
        }

        Ok(ValidatedSubject {
            name,
            age: self.age,
            gender,
            created_at: now,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSubject {
    pub name: String,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ValidatedSubject {
    #[must_use]
    pub fn assign_id(self, id: SubjectId) -> Subject {
        Subject {
            id,
            name: self.name,
            age: self.age,
            gender: self.gender,
            created_at: self.created_at,
        }
    }
}

/// A registered experiment participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub id: SubjectId,
    pub name: String,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn draft(name: &str) -> SubjectDraft {
        SubjectDraft {
            name: name.into(),
            age: Some(30),
            gender: Some("  ".into()),
        }
    }

    #[test]
    fn trims_name_and_drops_blank_gender() {
        let subject = draft("  Ada ").validate(fixed_now()).unwrap();
        assert_eq!(subject.name, "Ada");
        assert_eq!(subject.gender, None);
        assert_eq!(subject.created_at, fixed_now());
    }

    #[test]
    fn rejects_blank_name() {
        let err = draft("   ").validate(fixed_now()).unwrap_err();
        assert_eq!(err, SubjectError::EmptyName);
    }

    #[test]
    fn rejects_unreasonable_age() {
        let mut d = draft("Bo");
        d.age = Some(400);
        assert_eq!(
            d.validate(fixed_now()).unwrap_err(),
            SubjectError::InvalidAge(400)
        );
    }
}
