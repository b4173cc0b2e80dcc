use rating_core::model::{Session, SubjectId};

/// The subject on whose behalf a request runs.
///
/// Authentication happens at the edge; services only see the resolved id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Caller(SubjectId);

impl Caller {
    #[must_use]
    pub fn new(subject_id: SubjectId) -> Self {
        Self(subject_id)
    }

    #[must_use]
    pub fn subject_id(self) -> SubjectId {
        self.0
    }

    #[must_use]
    pub fn owns(self, session: &Session) -> bool {
        session.is_owned_by(self.0)
    }
}
