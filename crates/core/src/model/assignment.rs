use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::model::ids::{AssignmentId, ImageId, SessionId};
use crate::model::session::Session;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AssignmentError {
    #[error("display position must be >= 1")]
    ZeroPosition,

    #[error("no images to assign")]
    Empty,

    #[error("image {0} appears more than once")]
    DuplicateImage(ImageId),

    #[error("too many images for one session: {0}")]
    TooMany(usize),
}

/// 1-based rank of an assignment within its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DisplayPosition(u32);

impl DisplayPosition {
    /// # Errors
    ///
    /// Returns `AssignmentError::ZeroPosition` for `0`.
    pub fn new(value: u32) -> Result<Self, AssignmentError> {
        if value == 0 {
            return Err(AssignmentError::ZeroPosition);
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for DisplayPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One (session, image, position) triple defining delivery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub id: AssignmentId,
    pub session_id: SessionId,
    pub image_id: ImageId,
    pub position: DisplayPosition,
    pub is_training: bool,
}

/// An assignment that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedAssignment {
    pub session_id: SessionId,
    pub image_id: ImageId,
    pub position: DisplayPosition,
    pub is_training: bool,
}

impl PlannedAssignment {
    #[must_use]
    pub fn assign_id(self, id: AssignmentId) -> Assignment {
        Assignment {
            id,
            session_id: self.session_id,
            image_id: self.image_id,
            position: self.position,
            is_training: self.is_training,
        }
    }
}

/// Number images `1..=n` in the order given.
///
/// The caller decides the order (e.g. shuffled); this only validates it and
/// derives the training flag from the session kind.
///
/// # Errors
///
/// Returns `AssignmentError::Empty` for no images and `DuplicateImage` when an
/// image is listed twice.
pub fn plan_assignments(
    session: &Session,
    image_ids: &[ImageId],
) -> Result<Vec<PlannedAssignment>, AssignmentError> {
    if image_ids.is_empty() {
        return Err(AssignmentError::Empty);
    }

    let mut seen = HashSet::with_capacity(image_ids.len());
    let mut planned = Vec::with_capacity(image_ids.len());
    for (idx, image_id) in image_ids.iter().enumerate() {
        if !seen.insert(*image_id) {
            return Err(AssignmentError::DuplicateImage(*image_id));
        }
        let rank = u32::try_from(idx + 1).map_err(|_| AssignmentError::TooMany(image_ids.len()))?;
        planned.push(PlannedAssignment {
            session_id: session.id(),
            image_id: *image_id,
            position: DisplayPosition::new(rank)?,
            is_training: session.kind().is_training(),
        });
    }
    Ok(planned)
}
