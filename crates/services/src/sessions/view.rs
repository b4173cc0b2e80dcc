use rating_core::model::{AssignmentId, DisplayPosition, ImageDescriptor, RatingId};
use storage::repository::{AssignedImage, RecordOutcome};

/// What the client should show next for a session.
///
/// Presentation-agnostic: the HTTP layer decides the wire shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextImage {
    Pending(PendingImage),
    Complete,
}

impl NextImage {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, NextImage::Complete)
    }

    #[must_use]
    pub fn pending(&self) -> Option<&PendingImage> {
        match self {
            NextImage::Pending(p) => Some(p),
            NextImage::Complete => None,
        }
    }
}

/// The first assignment past the session cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingImage {
    pub assignment_id: AssignmentId,
    pub image: ImageDescriptor,
    pub position: DisplayPosition,
}

impl From<AssignedImage> for PendingImage {
    fn from(value: AssignedImage) -> Self {
        Self {
            assignment_id: value.assignment.id,
            position: value.assignment.position,
            image: value.image,
        }
    }
}

/// Acknowledgement for a stored answer payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerReceipt {
    pub assignment_id: AssignmentId,
    pub rating_ids: Vec<RatingId>,
    pub last_seen_position: u32,
    pub advanced: bool,
}

impl AnswerReceipt {
    pub(crate) fn new(assignment_id: AssignmentId, outcome: RecordOutcome) -> Self {
        Self {
            assignment_id,
            rating_ids: outcome.rating_ids,
            last_seen_position: outcome.last_seen_position,
            advanced: outcome.advanced,
        }
    }

    /// Human-readable pointer to the follow-up call.
    #[must_use]
    pub fn hint(&self) -> &'static str {
        "Rating submitted. Call next_image to get the next image."
    }
}
