use serde::Serialize;
use storage::repository::AssignedImage;

/// Aggregated view of session progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub last_seen_position: u32,
    pub is_complete: bool,
}

impl SessionProgress {
    /// Positions at or below the cursor count as answered.
    pub(crate) fn from_assignments(
        assignments: &[AssignedImage],
        last_seen_position: u32,
        is_complete: bool,
    ) -> Self {
        let total = assignments.len();
        let answered = assignments
            .iter()
            .filter(|a| a.assignment.position.value() <= last_seen_position)
            .count();
        Self {
            total,
            answered,
            remaining: total - answered,
            last_seen_position,
            is_complete,
        }
    }
}
