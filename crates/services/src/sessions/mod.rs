mod plan;
mod progress;
mod service;
mod tracker;
mod view;

// Public API of the session subsystem.
pub use crate::error::{SessionServiceError, TrackerError};
pub use progress::SessionProgress;
pub use service::{DEFAULT_ASSIGN_BATCH, SessionService};
pub use tracker::ProgressTracker;
pub use view::{AnswerReceipt, NextImage, PendingImage};
