mod assignment;
mod ids;
mod image;
mod question;
mod rating;
mod session;
mod subject;

pub use ids::{AssignmentId, ImageId, ParseIdError, QuestionId, RatingId, SessionId, SubjectId};

pub use assignment::{
    Assignment, AssignmentError, DisplayPosition, PlannedAssignment, plan_assignments,
};
pub use image::{Image, ImageDescriptor, ImageDraft, ImageError, ValidatedImage};
pub use question::{
    LikertScale, Question, QuestionDraft, QuestionError, QuestionKind, ValidatedQuestion,
};
pub use rating::{Answer, AnswerError, AnswerPayload, Rating};
pub use session::{Session, SessionError, SessionKind, SessionState};
pub use subject::{Subject, SubjectDraft, SubjectError, ValidatedSubject};
