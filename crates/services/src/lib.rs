#![forbid(unsafe_code)]

pub mod app_services;
pub mod caller;
pub mod catalog_service;
pub mod error;
pub mod rating_service;
pub mod sessions;
pub mod subject_service;

pub use rating_core::Clock;

pub use app_services::AppServices;
pub use caller::Caller;
pub use catalog_service::{CatalogService, MAX_PAGE_SIZE};
pub use error::{
    AppServicesError, CatalogError, ErrorKind, RatingServiceError, SessionServiceError,
    SubjectServiceError, TrackerError,
};
pub use rating_service::RatingService;
pub use sessions::{
    AnswerReceipt, DEFAULT_ASSIGN_BATCH, NextImage, PendingImage, ProgressTracker,
    SessionProgress, SessionService,
};
pub use subject_service::SubjectService;
