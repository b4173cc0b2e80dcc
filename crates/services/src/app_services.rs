use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::catalog_service::CatalogService;
use crate::error::AppServicesError;
use crate::rating_service::RatingService;
use crate::sessions::{DEFAULT_ASSIGN_BATCH, ProgressTracker, SessionService};
use crate::subject_service::SubjectService;

/// Assembles the services an HTTP front end needs over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    subjects: Arc<SubjectService>,
    sessions: Arc<SessionService>,
    tracker: Arc<ProgressTracker>,
    catalog: Arc<CatalogService>,
    ratings: Arc<RatingService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        assign_batch: usize,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock, assign_batch))
    }

    /// Build services backed by in-memory storage.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock, DEFAULT_ASSIGN_BATCH)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock, assign_batch: usize) -> Self {
        Self {
            subjects: Arc::new(SubjectService::from_storage(clock, storage)),
            sessions: Arc::new(
                SessionService::from_storage(clock, storage).with_default_batch(assign_batch),
            ),
            tracker: Arc::new(ProgressTracker::from_storage(clock, storage)),
            catalog: Arc::new(CatalogService::from_storage(clock, storage)),
            ratings: Arc::new(RatingService::from_storage(storage)),
        }
    }

    #[must_use]
    pub fn subjects(&self) -> Arc<SubjectService> {
        Arc::clone(&self.subjects)
    }

    #[must_use]
    pub fn sessions(&self) -> Arc<SessionService> {
        Arc::clone(&self.sessions)
    }

    #[must_use]
    pub fn tracker(&self) -> Arc<ProgressTracker> {
        Arc::clone(&self.tracker)
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn ratings(&self) -> Arc<RatingService> {
        Arc::clone(&self.ratings)
    }
}
