//! HTTP API handlers

pub mod caller;
pub mod catalog;
pub mod error;
pub mod flow;
pub mod health;
pub mod ratings;
pub mod sessions;
pub mod subjects;

pub use caller::{CurrentSubject, SUBJECT_HEADER};
pub use catalog::catalog_routes;
pub use error::{ApiError, ApiResult};
pub use flow::flow_routes;
pub use health::health_routes;
pub use ratings::rating_routes;
pub use sessions::session_routes;
pub use subjects::subject_routes;
