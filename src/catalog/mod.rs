//! # Catalog Module - Course Catalog & Progress Aggregation
//!
//! Lists active courses with their structure counts and, for a given learner,
//! their progress; creates, deactivates and enrolls into courses.
//!
//! ## Architecture
//!
//! - `filters`: boundary parsing of query parameters into typed predicates
//! - `store`: the `CatalogStore` capability plus its row types
//! - `pg_store` / `memory_store`: PostgreSQL (Diesel) and in-process stores
//! - `service`: aggregation and validation on top of a store
//! - `handlers`: Axum handlers, run blocking store work on `spawn_blocking`

pub mod error;
pub mod filters;
pub mod handlers;
pub mod memory_store;
pub mod pg_store;
pub mod service;
pub mod store;
pub mod types;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::core::shared::state::AppState;

pub use error::CatalogError;
pub use filters::{CourseFilters, CoursePredicate, CourseQuery};
pub use handlers::*;
pub use memory_store::MemoryCatalogStore;
pub use pg_store::PgCatalogStore;
pub use service::CatalogService;
pub use store::CatalogStore;
pub use types::*;

pub fn configure_catalog_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/courses",
            get(handle_list_courses).post(handle_create_course),
        )
        .route(
            "/api/courses/:id",
            get(handle_get_course).delete(handle_deactivate_course),
        )
        .route(
            "/api/courses/:id/enroll",
            post(handle_enroll).delete(handle_unenroll),
        )
        .route(
            "/api/courses/:id/prerequisite-check",
            get(handle_prerequisite_check),
        )
        .route("/api/languages", get(handle_list_languages))
}
