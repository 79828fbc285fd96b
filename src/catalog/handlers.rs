use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use log::{error, warn};
use std::sync::Arc;
use uuid::Uuid;

use crate::core::shared::state::AppState;

use super::error::CatalogError;
use super::filters::{parse_learner, require_learner, LearnerParams, ListCoursesParams};
use super::types::{
    CourseCreatedResponse, CourseDetailResponse, CourseListResponse, CreateCourseRequest,
    EnrollRequest, EnrollmentResponse, LanguageListResponse, PrerequisiteCheckResponse,
    UnenrollResponse,
};

fn log_failure(context: &'static str) -> impl Fn(CatalogError) -> CatalogError {
    move |e| {
        match &e {
            CatalogError::StoreUnavailable(_) => error!("{context}: {e}"),
            _ => warn!("{context}: {e}"),
        }
        e
    }
}

fn course_id_from(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, CatalogError> {
    path.map(|Path(id)| id)
        .map_err(|e| CatalogError::InvalidFilter(e.body_text()))
}

/// GET /api/courses
pub async fn handle_list_courses(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ListCoursesParams>, QueryRejection>,
) -> Result<Json<CourseListResponse>, CatalogError> {
    let Query(params) = params.map_err(|e| CatalogError::InvalidFilter(e.body_text()))?;
    let (filters, learner_id) = params
        .into_filters()
        .map_err(log_failure("Rejected course listing"))?;

    let catalog = state.catalog.clone();
    let courses = tokio::task::spawn_blocking(move || catalog.list_courses(&filters, learner_id))
        .await
        .map_err(CatalogError::from)
        .and_then(|r| r)
        .map_err(log_failure("Failed to fetch courses"))?;

    Ok(Json(CourseListResponse {
        total: courses.len(),
        courses,
        success: true,
    }))
}

/// POST /api/courses
pub async fn handle_create_course(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateCourseRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CourseCreatedResponse>), CatalogError> {
    let Json(req) = body.map_err(|e| CatalogError::Validation(e.body_text()))?;

    let catalog = state.catalog.clone();
    let course = tokio::task::spawn_blocking(move || catalog.create_course(req))
        .await
        .map_err(CatalogError::from)
        .and_then(|r| r)
        .map_err(log_failure("Failed to create course"))?;

    Ok((
        StatusCode::CREATED,
        Json(CourseCreatedResponse {
            course,
            success: true,
        }),
    ))
}

/// GET /api/courses/:id
pub async fn handle_get_course(
    State(state): State<Arc<AppState>>,
    path: Result<Path<Uuid>, PathRejection>,
    params: Result<Query<LearnerParams>, QueryRejection>,
) -> Result<Json<CourseDetailResponse>, CatalogError> {
    let course_id = course_id_from(path)?;
    let Query(params) = params.map_err(|e| CatalogError::InvalidFilter(e.body_text()))?;
    let learner_id = parse_learner(params.user_id.as_deref())?;

    let catalog = state.catalog.clone();
    let course = tokio::task::spawn_blocking(move || catalog.get_course(course_id, learner_id))
        .await
        .map_err(CatalogError::from)
        .and_then(|r| r)
        .map_err(log_failure("Failed to fetch course"))?;

    Ok(Json(CourseDetailResponse {
        course,
        success: true,
    }))
}

/// DELETE /api/courses/:id
pub async fn handle_deactivate_course(
    State(state): State<Arc<AppState>>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<serde_json::Value>, CatalogError> {
    let course_id = course_id_from(path)?;

    let catalog = state.catalog.clone();
    tokio::task::spawn_blocking(move || catalog.deactivate_course(course_id))
        .await
        .map_err(CatalogError::from)
        .and_then(|r| r)
        .map_err(log_failure("Failed to deactivate course"))?;

    Ok(Json(serde_json::json!({ "success": true })))
}

/// POST /api/courses/:id/enroll
pub async fn handle_enroll(
    State(state): State<Arc<AppState>>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<EnrollRequest>, JsonRejection>,
) -> Result<Json<EnrollmentResponse>, CatalogError> {
    let course_id = course_id_from(path)?;
    let Json(req) = body.map_err(|e| CatalogError::Validation(e.body_text()))?;

    let catalog = state.catalog.clone();
    let enrollment = tokio::task::spawn_blocking(move || catalog.enroll(course_id, req.user_id))
        .await
        .map_err(CatalogError::from)
        .and_then(|r| r)
        .map_err(log_failure("Course enrollment failed"))?;

    let message = if enrollment.already_enrolled {
        "Already enrolled in course"
    } else {
        "Successfully enrolled in course"
    };

    Ok(Json(EnrollmentResponse {
        message: message.to_string(),
        enrollment,
        success: true,
    }))
}

/// DELETE /api/courses/:id/enroll?userId=
pub async fn handle_unenroll(
    State(state): State<Arc<AppState>>,
    path: Result<Path<Uuid>, PathRejection>,
    params: Result<Query<LearnerParams>, QueryRejection>,
) -> Result<Json<UnenrollResponse>, CatalogError> {
    let course_id = course_id_from(path)?;
    let Query(params) = params.map_err(|e| CatalogError::InvalidFilter(e.body_text()))?;
    let learner_id = require_learner(params.user_id.as_deref())?;

    let catalog = state.catalog.clone();
    tokio::task::spawn_blocking(move || catalog.unenroll(course_id, learner_id))
        .await
        .map_err(CatalogError::from)
        .and_then(|r| r)
        .map_err(log_failure("Course unenrollment failed"))?;

    Ok(Json(UnenrollResponse {
        message: "Successfully unenrolled from course".to_string(),
        success: true,
    }))
}

/// GET /api/courses/:id/prerequisite-check?userId=
pub async fn handle_prerequisite_check(
    State(state): State<Arc<AppState>>,
    path: Result<Path<Uuid>, PathRejection>,
    params: Result<Query<LearnerParams>, QueryRejection>,
) -> Result<Json<PrerequisiteCheckResponse>, CatalogError> {
    let course_id = course_id_from(path)?;
    let Query(params) = params.map_err(|e| CatalogError::InvalidFilter(e.body_text()))?;
    let learner_id = require_learner(params.user_id.as_deref())?;

    let catalog = state.catalog.clone();
    let check =
        tokio::task::spawn_blocking(move || catalog.prerequisite_status(course_id, learner_id))
            .await
            .map_err(CatalogError::from)
            .and_then(|r| r)
            .map_err(log_failure("Course prerequisite check failed"))?;

    Ok(Json(PrerequisiteCheckResponse {
        check,
        success: true,
    }))
}

/// GET /api/languages
pub async fn handle_list_languages(
    State(state): State<Arc<AppState>>,
) -> Result<Json<LanguageListResponse>, CatalogError> {
    let catalog = state.catalog.clone();
    let languages = tokio::task::spawn_blocking(move || catalog.list_languages())
        .await
        .map_err(CatalogError::from)
        .and_then(|r| r)
        .map_err(log_failure("Failed to fetch languages"))?;

    Ok(Json(LanguageListResponse {
        languages,
        success: true,
    }))
}
