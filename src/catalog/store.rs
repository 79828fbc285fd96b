use chrono::{DateTime, Utc};
use diesel::prelude::*;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::core::shared::schema::catalog::{course_progress, courses, languages};

use super::error::CatalogError;
use super::filters::CourseQuery;
use super::types::{Course, Language, LanguageInfo};

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = languages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LanguageRow {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub native_name: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = courses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CourseRow {
    pub id: Uuid,
    pub language_id: Uuid,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub level: i32,
    pub cefr_level: Option<String>,
    pub learning_objectives: serde_json::Value,
    pub estimated_hours: Option<f64>,
    pub prerequisites: Vec<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = course_progress)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProgressRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub status: String,
    pub enrollment_date: DateTime<Utc>,
    pub completion_date: Option<DateTime<Utc>>,
    pub total_hours_spent: f64,
    pub skills_completed: i32,
    pub overall_score: Option<f64>,
}

/// Distinct child counts for one course, computed per dimension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StructureCounts {
    pub skills: i64,
    pub units: i64,
}

/// Read/write capability the catalog service is built on.
///
/// Implementations are blocking; async callers go through
/// `tokio::task::spawn_blocking`.
pub trait CatalogStore: Send + Sync {
    fn ping(&self) -> Result<(), CatalogError>;

    /// Languages ordered by name.
    fn list_languages(&self, active_only: bool) -> Result<Vec<LanguageRow>, CatalogError>;

    fn find_language(&self, language_id: Uuid) -> Result<Option<LanguageRow>, CatalogError>;

    /// Courses matching every predicate of `query`, joined to their language
    /// and ordered by language name then level.
    fn load_courses(&self, query: &CourseQuery)
        -> Result<Vec<(CourseRow, LanguageRow)>, CatalogError>;

    /// Courses without any skill or unit may be missing from the map.
    fn structure_counts(
        &self,
        course_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, StructureCounts>, CatalogError>;

    /// At most one progress row per course for `learner_id`.
    fn load_progress(
        &self,
        learner_id: Uuid,
        course_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, ProgressRow>, CatalogError>;

    fn course_code_exists(&self, language_id: Uuid, code: &str) -> Result<bool, CatalogError>;

    /// Subset of `course_ids` that exist, active or not.
    fn existing_course_ids(&self, course_ids: &[Uuid]) -> Result<Vec<Uuid>, CatalogError>;

    /// Inserts atomically; a code clash detected at write time is reported as
    /// `DuplicateCourseCode` and leaves the store untouched.
    fn insert_course(&self, course: CourseRow) -> Result<CourseRow, CatalogError>;

    /// Returns `false` when no course has that id.
    fn set_course_active(&self, course_id: Uuid, active: bool) -> Result<bool, CatalogError>;

    fn count_completed(&self, learner_id: Uuid, course_ids: &[Uuid])
        -> Result<usize, CatalogError>;

    /// Removes every progress row the learner holds for the course and returns
    /// how many were removed.
    fn delete_progress(&self, learner_id: Uuid, course_id: Uuid) -> Result<usize, CatalogError>;

    /// Inserts unless the learner already has a row for the course. Returns the
    /// stored row and whether it was created by this call.
    fn insert_progress_if_absent(
        &self,
        progress: ProgressRow,
    ) -> Result<(ProgressRow, bool), CatalogError>;
}

/// Stored objectives that are not a JSON array of strings are reported and
/// read back as an empty list.
pub fn learning_objectives_from_value(course_id: Uuid, value: &serde_json::Value) -> Vec<String> {
    match serde_json::from_value(value.clone()) {
        Ok(objectives) => objectives,
        Err(e) => {
            warn!("Course {course_id} has malformed learning_objectives ({e}): {value}");
            Vec::new()
        }
    }
}

pub fn course_row_to_course(row: CourseRow) -> Course {
    let learning_objectives = learning_objectives_from_value(row.id, &row.learning_objectives);
    Course {
        id: row.id,
        language_id: row.language_id,
        name: row.name,
        code: row.code,
        description: row.description,
        level: row.level,
        cefr_level: row.cefr_level,
        learning_objectives,
        estimated_hours: row.estimated_hours,
        prerequisites: row.prerequisites,
        is_active: row.is_active,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

pub fn language_row_to_language(row: LanguageRow) -> Language {
    Language {
        id: row.id,
        code: row.code,
        name: row.name,
        native_name: row.native_name,
    }
}

pub fn language_row_to_info(row: &LanguageRow) -> LanguageInfo {
    LanguageInfo {
        code: row.code.clone(),
        name: row.name.clone(),
        native_name: row.native_name.clone(),
    }
}
