use chrono::Utc;
use log::{debug, info};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

use super::error::CatalogError;
use super::filters::{CourseFilters, CoursePredicate, CourseQuery};
use super::store::{
    course_row_to_course, language_row_to_info, language_row_to_language,
    learning_objectives_from_value, CatalogStore, CourseRow, LanguageRow, ProgressRow,
    StructureCounts,
};
use super::types::{
    Course, CourseSummary, CreateCourseRequest, Enrollment, Language, PrerequisiteCheck,
    PrerequisiteCounts, ProgressStatus, UserProgressSummary,
};

// ============================================================================
// CATALOG SERVICE
// ============================================================================

/// Aggregates courses, their structure and learner progress over a
/// [`CatalogStore`]. Holds no state of its own; every call re-reads the store.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    pub fn is_healthy(&self) -> bool {
        self.store.ping().is_ok()
    }

    // ----- Course Listing -----

    pub fn list_courses(
        &self,
        filters: &CourseFilters,
        learner_id: Option<Uuid>,
    ) -> Result<Vec<CourseSummary>, CatalogError> {
        let query = CourseQuery::from_filters(filters);
        let summaries = self.summarize(&query, learner_id)?;
        debug!(
            "Listed {} courses (language={:?}, level={:?}, learner={:?})",
            summaries.len(),
            filters.language_code,
            filters.level,
            learner_id
        );
        Ok(summaries)
    }

    pub fn get_course(
        &self,
        course_id: Uuid,
        learner_id: Option<Uuid>,
    ) -> Result<CourseSummary, CatalogError> {
        let query = CourseQuery::eligible().with(CoursePredicate::CourseId(course_id));
        self.summarize(&query, learner_id)?
            .into_iter()
            .next()
            .ok_or_else(|| CatalogError::NotFound(format!("course {course_id}")))
    }

    fn summarize(
        &self,
        query: &CourseQuery,
        learner_id: Option<Uuid>,
    ) -> Result<Vec<CourseSummary>, CatalogError> {
        let mut seen = HashSet::new();
        let rows: Vec<(CourseRow, LanguageRow)> = self
            .store
            .load_courses(query)?
            .into_iter()
            .filter(|(course, _)| seen.insert(course.id))
            .collect();

        let course_ids: Vec<Uuid> = rows.iter().map(|(course, _)| course.id).collect();
        let counts = self.store.structure_counts(&course_ids)?;
        let progress = match learner_id {
            Some(learner_id) => self.store.load_progress(learner_id, &course_ids)?,
            None => HashMap::new(),
        };

        let mut summaries: Vec<CourseSummary> = rows
            .into_iter()
            .map(|(course, language)| {
                let course_counts = counts.get(&course.id).copied().unwrap_or_default();
                let course_progress = progress.get(&course.id);
                build_summary(
                    course,
                    &language,
                    course_counts,
                    learner_id.is_some(),
                    course_progress,
                )
            })
            .collect();

        summaries.sort_by(|a, b| {
            a.language
                .name
                .cmp(&b.language.name)
                .then(a.level.cmp(&b.level))
        });
        Ok(summaries)
    }

    // ----- Course Operations -----

    pub fn create_course(&self, req: CreateCourseRequest) -> Result<Course, CatalogError> {
        let name = req.name.trim();
        if name.is_empty() {
            return Err(CatalogError::Validation("name must not be empty".to_string()));
        }
        let code = req.code.trim();
        if code.is_empty() {
            return Err(CatalogError::Validation("code must not be empty".to_string()));
        }
        if req.level < 0 {
            return Err(CatalogError::Validation(format!(
                "level must be a non-negative integer, got {}",
                req.level
            )));
        }
        if let Some(hours) = req.estimated_hours {
            if !hours.is_finite() || hours < 0.0 {
                return Err(CatalogError::Validation(format!(
                    "estimatedHours must be a non-negative number, got {hours}"
                )));
            }
        }

        let language = self.store.find_language(req.language_id)?.ok_or_else(|| {
            CatalogError::Validation(format!("language {} does not exist", req.language_id))
        })?;

        let prerequisites = req.prerequisites.unwrap_or_default();
        if !prerequisites.is_empty() {
            let existing: HashSet<Uuid> = self
                .store
                .existing_course_ids(&prerequisites)?
                .into_iter()
                .collect();
            if let Some(missing) = prerequisites.iter().find(|id| !existing.contains(id)) {
                return Err(CatalogError::Validation(format!(
                    "prerequisite course {missing} does not exist"
                )));
            }
        }

        if self.store.course_code_exists(language.id, code)? {
            return Err(CatalogError::DuplicateCourseCode {
                language_id: language.id,
                code: code.to_string(),
            });
        }

        let learning_objectives =
            serde_json::to_value(req.learning_objectives.unwrap_or_default())
                .map_err(|e| CatalogError::Validation(e.to_string()))?;

        let now = Utc::now();
        let row = CourseRow {
            id: Uuid::new_v4(),
            language_id: language.id,
            name: name.to_string(),
            code: code.to_string(),
            description: req.description,
            level: req.level,
            cefr_level: req.cefr_level,
            learning_objectives,
            estimated_hours: req.estimated_hours,
            prerequisites,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let stored = self.store.insert_course(row)?;
        info!(
            "Created course {} ({}) for language {}",
            stored.name, stored.code, language.code
        );
        Ok(course_row_to_course(stored))
    }

    pub fn deactivate_course(&self, course_id: Uuid) -> Result<(), CatalogError> {
        if !self.store.set_course_active(course_id, false)? {
            return Err(CatalogError::NotFound(format!("course {course_id}")));
        }
        info!("Deactivated course {course_id}");
        Ok(())
    }

    // ----- Enrollment Operations -----

    pub fn enroll(&self, course_id: Uuid, learner_id: Uuid) -> Result<Enrollment, CatalogError> {
        let course = self.load_active_course(course_id)?;

        let total_skills = self
            .store
            .structure_counts(&[course_id])?
            .get(&course_id)
            .map(|c| c.skills)
            .unwrap_or(0);

        if let Some(existing) = self
            .store
            .load_progress(learner_id, &[course_id])?
            .remove(&course_id)
        {
            return Ok(enrollment_from_progress(existing, total_skills, true));
        }

        let prerequisites = self.prerequisite_counts(&course, learner_id)?;
        if !prerequisites.is_met() {
            return Err(CatalogError::PrerequisitesNotMet {
                required: prerequisites.total,
                completed: prerequisites.completed,
            });
        }

        let progress = ProgressRow {
            id: Uuid::new_v4(),
            user_id: learner_id,
            course_id,
            status: ProgressStatus::InProgress.to_string(),
            enrollment_date: Utc::now(),
            completion_date: None,
            total_hours_spent: 0.0,
            skills_completed: 0,
            overall_score: None,
        };
        let (stored, created) = self.store.insert_progress_if_absent(progress)?;
        if created {
            info!("Learner {learner_id} enrolled in course {}", course.name);
        }
        Ok(enrollment_from_progress(stored, total_skills, !created))
    }

    pub fn unenroll(&self, course_id: Uuid, learner_id: Uuid) -> Result<(), CatalogError> {
        let removed = self.store.delete_progress(learner_id, course_id)?;
        if removed == 0 {
            return Err(CatalogError::NotFound(format!(
                "learner {learner_id} is not enrolled in course {course_id}"
            )));
        }
        info!("Learner {learner_id} unenrolled from course {course_id}");
        Ok(())
    }

    pub fn prerequisite_status(
        &self,
        course_id: Uuid,
        learner_id: Uuid,
    ) -> Result<PrerequisiteCheck, CatalogError> {
        let course = self.load_active_course(course_id)?;
        let is_enrolled = !self
            .store
            .load_progress(learner_id, &[course_id])?
            .is_empty();
        let prerequisites = self.prerequisite_counts(&course, learner_id)?;

        let message = match (prerequisites.is_met(), is_enrolled) {
            (false, _) => format!(
                "Complete {} prerequisite course(s) first.",
                prerequisites.missing
            ),
            (true, true) => "You are enrolled and can access this course.".to_string(),
            (true, false) => "All prerequisites met. You can enroll in this course.".to_string(),
        };

        Ok(PrerequisiteCheck {
            course_id,
            user_id: learner_id,
            is_enrolled,
            can_enroll: prerequisites.is_met() && !is_enrolled,
            prerequisites,
            message,
        })
    }

    fn load_active_course(&self, course_id: Uuid) -> Result<CourseRow, CatalogError> {
        let query = CourseQuery::eligible().with(CoursePredicate::CourseId(course_id));
        self.store
            .load_courses(&query)?
            .into_iter()
            .next()
            .map(|(course, _)| course)
            .ok_or_else(|| CatalogError::NotFound(format!("course {course_id}")))
    }

    /// Distinct prerequisites of `course` against the learner's completions.
    fn prerequisite_counts(
        &self,
        course: &CourseRow,
        learner_id: Uuid,
    ) -> Result<PrerequisiteCounts, CatalogError> {
        let mut seen = HashSet::new();
        let required: Vec<Uuid> = course
            .prerequisites
            .iter()
            .filter(|id| seen.insert(**id))
            .copied()
            .collect();
        if required.is_empty() {
            return Ok(PrerequisiteCounts::default());
        }
        let completed = self.store.count_completed(learner_id, &required)?;
        Ok(PrerequisiteCounts::new(required.len(), completed))
    }

    // ----- Language Operations -----

    pub fn list_languages(&self) -> Result<Vec<Language>, CatalogError> {
        Ok(self
            .store
            .list_languages(true)?
            .into_iter()
            .map(language_row_to_language)
            .collect())
    }
}

/// Shapes one course row into its summary. `with_learner` decides whether a
/// progress block is emitted at all; a learner without a progress row gets a
/// zero-filled block and `not_started`.
pub fn build_summary(
    course: CourseRow,
    language: &LanguageRow,
    counts: StructureCounts,
    with_learner: bool,
    progress: Option<&ProgressRow>,
) -> CourseSummary {
    let enrollment_status = progress
        .map(|p| p.status.clone())
        .unwrap_or_else(|| ProgressStatus::NotStarted.to_string());

    let user_progress = with_learner.then(|| match progress {
        Some(p) => UserProgressSummary {
            completion_date: p.completion_date,
            hours_spent: p.total_hours_spent,
            skills_completed: p.skills_completed,
            overall_score: p.overall_score,
        },
        None => UserProgressSummary::default(),
    });

    let learning_objectives = learning_objectives_from_value(course.id, &course.learning_objectives);

    CourseSummary {
        id: course.id,
        learning_objectives,
        name: course.name,
        code: course.code,
        description: course.description,
        level: course.level,
        cefr_level: course.cefr_level,
        language: language_row_to_info(language),
        estimated_hours: course.estimated_hours,
        total_skills: counts.skills,
        total_units: counts.units,
        enrollment_status,
        user_progress,
    }
}

fn enrollment_from_progress(
    progress: ProgressRow,
    total_skills: i64,
    already_enrolled: bool,
) -> Enrollment {
    Enrollment {
        course_id: progress.course_id,
        user_id: progress.user_id,
        status: progress.status,
        enrollment_date: progress.enrollment_date,
        total_skills,
        already_enrolled,
    }
}
