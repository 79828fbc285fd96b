//! In-process [`CatalogStore`] used by the test suites and local demos.
//!
//! Tables are plain vectors behind a lock. Child rows are kept as raw rows so
//! that duplicate skill links or stray progress rows behave the way they would
//! in PostgreSQL.

use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use super::error::CatalogError;
use super::filters::CourseQuery;
use super::store::{CatalogStore, CourseRow, LanguageRow, ProgressRow, StructureCounts};
use super::types::ProgressStatus;

#[derive(Debug, Default)]
struct MemoryTables {
    languages: Vec<LanguageRow>,
    courses: Vec<CourseRow>,
    skills: Vec<(Uuid, Uuid)>,
    units: Vec<(Uuid, Uuid)>,
    progress: Vec<ProgressRow>,
}

#[derive(Debug)]
pub struct MemoryCatalogStore {
    tables: RwLock<MemoryTables>,
    available: AtomicBool,
}

impl Default for MemoryCatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(MemoryTables::default()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulates losing (or regaining) the connection to the store.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn add_language(&self, code: &str, name: &str, native_name: &str) -> LanguageRow {
        let row = LanguageRow {
            id: Uuid::new_v4(),
            code: code.to_string(),
            name: name.to_string(),
            native_name: native_name.to_string(),
            active: true,
        };
        self.write_unchecked().languages.push(row.clone());
        row
    }

    /// Links a skill to a course. Linking the same skill twice is allowed and
    /// must not change the course's skill count.
    pub fn add_skill(&self, course_id: Uuid, skill_id: Uuid) {
        self.write_unchecked().skills.push((course_id, skill_id));
    }

    pub fn add_unit(&self, course_id: Uuid) -> Uuid {
        let unit_id = Uuid::new_v4();
        self.write_unchecked().units.push((course_id, unit_id));
        unit_id
    }

    /// Inserts a raw progress row, bypassing the one-row-per-learner check.
    pub fn add_progress(&self, progress: ProgressRow) {
        self.write_unchecked().progress.push(progress);
    }

    pub fn course_count(&self) -> usize {
        self.read_unchecked().courses.len()
    }

    fn read_unchecked(&self) -> RwLockReadGuard<'_, MemoryTables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_unchecked(&self) -> RwLockWriteGuard<'_, MemoryTables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_available(&self) -> Result<(), CatalogError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CatalogError::StoreUnavailable(
                "in-memory store is offline".to_string(),
            ))
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryTables>, CatalogError> {
        self.check_available()?;
        Ok(self.read_unchecked())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryTables>, CatalogError> {
        self.check_available()?;
        Ok(self.write_unchecked())
    }
}

impl CatalogStore for MemoryCatalogStore {
    fn ping(&self) -> Result<(), CatalogError> {
        self.check_available()
    }

    fn list_languages(&self, active_only: bool) -> Result<Vec<LanguageRow>, CatalogError> {
        let tables = self.read()?;
        let mut rows: Vec<LanguageRow> = tables
            .languages
            .iter()
            .filter(|l| !active_only || l.active)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    fn find_language(&self, language_id: Uuid) -> Result<Option<LanguageRow>, CatalogError> {
        let tables = self.read()?;
        Ok(tables
            .languages
            .iter()
            .find(|l| l.id == language_id)
            .cloned())
    }

    fn load_courses(
        &self,
        query: &CourseQuery,
    ) -> Result<Vec<(CourseRow, LanguageRow)>, CatalogError> {
        let tables = self.read()?;
        let languages: HashMap<Uuid, &LanguageRow> =
            tables.languages.iter().map(|l| (l.id, l)).collect();

        let mut rows: Vec<(CourseRow, LanguageRow)> = tables
            .courses
            .iter()
            .filter_map(|course| {
                let language = languages.get(&course.language_id)?;
                query
                    .matches(course, language)
                    .then(|| (course.clone(), (*language).clone()))
            })
            .collect();

        rows.sort_by(|(ca, la), (cb, lb)| {
            la.name
                .cmp(&lb.name)
                .then(ca.level.cmp(&cb.level))
                .then(ca.name.cmp(&cb.name))
        });
        Ok(rows)
    }

    fn structure_counts(
        &self,
        course_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, StructureCounts>, CatalogError> {
        let tables = self.read()?;
        let wanted: HashSet<&Uuid> = course_ids.iter().collect();

        let mut skills: HashMap<Uuid, HashSet<Uuid>> = HashMap::new();
        for (course_id, skill_id) in tables.skills.iter().filter(|(c, _)| wanted.contains(c)) {
            skills.entry(*course_id).or_default().insert(*skill_id);
        }
        let mut units: HashMap<Uuid, HashSet<Uuid>> = HashMap::new();
        for (course_id, unit_id) in tables.units.iter().filter(|(c, _)| wanted.contains(c)) {
            units.entry(*course_id).or_default().insert(*unit_id);
        }

        let mut counts: HashMap<Uuid, StructureCounts> = HashMap::new();
        for (course_id, set) in skills {
            counts.entry(course_id).or_default().skills = set.len() as i64;
        }
        for (course_id, set) in units {
            counts.entry(course_id).or_default().units = set.len() as i64;
        }
        Ok(counts)
    }

    fn load_progress(
        &self,
        learner_id: Uuid,
        course_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, ProgressRow>, CatalogError> {
        let tables = self.read()?;
        let wanted: HashSet<&Uuid> = course_ids.iter().collect();

        let mut rows: Vec<&ProgressRow> = tables
            .progress
            .iter()
            .filter(|p| p.user_id == learner_id && wanted.contains(&p.course_id))
            .collect();
        rows.sort_by_key(|p| p.enrollment_date);

        let mut by_course = HashMap::new();
        for row in rows {
            by_course.entry(row.course_id).or_insert_with(|| row.clone());
        }
        Ok(by_course)
    }

    fn course_code_exists(&self, language_id: Uuid, code: &str) -> Result<bool, CatalogError> {
        let tables = self.read()?;
        Ok(tables
            .courses
            .iter()
            .any(|c| c.language_id == language_id && c.code == code))
    }

    fn existing_course_ids(&self, course_ids: &[Uuid]) -> Result<Vec<Uuid>, CatalogError> {
        let tables = self.read()?;
        Ok(course_ids
            .iter()
            .filter(|id| tables.courses.iter().any(|c| c.id == **id))
            .copied()
            .collect())
    }

    fn insert_course(&self, course: CourseRow) -> Result<CourseRow, CatalogError> {
        let mut tables = self.write()?;
        if tables
            .courses
            .iter()
            .any(|c| c.language_id == course.language_id && c.code == course.code)
        {
            return Err(CatalogError::DuplicateCourseCode {
                language_id: course.language_id,
                code: course.code,
            });
        }
        tables.courses.push(course.clone());
        Ok(course)
    }

    fn set_course_active(&self, course_id: Uuid, active: bool) -> Result<bool, CatalogError> {
        let mut tables = self.write()?;
        match tables.courses.iter_mut().find(|c| c.id == course_id) {
            Some(course) => {
                course.is_active = active;
                course.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn count_completed(
        &self,
        learner_id: Uuid,
        course_ids: &[Uuid],
    ) -> Result<usize, CatalogError> {
        let tables = self.read()?;
        let completed: HashSet<Uuid> = tables
            .progress
            .iter()
            .filter(|p| {
                p.user_id == learner_id
                    && course_ids.contains(&p.course_id)
                    && p.status == ProgressStatus::Completed.as_str()
            })
            .map(|p| p.course_id)
            .collect();
        Ok(completed.len())
    }

    fn delete_progress(&self, learner_id: Uuid, course_id: Uuid) -> Result<usize, CatalogError> {
        let mut tables = self.write()?;
        let before = tables.progress.len();
        tables
            .progress
            .retain(|p| !(p.user_id == learner_id && p.course_id == course_id));
        Ok(before - tables.progress.len())
    }

    fn insert_progress_if_absent(
        &self,
        progress: ProgressRow,
    ) -> Result<(ProgressRow, bool), CatalogError> {
        let mut tables = self.write()?;
        if let Some(existing) = tables
            .progress
            .iter()
            .find(|p| p.user_id == progress.user_id && p.course_id == progress.course_id)
        {
            return Ok((existing.clone(), false));
        }
        tables.progress.push(progress.clone());
        Ok((progress, true))
    }
}
