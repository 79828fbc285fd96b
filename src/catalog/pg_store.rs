use chrono::Utc;
use diesel::dsl::{count_distinct, exists, AsSelect, InnerJoin, IntoBoxed, Select};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use diesel::result::DatabaseErrorKind;
use std::collections::HashMap;
use uuid::Uuid;

use crate::core::shared::schema::catalog::{
    course_progress, course_skills, course_units, courses, languages,
};
use crate::core::shared::utils::DbPool;

use super::error::CatalogError;
use super::filters::{CoursePredicate, CourseQuery};
use super::store::{CatalogStore, CourseRow, LanguageRow, ProgressRow, StructureCounts};
use super::types::ProgressStatus;

type PgPooledConn = PooledConnection<ConnectionManager<PgConnection>>;

type CourseListing<'a> = IntoBoxed<
    'a,
    Select<
        InnerJoin<courses::table, languages::table>,
        (AsSelect<CourseRow, Pg>, AsSelect<LanguageRow, Pg>),
    >,
    Pg,
>;

/// Courses joined to their language, one bound filter per predicate, ordered
/// by language name then level.
fn course_listing(query: &CourseQuery) -> CourseListing<'static> {
    let mut db_query = courses::table
        .inner_join(languages::table)
        .select((CourseRow::as_select(), LanguageRow::as_select()))
        .into_boxed();

    for predicate in query.predicates() {
        db_query = match predicate {
            CoursePredicate::Active => db_query.filter(courses::is_active.eq(true)),
            CoursePredicate::CourseId(id) => db_query.filter(courses::id.eq(*id)),
            CoursePredicate::LanguageCode(code) => {
                db_query.filter(languages::code.eq(code.clone()))
            }
            CoursePredicate::Level(level) => db_query.filter(courses::level.eq(*level)),
        };
    }

    db_query.order((
        languages::name.asc(),
        courses::level.asc(),
        courses::name.asc(),
    ))
}

/// Per-course `COUNT(DISTINCT ..)` over one child table. Each child table gets
/// its own statement; joining skills and units together would multiply them.
macro_rules! distinct_count_by_course {
    ($child:ident, $counted:ident, $course_ids:expr) => {
        $child::table
            .filter($child::course_id.eq_any($course_ids))
            .group_by($child::course_id)
            .select(($child::course_id, count_distinct($child::$counted)))
    };
}

/// PostgreSQL store backed by the shared r2d2 pool.
pub struct PgCatalogStore {
    pool: DbPool,
}

impl PgCatalogStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<PgPooledConn, CatalogError> {
        Ok(self.pool.get()?)
    }
}

fn code_taken(
    conn: &mut PgConnection,
    language_id: Uuid,
    code: &str,
) -> Result<bool, diesel::result::Error> {
    diesel::select(exists(
        courses::table
            .filter(courses::language_id.eq(language_id))
            .filter(courses::code.eq(code)),
    ))
    .get_result(conn)
}

impl CatalogStore for PgCatalogStore {
    fn ping(&self) -> Result<(), CatalogError> {
        let mut conn = self.conn()?;
        diesel::sql_query("SELECT 1").execute(&mut conn)?;
        Ok(())
    }

    fn list_languages(&self, active_only: bool) -> Result<Vec<LanguageRow>, CatalogError> {
        let mut conn = self.conn()?;

        let mut query = languages::table
            .select(LanguageRow::as_select())
            .into_boxed();
        if active_only {
            query = query.filter(languages::active.eq(true));
        }

        Ok(query.order(languages::name.asc()).load(&mut conn)?)
    }

    fn find_language(&self, language_id: Uuid) -> Result<Option<LanguageRow>, CatalogError> {
        let mut conn = self.conn()?;

        Ok(languages::table
            .find(language_id)
            .select(LanguageRow::as_select())
            .first(&mut conn)
            .optional()?)
    }

    fn load_courses(
        &self,
        query: &CourseQuery,
    ) -> Result<Vec<(CourseRow, LanguageRow)>, CatalogError> {
        let mut conn = self.conn()?;

        Ok(course_listing(query).load::<(CourseRow, LanguageRow)>(&mut conn)?)
    }

    fn structure_counts(
        &self,
        course_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, StructureCounts>, CatalogError> {
        if course_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut conn = self.conn()?;

        let skills: Vec<(Uuid, i64)> =
            distinct_count_by_course!(course_skills, skill_id, course_ids.to_vec())
                .load(&mut conn)?;
        let units: Vec<(Uuid, i64)> =
            distinct_count_by_course!(course_units, id, course_ids.to_vec()).load(&mut conn)?;

        let mut counts: HashMap<Uuid, StructureCounts> = HashMap::new();
        for (course_id, total) in skills {
            counts.entry(course_id).or_default().skills = total;
        }
        for (course_id, total) in units {
            counts.entry(course_id).or_default().units = total;
        }
        Ok(counts)
    }

    fn load_progress(
        &self,
        learner_id: Uuid,
        course_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, ProgressRow>, CatalogError> {
        if course_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut conn = self.conn()?;

        let rows: Vec<ProgressRow> = course_progress::table
            .filter(course_progress::user_id.eq(learner_id))
            .filter(course_progress::course_id.eq_any(course_ids.to_vec()))
            .order(course_progress::enrollment_date.asc())
            .select(ProgressRow::as_select())
            .load(&mut conn)?;

        let mut by_course = HashMap::with_capacity(rows.len());
        for row in rows {
            by_course.entry(row.course_id).or_insert(row);
        }
        Ok(by_course)
    }

    fn course_code_exists(&self, language_id: Uuid, code: &str) -> Result<bool, CatalogError> {
        let mut conn = self.conn()?;
        Ok(code_taken(&mut conn, language_id, code)?)
    }

    fn existing_course_ids(&self, course_ids: &[Uuid]) -> Result<Vec<Uuid>, CatalogError> {
        if course_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn()?;

        Ok(courses::table
            .filter(courses::id.eq_any(course_ids.to_vec()))
            .select(courses::id)
            .load(&mut conn)?)
    }

    fn insert_course(&self, course: CourseRow) -> Result<CourseRow, CatalogError> {
        let mut conn = self.conn()?;
        let duplicate = || CatalogError::DuplicateCourseCode {
            language_id: course.language_id,
            code: course.code.clone(),
        };

        conn.transaction::<CourseRow, CatalogError, _>(|conn| {
            if code_taken(conn, course.language_id, &course.code)? {
                return Err(duplicate());
            }

            diesel::insert_into(courses::table)
                .values(&course)
                .returning(CourseRow::as_returning())
                .get_result(conn)
                .map_err(|e| match e {
                    diesel::result::Error::DatabaseError(
                        DatabaseErrorKind::UniqueViolation,
                        _,
                    ) => duplicate(),
                    other => other.into(),
                })
        })
    }

    fn set_course_active(&self, course_id: Uuid, active: bool) -> Result<bool, CatalogError> {
        let mut conn = self.conn()?;

        let updated = diesel::update(courses::table.find(course_id))
            .set((
                courses::is_active.eq(active),
                courses::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;
        Ok(updated > 0)
    }

    fn count_completed(
        &self,
        learner_id: Uuid,
        course_ids: &[Uuid],
    ) -> Result<usize, CatalogError> {
        if course_ids.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn()?;

        let completed: i64 = course_progress::table
            .filter(course_progress::user_id.eq(learner_id))
            .filter(course_progress::course_id.eq_any(course_ids.to_vec()))
            .filter(course_progress::status.eq(ProgressStatus::Completed.as_str()))
            .select(count_distinct(course_progress::course_id))
            .get_result(&mut conn)?;
        Ok(usize::try_from(completed).unwrap_or_default())
    }

    fn delete_progress(&self, learner_id: Uuid, course_id: Uuid) -> Result<usize, CatalogError> {
        let mut conn = self.conn()?;

        Ok(diesel::delete(
            course_progress::table
                .filter(course_progress::user_id.eq(learner_id))
                .filter(course_progress::course_id.eq(course_id)),
        )
        .execute(&mut conn)?)
    }

    fn insert_progress_if_absent(
        &self,
        progress: ProgressRow,
    ) -> Result<(ProgressRow, bool), CatalogError> {
        let mut conn = self.conn()?;

        let inserted = diesel::insert_into(course_progress::table)
            .values(&progress)
            .on_conflict((course_progress::user_id, course_progress::course_id))
            .do_nothing()
            .execute(&mut conn)?;

        let stored = course_progress::table
            .filter(course_progress::user_id.eq(progress.user_id))
            .filter(course_progress::course_id.eq(progress.course_id))
            .select(ProgressRow::as_select())
            .first(&mut conn)?;

        Ok((stored, inserted > 0))
    }
}
