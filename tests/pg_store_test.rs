//! Runs the PostgreSQL store against a live database. Skipped unless
//! `DATABASE_URL` points at a reachable server.

use diesel::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

use course_catalog::catalog::store::LanguageRow;
use course_catalog::catalog::{
    CatalogError, CatalogService, CourseFilters, CreateCourseRequest, PgCatalogStore,
};
use course_catalog::core::config::DatabaseConfig;
use course_catalog::core::shared::schema::catalog::{
    course_progress, course_skills, course_units, courses, languages,
};
use course_catalog::core::shared::utils::{create_conn, run_migrations, DbPool};

fn connect() -> Option<DbPool> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) if !url.is_empty() => url,
        _ => {
            println!("Skipping test - DATABASE_URL not set");
            return None;
        }
    };
    let config = DatabaseConfig {
        url,
        max_connections: 2,
        connect_timeout_secs: 5,
        statement_timeout_ms: 10_000,
        run_migrations: true,
    };
    let pool = match create_conn(&config) {
        Ok(pool) => pool,
        Err(e) => {
            println!("Skipping test - Cannot connect to PostgreSQL: {e}");
            return None;
        }
    };
    run_migrations(&pool).unwrap();
    Some(pool)
}

fn seed_language(pool: &DbPool) -> LanguageRow {
    let suffix = Uuid::new_v4().simple().to_string();
    let row = LanguageRow {
        id: Uuid::new_v4(),
        code: format!("t-{}", &suffix[..12]),
        name: format!("Test Language {}", &suffix[..12]),
        native_name: "Test".to_string(),
        active: true,
    };
    let mut conn = pool.get().unwrap();
    diesel::insert_into(languages::table)
        .values(&row)
        .execute(&mut conn)
        .unwrap();
    row
}

fn cleanup(pool: &DbPool, language_id: Uuid) {
    let mut conn = pool.get().unwrap();
    let course_ids: Vec<Uuid> = courses::table
        .filter(courses::language_id.eq(language_id))
        .select(courses::id)
        .load(&mut conn)
        .unwrap();
    diesel::delete(course_progress::table.filter(course_progress::course_id.eq_any(course_ids.clone())))
        .execute(&mut conn)
        .unwrap();
    diesel::delete(course_skills::table.filter(course_skills::course_id.eq_any(course_ids.clone())))
        .execute(&mut conn)
        .unwrap();
    diesel::delete(course_units::table.filter(course_units::course_id.eq_any(course_ids.clone())))
        .execute(&mut conn)
        .unwrap();
    diesel::delete(courses::table.filter(courses::language_id.eq(language_id)))
        .execute(&mut conn)
        .unwrap();
    diesel::delete(languages::table.find(language_id))
        .execute(&mut conn)
        .unwrap();
}

fn request(language_id: Uuid, code: &str) -> CreateCourseRequest {
    CreateCourseRequest {
        language_id,
        name: format!("Course {code}"),
        code: code.to_string(),
        description: None,
        level: 1,
        cefr_level: Some("A1".to_string()),
        learning_objectives: Some(vec!["z".into(), "a".into(), "m".into()]),
        estimated_hours: Some(30.0),
        prerequisites: None,
    }
}

#[test]
fn test_postgres_counts_and_progress() {
    let Some(pool) = connect() else {
        return;
    };
    let language = seed_language(&pool);
    let service = CatalogService::new(Arc::new(PgCatalogStore::new(pool.clone())));

    let course = service.create_course(request(language.id, "PG-1")).unwrap();
    {
        let mut conn = pool.get().unwrap();
        for _ in 0..3 {
            let skill_id = Uuid::new_v4();
            for position in 0..2 {
                diesel::insert_into(course_skills::table)
                    .values((
                        course_skills::id.eq(Uuid::new_v4()),
                        course_skills::course_id.eq(course.id),
                        course_skills::skill_id.eq(skill_id),
                        course_skills::position.eq(position),
                    ))
                    .execute(&mut conn)
                    .unwrap();
            }
        }
        for position in 0..5 {
            diesel::insert_into(course_units::table)
                .values((
                    course_units::id.eq(Uuid::new_v4()),
                    course_units::course_id.eq(course.id),
                    course_units::name.eq(format!("Unit {position}")),
                    course_units::position.eq(position),
                ))
                .execute(&mut conn)
                .unwrap();
        }
    }

    let filters = CourseFilters {
        language_code: Some(language.code.clone()),
        level: None,
    };
    let learner = Uuid::new_v4();
    let listed = service.list_courses(&filters, Some(learner));
    let enrolled = service.enroll(course.id, learner);
    let relisted = service.list_courses(&filters, Some(learner));
    cleanup(&pool, language.id);

    let listed = listed.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].total_skills, 3);
    assert_eq!(listed[0].total_units, 5);
    assert_eq!(listed[0].enrollment_status, "not_started");
    assert!(listed[0].user_progress.is_some());
    assert_eq!(listed[0].learning_objectives, vec!["z", "a", "m"]);

    assert_eq!(enrolled.unwrap().total_skills, 3);
    assert_eq!(relisted.unwrap()[0].enrollment_status, "in_progress");
}

#[test]
fn test_postgres_rejects_duplicate_course_code() {
    let Some(pool) = connect() else {
        return;
    };
    let language = seed_language(&pool);
    let service = CatalogService::new(Arc::new(PgCatalogStore::new(pool.clone())));

    let first = service.create_course(request(language.id, "PG-DUP"));
    let second = service.create_course(request(language.id, "PG-DUP"));
    let count: i64 = {
        let mut conn = pool.get().unwrap();
        courses::table
            .filter(courses::language_id.eq(language.id))
            .count()
            .get_result(&mut conn)
            .unwrap()
    };
    cleanup(&pool, language.id);

    assert!(first.is_ok());
    assert!(matches!(
        second,
        Err(CatalogError::DuplicateCourseCode { .. })
    ));
    assert_eq!(count, 1);
}
