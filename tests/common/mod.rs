#![allow(dead_code)]

use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tempfile::TempDir;

use registrar::db::repository;
use registrar::models::NewCourseRequest;

/// File-backed database so every pool connection sees the same data; an
/// in-memory SQLite database exists per connection.
pub async fn setup_db() -> (TempDir, SqlitePool) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("registrar.db").display()
    );

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect(&url)
        .await
        .expect("Failed to open test db");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    (dir, pool)
}

/// Creates a course, an instructor, and one offering; returns
/// (offering_id, instructor_id).
pub async fn seed_offering(
    pool: &SqlitePool,
    code: &str,
    credits: i64,
    capacity: i64,
) -> (String, String) {
    let course = repository::insert_course(
        pool,
        NewCourseRequest {
            id: code.to_string(),
            name: format!("Course {code}"),
            credits,
        },
    )
    .await
    .expect("Failed to insert course");

    let instructor = repository::insert_instructor(pool, &format!("Instructor {code}"))
        .await
        .expect("Failed to insert instructor");

    let offering = repository::insert_offering(pool, &course.id, &instructor.id, capacity)
        .await
        .expect("Failed to insert offering");

    (offering.id, instructor.id)
}

pub async fn seed_student(pool: &SqlitePool, name: &str) -> String {
    repository::insert_student(pool, name)
        .await
        .expect("Failed to insert student")
        .id
}
