use chrono::Utc;
use sqlx::{Sqlite, SqlitePool};
use uuid::Uuid;

use crate::models::{
    AttendanceStatus, Course, Enrollment, Instructor, NewCourseRequest, Offering, OfferingSummary,
    RosterEntry, Student,
};

pub async fn fetch_courses(db: &SqlitePool) -> Result<Vec<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(
        "SELECT id, name, credits, created_at FROM courses ORDER BY id",
    )
    .fetch_all(db)
    .await
}

pub async fn find_course_by_id(db: &SqlitePool, id: &str) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>("SELECT id, name, credits, created_at FROM courses WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn insert_course(db: &SqlitePool, req: NewCourseRequest) -> Result<Course, sqlx::Error> {
    let now = Utc::now().to_rfc3339();

    sqlx::query("INSERT INTO courses (id, name, credits, created_at) VALUES (?, ?, ?, ?)")
        .bind(&req.id)
        .bind(&req.name)
        .bind(req.credits)
        .bind(&now)
        .execute(db)
        .await?;

    Ok(Course {
        id: req.id,
        name: req.name,
        credits: req.credits,
        created_at: now,
    })
}

pub async fn delete_course(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM courses WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_offerings_for_course(db: &SqlitePool, course_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM offerings WHERE course_id = ?")
        .bind(course_id)
        .fetch_one(db)
        .await
}

pub async fn insert_instructor(db: &SqlitePool, name: &str) -> Result<Instructor, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    sqlx::query("INSERT INTO instructors (id, name) VALUES (?, ?)")
        .bind(&id)
        .bind(name)
        .execute(db)
        .await?;
    Ok(Instructor {
        id,
        name: name.to_string(),
    })
}

pub async fn find_instructor_by_id(
    db: &SqlitePool,
    id: &str,
) -> Result<Option<Instructor>, sqlx::Error> {
    sqlx::query_as::<_, Instructor>("SELECT id, name FROM instructors WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn insert_student(db: &SqlitePool, name: &str) -> Result<Student, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    sqlx::query("INSERT INTO students (id, name) VALUES (?, ?)")
        .bind(&id)
        .bind(name)
        .execute(db)
        .await?;
    Ok(Student {
        id,
        name: name.to_string(),
    })
}

pub async fn find_student_by_id(db: &SqlitePool, id: &str) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>("SELECT id, name FROM students WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn insert_offering(
    db: &SqlitePool,
    course_id: &str,
    instructor_id: &str,
    capacity: i64,
) -> Result<Offering, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        "INSERT INTO offerings (id, course_id, instructor_id, capacity, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(course_id)
    .bind(instructor_id)
    .bind(capacity)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(Offering {
        id,
        course_id: course_id.to_string(),
        instructor_id: instructor_id.to_string(),
        capacity,
        created_at: now,
    })
}

pub async fn find_offering_by_id(
    db: &SqlitePool,
    id: &str,
) -> Result<Option<Offering>, sqlx::Error> {
    sqlx::query_as::<_, Offering>(
        "SELECT id, course_id, instructor_id, capacity, created_at FROM offerings WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

/// Offering plus the credit value of its course, for constraint validation.
#[derive(Debug, sqlx::FromRow)]
pub struct OfferingWithCredits {
    pub id: String,
    pub instructor_id: String,
    pub capacity: i64,
    pub credits: i64,
}

pub async fn find_offering_with_credits(
    db: &SqlitePool,
    id: &str,
) -> Result<Option<OfferingWithCredits>, sqlx::Error> {
    sqlx::query_as::<_, OfferingWithCredits>(
        r#"
        SELECT o.id AS id, o.instructor_id AS instructor_id, o.capacity AS capacity, c.credits AS credits
        FROM offerings o
        JOIN courses c ON c.id = o.course_id
        WHERE o.id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn delete_offering(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM offerings WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn offering_exists_for_pair(
    db: &SqlitePool,
    course_id: &str,
    instructor_id: &str,
) -> Result<bool, sqlx::Error> {
    let n: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM offerings WHERE course_id = ? AND instructor_id = ?")
            .bind(course_id)
            .bind(instructor_id)
            .fetch_one(db)
            .await?;
    Ok(n > 0)
}

/// Offerings joined with course/instructor display fields; seat counts are
/// derived from the enrollment table in the same read, never stored.
pub async fn fetch_offerings_with_counts(
    db: &SqlitePool,
) -> Result<Vec<OfferingSummary>, sqlx::Error> {
    sqlx::query_as::<_, OfferingSummary>(
        r#"
        SELECT
            o.id AS offering_id,
            c.id AS course_id,
            c.name AS course_name,
            c.credits AS credits,
            i.id AS instructor_id,
            i.name AS instructor_name,
            o.capacity AS capacity,
            COUNT(e.id) AS enrolled_count,
            CASE WHEN o.capacity - COUNT(e.id) > 0
                 THEN o.capacity - COUNT(e.id)
                 ELSE 0
            END AS available_seats
        FROM offerings o
        JOIN courses c ON c.id = o.course_id
        JOIN instructors i ON i.id = o.instructor_id
        LEFT JOIN enrollments e ON e.offering_id = o.id
        GROUP BY o.id
        ORDER BY c.id, i.name
        "#,
    )
    .fetch_all(db)
    .await
}

/// Live enrollment count for one offering. Callers that need the count for a
/// commit decision must run this on the commit transaction, not the pool.
pub async fn enrolled_count<'e, E>(executor: E, offering_id: &str) -> Result<i64, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar("SELECT COUNT(*) FROM enrollments WHERE offering_id = ?")
        .bind(offering_id)
        .fetch_one(executor)
        .await
}

pub async fn is_enrolled<'e, E>(
    executor: E,
    student_id: &str,
    offering_id: &str,
) -> Result<bool, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let n: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM enrollments WHERE student_id = ? AND offering_id = ?")
            .bind(student_id)
            .bind(offering_id)
            .fetch_one(executor)
            .await?;
    Ok(n > 0)
}

pub async fn insert_enrollment<'e, E>(
    executor: E,
    student_id: &str,
    offering_id: &str,
    enrolled_at: &str,
) -> Result<Enrollment, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO enrollments (id, student_id, offering_id, enrolled_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(student_id)
    .bind(offering_id)
    .bind(enrolled_at)
    .execute(executor)
    .await?;

    Ok(Enrollment {
        id,
        student_id: student_id.to_string(),
        offering_id: offering_id.to_string(),
        enrolled_at: enrolled_at.to_string(),
    })
}

pub async fn fetch_enrollments_for_student(
    db: &SqlitePool,
    student_id: &str,
) -> Result<Vec<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(
        "SELECT id, student_id, offering_id, enrolled_at FROM enrollments WHERE student_id = ? ORDER BY enrolled_at",
    )
    .bind(student_id)
    .fetch_all(db)
    .await
}

pub async fn roster_for_offering(
    db: &SqlitePool,
    offering_id: &str,
) -> Result<Vec<RosterEntry>, sqlx::Error> {
    sqlx::query_as::<_, RosterEntry>(
        r#"
        SELECT s.id AS student_id, s.name AS name
        FROM enrollments e
        JOIN students s ON s.id = e.student_id
        WHERE e.offering_id = ?
        ORDER BY s.name
        "#,
    )
    .bind(offering_id)
    .fetch_all(db)
    .await
}

/// One `INSERT .. ON CONFLICT` per row; the uniqueness key on
/// (student, offering, date) turns a repeat mark into an overwrite.
pub async fn upsert_attendance<'e, E>(
    executor: E,
    student_id: &str,
    offering_id: &str,
    date: &str,
    status: AttendanceStatus,
    now: &str,
) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO attendance_records
            (id, student_id, offering_id, date, status, recorded_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (student_id, offering_id, date)
        DO UPDATE SET status = excluded.status, updated_at = excluded.updated_at
        "#,
    )
    .bind(&id)
    .bind(student_id)
    .bind(offering_id)
    .bind(date)
    .bind(status)
    .bind(now)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(())
}

#[derive(Debug, sqlx::FromRow)]
pub struct StatusCount {
    pub offering_id: String,
    pub status: AttendanceStatus,
    pub n: i64,
}

pub async fn attendance_status_counts(
    db: &SqlitePool,
    student_id: &str,
) -> Result<Vec<StatusCount>, sqlx::Error> {
    sqlx::query_as::<_, StatusCount>(
        r#"
        SELECT offering_id, status, COUNT(*) AS n
        FROM attendance_records
        WHERE student_id = ?
        GROUP BY offering_id, status
        "#,
    )
    .bind(student_id)
    .fetch_all(db)
    .await
}

pub async fn count_attendance_for_offering_date(
    db: &SqlitePool,
    offering_id: &str,
    date: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM attendance_records WHERE offering_id = ? AND date = ?")
        .bind(offering_id)
        .bind(date)
        .fetch_one(db)
        .await
}

#[derive(Debug, sqlx::FromRow)]
pub struct EnrolledCourse {
    pub offering_id: String,
    pub course_id: String,
    pub course_name: String,
}

/// Everything a student is enrolled in, with course display fields.
pub async fn enrolled_courses_for_student(
    db: &SqlitePool,
    student_id: &str,
) -> Result<Vec<EnrolledCourse>, sqlx::Error> {
    sqlx::query_as::<_, EnrolledCourse>(
        r#"
        SELECT e.offering_id AS offering_id, c.id AS course_id, c.name AS course_name
        FROM enrollments e
        JOIN offerings o ON o.id = e.offering_id
        JOIN courses c ON c.id = o.course_id
        WHERE e.student_id = ?
        ORDER BY c.id
        "#,
    )
    .bind(student_id)
    .fetch_all(db)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqlitePool {
        // A single connection keeps the in-memory database alive and shared.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create test db");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        pool
    }

    #[tokio::test]
    async fn test_insert_and_fetch_course() {
        let pool = setup_test_db().await;

        let req = NewCourseRequest {
            id: "CS301".to_string(),
            name: "Operating Systems".to_string(),
            credits: 4,
        };

        let course = insert_course(&pool, req).await.expect("Failed to insert course");
        assert_eq!(course.id, "CS301");
        assert_eq!(course.credits, 4);

        let courses = fetch_courses(&pool).await.expect("Failed to fetch courses");
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].name, "Operating Systems");
    }

    #[tokio::test]
    async fn test_offering_pair_is_unique() {
        let pool = setup_test_db().await;

        let course = insert_course(
            &pool,
            NewCourseRequest {
                id: "CS301".to_string(),
                name: "Operating Systems".to_string(),
                credits: 4,
            },
        )
        .await
        .expect("Failed to insert course");
        let instructor = insert_instructor(&pool, "R. Iyer").await.expect("Failed to insert instructor");

        insert_offering(&pool, &course.id, &instructor.id, 60)
            .await
            .expect("Failed to insert offering");

        let duplicate = insert_offering(&pool, &course.id, &instructor.id, 30).await;
        assert!(duplicate.is_err());
        assert!(
            offering_exists_for_pair(&pool, &course.id, &instructor.id)
                .await
                .expect("Failed to check pair")
        );
    }

    #[tokio::test]
    async fn test_enrolled_count_is_derived() {
        let pool = setup_test_db().await;

        let course = insert_course(
            &pool,
            NewCourseRequest {
                id: "MA101".to_string(),
                name: "Calculus".to_string(),
                credits: 3,
            },
        )
        .await
        .expect("Failed to insert course");
        let instructor = insert_instructor(&pool, "K. Das").await.expect("Failed to insert instructor");
        let offering = insert_offering(&pool, &course.id, &instructor.id, 60)
            .await
            .expect("Failed to insert offering");

        assert_eq!(enrolled_count(&pool, &offering.id).await.unwrap(), 0);

        let now = Utc::now().to_rfc3339();
        for i in 0..3 {
            let student = insert_student(&pool, &format!("Student {i}"))
                .await
                .expect("Failed to insert student");
            insert_enrollment(&pool, &student.id, &offering.id, &now)
                .await
                .expect("Failed to enroll");
        }

        assert_eq!(enrolled_count(&pool, &offering.id).await.unwrap(), 3);

        let listed = fetch_offerings_with_counts(&pool).await.expect("Failed to list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].enrolled_count, 3);
        assert_eq!(listed[0].available_seats, 57);
    }

    #[tokio::test]
    async fn test_duplicate_enrollment_rejected_by_schema() {
        let pool = setup_test_db().await;

        let course = insert_course(
            &pool,
            NewCourseRequest {
                id: "PH102".to_string(),
                name: "Mechanics".to_string(),
                credits: 4,
            },
        )
        .await
        .unwrap();
        let instructor = insert_instructor(&pool, "A. Bose").await.unwrap();
        let offering = insert_offering(&pool, &course.id, &instructor.id, 60).await.unwrap();
        let student = insert_student(&pool, "N. Rao").await.unwrap();

        let now = Utc::now().to_rfc3339();
        insert_enrollment(&pool, &student.id, &offering.id, &now).await.unwrap();
        let second = insert_enrollment(&pool, &student.id, &offering.id, &now).await;
        assert!(second.is_err());
        assert_eq!(enrolled_count(&pool, &offering.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_attendance_upsert_overwrites() {
        let pool = setup_test_db().await;

        let course = insert_course(
            &pool,
            NewCourseRequest {
                id: "CH110".to_string(),
                name: "Chemistry".to_string(),
                credits: 3,
            },
        )
        .await
        .unwrap();
        let instructor = insert_instructor(&pool, "M. Sen").await.unwrap();
        let offering = insert_offering(&pool, &course.id, &instructor.id, 60).await.unwrap();
        let student = insert_student(&pool, "P. Ghosh").await.unwrap();

        let now = Utc::now().to_rfc3339();
        upsert_attendance(&pool, &student.id, &offering.id, "2025-09-01", AttendanceStatus::Absent, &now)
            .await
            .unwrap();
        upsert_attendance(&pool, &student.id, &offering.id, "2025-09-01", AttendanceStatus::Present, &now)
            .await
            .unwrap();

        assert_eq!(
            count_attendance_for_offering_date(&pool, &offering.id, "2025-09-01")
                .await
                .unwrap(),
            1
        );

        let counts = attendance_status_counts(&pool, &student.id).await.unwrap();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].status, AttendanceStatus::Present);
        assert_eq!(counts[0].n, 1);
    }
}
