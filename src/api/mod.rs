pub mod auth;

use axum::Json;
use axum::extract::Path;
use axum::routing::{delete, post, put};
use axum::{Router, extract::State, http::StatusCode, routing::get};

use crate::api::auth::AuthContext;
use crate::db::repository;
use crate::error::AppError;
use crate::models::*;
use crate::services::{AttendanceService, EnrollmentService};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/courses", get(list_courses).post(create_course))
        .route("/courses/{id}", delete(delete_course))
        .route("/instructors", post(create_instructor))
        .route("/students", post(create_student))
        .route("/offerings", get(list_offerings).post(create_offering))
        .route("/offerings/{id}", delete(delete_offering))
        .route("/offerings/{id}/roster", get(offering_roster))
        .route("/offerings/{id}/attendance/{date}", put(mark_attendance))
        .route("/enrollments", post(submit_enrollment))
        .route("/students/{id}/attendance", get(attendance_summary))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn list_courses(
    State(state): State<AppState>,
    _auth: AuthContext,
) -> Result<Json<Vec<Course>>, AppError> {
    let courses = repository::fetch_courses(&state.db).await?;
    Ok(Json(courses))
}

async fn create_course(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<NewCourseRequest>,
) -> Result<Json<Course>, AppError> {
    auth.require(Role::Admin)?;
    if req.id.trim().is_empty() {
        return Err(AppError::Validation("course id must not be empty".to_string()));
    }
    if !(1..=5).contains(&req.credits) {
        return Err(AppError::Validation(format!(
            "credits must be between 1 and 5, got {}",
            req.credits
        )));
    }
    if repository::find_course_by_id(&state.db, &req.id).await?.is_some() {
        return Err(AppError::Conflict(format!("course {} already exists", req.id)));
    }
    let course = repository::insert_course(&state.db, req).await?;
    Ok(Json(course))
}

async fn delete_course(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    auth.require(Role::Admin)?;
    let offerings = repository::count_offerings_for_course(&state.db, &id).await?;
    if offerings > 0 {
        return Err(AppError::Conflict(format!(
            "course {id} still has {offerings} offering(s)"
        )));
    }
    if repository::delete_course(&state.db, &id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("unknown course {id}")))
    }
}

async fn create_instructor(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<NewPersonRequest>,
) -> Result<Json<Instructor>, AppError> {
    auth.require(Role::Admin)?;
    if req.name.trim().is_empty() {
        return Err(AppError::Validation("name must not be empty".to_string()));
    }
    let instructor = repository::insert_instructor(&state.db, &req.name).await?;
    Ok(Json(instructor))
}

async fn create_student(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<NewPersonRequest>,
) -> Result<Json<Student>, AppError> {
    auth.require(Role::Admin)?;
    if req.name.trim().is_empty() {
        return Err(AppError::Validation("name must not be empty".to_string()));
    }
    let student = repository::insert_student(&state.db, &req.name).await?;
    Ok(Json(student))
}

async fn list_offerings(
    State(state): State<AppState>,
    _auth: AuthContext,
) -> Result<Json<Vec<OfferingSummary>>, AppError> {
    let offerings = repository::fetch_offerings_with_counts(&state.db).await?;
    Ok(Json(offerings))
}

async fn create_offering(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<NewOfferingRequest>,
) -> Result<Json<Offering>, AppError> {
    auth.require(Role::Admin)?;

    let capacity = req.capacity.unwrap_or(DEFAULT_CAPACITY);
    if capacity < 0 {
        return Err(AppError::Validation(format!(
            "capacity must not be negative, got {capacity}"
        )));
    }
    repository::find_course_by_id(&state.db, &req.course_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("unknown course {}", req.course_id)))?;
    repository::find_instructor_by_id(&state.db, &req.instructor_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("unknown instructor {}", req.instructor_id)))?;
    if repository::offering_exists_for_pair(&state.db, &req.course_id, &req.instructor_id).await? {
        return Err(AppError::Conflict(format!(
            "offering of {} by {} already exists",
            req.course_id, req.instructor_id
        )));
    }

    let offering =
        repository::insert_offering(&state.db, &req.course_id, &req.instructor_id, capacity).await?;
    Ok(Json(offering))
}

async fn delete_offering(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    auth.require(Role::Admin)?;
    let enrolled = repository::enrolled_count(&state.db, &id).await?;
    if enrolled > 0 {
        return Err(AppError::Conflict(format!(
            "offering {id} still has {enrolled} enrollment(s)"
        )));
    }
    if repository::delete_offering(&state.db, &id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("unknown offering {id}")))
    }
}

async fn submit_enrollment(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<EnrollmentRequest>,
) -> Result<Json<EnrollmentReceipt>, AppError> {
    auth.require(Role::Student)?;
    let service = EnrollmentService::new(
        state.db.clone(),
        state.credit_policy.clone(),
        state.locks.clone(),
    );
    let receipt = service.submit(&auth.id, req.offering_ids).await?;
    Ok(Json(receipt))
}

async fn attendance_summary(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(student_id): Path<String>,
) -> Result<Json<Vec<AttendanceSummary>>, AppError> {
    auth.require(Role::Student)?;
    if auth.id != student_id {
        return Err(AppError::NotAuthorized(
            "students may only read their own attendance".to_string(),
        ));
    }
    let service = AttendanceService::new(state.db.clone(), state.attendance_policy);
    let summaries = service.summary(&student_id).await?;
    Ok(Json(summaries))
}

async fn offering_roster(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(offering_id): Path<String>,
) -> Result<Json<Vec<RosterEntry>>, AppError> {
    auth.require(Role::Faculty)?;
    let service = AttendanceService::new(state.db.clone(), state.attendance_policy);
    let roster = service.roster(&auth.id, &offering_id).await?;
    Ok(Json(roster))
}

async fn mark_attendance(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((offering_id, date)): Path<(String, String)>,
    Json(req): Json<MarkAttendanceRequest>,
) -> Result<Json<MarkReceipt>, AppError> {
    auth.require(Role::Faculty)?;
    let service = AttendanceService::new(state.db.clone(), state.attendance_policy);
    let receipt = service.mark(&auth.id, &offering_id, &date, req.entries).await?;
    Ok(Json(receipt))
}
