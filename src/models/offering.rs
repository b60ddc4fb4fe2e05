use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const DEFAULT_CAPACITY: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Offering {
    pub id: String,
    pub course_id: String,
    pub instructor_id: String,
    pub capacity: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOfferingRequest {
    pub course_id: String,
    pub instructor_id: String,
    pub capacity: Option<i64>,
}

/// Listing row: offering joined with its course and instructor, seat counts
/// computed from the enrollment table at query time.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OfferingSummary {
    pub offering_id: String,
    pub course_id: String,
    pub course_name: String,
    pub credits: i64,
    pub instructor_id: String,
    pub instructor_name: String,
    pub capacity: i64,
    pub enrolled_count: i64,
    pub available_seats: i64,
}
