use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Instructor {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Student {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPersonRequest {
    pub name: String,
}

/// Roster line for an offering: every enrolled student.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RosterEntry {
    pub student_id: String,
    pub name: String,
}
