use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Late => "late",
            AttendanceStatus::Excused => "excused",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AttendanceRecord {
    pub id: String,
    pub student_id: String,
    pub offering_id: String,
    pub date: String,
    pub status: AttendanceStatus,
    pub recorded_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceEntry {
    pub student_id: String,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkAttendanceRequest {
    pub entries: Vec<AttendanceEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkReceipt {
    pub upserted_count: usize,
}

/// Per-offering attendance summary for one student.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceSummary {
    pub offering_id: String,
    pub course_id: String,
    pub course_name: String,
    pub total_classes: i64,
    pub present_classes: i64,
    pub percentage: f64,
}
