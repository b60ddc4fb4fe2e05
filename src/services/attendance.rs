use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::info;

use crate::config::AttendancePolicy;
use crate::db::repository;
use crate::error::AppError;
use crate::models::{AttendanceEntry, AttendanceSummary, MarkReceipt, Offering, RosterEntry};

pub struct AttendanceService {
    db: SqlitePool,
    policy: AttendancePolicy,
}

impl AttendanceService {
    pub fn new(db: SqlitePool, policy: AttendancePolicy) -> Self {
        Self { db, policy }
    }

    /// Records one date's roster for an offering. Rows are keyed on
    /// (student, offering, date), so repeating a call overwrites statuses
    /// instead of duplicating rows; the whole batch lands in one transaction.
    pub async fn mark(
        &self,
        instructor_id: &str,
        offering_id: &str,
        date: &str,
        entries: Vec<AttendanceEntry>,
    ) -> Result<MarkReceipt, AppError> {
        let offering = self.owned_offering(instructor_id, offering_id).await?;
        let date = parse_date(date)?;

        for entry in &entries {
            repository::find_student_by_id(&self.db, &entry.student_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("unknown student {}", entry.student_id)))?;
        }

        let now = Utc::now().to_rfc3339();
        let mut tx = self.db.begin().await?;
        for entry in &entries {
            repository::upsert_attendance(
                &mut *tx,
                &entry.student_id,
                &offering.id,
                &date,
                entry.status,
                &now,
            )
            .await?;
        }
        tx.commit().await?;

        info!(
            "attendance marked for offering {} on {} ({} students)",
            offering.id,
            date,
            entries.len()
        );
        Ok(MarkReceipt {
            upserted_count: entries.len(),
        })
    }

    pub async fn roster(
        &self,
        instructor_id: &str,
        offering_id: &str,
    ) -> Result<Vec<RosterEntry>, AppError> {
        let offering = self.owned_offering(instructor_id, offering_id).await?;
        Ok(repository::roster_for_offering(&self.db, &offering.id).await?)
    }

    /// Present/total counts and percentage for every offering the student is
    /// enrolled in. Offerings with no recorded classes report 0, not an error.
    pub async fn summary(&self, student_id: &str) -> Result<Vec<AttendanceSummary>, AppError> {
        repository::find_student_by_id(&self.db, student_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("unknown student {student_id}")))?;

        let mut totals: HashMap<String, (i64, i64)> = HashMap::new();
        for row in repository::attendance_status_counts(&self.db, student_id).await? {
            let (total, present) = totals.entry(row.offering_id.clone()).or_insert((0, 0));
            *total += row.n;
            if self.policy.counts_as_present(row.status) {
                *present += row.n;
            }
        }

        let enrolled = repository::enrolled_courses_for_student(&self.db, student_id).await?;
        let summaries = enrolled
            .into_iter()
            .map(|course| {
                let (total, present) = totals.get(&course.offering_id).copied().unwrap_or((0, 0));
                AttendanceSummary {
                    offering_id: course.offering_id,
                    course_id: course.course_id,
                    course_name: course.course_name,
                    total_classes: total,
                    present_classes: present,
                    percentage: percentage(present, total),
                }
            })
            .collect();

        Ok(summaries)
    }

    async fn owned_offering(
        &self,
        instructor_id: &str,
        offering_id: &str,
    ) -> Result<Offering, AppError> {
        let offering = repository::find_offering_by_id(&self.db, offering_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("unknown offering {offering_id}")))?;
        if offering.instructor_id != instructor_id {
            return Err(AppError::NotAuthorized(format!(
                "offering {offering_id} belongs to another instructor"
            )));
        }
        Ok(offering)
    }
}

/// Validates and canonicalizes a calendar date to `YYYY-MM-DD`.
fn parse_date(raw: &str) -> Result<String, AppError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|_| AppError::Validation(format!("invalid date '{raw}', expected YYYY-MM-DD")))
}

fn percentage(present: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (present as f64 / total as f64 * 1000.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_rounds_to_one_decimal() {
        assert_eq!(percentage(7, 10), 70.0);
        assert_eq!(percentage(1, 3), 33.3);
        assert_eq!(percentage(2, 3), 66.7);
        assert_eq!(percentage(10, 10), 100.0);
    }

    #[test]
    fn percentage_of_no_classes_is_zero() {
        assert_eq!(percentage(0, 0), 0.0);
    }

    #[test]
    fn date_is_canonicalized() {
        assert_eq!(parse_date("2025-09-01").unwrap(), "2025-09-01");
        assert!(parse_date("01/09/2025").is_err());
        assert!(parse_date("2025-13-40").is_err());
        assert!(parse_date("not a date").is_err());
    }
}
