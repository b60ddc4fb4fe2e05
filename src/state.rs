use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::{AttendancePolicy, CreditPolicy};
use crate::services::OfferingLocks;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub credit_policy: CreditPolicy,
    pub attendance_policy: AttendancePolicy,
    pub locks: Arc<OfferingLocks>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        credit_policy: CreditPolicy,
        attendance_policy: AttendancePolicy,
    ) -> Self {
        Self {
            db,
            credit_policy,
            attendance_policy,
            locks: Arc::new(OfferingLocks::new()),
        }
    }
}
