use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use chrono::Utc;
use sqlx::SqlitePool;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};

use crate::config::CreditPolicy;
use crate::db::repository;
use crate::error::AppError;
use crate::models::EnrollmentReceipt;
use crate::services::credits;

/// One async mutex per offering id. Enrollment commits touching an offering
/// serialize on its lock, so two submissions can never both observe the last
/// seat as free. Guards are acquired in sorted id order, which rules out
/// deadlock between submissions holding overlapping sets.
#[derive(Default)]
pub struct OfferingLocks {
    inner: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl OfferingLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, offering_id: &str) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock().expect("offering lock map poisoned");
        map.entry(offering_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// `offering_ids` must already be sorted and deduplicated.
    async fn acquire(&self, offering_ids: &[String]) -> Vec<OwnedMutexGuard<()>> {
        let handles: Vec<_> = offering_ids.iter().map(|id| self.handle(id)).collect();
        let mut guards = Vec::with_capacity(handles.len());
        for handle in handles {
            guards.push(handle.lock_owned().await);
        }
        guards
    }
}

pub struct EnrollmentService {
    db: SqlitePool,
    policy: CreditPolicy,
    locks: Arc<OfferingLocks>,
}

impl EnrollmentService {
    pub fn new(db: SqlitePool, policy: CreditPolicy, locks: Arc<OfferingLocks>) -> Self {
        Self { db, policy, locks }
    }

    /// Validates and commits a student's full course selection as one unit.
    /// Either every offering in the set gains an enrollment row or none does.
    pub async fn submit(
        &self,
        student_id: &str,
        offering_ids: Vec<String>,
    ) -> Result<EnrollmentReceipt, AppError> {
        repository::find_student_by_id(&self.db, student_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("unknown student {student_id}")))?;

        let mut ids = offering_ids;
        ids.sort();
        if ids.windows(2).any(|w| w[0] == w[1]) {
            return Err(AppError::Validation(
                "selection lists the same offering twice".to_string(),
            ));
        }

        let mut offerings = Vec::with_capacity(ids.len());
        for id in &ids {
            let offering = repository::find_offering_with_credits(&self.db, id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("unknown offering {id}")))?;
            offerings.push(offering);
        }

        let credit_values: Vec<i64> = offerings.iter().map(|o| o.credits).collect();
        let violations = credits::validate(&self.policy, &credit_values);
        if !violations.is_empty() {
            return Err(AppError::ConstraintUnmet { violations });
        }

        // Serialization point: hold every involved offering's lock across the
        // seat re-read and the insert transaction.
        let _guards = self.locks.acquire(&ids).await;

        let mut tx = self.db.begin().await?;

        let mut full = Vec::new();
        for offering in &offerings {
            let enrolled = repository::enrolled_count(&mut *tx, &offering.id).await?;
            if offering.capacity - enrolled < 1 {
                full.push(offering.id.clone());
            }
        }
        if !full.is_empty() {
            warn!("enrollment rejected for {}: no seats left in {:?}", student_id, full);
            return Err(AppError::InsufficientSeats { offering_ids: full });
        }

        for offering in &offerings {
            if repository::is_enrolled(&mut *tx, student_id, &offering.id).await? {
                return Err(AppError::DuplicateEnrollment {
                    offering_id: offering.id.clone(),
                });
            }
        }

        let now = Utc::now().to_rfc3339();
        for offering in &offerings {
            repository::insert_enrollment(&mut *tx, student_id, &offering.id, &now).await?;
        }
        tx.commit().await?;

        info!("enrollment committed for {} ({} offerings)", student_id, ids.len());
        Ok(EnrollmentReceipt {
            student_id: student_id.to_string(),
            committed_offering_ids: ids,
        })
    }
}
