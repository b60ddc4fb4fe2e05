use std::collections::BTreeMap;
use std::env;

use crate::error::AppError;
use crate::models::AttendanceStatus;

/// How the total-credit ceiling is enforced. Degree programs differ on
/// whether the ceiling is a target or a maximum, so the rule is
/// configuration, not code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CeilingRule {
    /// Total selected credits must equal the ceiling exactly.
    Exact,
    /// Total selected credits must not exceed the ceiling.
    AtMost,
}

#[derive(Debug, Clone)]
pub struct CreditPolicy {
    /// Required number of selected offerings per credit value.
    pub required_per_credit: BTreeMap<i64, i64>,
    pub ceiling: i64,
    pub ceiling_rule: CeilingRule,
}

impl Default for CreditPolicy {
    fn default() -> Self {
        Self {
            required_per_credit: BTreeMap::from([(5, 1), (4, 2), (3, 3)]),
            ceiling: 25,
            ceiling_rule: CeilingRule::AtMost,
        }
    }
}

impl CreditPolicy {
    /// Reads `CREDIT_BUCKETS` (e.g. `"5:1,4:2,3:3"`), `CREDIT_CEILING` and
    /// `CREDIT_CEILING_RULE` (`exact` | `at-most`), falling back to the
    /// defaults for any unset variable.
    pub fn from_env() -> Result<Self, AppError> {
        let mut policy = Self::default();

        if let Ok(raw) = env::var("CREDIT_BUCKETS") {
            policy.required_per_credit = parse_buckets(&raw)
                .map_err(|e| AppError::Validation(format!("CREDIT_BUCKETS: {e}")))?;
        }
        if let Ok(raw) = env::var("CREDIT_CEILING") {
            policy.ceiling = raw
                .parse()
                .map_err(|_| AppError::Validation(format!("CREDIT_CEILING is not a number: {raw}")))?;
        }
        if let Ok(raw) = env::var("CREDIT_CEILING_RULE") {
            policy.ceiling_rule = match raw.as_str() {
                "exact" => CeilingRule::Exact,
                "at-most" => CeilingRule::AtMost,
                other => {
                    return Err(AppError::Validation(format!(
                        "CREDIT_CEILING_RULE must be 'exact' or 'at-most', got '{other}'"
                    )));
                }
            };
        }

        Ok(policy)
    }
}

fn parse_buckets(raw: &str) -> Result<BTreeMap<i64, i64>, String> {
    let mut buckets = BTreeMap::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (credit, count) = part
            .split_once(':')
            .ok_or_else(|| format!("expected 'credit:count', got '{part}'"))?;
        let credit: i64 = credit
            .trim()
            .parse()
            .map_err(|_| format!("bad credit value '{credit}'"))?;
        let count: i64 = count
            .trim()
            .parse()
            .map_err(|_| format!("bad target count '{count}'"))?;
        if !(1..=5).contains(&credit) {
            return Err(format!("credit value {credit} out of range 1-5"));
        }
        if count < 0 {
            return Err(format!("target count {count} is negative"));
        }
        if buckets.insert(credit, count).is_some() {
            return Err(format!("credit value {credit} listed twice"));
        }
    }
    Ok(buckets)
}

/// Which statuses count toward the present-percentage. Institutions disagree
/// on Late and Excused, so both are explicit switches here.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttendancePolicy {
    pub count_late: bool,
    pub count_excused: bool,
}

impl AttendancePolicy {
    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self {
            count_late: env_flag("ATTENDANCE_COUNT_LATE")?,
            count_excused: env_flag("ATTENDANCE_COUNT_EXCUSED")?,
        })
    }

    pub fn counts_as_present(&self, status: AttendanceStatus) -> bool {
        match status {
            AttendanceStatus::Present => true,
            AttendanceStatus::Late => self.count_late,
            AttendanceStatus::Excused => self.count_excused,
            AttendanceStatus::Absent => false,
        }
    }
}

fn env_flag(name: &str) -> Result<bool, AppError> {
    match env::var(name) {
        Err(_) => Ok(false),
        Ok(raw) => match raw.as_str() {
            "1" | "true" => Ok(true),
            "0" | "false" => Ok(false),
            other => Err(AppError::Validation(format!(
                "{name} must be true/false, got '{other}'"
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bucket_list() {
        let buckets = parse_buckets("5:1, 4:2,3:3").unwrap();
        assert_eq!(buckets, BTreeMap::from([(5, 1), (4, 2), (3, 3)]));
    }

    #[test]
    fn rejects_malformed_bucket_list() {
        assert!(parse_buckets("5-1").is_err());
        assert!(parse_buckets("9:1").is_err());
        assert!(parse_buckets("5:x").is_err());
        assert!(parse_buckets("5:1,5:2").is_err());
    }

    #[test]
    fn default_policy_excludes_late_and_excused() {
        let policy = AttendancePolicy::default();
        assert!(policy.counts_as_present(AttendanceStatus::Present));
        assert!(!policy.counts_as_present(AttendanceStatus::Late));
        assert!(!policy.counts_as_present(AttendanceStatus::Excused));
        assert!(!policy.counts_as_present(AttendanceStatus::Absent));
    }

    #[test]
    fn late_counts_when_enabled() {
        let policy = AttendancePolicy {
            count_late: true,
            count_excused: false,
        };
        assert!(policy.counts_as_present(AttendanceStatus::Late));
        assert!(!policy.counts_as_present(AttendanceStatus::Excused));
    }
}
