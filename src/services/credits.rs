use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::{CeilingRule, CreditPolicy};

/// One way a proposed selection misses the credit rules. A selection is valid
/// only when the full list comes back empty; callers report every violation,
/// not just the first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BucketViolation {
    ShortOfTarget {
        credit_value: i64,
        required: i64,
        selected: i64,
    },
    OverTarget {
        credit_value: i64,
        required: i64,
        selected: i64,
    },
    CeilingExceeded {
        ceiling: i64,
        total: i64,
    },
    CeilingNotReached {
        ceiling: i64,
        total: i64,
    },
}

/// Checks the credit values of a proposed selection against the policy.
/// Credit values with no configured bucket count toward the total only.
pub fn validate(policy: &CreditPolicy, credit_values: &[i64]) -> Vec<BucketViolation> {
    let mut selected_per_credit: BTreeMap<i64, i64> = BTreeMap::new();
    for &credits in credit_values {
        *selected_per_credit.entry(credits).or_insert(0) += 1;
    }

    let mut violations = Vec::new();

    for (&credit_value, &required) in &policy.required_per_credit {
        let selected = selected_per_credit.get(&credit_value).copied().unwrap_or(0);
        if selected < required {
            violations.push(BucketViolation::ShortOfTarget {
                credit_value,
                required,
                selected,
            });
        } else if selected > required {
            violations.push(BucketViolation::OverTarget {
                credit_value,
                required,
                selected,
            });
        }
    }

    let total: i64 = credit_values.iter().sum();
    match policy.ceiling_rule {
        CeilingRule::AtMost => {
            if total > policy.ceiling {
                violations.push(BucketViolation::CeilingExceeded {
                    ceiling: policy.ceiling,
                    total,
                });
            }
        }
        CeilingRule::Exact => {
            if total > policy.ceiling {
                violations.push(BucketViolation::CeilingExceeded {
                    ceiling: policy.ceiling,
                    total,
                });
            } else if total < policy.ceiling {
                violations.push(BucketViolation::CeilingNotReached {
                    ceiling: policy.ceiling,
                    total,
                });
            }
        }
    }

    violations
}
