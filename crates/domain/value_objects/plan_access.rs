use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::value_objects::enums::plan_statuses::PlanStatus;

/// Access decision derived from the trial window and external subscriptions.
/// Recomputed on every check; never stored.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlanAccessDecision {
    pub status: PlanStatus,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub trial_delete_at: Option<DateTime<Utc>>,
    pub trial_days_left: i64,
}

impl PlanAccessDecision {
    pub fn active() -> Self {
        Self {
            status: PlanStatus::Active,
            trial_ends_at: None,
            trial_delete_at: None,
            trial_days_left: 0,
        }
    }
}
