use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use crates::domain::{
    entities::{subscriptions::SubscriptionEntity, users::UserEntity},
    repositories::{subscriptions::SubscriptionRepository, users::UserRepository},
    value_objects::{
        enums::{plan_statuses::PlanStatus, user_roles::UserRole},
        plan_access::PlanAccessDecision,
    },
};
use tracing::debug;
use uuid::Uuid;

/// Signup trial length and the grace window after it; deletion itself is
/// enforced by an external cleanup job, not here.
pub const TRIAL_DAYS: i64 = 30;
pub const TRIAL_GRACE_DAYS: i64 = 5;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Resolves the tenant's access tier from the local trial window and the
/// externally recorded subscriptions. Pure function of its inputs.
///
/// Precedence: any currently-active subscription wins; a record that is
/// active by status but past its end date demotes to expired; otherwise the
/// trial arithmetic is authoritative.
pub fn resolve_plan_access(
    user: &UserEntity,
    now: DateTime<Utc>,
    subscriptions: &[SubscriptionEntity],
) -> PlanAccessDecision {
    if UserRole::from_str(&user.role) == UserRole::Admin {
        return PlanAccessDecision::active();
    }

    let trial_ends_at = user.created_at + Duration::days(TRIAL_DAYS);
    let trial_delete_at = trial_ends_at + Duration::days(TRIAL_GRACE_DAYS);

    let email = user.email.trim().to_lowercase();
    let relevant: Vec<&SubscriptionEntity> = subscriptions
        .iter()
        .filter(|subscription| subscription.email.trim().to_lowercase() == email)
        .collect();

    let status = if relevant
        .iter()
        .any(|subscription| subscription.is_active_at(now))
    {
        PlanStatus::Active
    } else if relevant
        .iter()
        .any(|subscription| subscription.is_lapsed_at(now))
    {
        PlanStatus::Expired
    } else if now < trial_ends_at {
        PlanStatus::Trial
    } else {
        PlanStatus::Expired
    };

    let trial_days_left = if status == PlanStatus::Trial {
        days_left_ceil(trial_ends_at - now)
    } else {
        0
    };

    PlanAccessDecision {
        status,
        trial_ends_at: Some(trial_ends_at),
        trial_delete_at: Some(trial_delete_at),
        trial_days_left,
    }
}

fn days_left_ceil(remaining: Duration) -> i64 {
    let seconds = remaining.num_seconds();
    if seconds <= 0 {
        return 0;
    }

    (seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY
}

/// Repo-backed wrapper: loads the tenant and its subscription history, then
/// applies the pure resolver.
pub struct PlanAccessUseCase<U, S>
where
    U: UserRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    user_repo: Arc<U>,
    subscription_repo: Arc<S>,
}

impl<U, S> PlanAccessUseCase<U, S>
where
    U: UserRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    pub fn new(user_repo: Arc<U>, subscription_repo: Arc<S>) -> Self {
        Self {
            user_repo,
            subscription_repo,
        }
    }

    pub async fn resolve_for_tenant(&self, tenant_id: Uuid) -> Result<PlanAccessDecision> {
        let user = self
            .user_repo
            .find_by_id(tenant_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("tenant not found"))?;

        let subscriptions = self
            .subscription_repo
            .find_by_email(user.email.trim().to_lowercase())
            .await?;

        let decision = resolve_plan_access(&user, Utc::now(), &subscriptions);
        debug!(
            %tenant_id,
            status = %decision.status,
            trial_days_left = decision.trial_days_left,
            "plan_access: resolved access decision"
        );

        Ok(decision)
    }
}
