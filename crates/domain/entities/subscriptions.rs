use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::value_objects::enums::subscription_statuses::SubscriptionStatus;
use crate::infra::db::postgres::schema::subscriptions;

/// Externally-sourced subscription keyed by normalized email + role. Several
/// rows may exist per email over time; resolution picks the relevant one.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = subscriptions)]
pub struct SubscriptionEntity {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    pub plan_id: String,
    pub status: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    /// Gateway payment id that last funded this row; the upsert key that
    /// keeps webhook redelivery idempotent.
    pub gateway_payment_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionEntity {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        SubscriptionStatus::from_str(&self.status) == SubscriptionStatus::Active
            && self.end_date.map(|end| end > now).unwrap_or(true)
    }

    /// Active by status but already past its end date.
    pub fn is_lapsed_at(&self, now: DateTime<Utc>) -> bool {
        SubscriptionStatus::from_str(&self.status) == SubscriptionStatus::Active
            && self.end_date.map(|end| end <= now).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = subscriptions)]
pub struct InsertSubscriptionEntity {
    pub email: String,
    pub role: String,
    pub plan_id: String,
    pub status: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub gateway_payment_ref: Option<String>,
}
