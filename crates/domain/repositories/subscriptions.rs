use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::subscriptions::{InsertSubscriptionEntity, SubscriptionEntity};

#[async_trait]
#[automock]
pub trait SubscriptionRepository {
    /// All subscription rows ever recorded for a normalized email, most
    /// recent first.
    async fn find_by_email(&self, email: String) -> Result<Vec<SubscriptionEntity>>;

    /// Looks a row up by the gateway payment id that funded it.
    async fn find_by_payment_ref(&self, payment_ref: String)
    -> Result<Option<SubscriptionEntity>>;

    async fn create(&self, subscription: InsertSubscriptionEntity) -> Result<Uuid>;

    /// Moves the end date of an existing row and records the funding payment.
    async fn extend_period(
        &self,
        id: Uuid,
        new_end: DateTime<Utc>,
        payment_ref: String,
    ) -> Result<()>;
}
