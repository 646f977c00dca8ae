use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::tickets::TicketEntity;

#[async_trait]
#[automock]
pub trait TicketRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<TicketEntity>>;
    async fn set_payment_date(&self, id: Uuid, payment_date: DateTime<Utc>) -> Result<()>;
}
