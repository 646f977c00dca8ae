use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::financial_records::{
    FinancialRecordEntity, InsertFinancialRecordEntity,
};

/// Narrow read/update contract the settlement engine needs from persistence.
#[async_trait]
#[automock]
pub trait FinancialRecordRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<FinancialRecordEntity>>;
    async fn find_by_ticket(&self, ticket_id: Uuid) -> Result<Option<FinancialRecordEntity>>;
    async fn create(&self, record: InsertFinancialRecordEntity) -> Result<FinancialRecordEntity>;
    async fn mark_paid(&self, id: Uuid, paid_at: DateTime<Utc>) -> Result<FinancialRecordEntity>;
}
