use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::entities::financial_records::FinancialRecordEntity;

#[derive(Debug, Clone, Serialize)]
pub struct FinancialRecordDto {
    pub id: Uuid,
    pub ticket_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub amount: Decimal,
    pub status: String,
    pub due_date: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
}

impl From<FinancialRecordEntity> for FinancialRecordDto {
    fn from(entity: FinancialRecordEntity) -> Self {
        Self {
            id: entity.id,
            ticket_id: entity.ticket_id,
            client_id: entity.client_id,
            amount: entity.amount,
            status: entity.status,
            due_date: entity.due_date,
            paid_at: entity.paid_at,
            description: entity.description,
        }
    }
}
